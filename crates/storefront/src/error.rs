//! Unified error handling with Sentry integration.
//!
//! Route handlers return `Result<T, AppError>`; server-class errors are
//! captured to Sentry before responding, and internals are never exposed to
//! clients.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::auth::AuthError;
use crate::commerce::CommerceError;
use crate::services::klarna::KlarnaError;
use crate::services::sequra::SequraError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Commerce platform operation failed.
    #[error("Commerce error: {0}")]
    Commerce(#[from] CommerceError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Klarna API operation failed.
    #[error("Klarna error: {0}")]
    Klarna(#[from] KlarnaError),

    /// SeQura API operation failed.
    #[error("SeQura error: {0}")]
    Sequra(#[from] SequraError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Customer is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server-class errors to Sentry
        if matches!(
            self,
            Self::Internal(_) | Self::Commerce(_) | Self::Klarna(_) | Self::Sequra(_)
        ) {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let status = match &self {
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Commerce(err) => match err {
                CommerceError::NotFound(_) => StatusCode::NOT_FOUND,
                CommerceError::UserError(_) => StatusCode::BAD_REQUEST,
                CommerceError::TokenExpired => StatusCode::UNAUTHORIZED,
                CommerceError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
                _ => StatusCode::BAD_GATEWAY,
            },
            Self::Klarna(_) | Self::Sequra(_) => StatusCode::BAD_GATEWAY,
            Self::Auth(err) => match err {
                AuthError::InvalidCredentials(_) | AuthError::RefreshRejected(_) => {
                    StatusCode::UNAUTHORIZED
                }
                AuthError::Commerce(_) => StatusCode::BAD_GATEWAY,
            },
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        };

        // Don't expose internal error details to clients
        let message = match &self {
            Self::Internal(_) => "Internal server error".to_owned(),
            Self::Commerce(err) => match err {
                CommerceError::NotFound(_) => "Not found".to_owned(),
                CommerceError::UserError(msg) => msg.clone(),
                CommerceError::TokenExpired => "Session expired, please sign in again".to_owned(),
                _ => "External service error".to_owned(),
            },
            Self::Klarna(_) | Self::Sequra(_) => "Payment service error".to_owned(),
            Self::Auth(err) => match err {
                AuthError::InvalidCredentials(_) => "Invalid credentials".to_owned(),
                AuthError::RefreshRejected(_) => {
                    "Session expired, please sign in again".to_owned()
                }
                AuthError::Commerce(_) => "External service error".to_owned(),
            },
            _ => self.to_string(),
        };

        (status, message).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;
