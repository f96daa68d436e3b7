//! Platform authentication: session token pairs and sign-in/sign-out.
//!
//! Token pairs are minted by the platform's `tokenCreate` mutation, rotated
//! through `tokenRefresh`, and invalidated with `tokenDeactivate`. The
//! storefront keeps the pair in the session cookie store; the platform owns
//! validity.

pub mod sync;

pub use sync::{AuthState, MountedQuery, SessionClients, SyncAction};

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;
use tracing::instrument;

use coastline_core::TokenPair;

use crate::commerce::types::{Customer, UserError};
use crate::commerce::{CommerceError, client::post_graphql, queries};

/// Errors from the authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The platform rejected the credentials.
    #[error("invalid credentials: {0}")]
    InvalidCredentials(String),

    /// The refresh token was rejected.
    #[error("refresh rejected: {0}")]
    RefreshRejected(String),

    /// Underlying platform request failed.
    #[error(transparent)]
    Commerce(#[from] CommerceError),
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenPayload {
    access_token: Option<String>,
    refresh_token: Option<String>,
    expires_in: Option<i64>,
    refresh_expires_in: Option<i64>,
    #[serde(default)]
    customer: Option<Customer>,
    #[serde(default)]
    errors: Vec<UserError>,
}

impl TokenPayload {
    fn into_pair(self, fallback_refresh: Option<&str>) -> Result<TokenPair, AuthError> {
        let access_token = self
            .access_token
            .ok_or_else(|| AuthError::RefreshRejected("no access token returned".to_owned()))?;
        let expires_in = self.expires_in.unwrap_or(0);
        let refresh_token = self
            .refresh_token
            .or_else(|| fallback_refresh.map(str::to_owned));

        Ok(TokenPair::from_lifetimes(
            access_token,
            refresh_token,
            chrono::Utc::now().timestamp(),
            expires_in,
            self.refresh_expires_in,
        ))
    }

    fn error_message(&self) -> Option<String> {
        if self.errors.is_empty() {
            return None;
        }
        Some(
            self.errors
                .iter()
                .map(|e| e.message.as_str())
                .collect::<Vec<_>>()
                .join("; "),
        )
    }
}

/// Sign in with email and password, minting a fresh token pair.
///
/// # Errors
///
/// Returns `AuthError::InvalidCredentials` when the platform rejects the
/// credentials, or a `CommerceError` for transport failures.
#[instrument(skip(http, password), fields(email = %email))]
pub async fn sign_in(
    http: &reqwest::Client,
    endpoint: &str,
    email: &str,
    password: &SecretString,
) -> Result<(TokenPair, Customer), AuthError> {
    #[derive(Deserialize)]
    struct Data {
        #[serde(rename = "tokenCreate")]
        token_create: TokenPayload,
    }

    let variables = serde_json::json!({
        "email": email,
        "password": password.expose_secret(),
    });

    let data: Data = post_graphql(http, endpoint, None, queries::TOKEN_CREATE, Some(variables))
        .await?;

    let mut payload = data.token_create;
    if let Some(message) = payload.error_message() {
        return Err(AuthError::InvalidCredentials(message));
    }

    let customer = payload
        .customer
        .take()
        .ok_or_else(|| AuthError::InvalidCredentials("no customer returned".to_owned()))?;
    let pair = payload.into_pair(None)?;

    Ok((pair, customer))
}

/// Rotate a token pair using its refresh token.
///
/// If the platform does not return a new refresh token, the old one is kept.
///
/// # Errors
///
/// Returns `AuthError::RefreshRejected` when the refresh token is no longer
/// accepted, or a `CommerceError` for transport failures.
#[instrument(skip_all)]
pub async fn refresh(
    http: &reqwest::Client,
    endpoint: &str,
    refresh_token: &str,
) -> Result<TokenPair, AuthError> {
    #[derive(Deserialize)]
    struct Data {
        #[serde(rename = "tokenRefresh")]
        token_refresh: TokenPayload,
    }

    let variables = serde_json::json!({ "refreshToken": refresh_token });
    let data: Data = post_graphql(http, endpoint, None, queries::TOKEN_REFRESH, Some(variables))
        .await?;

    if let Some(message) = data.token_refresh.error_message() {
        return Err(AuthError::RefreshRejected(message));
    }

    data.token_refresh.into_pair(Some(refresh_token))
}

/// Deactivate a token pair server-side.
///
/// Local sign-out must succeed even when this call fails; callers log the
/// error and drop the pair regardless.
///
/// # Errors
///
/// Returns a `CommerceError` for transport failures or platform errors.
#[instrument(skip_all)]
pub async fn sign_out(
    http: &reqwest::Client,
    endpoint: &str,
    pair: &TokenPair,
) -> Result<(), AuthError> {
    let Some(refresh_token) = pair.refresh_token.as_deref() else {
        // Nothing to revoke server-side; access tokens age out on their own.
        return Ok(());
    };

    #[derive(Deserialize)]
    struct Data {
        #[serde(rename = "tokenDeactivate")]
        token_deactivate: DeactivatePayload,
    }

    #[derive(Deserialize)]
    struct DeactivatePayload {
        #[serde(default)]
        errors: Vec<UserError>,
    }

    let variables = serde_json::json!({ "refreshToken": refresh_token });
    let data: Data = post_graphql(
        http,
        endpoint,
        Some(pair.access_token.as_str()),
        queries::TOKEN_DEACTIVATE,
        Some(variables),
    )
    .await?;

    if let Some(first) = data.token_deactivate.errors.first() {
        return Err(AuthError::RefreshRejected(first.message.clone()));
    }

    Ok(())
}

/// Authentication client bound to the platform endpoint.
#[derive(Clone)]
pub struct AuthClient {
    http: reqwest::Client,
    endpoint: String,
}

impl AuthClient {
    /// Create an auth client for the given GraphQL endpoint.
    #[must_use]
    pub fn new(endpoint: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.to_owned(),
        }
    }

    /// See [`sign_in`].
    ///
    /// # Errors
    ///
    /// Propagates the errors of the free function.
    pub async fn sign_in(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<(TokenPair, Customer), AuthError> {
        sign_in(&self.http, &self.endpoint, email, password).await
    }

    /// See [`refresh`].
    ///
    /// # Errors
    ///
    /// Propagates the errors of the free function.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, AuthError> {
        refresh(&self.http, &self.endpoint, refresh_token).await
    }

    /// See [`sign_out`].
    ///
    /// # Errors
    ///
    /// Propagates the errors of the free function.
    pub async fn sign_out(&self, pair: &TokenPair) -> Result<(), AuthError> {
        sign_out(&self.http, &self.endpoint, pair).await
    }
}
