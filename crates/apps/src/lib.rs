//! Coastline Apps - platform-integration app service.
//!
//! # Architecture
//!
//! - Serves the app manifest the platform consumes at installation
//! - Receives the installation token (held in memory only)
//! - Verifies and processes HMAC-signed webhooks from the platform and from
//!   Authorize.net
//! - Fans order events out to Slack, email and tax calculation; fan-out
//!   failures are logged, never retried

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod error;
pub mod manifest;
pub mod services;
pub mod slack;
pub mod state;
pub mod webhooks;

use axum::{
    Router,
    routing::{get, post},
};

use state::AppState;

/// Liveness health check endpoint.
async fn health() -> &'static str {
    "ok"
}

/// Build the app service router.
#[must_use]
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/manifest", get(manifest::manifest))
        .route("/api/register", post(manifest::register))
        .nest("/api/webhooks", webhooks::router())
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}
