//! Coastline Storefront - customer-facing e-commerce server.
//!
//! # Architecture
//!
//! - Axum web framework with Askama server-side rendering
//! - Commerce platform GraphQL API for checkouts, orders and auth
//! - Session-scoped GraphQL clients: each session's client (and its cache)
//!   is replaced on auth-state transitions
//! - Klarna and SeQura payment redirect flows with state threaded through
//!   the session cookie and callback query parameters

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod auth;
pub mod commerce;
pub mod config;
pub mod error;
pub mod middleware;
pub mod models;
pub mod payments;
pub mod routes;
pub mod services;
pub mod state;

use axum::{Router, routing::get};

use state::AppState;

/// Liveness health check endpoint.
async fn health() -> &'static str {
    "ok"
}

/// Build the storefront application router.
///
/// Everything except the Sentry tower layers, which `main` adds outermost.
#[must_use]
pub fn app(state: AppState) -> Router {
    let session_layer = middleware::create_session_layer(state.config());

    Router::new()
        .route("/health", get(health))
        .merge(routes::routes())
        .layer(axum::middleware::from_fn(
            middleware::request_id_middleware,
        ))
        .layer(session_layer)
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}
