//! Webhook receivers.
//!
//! Every receiver verifies its signature against the raw request body before
//! parsing anything.

pub mod authorize_net;
pub mod orders;
pub mod signature;

use axum::{Router, routing::post};

use crate::state::AppState;

/// Create the webhook routes router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/orders", post(orders::handle))
        .route("/authorize-net", post(authorize_net::handle))
}
