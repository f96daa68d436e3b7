//! HTTP middleware for the storefront.

mod auth;
mod request_id;
mod session;

pub use auth::{AuthRejection, RequireAuth};
pub use request_id::request_id_middleware;
pub use session::{SESSION_COOKIE_NAME, create_session_layer};
