//! Request-scoped models and session-stored types.

pub mod session;

pub use session::{CurrentCustomer, keys as session_keys};
