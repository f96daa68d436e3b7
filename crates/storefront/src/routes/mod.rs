//! HTTP route handlers for the storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                                - Home page
//! GET  /health                          - Health check
//!
//! # Checkout
//! GET  /checkout                        - Checkout page
//! POST /checkout/lines                  - Add a line to the checkout
//!
//! # Payment redirect flows
//! GET  /checkout/pay/klarna/start       - Initialize transaction, redirect to Klarna
//! GET  /checkout/pay/klarna/confirm     - Return callback from Klarna
//! GET  /checkout/pay/klarna/cancel      - Customer cancelled at Klarna
//! GET  /checkout/pay/sequra/start       - Initialize transaction, redirect to SeQura
//! POST /checkout/pay/sequra/ipn         - Signed IPN callback from SeQura
//! GET  /checkout/pay/sequra/return      - Customer returns from SeQura
//!
//! # Orders
//! GET  /orders/{id}/confirmed           - Order confirmation page
//! GET  /account/orders                  - Order history (requires auth)
//!
//! # Auth
//! GET  /auth/login                      - Sign-in page
//! POST /auth/login                      - Sign-in action
//! POST /auth/logout                     - Sign-out action
//! ```

pub mod auth;
pub mod checkout;
pub mod home;
pub mod orders;
pub mod payment;

use axum::{
    Router,
    routing::{get, post},
};
use tower_sessions::Session;
use uuid::Uuid;

use crate::commerce::CommerceClient;
use crate::error::AppError;
use crate::models::session_keys;
use crate::state::AppState;

/// The opaque key binding this session to its entry in the client registry.
///
/// Created on first use and stored in the session cookie.
pub(crate) async fn client_key(session: &Session) -> Result<String, AppError> {
    if let Ok(Some(key)) = session.get::<String>(session_keys::CLIENT_KEY).await {
        return Ok(key);
    }

    let key = Uuid::new_v4().to_string();
    session
        .insert(session_keys::CLIENT_KEY, &key)
        .await
        .map_err(|e| AppError::Internal(format!("session store: {e}")))?;
    Ok(key)
}

/// The commerce client bound to this session's auth state.
pub(crate) async fn session_client(
    state: &AppState,
    session: &Session,
) -> Result<CommerceClient, AppError> {
    let key = client_key(session).await?;
    Ok(state.sessions().client(&key).await)
}

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/logout", post(auth::logout))
}

/// Create the checkout and payment routes router.
pub fn checkout_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(checkout::show))
        .route("/lines", post(checkout::add_line))
        .route("/pay/klarna/start", get(payment::klarna::start))
        .route("/pay/klarna/confirm", get(payment::klarna::confirm))
        .route("/pay/klarna/cancel", get(payment::klarna::cancel))
        .route("/pay/sequra/start", get(payment::sequra::start))
        .route("/pay/sequra/ipn", post(payment::sequra::ipn))
        .route("/pay/sequra/return", get(payment::sequra::return_page))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(home::home))
        .nest("/checkout", checkout_routes())
        .route("/orders/{id}/confirmed", get(orders::confirmed))
        .route("/account/orders", get(orders::history))
        .nest("/auth", auth_routes())
}
