//! Klarna hosted payment page flow.
//!
//! 1. `start` - initialize a platform transaction, create a Klarna session,
//!    redirect the customer to Klarna's hosted page.
//! 2. Klarna redirects back to `confirm` with the checkout ID, transaction
//!    ID and an authorization token in the query string.
//! 3. `confirm` - validate the parameters, confirm the Klarna order, and
//!    complete the checkout on the platform.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use coastline_core::{CheckoutId, TransactionId};

use crate::models::session_keys;
use crate::routes::checkout::get_checkout_id;
use crate::routes::orders::{OrderConfirmedTemplate, OrderView};
use crate::state::AppState;

use super::{PaymentCancelledTemplate, error_view};

/// Query parameters on the Klarna return callback.
#[derive(Debug, Deserialize)]
pub struct ConfirmQuery {
    /// Platform checkout ID, threaded through the redirect.
    pub checkout: Option<String>,
    /// Platform transaction ID, threaded through the redirect.
    pub transaction: Option<String>,
    /// Klarna's authorization token for the approved payment.
    pub authorization_token: Option<String>,
}

/// Start the Klarna flow.
///
/// Requires an active checkout in the session. Initializes a platform
/// transaction, stores its ID in the session, and redirects to Klarna.
#[instrument(skip(state, session))]
pub async fn start(State(state): State<AppState>, session: Session) -> Response {
    let Some(checkout_id) = get_checkout_id(&session).await else {
        return error_view(StatusCode::BAD_REQUEST, "No active checkout to pay for.");
    };

    let client = match crate::routes::session_client(&state, &session).await {
        Ok(client) => client,
        Err(e) => return e.into_response(),
    };

    let checkout = match client.checkout(&checkout_id).await {
        Ok(checkout) => checkout,
        Err(e) => {
            tracing::error!(error = %e, "failed to load checkout for payment");
            return error_view(StatusCode::BAD_GATEWAY, "Could not load your checkout.");
        }
    };

    let transaction = match client.transaction_initialize(&checkout_id, "klarna").await {
        Ok(init) => init.transaction_id,
        Err(e) => {
            tracing::error!(error = %e, "transaction initialization failed");
            return error_view(StatusCode::BAD_GATEWAY, "Could not start the payment.");
        }
    };

    if let Err(e) = session
        .insert(session_keys::KLARNA_TRANSACTION, &transaction)
        .await
    {
        tracing::error!(error = %e, "failed to store transaction in session");
        return error_view(StatusCode::INTERNAL_SERVER_ERROR, "Session failure.");
    }

    let base = &state.config().base_url;
    let confirm_url = format!(
        "{base}/checkout/pay/klarna/confirm?checkout={}&transaction={}",
        urlencode(checkout_id.as_str()),
        urlencode(transaction.as_str()),
    );
    let cancel_url = format!("{base}/checkout/pay/klarna/cancel");

    match state
        .klarna()
        .create_session(&checkout, &confirm_url, &cancel_url)
        .await
    {
        Ok(hpp) => Redirect::to(&hpp.redirect_url).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Klarna session creation failed");
            error_view(StatusCode::BAD_GATEWAY, "Could not reach the payment provider.")
        }
    }
}

/// Handle the Klarna return callback.
///
/// Every required parameter is checked before any network call: a malformed
/// callback renders one error view and touches nothing remote. Replays of an
/// already-processed transaction render the recorded order again.
#[instrument(skip(state, session, query))]
pub async fn confirm(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<ConfirmQuery>,
) -> Response {
    // Parameter validation first; no network traffic on a malformed callback.
    let Some(checkout) = query.checkout else {
        tracing::warn!("Klarna callback missing checkout parameter");
        return error_view(StatusCode::BAD_REQUEST, "Missing checkout reference.");
    };
    let Some(transaction) = query.transaction else {
        tracing::warn!("Klarna callback missing transaction parameter");
        return error_view(StatusCode::BAD_REQUEST, "Missing transaction reference.");
    };
    let Some(authorization_token) = query.authorization_token else {
        tracing::warn!("Klarna callback missing authorization token");
        return error_view(StatusCode::BAD_REQUEST, "Missing authorization token.");
    };

    let checkout_id = CheckoutId::new(checkout);
    let transaction_id = TransactionId::new(transaction);

    // Replayed callback: the session's one-time state is already gone, but
    // the order exists. Render it again instead of failing the refresh.
    if let Some(order_id) = state.replay().completed_order(&transaction_id).await {
        tracing::info!(order_id = %order_id, "duplicate Klarna callback, replaying order view");
        return render_order(&state, &session, &order_id).await;
    }

    // The transaction must be the one this session started (one-time state,
    // like an OAuth state parameter).
    let expected: Option<TransactionId> = session
        .get(session_keys::KLARNA_TRANSACTION)
        .await
        .ok()
        .flatten();
    if expected.as_ref() != Some(&transaction_id) {
        tracing::warn!("Klarna callback transaction mismatch");
        return error_view(StatusCode::BAD_REQUEST, "Unknown payment transaction.");
    }

    if let Err(e) = state.klarna().confirm_order(&authorization_token).await {
        tracing::error!(error = %e, "Klarna order confirmation failed");
        return error_view(StatusCode::BAD_GATEWAY, "The payment could not be confirmed.");
    }

    let client = match crate::routes::session_client(&state, &session).await {
        Ok(client) => client,
        Err(e) => return e.into_response(),
    };

    let order = match client.checkout_complete(&checkout_id, &transaction_id).await {
        Ok(order) => order,
        Err(e) => {
            tracing::error!(error = %e, "checkout completion failed");
            return error_view(StatusCode::BAD_GATEWAY, "The order could not be created.");
        }
    };

    state
        .replay()
        .record(transaction_id, order.id.clone())
        .await;

    // The checkout is consumed; clear the threaded flow state.
    let _ = session
        .remove::<CheckoutId>(session_keys::CHECKOUT_ID)
        .await;
    let _ = session
        .remove::<TransactionId>(session_keys::KLARNA_TRANSACTION)
        .await;

    tracing::info!(order_id = %order.id, "Klarna payment completed");

    OrderConfirmedTemplate {
        order: OrderView::from(&order),
    }
    .into_response()
}

/// Customer cancelled on Klarna's page.
pub async fn cancel() -> PaymentCancelledTemplate {
    PaymentCancelledTemplate
}

/// Fetch and render an order that was already created for this transaction.
async fn render_order(
    state: &AppState,
    session: &Session,
    order_id: &coastline_core::OrderId,
) -> Response {
    let client = match crate::routes::session_client(state, session).await {
        Ok(client) => client,
        Err(e) => return e.into_response(),
    };

    match client.order(order_id).await {
        Ok(order) => OrderConfirmedTemplate {
            order: OrderView::from(&order),
        }
        .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "failed to load replayed order");
            error_view(StatusCode::BAD_GATEWAY, "Could not load your order.")
        }
    }
}

/// Minimal percent-encoding for IDs embedded in redirect URLs.
fn urlencode(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes()).collect()
}
