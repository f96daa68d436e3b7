//! SeQura pay-later flow.
//!
//! 1. `start` - initialize a platform transaction, start a SeQura
//!    solicitation, redirect the customer to the hosted form.
//! 2. SeQura posts a signed IPN to `ipn` when the payment is approved; that
//!    is where the checkout completes.
//! 3. The customer lands on `return` and sees the order if the IPN already
//!    arrived, or a pending page if it has not.

use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
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

use super::{PaymentPendingTemplate, error_view};

/// Signature header on SeQura IPN requests.
pub const IPN_SIGNATURE_HEADER: &str = "x-sequra-signature";

/// IPN payload posted by SeQura.
#[derive(Debug, Deserialize)]
pub struct IpnPayload {
    /// SeQura's order reference.
    pub order_ref: Option<String>,
    /// Event type; only `approved` completes the checkout.
    pub event: Option<String>,
    /// Platform checkout ID, echoed from the solicitation.
    pub checkout: Option<String>,
    /// Platform transaction ID, echoed from the solicitation.
    pub transaction: Option<String>,
}

/// Query parameters on the customer-facing return page.
#[derive(Debug, Deserialize)]
pub struct ReturnQuery {
    pub transaction: Option<String>,
}

/// Start the SeQura flow.
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

    let transaction = match client.transaction_initialize(&checkout_id, "sequra").await {
        Ok(init) => init.transaction_id,
        Err(e) => {
            tracing::error!(error = %e, "transaction initialization failed");
            return error_view(StatusCode::BAD_GATEWAY, "Could not start the payment.");
        }
    };

    if let Err(e) = session
        .insert(session_keys::SEQURA_TRANSACTION, &transaction)
        .await
    {
        tracing::error!(error = %e, "failed to store transaction in session");
        return error_view(StatusCode::INTERNAL_SERVER_ERROR, "Session failure.");
    }

    let base = &state.config().base_url;
    let return_url = format!(
        "{base}/checkout/pay/sequra/return?transaction={}",
        urlencode(transaction.as_str()),
    );
    let notify_url = format!("{base}/checkout/pay/sequra/ipn");

    match state
        .sequra()
        .start_solicitation(&checkout, &return_url, &notify_url)
        .await
    {
        Ok(solicitation) => Redirect::to(&solicitation.form_url).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "SeQura solicitation failed");
            error_view(StatusCode::BAD_GATEWAY, "Could not reach the payment provider.")
        }
    }
}

/// Handle the signed IPN callback.
///
/// The signature is verified against the raw body before anything is parsed
/// or any remote call is made. Approved events complete the checkout; the
/// replay guard keeps re-deliveries from completing it twice.
#[instrument(skip(state, headers, body))]
pub async fn ipn(State(state): State<AppState>, headers: HeaderMap, body: String) -> Response {
    let Some(signature) = headers
        .get(IPN_SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
    else {
        tracing::warn!("SeQura IPN missing signature header");
        return (StatusCode::BAD_REQUEST, "missing signature").into_response();
    };

    if let Err(e) = state.sequra().verify_ipn(&body, signature) {
        tracing::warn!(error = %e, "SeQura IPN signature rejected");
        return (StatusCode::UNAUTHORIZED, "invalid signature").into_response();
    }

    let payload: IpnPayload = match serde_json::from_str(&body) {
        Ok(payload) => payload,
        Err(e) => {
            tracing::warn!(error = %e, "SeQura IPN body unparseable");
            return (StatusCode::BAD_REQUEST, "invalid payload").into_response();
        }
    };

    // Parameter validation before any remote call.
    let (Some(checkout), Some(transaction)) = (payload.checkout, payload.transaction) else {
        tracing::warn!("SeQura IPN missing checkout or transaction reference");
        return (StatusCode::BAD_REQUEST, "missing references").into_response();
    };

    if payload.event.as_deref() != Some("approved") {
        tracing::info!(event = ?payload.event, "ignoring non-approval SeQura event");
        return (StatusCode::OK, "ignored").into_response();
    }

    let checkout_id = CheckoutId::new(checkout);
    let transaction_id = TransactionId::new(transaction);

    if let Some(order_id) = state.replay().completed_order(&transaction_id).await {
        tracing::info!(order_id = %order_id, "duplicate SeQura IPN, already completed");
        return (StatusCode::OK, "already processed").into_response();
    }

    // IPNs arrive outside any customer session; complete through the shared
    // anonymous client. The platform authorizes by transaction, not viewer.
    match state
        .anonymous()
        .checkout_complete(&checkout_id, &transaction_id)
        .await
    {
        Ok(order) => {
            state.replay().record(transaction_id, order.id.clone()).await;
            tracing::info!(order_id = %order.id, "SeQura payment completed");
            (StatusCode::OK, "ok").into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "checkout completion from IPN failed");
            (StatusCode::BAD_GATEWAY, "completion failed").into_response()
        }
    }
}

/// Customer-facing return page.
///
/// Shows the order if the IPN already completed it, a pending page otherwise.
#[instrument(skip(state, session, query))]
pub async fn return_page(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<ReturnQuery>,
) -> Response {
    let Some(transaction) = query.transaction else {
        tracing::warn!("SeQura return missing transaction parameter");
        return error_view(StatusCode::BAD_REQUEST, "Missing transaction reference.");
    };

    let transaction_id = TransactionId::new(transaction);

    // Completed transactions render the order even on a refresh, after the
    // session's one-time state has been cleared.
    let completed = state.replay().completed_order(&transaction_id).await;

    if completed.is_none() {
        // The transaction must be the one this session started.
        let expected: Option<TransactionId> = session
            .get(session_keys::SEQURA_TRANSACTION)
            .await
            .ok()
            .flatten();
        if expected.as_ref() != Some(&transaction_id) {
            tracing::warn!("SeQura return transaction mismatch");
            return error_view(StatusCode::BAD_REQUEST, "Unknown payment transaction.");
        }
    }

    let Some(order_id) = completed else {
        return PaymentPendingTemplate.into_response();
    };

    // Payment settled; this session's checkout is consumed.
    let _ = session
        .remove::<CheckoutId>(session_keys::CHECKOUT_ID)
        .await;
    let _ = session
        .remove::<TransactionId>(session_keys::SEQURA_TRANSACTION)
        .await;

    let client = match crate::routes::session_client(&state, &session).await {
        Ok(client) => client,
        Err(e) => return e.into_response(),
    };

    match client.order(&order_id).await {
        Ok(order) => OrderConfirmedTemplate {
            order: OrderView::from(&order),
        }
        .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "failed to load completed order");
            error_view(StatusCode::BAD_GATEWAY, "Could not load your order.")
        }
    }
}

/// Minimal percent-encoding for IDs embedded in redirect URLs.
fn urlencode(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes()).collect()
}
