//! Platform order webhook receiver.
//!
//! Verifies the delivery signature against the raw body, then fans the event
//! out to the configured notifiers. Fan-out failures are logged and never
//! retried; the platform gets a 200 as soon as the delivery itself was
//! valid, so it does not redeliver on a notifier outage.

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::{error, info, instrument, warn};

use coastline_core::{Money, OrderId};

use crate::error::AppError;
use crate::slack::{build_order_created_message, build_order_paid_message};
use crate::state::AppState;

use super::signature::verify_platform_signature;

/// Signature header on platform webhook deliveries.
pub const SIGNATURE_HEADER: &str = "x-platform-signature";
/// Timestamp header on platform webhook deliveries.
pub const TIMESTAMP_HEADER: &str = "x-platform-timestamp";

/// Webhook event types this app subscribes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderEvent {
    OrderCreated,
    OrderPaid,
}

/// Order data carried in the webhook payload.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSummary {
    pub id: OrderId,
    pub number: String,
    pub total: Money,
    #[serde(default)]
    pub customer_email: Option<String>,
}

/// Full webhook payload.
#[derive(Debug, Deserialize)]
pub struct OrderWebhookPayload {
    pub event: OrderEvent,
    pub order: OrderSummary,
}

/// Handle a platform order webhook.
#[instrument(skip(state, headers, body))]
pub async fn handle(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> Result<impl IntoResponse, AppError> {
    let timestamp = headers
        .get(TIMESTAMP_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::BadRequest("Missing timestamp header".into()))?;

    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::BadRequest("Missing signature header".into()))?;

    verify_platform_signature(
        &state.config().webhook_secret,
        timestamp,
        &body,
        signature,
    )
    .map_err(|e| AppError::Unauthorized(e.to_string()))?;

    let payload: OrderWebhookPayload = serde_json::from_str(&body)
        .map_err(|e| AppError::BadRequest(format!("Failed to parse payload: {e}")))?;

    info!(event = ?payload.event, order = %payload.order.id, "order webhook received");

    match payload.event {
        OrderEvent::OrderCreated => {
            notify_slack_created(&state, &payload.order).await;
            notify_email(&state, &payload.order).await;
        }
        OrderEvent::OrderPaid => {
            notify_slack_paid(&state, &payload.order).await;
            record_taxes(&state, &payload.order).await;
        }
    }

    // Fan-out failures were already logged; the delivery itself was valid.
    Ok(StatusCode::OK)
}

async fn notify_slack_created(state: &AppState, order: &OrderSummary) {
    let Some(slack) = state.slack() else { return };

    let blocks = build_order_created_message(order);
    let fallback = format!("New order {}", order.number);
    if let Err(e) = slack
        .post_message(slack.orders_channel(), blocks, Some(&fallback))
        .await
    {
        error!(error = %e, order = %order.id, "Slack notification failed");
    }
}

async fn notify_slack_paid(state: &AppState, order: &OrderSummary) {
    let Some(slack) = state.slack() else { return };

    let blocks = build_order_paid_message(order);
    let fallback = format!("Order {} paid", order.number);
    if let Err(e) = slack
        .post_message(slack.orders_channel(), blocks, Some(&fallback))
        .await
    {
        error!(error = %e, order = %order.id, "Slack notification failed");
    }
}

async fn notify_email(state: &AppState, order: &OrderSummary) {
    let Some(email) = state.email() else { return };
    let Some(to) = order.customer_email.as_deref() else {
        warn!(order = %order.id, "order has no customer email, skipping confirmation");
        return;
    };

    if let Err(e) = email
        .send_order_confirmation(to, &order.number, &order.total.to_string())
        .await
    {
        error!(error = %e, order = %order.id, "order confirmation email failed");
    }
}

async fn record_taxes(state: &AppState, order: &OrderSummary) {
    let Some(tax) = state.tax() else { return };

    match tax.calculate(&order.total).await {
        Ok(breakdown) => {
            info!(
                order = %order.id,
                amount_to_collect = %breakdown.amount_to_collect,
                rate = breakdown.rate,
                "tax calculated for paid order"
            );
        }
        Err(e) => {
            error!(error = %e, order = %order.id, "tax calculation failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_deserializes() {
        let raw = r#"{
            "event": "ORDER_CREATED",
            "order": {
                "id": "gid://platform/Order/1",
                "number": "1001",
                "total": {"amount": "42.50", "currency": "EUR"},
                "customerEmail": "shopper@example.com"
            }
        }"#;

        let payload: OrderWebhookPayload = serde_json::from_str(raw).expect("deserialize");
        assert_eq!(payload.event, OrderEvent::OrderCreated);
        assert_eq!(payload.order.number, "1001");
        assert_eq!(
            payload.order.customer_email.as_deref(),
            Some("shopper@example.com")
        );
    }

    #[test]
    fn test_unknown_event_is_rejected() {
        let raw = r#"{
            "event": "ORDER_SNEEZED",
            "order": {
                "id": "o-1",
                "number": "1",
                "total": {"amount": "1.00", "currency": "USD"}
            }
        }"#;

        assert!(serde_json::from_str::<OrderWebhookPayload>(raw).is_err());
    }
}
