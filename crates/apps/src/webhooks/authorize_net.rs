//! Authorize.net payment-event webhook receiver.
//!
//! Verifies the HMAC-SHA512 signature, maps the gateway event to a payment
//! status, and logs it. The platform reconciles the actual payment state;
//! this endpoint only gives operators a trail.

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::{info, instrument, warn};

use coastline_core::PaymentStatus;

use crate::error::AppError;
use crate::state::AppState;

use super::signature::verify_authorize_net_signature;

/// Signature header on Authorize.net webhook deliveries.
pub const SIGNATURE_HEADER: &str = "x-anet-signature";

/// Authorize.net webhook notification body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthNetNotification {
    pub notification_id: String,
    pub event_type: String,
    #[serde(default)]
    pub payload: Option<AuthNetPayload>,
}

/// Transaction details inside a notification.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthNetPayload {
    #[serde(default)]
    pub id: Option<String>,
}

/// Map an Authorize.net event type to a payment status.
#[must_use]
pub fn map_event(event_type: &str) -> Option<PaymentStatus> {
    match event_type {
        "net.authorize.payment.authorization.created" => Some(PaymentStatus::Authorized),
        "net.authorize.payment.authcapture.created"
        | "net.authorize.payment.capture.created"
        | "net.authorize.payment.priorAuthCapture.created" => Some(PaymentStatus::Charged),
        "net.authorize.payment.refund.created" => Some(PaymentStatus::Refunded),
        "net.authorize.payment.void.created" => Some(PaymentStatus::Voided),
        "net.authorize.payment.fraud.declined" => Some(PaymentStatus::Failed),
        _ => None,
    }
}

/// Handle an Authorize.net webhook.
#[instrument(skip(state, headers, body))]
pub async fn handle(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> Result<impl IntoResponse, AppError> {
    let Some(config) = state.config().authorize_net.as_ref() else {
        return Err(AppError::BadRequest(
            "Authorize.net integration not configured".into(),
        ));
    };

    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::BadRequest("Missing signature header".into()))?;

    verify_authorize_net_signature(&config.signature_key, &body, signature)
        .map_err(|e| AppError::Unauthorized(e.to_string()))?;

    let notification: AuthNetNotification = serde_json::from_str(&body)
        .map_err(|e| AppError::BadRequest(format!("Failed to parse payload: {e}")))?;

    let transaction = notification
        .payload
        .and_then(|p| p.id)
        .unwrap_or_else(|| "unknown".to_owned());

    match map_event(&notification.event_type) {
        Some(status) => {
            info!(
                notification = %notification.notification_id,
                transaction = %transaction,
                status = ?status,
                "Authorize.net payment event"
            );
        }
        None => {
            warn!(
                notification = %notification.notification_id,
                event_type = %notification.event_type,
                "unhandled Authorize.net event type"
            );
        }
    }

    Ok(StatusCode::OK)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_event() {
        assert_eq!(
            map_event("net.authorize.payment.authcapture.created"),
            Some(PaymentStatus::Charged)
        );
        assert_eq!(
            map_event("net.authorize.payment.refund.created"),
            Some(PaymentStatus::Refunded)
        );
        assert_eq!(
            map_event("net.authorize.payment.void.created"),
            Some(PaymentStatus::Voided)
        );
        assert_eq!(map_event("net.authorize.customer.created"), None);
    }

    #[test]
    fn test_notification_deserializes() {
        let raw = r#"{
            "notificationId": "n-1",
            "eventType": "net.authorize.payment.authcapture.created",
            "payload": {"id": "trans-77"}
        }"#;

        let notification: AuthNetNotification = serde_json::from_str(raw).expect("deserialize");
        assert_eq!(notification.notification_id, "n-1");
        assert_eq!(
            notification.payload.and_then(|p| p.id).as_deref(),
            Some("trans-77")
        );
    }
}
