//! Remote entity types fetched from the commerce platform.
//!
//! These are ephemeral query results; the storefront never persists them.

use serde::{Deserialize, Serialize};

use coastline_core::{CheckoutId, CheckoutStatus, CustomerId, Money, OrderId, OrderStatus};

/// A checkout (remote cart-like entity) tracked by the platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Checkout {
    pub id: CheckoutId,
    #[serde(default)]
    pub email: Option<String>,
    pub status: CheckoutStatus,
    #[serde(default)]
    pub lines: Vec<CheckoutLine>,
    pub subtotal: Money,
    pub total: Money,
}

impl Checkout {
    /// Total number of units across all lines.
    #[must_use]
    pub fn quantity(&self) -> u32 {
        self.lines.iter().map(|l| l.quantity).sum()
    }
}

/// A single line in a checkout.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutLine {
    pub id: String,
    pub variant_id: String,
    pub title: String,
    pub quantity: u32,
    pub unit_price: Money,
    pub total_price: Money,
}

/// Input for adding a line to a checkout.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutLineInput {
    pub variant_id: String,
    pub quantity: u32,
}

/// An order created by completing a checkout.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    /// Human-readable order number.
    pub number: String,
    pub status: OrderStatus,
    pub total: Money,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// The signed-in customer, as reported by the platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: CustomerId,
    pub email: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

/// Result of initializing a payment transaction on the platform.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionInit {
    /// Platform-side transaction ID, threaded through the redirect flow.
    pub transaction_id: coastline_core::TransactionId,
    /// Gateway-specific payload (e.g. a client token), passed through opaquely.
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

/// A user-facing validation error attached to a mutation payload.
#[derive(Debug, Clone, Deserialize)]
pub struct UserError {
    #[serde(default)]
    pub field: Option<String>,
    pub message: String,
}

/// Join mutation user errors into a single message, or pass the payload on.
pub(crate) fn reject_user_errors(errors: Vec<UserError>) -> Result<(), super::CommerceError> {
    if errors.is_empty() {
        return Ok(());
    }
    let joined = errors
        .into_iter()
        .map(|e| match e.field {
            Some(field) => format!("{field}: {}", e.message),
            None => e.message,
        })
        .collect::<Vec<_>>()
        .join("; ");
    Err(super::CommerceError::UserError(joined))
}
