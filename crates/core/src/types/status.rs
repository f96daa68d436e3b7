//! Status enums for remote commerce entities.
//!
//! These mirror the platform's GraphQL enums; the storefront never stores
//! them durably, it only renders and routes on them.

use serde::{Deserialize, Serialize};

/// Lifecycle of a checkout on the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CheckoutStatus {
    /// Open for line edits and payment initialization.
    #[default]
    Active,
    /// A payment transaction has been initialized; lines are frozen.
    PaymentPending,
    /// Completed into an order.
    Complete,
    /// Abandoned or cancelled.
    Expired,
}

/// Payment state reported by the platform or a payment gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Authorized,
    Charged,
    Refunded,
    Voided,
    Failed,
}

/// Order state on the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Unconfirmed,
    Unfulfilled,
    PartiallyFulfilled,
    Fulfilled,
    Canceled,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_wire_format() {
        let json = serde_json::to_string(&CheckoutStatus::PaymentPending).expect("serialize");
        assert_eq!(json, "\"PAYMENT_PENDING\"");

        let status: PaymentStatus = serde_json::from_str("\"CHARGED\"").expect("deserialize");
        assert_eq!(status, PaymentStatus::Charged);
    }

    #[test]
    fn test_checkout_status_default() {
        assert_eq!(CheckoutStatus::default(), CheckoutStatus::Active);
    }
}
