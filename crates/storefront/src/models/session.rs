//! Session-stored types.
//!
//! Everything the storefront threads between page loads lives in the session
//! cookie store: the checkout identifier, the token pair, and the in-flight
//! payment transaction.

use serde::{Deserialize, Serialize};

use coastline_core::{CustomerId, Email};

/// Session-stored customer identity.
///
/// Minimal data to identify the signed-in customer; everything else is
/// fetched from the platform on demand.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentCustomer {
    /// Platform customer ID.
    pub id: CustomerId,
    /// Customer's email address.
    pub email: Email,
}

/// Session keys.
pub mod keys {
    /// Opaque key identifying this session in the client registry.
    pub const CLIENT_KEY: &str = "client_key";

    /// The active checkout's platform ID.
    pub const CHECKOUT_ID: &str = "checkout_id";

    /// The signed-in customer's token pair.
    pub const TOKEN_PAIR: &str = "token_pair";

    /// The signed-in customer's identity.
    pub const CURRENT_CUSTOMER: &str = "current_customer";

    /// Transaction ID of the in-flight Klarna payment.
    pub const KLARNA_TRANSACTION: &str = "klarna_transaction";

    /// Transaction ID of the in-flight SeQura payment.
    pub const SEQURA_TRANSACTION: &str = "sequra_transaction";
}
