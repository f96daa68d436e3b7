//! SeQura API client for the pay-later redirect flow.
//!
//! The storefront starts a solicitation, sends the customer to SeQura's
//! hosted form, and processes the signed IPN callback that follows.

use hmac::{Hmac, Mac};
use secrecy::ExposeSecret;
use serde::Deserialize;
use sha2::Sha256;
use thiserror::Error;
use tracing::instrument;

use coastline_core::Money;

use crate::commerce::types::Checkout;
use crate::config::SequraConfig;

/// Errors that can occur when interacting with the SeQura API.
#[derive(Debug, Error)]
pub enum SequraError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Failed to parse a response.
    #[error("Parse error: {0}")]
    Parse(String),

    /// IPN signature did not verify.
    #[error("Invalid IPN signature: {0}")]
    InvalidSignature(String),
}

/// SeQura API client.
#[derive(Clone)]
pub struct SequraClient {
    client: reqwest::Client,
    api_url: String,
    merchant_ref: String,
    username: String,
    password: secrecy::SecretString,
    ipn_secret: secrecy::SecretString,
}

/// A started solicitation: where to send the customer.
#[derive(Debug, Clone, Deserialize)]
pub struct Solicitation {
    /// SeQura order reference, echoed back in the IPN.
    pub order_ref: String,
    /// URL of the hosted payment form.
    pub form_url: String,
}

/// Convert an amount to SeQura's cents representation.
fn with_tax_cents(money: &Money) -> i64 {
    use rust_decimal::prelude::ToPrimitive;
    (money.amount * rust_decimal::Decimal::from(100))
        .round()
        .to_i64()
        .unwrap_or(0)
}

/// Constant-time string comparison for signatures.
fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.bytes().zip(b.bytes()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

impl SequraClient {
    /// Create a new SeQura API client.
    #[must_use]
    pub fn new(config: &SequraConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: config.api_url.clone(),
            merchant_ref: config.merchant_ref.clone(),
            username: config.username.clone(),
            password: config.password.clone(),
            ipn_secret: config.ipn_secret.clone(),
        }
    }

    /// Start a solicitation for a checkout.
    ///
    /// `return_url` is where the customer lands after the form; `notify_url`
    /// receives the signed IPN.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, checkout), fields(checkout_id = %checkout.id))]
    pub async fn start_solicitation(
        &self,
        checkout: &Checkout,
        return_url: &str,
        notify_url: &str,
    ) -> Result<Solicitation, SequraError> {
        let url = format!("{}/merchants/{}/orders", self.api_url, self.merchant_ref);

        let items: Vec<serde_json::Value> = checkout
            .lines
            .iter()
            .map(|line| {
                serde_json::json!({
                    "reference": line.variant_id,
                    "name": line.title,
                    "quantity": line.quantity,
                    "price_with_tax": with_tax_cents(&line.unit_price),
                    "total_with_tax": with_tax_cents(&line.total_price),
                })
            })
            .collect();

        let body = serde_json::json!({
            "order": {
                "currency": checkout.total.currency.code(),
                "cart": {
                    "order_total_with_tax": with_tax_cents(&checkout.total),
                    "items": items,
                },
                "merchant": {
                    "notify_url": notify_url,
                    "return_url": return_url,
                },
            },
        });

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.username, Some(self.password.expose_secret()))
            .json(&body)
            .send()
            .await?;
        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(SequraError::Api {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json()
            .await
            .map_err(|e| SequraError::Parse(e.to_string()))
    }

    /// Verify the HMAC-SHA256 signature on an IPN body.
    ///
    /// # Errors
    ///
    /// Returns `SequraError::InvalidSignature` if the signature does not
    /// match the body.
    #[instrument(skip(self, body, signature))]
    pub fn verify_ipn(&self, body: &str, signature: &str) -> Result<(), SequraError> {
        let mut mac = Hmac::<Sha256>::new_from_slice(self.ipn_secret.expose_secret().as_bytes())
            .map_err(|e| SequraError::InvalidSignature(e.to_string()))?;

        mac.update(body.as_bytes());

        let expected = hex::encode(mac.finalize().into_bytes());

        if !constant_time_compare(&expected, signature) {
            return Err(SequraError::InvalidSignature(
                "signature mismatch".to_owned(),
            ));
        }

        Ok(())
    }
}
