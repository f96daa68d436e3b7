//! Tax calculation client (TaxJar-style REST API).

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;
use tracing::instrument;

use coastline_core::Money;

use crate::config::TaxConfig;

/// Errors that can occur when calculating taxes.
#[derive(Debug, Error)]
pub enum TaxError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Failed to parse response.
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Tax calculation client.
#[derive(Clone)]
pub struct TaxClient {
    client: reqwest::Client,
    api_url: String,
    api_token: SecretString,
}

/// Tax amounts computed for an order.
#[derive(Debug, Clone, Deserialize)]
pub struct TaxBreakdown {
    /// Tax to collect, in the order's currency.
    pub amount_to_collect: rust_decimal::Decimal,
    /// Combined tax rate applied.
    pub rate: f64,
}

#[derive(Deserialize)]
struct TaxResponse {
    tax: TaxBreakdown,
}

impl TaxClient {
    /// Create a new tax client.
    #[must_use]
    pub fn new(config: &TaxConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: config.api_url.clone(),
            api_token: config.api_token.clone(),
        }
    }

    /// Calculate the tax to collect on an order total.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails.
    #[instrument(skip(self))]
    pub async fn calculate(&self, total: &Money) -> Result<TaxBreakdown, TaxError> {
        let url = format!("{}/v2/taxes", self.api_url);

        let body = serde_json::json!({
            "amount": total.amount,
            "currency": total.currency.code(),
        });

        let response = self
            .client
            .post(&url)
            .bearer_auth(self.api_token.expose_secret())
            .json(&body)
            .send()
            .await?;
        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(TaxError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: TaxResponse = response
            .json()
            .await
            .map_err(|e| TaxError::Parse(e.to_string()))?;

        Ok(parsed.tax)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tax_response_deserializes() {
        let raw = r#"{"tax": {"amount_to_collect": "3.94", "rate": 0.0825}}"#;
        let parsed: TaxResponse = serde_json::from_str(raw).expect("deserialize");
        assert_eq!(
            parsed.tax.amount_to_collect,
            rust_decimal::Decimal::new(394, 2)
        );
        assert!((parsed.tax.rate - 0.0825).abs() < f64::EPSILON);
    }
}
