//! Klarna API client for the hosted payment page flow.
//!
//! The storefront creates a payment session, sends the customer to Klarna's
//! hosted page, and confirms the resulting authorization when the customer
//! returns.

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use reqwest::header::{HeaderMap, HeaderValue};
use rust_decimal::prelude::ToPrimitive;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::instrument;

use coastline_core::Money;

use crate::commerce::types::Checkout;
use crate::config::KlarnaConfig;

/// Errors that can occur when interacting with the Klarna API.
#[derive(Debug, Error)]
pub enum KlarnaError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Failed to build the client or parse a response.
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Klarna API client.
#[derive(Clone)]
pub struct KlarnaClient {
    client: reqwest::Client,
    api_url: String,
}

/// A hosted payment page session.
#[derive(Debug, Clone, Deserialize)]
pub struct HppSession {
    /// Klarna session ID.
    pub session_id: String,
    /// URL of the hosted payment page to redirect the customer to.
    pub redirect_url: String,
}

/// A Klarna order created from a completed authorization.
#[derive(Debug, Clone, Deserialize)]
pub struct KlarnaOrder {
    /// Klarna-side order ID.
    pub order_id: String,
    /// Fraud assessment: ACCEPTED, PENDING or REJECTED.
    pub fraud_status: String,
}

#[derive(Serialize)]
struct OrderLine<'a> {
    name: &'a str,
    quantity: u32,
    unit_price: i64,
    total_amount: i64,
}

/// Convert an amount to Klarna's minor units (cents).
fn minor_units(money: &Money) -> i64 {
    (money.amount * rust_decimal::Decimal::from(100))
        .round()
        .to_i64()
        .unwrap_or(0)
}

impl KlarnaClient {
    /// Create a new Klarna API client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn new(config: &KlarnaConfig) -> Result<Self, KlarnaError> {
        let mut headers = HeaderMap::new();

        let credentials = format!(
            "{}:{}",
            config.username,
            config.password.expose_secret()
        );
        let auth_value = format!("Basic {}", BASE64.encode(credentials));
        headers.insert(
            "Authorization",
            HeaderValue::from_str(&auth_value)
                .map_err(|e| KlarnaError::Parse(format!("Invalid credential format: {e}")))?,
        );
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            api_url: config.api_url.clone(),
        })
    }

    /// Create a hosted payment page session for a checkout.
    ///
    /// `confirm_url` and `cancel_url` are where Klarna sends the customer
    /// afterwards; Klarna appends its authorization token to `confirm_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, checkout), fields(checkout_id = %checkout.id))]
    pub async fn create_session(
        &self,
        checkout: &Checkout,
        confirm_url: &str,
        cancel_url: &str,
    ) -> Result<HppSession, KlarnaError> {
        let url = format!("{}/hpp/v1/sessions", self.api_url);

        let order_lines: Vec<OrderLine<'_>> = checkout
            .lines
            .iter()
            .map(|line| OrderLine {
                name: &line.title,
                quantity: line.quantity,
                unit_price: minor_units(&line.unit_price),
                total_amount: minor_units(&line.total_price),
            })
            .collect();

        let body = serde_json::json!({
            "payment_session": {
                "purchase_currency": checkout.total.currency.code(),
                "order_amount": minor_units(&checkout.total),
                "order_lines": order_lines,
            },
            "merchant_urls": {
                "success": confirm_url,
                "cancel": cancel_url,
            },
        });

        let response = self.client.post(&url).json(&body).send().await?;
        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(KlarnaError::Api {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json()
            .await
            .map_err(|e| KlarnaError::Parse(e.to_string()))
    }

    /// Turn a completed authorization into a Klarna order.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails or the authorization token
    /// is no longer valid.
    #[instrument(skip(self, authorization_token))]
    pub async fn confirm_order(
        &self,
        authorization_token: &str,
    ) -> Result<KlarnaOrder, KlarnaError> {
        let url = format!(
            "{}/payments/v1/authorizations/{authorization_token}/order",
            self.api_url
        );

        let response = self.client.post(&url).send().await?;
        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(KlarnaError::Api {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json()
            .await
            .map_err(|e| KlarnaError::Parse(e.to_string()))
    }
}
