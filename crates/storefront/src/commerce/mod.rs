//! Commerce platform GraphQL client.
//!
//! # Architecture
//!
//! - Hand-written GraphQL documents over the platform's single HTTP endpoint
//!   (`POST {query, variables}` -> `{data}` or `{errors}`)
//! - The platform is the source of truth - no local sync, direct API calls
//! - Each client owns a private in-memory cache (`moka`, 5 minute TTL) that
//!   lives exactly as long as the client does
//!
//! # Example
//!
//! ```rust,ignore
//! use coastline_storefront::commerce::CommerceClient;
//!
//! let client = CommerceClient::build(&config.commerce.api_url, None);
//!
//! let checkout = client.checkout(&checkout_id).await?;
//! let order = client.checkout_complete(&checkout_id, &transaction_id).await?;
//! ```

pub(crate) mod client;
pub mod queries;
pub mod types;

pub use client::CommerceClient;
pub use types::*;

use serde::Deserialize;
use thiserror::Error;

/// Errors that can occur when talking to the commerce platform.
#[derive(Debug, Error)]
pub enum CommerceError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// GraphQL query returned errors. The array is surfaced verbatim.
    #[error("GraphQL errors: {}", format_graphql_errors(.0))]
    GraphQL(Vec<GraphQLError>),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Resource not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Rate limited by the platform.
    #[error("rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// User error from a mutation (e.g. invalid input).
    #[error("user error: {0}")]
    UserError(String),

    /// The access token was rejected and could not be refreshed.
    #[error("access token expired")]
    TokenExpired,
}

/// A GraphQL error as returned by the platform, kept verbatim.
#[derive(Debug, Clone, Deserialize)]
pub struct GraphQLError {
    /// Error message.
    pub message: String,
    /// Source locations in the query.
    #[serde(default)]
    pub locations: Vec<GraphQLErrorLocation>,
    /// Path to the failing field in the response.
    #[serde(default)]
    pub path: Vec<serde_json::Value>,
}

/// Location in a GraphQL document where an error occurred.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct GraphQLErrorLocation {
    /// Line number (1-indexed).
    pub line: i64,
    /// Column number (1-indexed).
    pub column: i64,
}

fn format_graphql_errors(errors: &[GraphQLError]) -> String {
    if errors.is_empty() {
        return "(no error details provided)".to_owned();
    }

    errors
        .iter()
        .enumerate()
        .map(|(i, e)| {
            let mut parts = Vec::new();

            if !e.message.is_empty() {
                parts.push(e.message.clone());
            }

            if !e.path.is_empty() {
                let path_str = e
                    .path
                    .iter()
                    .map(|p| match p {
                        serde_json::Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .collect::<Vec<_>>()
                    .join(".");
                parts.push(format!("path: {path_str}"));
            }

            if let Some(loc) = e.locations.first() {
                parts.push(format!("at line {}:{}", loc.line, loc.column));
            }

            if parts.is_empty() {
                format!("[error {}]: (no details)", i + 1)
            } else {
                parts.join(" ")
            }
        })
        .collect::<Vec<_>>()
        .join("; ")
}
