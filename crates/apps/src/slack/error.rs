//! Slack client errors.

use thiserror::Error;

/// Errors that can occur when talking to the Slack Web API.
#[derive(Debug, Error)]
pub enum SlackError {
    /// Request failed to send.
    #[error("Slack request failed: {0}")]
    Request(String),

    /// Response could not be read or parsed.
    #[error("Slack response invalid: {0}")]
    Response(String),

    /// Slack returned `ok: false`.
    #[error("Slack API error: {0}")]
    Api(String),
}
