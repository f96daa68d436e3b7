//! Slack Web API client.

use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, error, instrument};

use crate::config::SlackConfig;

use super::error::SlackError;
use super::types::{Block, PostMessageResponse, SlackMessage};

/// Slack Web API base URL.
const SLACK_API_BASE: &str = "https://slack.com/api";

/// Slack API client for posting order notifications.
#[derive(Clone)]
pub struct SlackClient {
    client: Client,
    bot_token: SecretString,
    orders_channel: String,
    api_base: String,
}

impl std::fmt::Debug for SlackClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlackClient")
            .field("bot_token", &"[REDACTED]")
            .field("orders_channel", &self.orders_channel)
            .finish_non_exhaustive()
    }
}

impl SlackClient {
    /// Create a new Slack client.
    #[must_use]
    pub fn new(config: &SlackConfig) -> Self {
        Self {
            client: Client::new(),
            bot_token: config.bot_token.clone(),
            orders_channel: config.orders_channel.clone(),
            api_base: SLACK_API_BASE.to_owned(),
        }
    }

    /// Create a client pointed at a different API base. Test hook.
    #[must_use]
    pub fn with_api_base(config: &SlackConfig, api_base: &str) -> Self {
        let mut client = Self::new(config);
        client.api_base = api_base.to_owned();
        client
    }

    /// The channel order notifications go to.
    #[must_use]
    pub fn orders_channel(&self) -> &str {
        &self.orders_channel
    }

    /// Post a message to a channel.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails or Slack returns an error.
    #[instrument(skip(self, blocks), fields(channel = %channel))]
    pub async fn post_message(
        &self,
        channel: &str,
        blocks: Vec<Block>,
        fallback_text: Option<&str>,
    ) -> Result<PostMessageResponse, SlackError> {
        let message = SlackMessage {
            channel: channel.to_owned(),
            blocks,
            text: fallback_text.map(String::from),
        };

        let response = self
            .client
            .post(format!("{}/chat.postMessage", self.api_base))
            .bearer_auth(self.bot_token.expose_secret())
            .json(&message)
            .send()
            .await
            .map_err(|e| SlackError::Request(e.to_string()))?;

        let result: PostMessageResponse = response
            .json()
            .await
            .map_err(|e| SlackError::Response(e.to_string()))?;

        if !result.ok {
            error!(
                error = ?result.error,
                "Slack API error posting message"
            );
            return Err(SlackError::Api(
                result.error.unwrap_or_else(|| "Unknown error".to_owned()),
            ));
        }

        debug!(
            ts = ?result.ts,
            channel = ?result.channel,
            "Message posted to Slack"
        );

        Ok(result)
    }
}
