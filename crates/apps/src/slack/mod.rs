//! Slack order notifications.

mod client;
mod error;
mod messages;
mod types;

pub use client::SlackClient;
pub use error::SlackError;
pub use messages::{build_order_created_message, build_order_paid_message};
pub use types::{Block, ContextElement, PlainText, PostMessageResponse, SlackMessage, Text};
