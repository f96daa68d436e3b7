//! Block Kit message builders for order notifications.

use crate::webhooks::orders::OrderSummary;

use super::types::{Block, ContextElement, PlainText, Text};

/// Message posted when the platform reports a new order.
#[must_use]
pub fn build_order_created_message(order: &OrderSummary) -> Vec<Block> {
    let mut blocks = vec![
        Block::Header {
            text: PlainText::new(format!("New order {}", order.number)),
        },
        Block::Section {
            text: Text::mrkdwn(format!(
                "*Total:* {} {}\n*Order ID:* `{}`",
                order.total.amount, order.total.currency, order.id
            )),
        },
    ];

    if let Some(email) = &order.customer_email {
        blocks.push(Block::Section {
            text: Text::mrkdwn(format!("*Customer:* {email}")),
        });
    }

    blocks.push(Block::Divider);
    blocks.push(Block::Context {
        elements: vec![ContextElement::Mrkdwn {
            text: "ORDER_CREATED webhook".to_owned(),
        }],
    });

    blocks
}

/// Message posted when the platform reports an order as paid.
#[must_use]
pub fn build_order_paid_message(order: &OrderSummary) -> Vec<Block> {
    vec![
        Block::Header {
            text: PlainText::new(format!("Order {} paid", order.number)),
        },
        Block::Section {
            text: Text::mrkdwn(format!(
                "*Total:* {} {}\n*Order ID:* `{}`",
                order.total.amount, order.total.currency, order.id
            )),
        },
        Block::Divider,
        Block::Context {
            elements: vec![ContextElement::Mrkdwn {
                text: "ORDER_PAID webhook".to_owned(),
            }],
        },
    ]
}
