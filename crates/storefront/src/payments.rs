//! Replay protection for payment redirect callbacks.
//!
//! Payment providers re-deliver return callbacks (browser refresh, IPN
//! retries). The guard remembers which transaction already produced which
//! order, so a duplicate callback renders the existing order instead of
//! completing the checkout twice.
//!
//! The guard is advisory and in-memory: the platform stays the source of
//! truth, and a restart merely degrades duplicates back to at-least-once.

use std::time::Duration;

use moka::future::Cache;

use coastline_core::{OrderId, TransactionId};

/// How long a processed transaction is remembered.
const REPLAY_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Records transactions that already completed into an order.
#[derive(Clone)]
pub struct ReplayGuard {
    seen: Cache<TransactionId, OrderId>,
}

impl ReplayGuard {
    /// Create an empty guard.
    #[must_use]
    pub fn new() -> Self {
        Self {
            seen: Cache::builder()
                .max_capacity(10_000)
                .time_to_live(REPLAY_TTL)
                .build(),
        }
    }

    /// The order already produced by this transaction, if any.
    pub async fn completed_order(&self, transaction: &TransactionId) -> Option<OrderId> {
        self.seen.get(transaction).await
    }

    /// Record that `transaction` completed into `order`.
    pub async fn record(&self, transaction: TransactionId, order: OrderId) {
        self.seen.insert(transaction, order).await;
    }
}

impl Default for ReplayGuard {
    fn default() -> Self {
        Self::new()
    }
}
