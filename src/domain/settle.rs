//! Coalescer queue entry.

use tokio::sync::oneshot;
use tokio::time::Instant;

use super::payment::{PaymentAuthorization, PaymentChallenge};

/// Outcome of settling one [`SettleItem`], delivered to its completion handle.
#[derive(Debug, Clone)]
pub enum SettleOutcome {
    Success { transaction_hash: String },
    Failure { reason: String },
}

/// One request's authorization, waiting in the coalescer's queue.
pub struct SettleItem {
    pub request_id: String,
    pub authorization: PaymentAuthorization,
    pub challenge: PaymentChallenge,
    pub enqueued_at: Instant,
    pub completion: oneshot::Sender<SettleOutcome>,
}

impl SettleItem {
    pub fn age(&self) -> std::time::Duration {
        self.enqueued_at.elapsed()
    }
}
