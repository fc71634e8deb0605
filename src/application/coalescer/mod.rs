//! Batch settlement coalescer.
//!
//! Turns many single-item settle requests into one batched call against the
//! facilitator: gather authorizations within a size/time window, re-verify
//! them, submit survivors as one `/settle/batch`, and demultiplex the
//! positional response array back to each caller's completion handle.

mod sweep;

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::{Mutex, oneshot};

use crate::domain::payment::{PaymentAuthorization, PaymentChallenge};
use crate::domain::settle::{SettleItem, SettleOutcome};
use crate::infrastructure::facilitator::FacilitatorClient;

pub use sweep::spawn_stale_sweep;

/// Tunables for the coalescer's queue/timer/sweep behavior.
#[derive(Debug, Clone)]
pub struct CoalescerConfig {
    pub batch_size: usize,
    pub batch_timeout: Duration,
    pub stale_age: Duration,
    pub sweep_interval: Duration,
}

pub struct SettleBatchCoalescer {
    facilitator: Arc<dyn FacilitatorClient>,
    queue: Mutex<VecDeque<SettleItem>>,
    processing: AtomicBool,
    timer_armed: AtomicBool,
    closing: AtomicBool,
    config: CoalescerConfig,
}

impl SettleBatchCoalescer {
    pub fn new(facilitator: Arc<dyn FacilitatorClient>, config: CoalescerConfig) -> Arc<Self> {
        Arc::new(Self {
            facilitator,
            queue: Mutex::new(VecDeque::new()),
            processing: AtomicBool::new(false),
            timer_armed: AtomicBool::new(false),
            closing: AtomicBool::new(false),
            config,
        })
    }

    /// Enqueue one authorization and wait for its settlement outcome.
    ///
    /// Returns `None` if the coalescer is closing (shutdown in progress) and
    /// refuses new work.
    pub async fn enqueue(
        self: &Arc<Self>,
        request_id: String,
        authorization: PaymentAuthorization,
        challenge: PaymentChallenge,
    ) -> Option<SettleOutcome> {
        if self.closing.load(Ordering::SeqCst) {
            return None;
        }

        let (tx, rx) = oneshot::channel();
        let item = SettleItem {
            request_id,
            authorization,
            challenge,
            enqueued_at: tokio::time::Instant::now(),
            completion: tx,
        };

        let should_flush_now = {
            let mut queue = self.queue.lock().await;
            queue.push_back(item);
            queue.len() >= self.config.batch_size
        };

        if should_flush_now {
            let this = self.clone();
            tokio::spawn(async move { this.flush().await });
        } else if !self.timer_armed.swap(true, Ordering::SeqCst) {
            let this = self.clone();
            let delay = self.config.batch_timeout;
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                this.timer_armed.store(false, Ordering::SeqCst);
                this.flush().await;
            });
        }

        rx.await.ok()
    }

    /// Drain up to `batch_size` items and settle them. Reentrancy-guarded:
    /// a flush already in progress short-circuits rather than racing.
    ///
    /// Returns a boxed future rather than being declared `async fn` because
    /// `flush` spawns tasks that call back into `flush`; without the
    /// explicit boxing the compiler cannot resolve the recursive `Send`
    /// auto-trait cycle.
    pub fn flush(self: &Arc<Self>) -> std::pin::Pin<Box<dyn std::future::Future<Output = ()> + Send + '_>> {
        Box::pin(async move {
        if self.processing.swap(true, Ordering::SeqCst) {
            return;
        }

        let drained: Vec<SettleItem> = {
            let mut queue = self.queue.lock().await;
            let n = self.config.batch_size.min(queue.len());
            queue.drain(..n).collect()
        };

        if drained.is_empty() {
            self.processing.store(false, Ordering::SeqCst);
            return;
        }

        let (valid, invalid) = self.reverify(drained).await;

        for (item, reason) in invalid {
            let _ = item
                .completion
                .send(SettleOutcome::Failure {
                    reason: format!("Verification failed: {reason}"),
                });
        }

        if !valid.is_empty() {
            self.settle_batch(valid).await;
        }

        let remaining_nonempty = !self.queue.lock().await.is_empty();
        self.processing.store(false, Ordering::SeqCst);

        if remaining_nonempty {
            let this = self.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(50)).await;
                this.flush().await;
            });
        }
        })
    }

    /// Phase 1: re-verify every item in parallel, splitting valid from
    /// invalid (with a per-item reason).
    async fn reverify(
        &self,
        items: Vec<SettleItem>,
    ) -> (Vec<SettleItem>, Vec<(SettleItem, String)>) {
        let checks = futures_util::future::join_all(
            items
                .iter()
                .map(|item| self.facilitator.verify(&item.authorization, &item.challenge)),
        )
        .await;

        let mut valid = Vec::new();
        let mut invalid = Vec::new();
        for (item, result) in items.into_iter().zip(checks) {
            match result {
                Ok(response) if response.is_valid => valid.push(item),
                Ok(response) => {
                    let reason = response
                        .reason
                        .or(response.message)
                        .unwrap_or_else(|| "rejected by facilitator".to_string());
                    invalid.push((item, reason));
                }
                Err(e) => invalid.push((item, e.to_string())),
            }
        }
        (valid, invalid)
    }

    /// Phase 2: submit the survivors as one batch and demultiplex the
    /// positional results back to each item's completion handle.
    async fn settle_batch(&self, items: Vec<SettleItem>) {
        let requests: Vec<(PaymentAuthorization, PaymentChallenge)> = items
            .iter()
            .map(|item| (item.authorization.clone(), item.challenge.clone()))
            .collect();

        match self.facilitator.settle_batch(&requests).await {
            Ok(response) => {
                let mut items: Vec<Option<SettleItem>> = items.into_iter().map(Some).collect();
                for result in response.results {
                    let Some(slot) = items.get_mut(result.index) else {
                        continue;
                    };
                    let Some(item) = slot.take() else { continue };
                    let outcome = match (result.success, result.transaction) {
                        (true, Some(hash)) => SettleOutcome::Success { transaction_hash: hash },
                        (true, None) => SettleOutcome::Failure {
                            reason: "settlement reported success without a transaction".into(),
                        },
                        (false, _) => SettleOutcome::Failure {
                            reason: result.error.unwrap_or_else(|| "settlement failed".into()),
                        },
                    };
                    let _ = item.completion.send(outcome);
                }
                for leftover in items.into_iter().flatten() {
                    let _ = leftover.completion.send(SettleOutcome::Failure {
                        reason: "no settlement result returned for this item".into(),
                    });
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "settle_batch transport failure");
                for item in items {
                    let _ = item.completion.send(SettleOutcome::Failure {
                        reason: e.to_string(),
                    });
                }
            }
        }
    }

    /// Graceful shutdown: stop admitting new work, flush once, then fail
    /// whatever remains with a shutdown error rather than leaking it.
    pub async fn shutdown(self: &Arc<Self>) {
        self.closing.store(true, Ordering::SeqCst);
        self.flush().await;

        let remaining: Vec<SettleItem> = self.queue.lock().await.drain(..).collect();
        for item in remaining {
            let _ = item.completion.send(SettleOutcome::Failure {
                reason: "gateway shutting down".into(),
            });
        }
    }

    pub(super) async fn evict_stale(&self, max_age: Duration) -> usize {
        let stale: Vec<SettleItem> = {
            let mut queue = self.queue.lock().await;
            let mut stale = Vec::new();
            let mut fresh = VecDeque::with_capacity(queue.len());
            for item in queue.drain(..) {
                if item.age() > max_age {
                    stale.push(item);
                } else {
                    fresh.push_back(item);
                }
            }
            *queue = fresh;
            stale
        };
        let evicted = stale.len();
        for item in stale {
            let _ = item.completion.send(SettleOutcome::Failure {
                reason: "settlement request timed out in queue".into(),
            });
        }
        evicted
    }
}
