use std::sync::Arc;

use super::SettleBatchCoalescer;

/// Background sweep: periodically evicts items older than `stale_age` and
/// completes them with a timeout rather than leaving them queued forever.
pub fn spawn_stale_sweep(coalescer: Arc<SettleBatchCoalescer>) -> tokio::task::JoinHandle<()> {
    let interval = coalescer.config.sweep_interval;
    let stale_age = coalescer.config.stale_age;
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            let evicted = coalescer.evict_stale(stale_age).await;
            if evicted > 0 {
                tracing::warn!(evicted, "coalescer stale sweep removed aged items");
            }
        }
    })
}
