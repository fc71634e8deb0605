use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::infrastructure::chain::ChainClient;

const TTL: Duration = Duration::from_secs(6);

struct Entry {
    value: u64,
    fetched_at: Instant,
}

/// 6-second cache of each token's mutable on-chain mint count.
///
/// Held under one lock across the chain read so concurrent callers within
/// the same staleness window share a single fetch rather than each racing
/// the chain node. On read failure, the last known value is returned as an
/// explicit degraded-mode read rather than propagating the error.
pub struct MintCountCache {
    entries: Mutex<HashMap<String, Entry>>,
}

impl MintCountCache {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub async fn get(&self, token: &str, chain: &dyn ChainClient) -> anyhow::Result<u64> {
        let mut guard = self.entries.lock().await;

        if let Some(entry) = guard.get(token) {
            if entry.fetched_at.elapsed() < TTL {
                return Ok(entry.value);
            }
        }

        match chain.mint_count(token).await {
            Ok(value) => {
                guard.insert(
                    token.to_string(),
                    Entry {
                        value,
                        fetched_at: Instant::now(),
                    },
                );
                Ok(value)
            }
            Err(e) => {
                if let Some(entry) = guard.get(token) {
                    tracing::warn!(token, error = %e, "mint count read failed, serving stale value");
                    Ok(entry.value)
                } else {
                    Err(e)
                }
            }
        }
    }

    #[cfg(test)]
    pub async fn clear(&self) {
        self.entries.lock().await.clear();
    }
}

impl Default for MintCountCache {
    fn default() -> Self {
        Self::new()
    }
}
