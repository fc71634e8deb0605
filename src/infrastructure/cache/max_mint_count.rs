use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OnceCell};

use crate::infrastructure::chain::ChainClient;

/// Permanent cache of each token's immutable max-mint-count contract
/// constant. Populated by a single chain read on first miss; never expires.
pub struct MaxMintCountCache {
    entries: Mutex<HashMap<String, Arc<OnceCell<u64>>>>,
}

impl MaxMintCountCache {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub async fn get(&self, token: &str, chain: &dyn ChainClient) -> anyhow::Result<u64> {
        let cell = {
            let mut guard = self.entries.lock().await;
            guard
                .entry(token.to_string())
                .or_insert_with(|| Arc::new(OnceCell::new()))
                .clone()
        };
        cell.get_or_try_init(|| chain.max_mint_count(token)).await.copied()
    }

    /// Test-only: drop all cached values.
    #[cfg(test)]
    pub async fn clear(&self) {
        self.entries.lock().await.clear();
    }
}

impl Default for MaxMintCountCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct CountingChain {
        calls: AtomicU32,
        value: u64,
    }

    #[async_trait]
    impl ChainClient for CountingChain {
        async fn max_mint_count(&self, _token: &str) -> anyhow::Result<u64> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.value)
        }
        async fn mint_count(&self, _token: &str) -> anyhow::Result<u64> {
            unreachable!()
        }
        async fn deployment_deadline(&self, _token: &str) -> anyhow::Result<i64> {
            unreachable!()
        }
    }

    #[tokio::test]
    async fn reads_chain_at_most_once_per_token() {
        let chain = CountingChain {
            calls: AtomicU32::new(0),
            value: 1000,
        };
        let cache = MaxMintCountCache::new();

        for _ in 0..5 {
            let value = cache.get("0xaa", &chain).await.unwrap();
            assert_eq!(value, 1000);
        }
        assert_eq!(chain.calls.load(Ordering::SeqCst), 1);
    }
}
