use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OnceCell};

use crate::infrastructure::chain::ChainClient;

/// Permanent cache of each token's on-chain deployment deadline (Unix
/// seconds). Immutable per deployed token, so once read it is never
/// refreshed; cheap enough to consult on every request.
pub struct TokenDeadlineCache {
    entries: Mutex<HashMap<String, Arc<OnceCell<i64>>>>,
}

impl TokenDeadlineCache {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub async fn deadline(&self, token: &str, chain: &dyn ChainClient) -> anyhow::Result<i64> {
        let cell = {
            let mut guard = self.entries.lock().await;
            guard
                .entry(token.to_string())
                .or_insert_with(|| Arc::new(OnceCell::new()))
                .clone()
        };
        cell.get_or_try_init(|| chain.deployment_deadline(token))
            .await
            .copied()
    }

    pub async fn is_expired(&self, token: &str, chain: &dyn ChainClient, now: i64) -> anyhow::Result<bool> {
        Ok(now > self.deadline(token, chain).await?)
    }

    #[cfg(test)]
    pub async fn clear(&self) {
        self.entries.lock().await.clear();
    }
}

impl Default for TokenDeadlineCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct FixedChain(i64);

    #[async_trait]
    impl ChainClient for FixedChain {
        async fn max_mint_count(&self, _token: &str) -> anyhow::Result<u64> {
            unreachable!()
        }
        async fn mint_count(&self, _token: &str) -> anyhow::Result<u64> {
            unreachable!()
        }
        async fn deployment_deadline(&self, _token: &str) -> anyhow::Result<i64> {
            Ok(self.0)
        }
    }

    #[tokio::test]
    async fn expired_when_now_past_deadline() {
        let cache = TokenDeadlineCache::new();
        let chain = FixedChain(1000);
        assert!(cache.is_expired("0xaa", &chain, 1001).await.unwrap());
        assert!(!cache.is_expired("0xaa", &chain, 999).await.unwrap());
    }
}
