//! Pending-mint counter and the capacity manager built atop the three caches.

mod pending_counter;

pub use pending_counter::PendingMintCounter;

use std::sync::Arc;

use crate::domain::mint::CapacityInfo;
use crate::error::GatewayError;
use crate::infrastructure::cache::{MaxMintCountCache, MintCountCache};
use crate::infrastructure::chain::ChainClient;

/// Combines the permanent max-count cache, the 6s mint-count cache, and the
/// Redis-backed pending counter into one capacity decision.
pub struct CapacityManager {
    max_mint_count: MaxMintCountCache,
    mint_count: MintCountCache,
    pending: PendingMintCounter,
    chain: Arc<dyn ChainClient>,
}

impl CapacityManager {
    pub fn new(chain: Arc<dyn ChainClient>, pending: PendingMintCounter) -> Self {
        Self {
            max_mint_count: MaxMintCountCache::new(),
            mint_count: MintCountCache::new(),
            pending,
            chain,
        }
    }

    /// Read the three counters without gating on any reservation. Used by
    /// the read-only `GET /capacity` endpoint, where transient
    /// over-subscription is a normal, self-healing state (spec §5) and must
    /// be reported, not refused.
    pub async fn snapshot(&self, token: &str) -> Result<CapacityInfo, GatewayError> {
        let max = self
            .max_mint_count
            .get(token, self.chain.as_ref())
            .await
            .map_err(|_| GatewayError::CapacityCheckFailed)?;
        let current = self
            .mint_count
            .get(token, self.chain.as_ref())
            .await
            .map_err(|_| GatewayError::CapacityCheckFailed)?;
        let pending = self.pending.get(token).await?;

        Ok(CapacityInfo {
            max_mint_count: max,
            current_mint_count: current,
            pending_count: pending,
        })
    }

    pub async fn check_capacity(&self, token: &str, n: u64) -> Result<CapacityInfo, GatewayError> {
        let info = self.snapshot(token).await?;

        if info.current_mint_count + info.pending_count + n > info.max_mint_count {
            return Err(GatewayError::CapacityExceeded {
                available: info.available_slots(),
            });
        }

        Ok(info)
    }

    pub async fn reserve_capacity(&self, token: &str, n: u64) -> Result<(), GatewayError> {
        self.pending.increment(token, n).await
    }

    pub async fn release_capacity(&self, token: &str, n: u64) -> Result<(), GatewayError> {
        self.pending.decrement(token, n).await
    }
}

