use std::sync::Arc;

use crate::error::GatewayError;
use crate::infrastructure::kv::{KvOp, KvPool};

/// One-hour safety ceiling bounding drift if a release is missed (spec §3).
const PENDING_KEY_TTL_SECONDS: &str = "3600";

fn key(token: &str) -> String {
    format!("pending_mint:{}", token.to_lowercase())
}

/// Redis-backed advisory counter of in-flight capacity reservations per
/// token. Deletes its key once the count drops to zero or below.
pub struct PendingMintCounter {
    kv: Arc<KvPool>,
}

impl PendingMintCounter {
    pub fn new(kv: Arc<KvPool>) -> Self {
        Self { kv }
    }

    pub async fn increment(&self, token: &str, n: u64) -> Result<(), GatewayError> {
        let key = key(token);
        self.kv
            .execute(&KvOp::new("INCRBY", vec![key.clone(), n.to_string()]))
            .await?;
        self.kv
            .execute(&KvOp::new(
                "EXPIRE",
                vec![key, PENDING_KEY_TTL_SECONDS.to_string()],
            ))
            .await?;
        Ok(())
    }

    pub async fn decrement(&self, token: &str, n: u64) -> Result<(), GatewayError> {
        let key = key(token);
        let value = self
            .kv
            .execute(&KvOp::new("DECRBY", vec![key.clone(), n.to_string()]))
            .await?;
        let remaining = redis::from_redis_value::<i64>(&value).unwrap_or(0);
        if remaining <= 0 {
            self.kv.execute(&KvOp::new("DEL", vec![key])).await?;
        }
        Ok(())
    }

    pub async fn get(&self, token: &str) -> Result<u64, GatewayError> {
        let value = self.kv.execute(&KvOp::new("GET", vec![key(token)])).await?;
        match value {
            redis::Value::Nil => Ok(0),
            other => {
                let parsed = redis::from_redis_value::<i64>(&other).unwrap_or(0);
                Ok(parsed.max(0) as u64)
            }
        }
    }

    /// Test-only: force a token's counter back to zero.
    #[cfg(test)]
    pub async fn clear(&self, token: &str) -> Result<(), GatewayError> {
        self.kv.execute(&KvOp::new("DEL", vec![key(token)])).await?;
        Ok(())
    }
}
