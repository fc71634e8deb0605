//! Sliding-window abuse detector: request counter, ban, and whitelist atop
//! the pooled key-value client.

use std::sync::Arc;

use redis::Value;

use crate::domain::identifier::Identifier;
use crate::error::GatewayError;
use crate::infrastructure::kv::{KvError, KvOp, KvPool};

fn count_key(id: &Identifier) -> String {
    format!("abuse:count:{id}")
}
fn ban_key(id: &Identifier) -> String {
    format!("abuse:ban:{id}")
}
fn whitelist_key(id: &Identifier) -> String {
    format!("abuse:whitelist:{id}")
}

/// Outcome of `record_request`: either the request is admitted, or refused
/// with the number of seconds until the ban lifts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbuseDecision {
    Allowed,
    Denied { retry_after: u64 },
}

/// Point-in-time abuse stats for one identifier.
#[derive(Debug, Clone, serde::Serialize)]
pub struct AbuseStats {
    pub count: u64,
    pub banned: bool,
    pub ban_remaining_seconds: u64,
    pub whitelisted: bool,
}

pub struct AbuseDetector {
    kv: Arc<KvPool>,
    window_seconds: u64,
    max_requests: u32,
    ban_seconds: u64,
}

impl AbuseDetector {
    pub fn new(kv: Arc<KvPool>, window_seconds: u64, max_requests: u32, ban_seconds: u64) -> Self {
        Self {
            kv,
            window_seconds,
            max_requests,
            ban_seconds,
        }
    }

    /// Record one tick against `id` and decide whether to admit it.
    ///
    /// Fails open (allows) if the key-value store is unavailable — abuse
    /// mitigation is sacrificed for availability, per spec §7.
    pub async fn record_request(&self, id: &Identifier) -> AbuseDecision {
        match self.record_request_inner(id).await {
            Ok(decision) => decision,
            Err(e) => {
                tracing::warn!(identifier = %id, error = %e, "abuse detector failing open");
                AbuseDecision::Allowed
            }
        }
    }

    async fn record_request_inner(&self, id: &Identifier) -> Result<AbuseDecision, KvError> {
        if self.is_whitelisted_raw(id).await? {
            return Ok(AbuseDecision::Allowed);
        }

        if let Some(remaining) = self.ban_remaining_raw(id).await? {
            return Ok(AbuseDecision::Denied {
                retry_after: remaining,
            });
        }

        let key = count_key(id);
        let count = self
            .kv
            .execute(&KvOp::new("INCR", vec![key.clone()]))
            .await?;
        let count = as_i64(&count);

        if count == 1 {
            self.kv
                .execute(&KvOp::new(
                    "EXPIRE",
                    vec![key, self.window_seconds.to_string()],
                ))
                .await?;
        }

        if count as u32 > self.max_requests {
            self.kv
                .execute(&KvOp::new(
                    "SET",
                    vec![
                        ban_key(id),
                        "1".to_string(),
                        "EX".to_string(),
                        self.ban_seconds.to_string(),
                    ],
                ))
                .await?;
            return Ok(AbuseDecision::Denied {
                retry_after: self.ban_seconds,
            });
        }

        Ok(AbuseDecision::Allowed)
    }

    async fn is_whitelisted_raw(&self, id: &Identifier) -> Result<bool, KvError> {
        let value = self
            .kv
            .execute(&KvOp::new("EXISTS", vec![whitelist_key(id)]))
            .await?;
        Ok(as_i64(&value) == 1)
    }

    async fn ban_remaining_raw(&self, id: &Identifier) -> Result<Option<u64>, KvError> {
        let ttl = self.kv.execute(&KvOp::new("TTL", vec![ban_key(id)])).await?;
        let ttl = as_i64(&ttl);
        Ok(if ttl > 0 { Some(ttl as u64) } else { None })
    }

    /// Administrative: does not fail open, per spec §4.3.
    pub async fn is_banned(&self, id: &Identifier) -> Result<bool, GatewayError> {
        Ok(self.ban_remaining_raw(id).await?.is_some())
    }

    /// Whitelist gate for the hidden internal endpoint. Fails closed: a KV
    /// outage denies access rather than waving requests through.
    pub async fn is_whitelisted(&self, id: &Identifier) -> Result<bool, GatewayError> {
        Ok(self.is_whitelisted_raw(id).await?)
    }

    pub async fn get_stats(&self, id: &Identifier) -> Result<AbuseStats, GatewayError> {
        let count = self.kv.execute(&KvOp::new("GET", vec![count_key(id)])).await?;
        let count = match count {
            Value::Nil => 0,
            other => as_i64(&other).max(0) as u64,
        };
        let ban_remaining = self.ban_remaining_raw(id).await?;
        let whitelisted = self.is_whitelisted_raw(id).await?;

        Ok(AbuseStats {
            count,
            banned: ban_remaining.is_some(),
            ban_remaining_seconds: ban_remaining.unwrap_or(0),
            whitelisted,
        })
    }

    pub async fn manual_ban(&self, id: &Identifier, seconds: u64) -> Result<(), GatewayError> {
        self.kv
            .execute(&KvOp::new(
                "SET",
                vec![ban_key(id), "1".to_string(), "EX".to_string(), seconds.to_string()],
            ))
            .await?;
        Ok(())
    }

    pub async fn unban(&self, id: &Identifier) -> Result<(), GatewayError> {
        self.kv.execute(&KvOp::new("DEL", vec![ban_key(id)])).await?;
        Ok(())
    }

    pub async fn add_to_whitelist(&self, id: &Identifier) -> Result<(), GatewayError> {
        self.kv
            .execute(&KvOp::new("SET", vec![whitelist_key(id), "1".to_string()]))
            .await?;
        Ok(())
    }

    pub async fn remove_from_whitelist(&self, id: &Identifier) -> Result<(), GatewayError> {
        self.kv
            .execute(&KvOp::new("DEL", vec![whitelist_key(id)]))
            .await?;
        Ok(())
    }
}

fn as_i64(value: &Value) -> i64 {
    redis::from_redis_value::<i64>(value).unwrap_or(0)
}
