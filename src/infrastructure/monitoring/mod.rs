//! Health check registry backing `/health`, `/payment/health`, `/kv/health`.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

/// Health check trait for monitoring service dependencies.
#[async_trait::async_trait]
pub trait HealthCheck {
    fn name(&self) -> &str;
    async fn check(&self) -> HealthCheckResult;

    fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(10)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheckResult {
    pub healthy: bool,
    pub message: Option<String>,
    pub response_time_ms: u64,
}

/// Registry of dependency health checks, polled on demand by the health
/// endpoints.
pub struct MonitoringService {
    health_checks: Arc<RwLock<Vec<Box<dyn HealthCheck + Send + Sync>>>>,
}

impl MonitoringService {
    pub fn new() -> Self {
        Self {
            health_checks: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub async fn register_health_check(&self, check: Box<dyn HealthCheck + Send + Sync>) {
        self.health_checks.write().await.push(check);
    }

    pub async fn check_health(&self) -> OverallHealthStatus {
        let checks = self.health_checks.read().await;
        let mut results = Vec::new();
        let mut all_healthy = true;

        for check in checks.iter() {
            let result = match tokio::time::timeout(check.timeout(), check.check()).await {
                Ok(result) => result,
                Err(_) => HealthCheckResult {
                    healthy: false,
                    message: Some("health check timed out".to_string()),
                    response_time_ms: check.timeout().as_millis() as u64,
                },
            };
            if !result.healthy {
                all_healthy = false;
            }
            results.push((check.name().to_string(), result));
        }

        OverallHealthStatus {
            healthy: all_healthy,
            checks: results,
        }
    }
}

impl Default for MonitoringService {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Serialize)]
pub struct OverallHealthStatus {
    pub healthy: bool,
    pub checks: Vec<(String, HealthCheckResult)>,
}

/// Key-value pool health check: reports pool occupancy as metadata.
pub struct KvHealthCheck {
    pool: Arc<crate::infrastructure::kv::KvPool>,
}

impl KvHealthCheck {
    pub fn new(pool: Arc<crate::infrastructure::kv::KvPool>) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl HealthCheck for KvHealthCheck {
    fn name(&self) -> &str {
        "kv"
    }

    async fn check(&self) -> HealthCheckResult {
        let start = std::time::Instant::now();
        let status = self.pool.status().await;
        HealthCheckResult {
            healthy: status.total > 0,
            message: Some(format!(
                "total={} free={} waiters={}",
                status.total, status.free, status.waiters
            )),
            response_time_ms: start.elapsed().as_millis() as u64,
        }
    }
}

/// Facilitator health check: proxies its `/health` endpoint.
pub struct FacilitatorHealthCheck {
    facilitator: Arc<dyn crate::infrastructure::facilitator::FacilitatorClient>,
}

impl FacilitatorHealthCheck {
    pub fn new(facilitator: Arc<dyn crate::infrastructure::facilitator::FacilitatorClient>) -> Self {
        Self { facilitator }
    }
}

#[async_trait::async_trait]
impl HealthCheck for FacilitatorHealthCheck {
    fn name(&self) -> &str {
        "facilitator"
    }

    async fn check(&self) -> HealthCheckResult {
        let start = std::time::Instant::now();
        match self.facilitator.health().await {
            Ok(healthy) => HealthCheckResult {
                healthy,
                message: None,
                response_time_ms: start.elapsed().as_millis() as u64,
            },
            Err(e) => HealthCheckResult {
                healthy: false,
                message: Some(e.to_string()),
                response_time_ms: start.elapsed().as_millis() as u64,
            },
        }
    }
}
