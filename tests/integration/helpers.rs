use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode},
};
use mint_gateway::{
    application::{
        admission::AdmissionPipeline,
        coalescer::{CoalescerConfig, SettleBatchCoalescer},
    },
    config::Config,
    infrastructure::{
        abuse::AbuseDetector,
        cache::TokenDeadlineCache,
        capacity::{CapacityManager, PendingMintCounter},
        chain::ChainClient,
        facilitator::{FacilitatorClient, SettleBatchResponse, SettleItemResult, VerifyResponse},
        kv::{KvPool, PoolConfig},
        monitoring::MonitoringService,
    },
    presentation::http::{routes::create_router, state::AppState},
};
use serde::de::DeserializeOwned;
use tower::ServiceExt;

/// Chain stub with fixed counters, mutable via the shared `mint_count` so
/// tests can move a token toward its capacity limit mid-flow.
pub struct FakeChain {
    pub max_mint_count: u64,
    pub mint_count: AtomicU64,
    pub deployment_deadline: i64,
}

impl FakeChain {
    pub fn new(max_mint_count: u64, mint_count: u64, deployment_deadline: i64) -> Arc<Self> {
        Arc::new(Self {
            max_mint_count,
            mint_count: AtomicU64::new(mint_count),
            deployment_deadline,
        })
    }
}

#[async_trait]
impl ChainClient for FakeChain {
    async fn max_mint_count(&self, _token_address: &str) -> anyhow::Result<u64> {
        Ok(self.max_mint_count)
    }

    async fn mint_count(&self, _token_address: &str) -> anyhow::Result<u64> {
        Ok(self.mint_count.load(Ordering::SeqCst))
    }

    async fn deployment_deadline(&self, _token_address: &str) -> anyhow::Result<i64> {
        Ok(self.deployment_deadline)
    }
}

/// Facilitator stub: always validates, always settles with a synthetic
/// transaction hash per item.
pub struct FakeFacilitator {
    pub reject_verify: bool,
    pub reject_settle: bool,
}

impl FakeFacilitator {
    pub fn new() -> Arc<dyn FacilitatorClient> {
        Arc::new(Self {
            reject_verify: false,
            reject_settle: false,
        })
    }

    pub fn rejecting_settle() -> Arc<dyn FacilitatorClient> {
        Arc::new(Self {
            reject_verify: false,
            reject_settle: true,
        })
    }
}

#[async_trait]
impl FacilitatorClient for FakeFacilitator {
    async fn verify(
        &self,
        _authorization: &mint_gateway::domain::payment::PaymentAuthorization,
        _challenge: &mint_gateway::domain::payment::PaymentChallenge,
    ) -> anyhow::Result<VerifyResponse> {
        Ok(VerifyResponse {
            is_valid: !self.reject_verify,
            reason: self.reject_verify.then(|| "signature mismatch".to_string()),
            message: None,
            active_transactions: None,
            max_capacity: None,
        })
    }

    async fn settle_batch(
        &self,
        items: &[(
            mint_gateway::domain::payment::PaymentAuthorization,
            mint_gateway::domain::payment::PaymentChallenge,
        )],
    ) -> anyhow::Result<SettleBatchResponse> {
        if self.reject_settle {
            anyhow::bail!("facilitator unavailable");
        }
        let results: Vec<SettleItemResult> = items
            .iter()
            .enumerate()
            .map(|(index, _)| SettleItemResult {
                index,
                success: true,
                transaction: Some(format!("0xsettled{index}")),
                nonce: None,
                error: None,
            })
            .collect();
        Ok(SettleBatchResponse {
            success: true,
            total_submitted: results.len(),
            total_success: results.len(),
            total_failed: 0,
            results,
        })
    }

    async fn health(&self) -> anyhow::Result<bool> {
        Ok(true)
    }
}

pub struct TestApp {
    pub app: Router,
    pub config: Config,
}

fn build_config() -> Config {
    Config {
        host: "127.0.0.1".into(),
        port: 0,
        redis_url: std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".into()),
        pool_min_connections: 1,
        pool_max_connections: 4,
        pool_acquire_timeout_ms: 5_000,
        pool_idle_timeout_ms: 300_000,
        pool_command_timeout_ms: 5_000,
        abuse_window_seconds: 60,
        abuse_max_requests: 3,
        abuse_ban_seconds: 120,
        batch_size: 10,
        batch_timeout_ms: 50,
        batch_max_retries: 3,
        batch_stale_age_seconds: 30,
        batch_sweep_interval_seconds: 5,
        facilitator_url: "https://facilitator.invalid".into(),
        chain_rpc_urls: vec!["https://rpc.invalid".into()],
        mint_price_minor_units: 10_000_000,
        payment_asset_address: "0xasset".into(),
        payment_asset_name: "USD Coin".into(),
        payment_asset_domain_version: "2".into(),
        payment_network: "bsc".into(),
        payment_max_timeout_seconds: 300,
        payment_chain_id: 56,
        internal_mint_secret: "test-secret".into(),
    }
}

/// Spawns a full router with a live Redis-backed `KvPool` (abuse detection
/// and capacity counters are not mockable without one) and injected fakes
/// for the chain and facilitator collaborators.
pub async fn spawn_app(chain: Arc<dyn ChainClient>, facilitator: Arc<dyn FacilitatorClient>) -> TestApp {
    let config = Arc::new(build_config());

    let pool_config = PoolConfig {
        min_connections: config.pool_min_connections,
        max_connections: config.pool_max_connections,
        acquire_timeout: Duration::from_millis(config.pool_acquire_timeout_ms),
        idle_timeout: Duration::from_millis(config.pool_idle_timeout_ms),
        command_timeout: Duration::from_millis(config.pool_command_timeout_ms),
    };
    let kv = Arc::new(
        KvPool::connect(&config.redis_url, pool_config)
            .await
            .expect("redis must be reachable for integration tests (set REDIS_URL)"),
    );

    let abuse = Arc::new(AbuseDetector::new(
        kv.clone(),
        config.abuse_window_seconds,
        config.abuse_max_requests,
        config.abuse_ban_seconds,
    ));
    let pending = PendingMintCounter::new(kv.clone());
    let capacity = Arc::new(CapacityManager::new(chain.clone(), pending));
    let deadline_cache = Arc::new(TokenDeadlineCache::new());

    let coalescer = SettleBatchCoalescer::new(
        facilitator.clone(),
        CoalescerConfig {
            batch_size: config.batch_size,
            batch_timeout: Duration::from_millis(config.batch_timeout_ms),
            stale_age: Duration::from_secs(config.batch_stale_age_seconds),
            sweep_interval: Duration::from_secs(config.batch_sweep_interval_seconds),
        },
    );

    let admission = Arc::new(AdmissionPipeline::new(
        config.clone(),
        capacity.clone(),
        abuse.clone(),
        deadline_cache.clone(),
        chain.clone(),
        facilitator.clone(),
        coalescer.clone(),
    ));

    let monitoring = Arc::new(MonitoringService::new());

    let state = AppState {
        config: config.clone(),
        kv,
        abuse,
        capacity,
        deadline_cache,
        chain,
        facilitator,
        coalescer,
        admission,
        monitoring,
    };

    TestApp {
        app: create_router(state),
        config: (*config).clone(),
    }
}

pub async fn send(app: &Router, req: Request<Body>) -> axum::response::Response {
    app.clone().oneshot(req).await.expect("request failed")
}

pub async fn read_json<T: DeserializeOwned>(res: axum::response::Response) -> T {
    let bytes = to_bytes(res.into_body(), usize::MAX)
        .await
        .expect("failed to read body");
    serde_json::from_slice(&bytes).expect("failed to parse json")
}

pub fn assert_status(status: StatusCode, expected: StatusCode) {
    assert_eq!(status, expected, "expected {expected}, got {status}");
}
