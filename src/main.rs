use mint_gateway::{
    application::{
        admission::AdmissionPipeline,
        coalescer::{CoalescerConfig, SettleBatchCoalescer, spawn_stale_sweep},
    },
    config::Config,
    infrastructure::{
        abuse::AbuseDetector,
        cache::TokenDeadlineCache,
        capacity::{CapacityManager, PendingMintCounter},
        chain::{ChainClient, HttpChainClient},
        facilitator::{FacilitatorClient, HttpFacilitatorClient},
        kv::{KvPool, PoolConfig, spawn_health_check_loop},
        monitoring::{FacilitatorHealthCheck, KvHealthCheck, MonitoringService},
    },
    presentation::http::{routes::create_router, state::AppState},
};
use axum::extract::DefaultBodyLimit;
use http::{HeaderValue, Method, header};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize logging with safe environment filter
    // Uses RUST_LOG if set, otherwise uses sensible defaults
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new("info,gateway=debug,tower_http=debug"))
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let config = Arc::new(Config::from_env()?);

    let pool_config = PoolConfig {
        min_connections: config.pool_min_connections,
        max_connections: config.pool_max_connections,
        acquire_timeout: Duration::from_millis(config.pool_acquire_timeout_ms),
        idle_timeout: Duration::from_millis(config.pool_idle_timeout_ms),
        command_timeout: Duration::from_millis(config.pool_command_timeout_ms),
    };
    let kv = Arc::new(KvPool::connect(&config.redis_url, pool_config).await?);
    spawn_health_check_loop(kv.clone(), Duration::from_secs(30));

    let chain: Arc<dyn ChainClient> = Arc::new(HttpChainClient::new(&config.chain_rpc_urls)?);
    let facilitator: Arc<dyn FacilitatorClient> =
        Arc::new(HttpFacilitatorClient::new(config.facilitator_url.clone())?);

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
    spawn_stale_sweep(coalescer.clone());

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
    monitoring
        .register_health_check(Box::new(KvHealthCheck::new(kv.clone())))
        .await;
    monitoring
        .register_health_check(Box::new(FacilitatorHealthCheck::new(facilitator.clone())))
        .await;

    let state = AppState {
        config: config.clone(),
        kv: kv.clone(),
        abuse,
        capacity,
        deadline_cache,
        chain,
        facilitator,
        coalescer: coalescer.clone(),
        admission,
        monitoring,
    };

    // Configure CORS with security in mind
    // In production, specify explicit allowed origins from config
    let cors = if cfg!(debug_assertions) {
        // Development: allow any origin
        CorsLayer::new()
            .allow_origin(tower_http::cors::Any)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT])
            .max_age(Duration::from_secs(3600))
    } else {
        // Production: restrict to configured origins
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(Vec::<HeaderValue>::new()))
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT])
            .max_age(Duration::from_secs(3600))
    };

    let app = create_router(state)
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .layer(cors)
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::REFERRER_POLICY,
            HeaderValue::from_static("strict-origin-when-cross-origin"),
        ));

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("mint gateway listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("connections drained, flushing coalescer and kv pool");
    let shutdown_sequence = async {
        coalescer.shutdown().await;
        kv.shutdown().await;
    };
    if tokio::time::timeout(Duration::from_secs(10), shutdown_sequence)
        .await
        .is_err()
    {
        tracing::error!("graceful shutdown exceeded its 10s bound, exiting");
        std::process::exit(1);
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Ctrl+C received, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("SIGTERM received, initiating graceful shutdown");
        }
    }
}
