//! Application configuration loading from environment variables.
//!
//! All configuration is loaded from the environment at startup via standard `std::env::var`.
//! This follows the same 12-factor approach the rest of the gateway uses for its dependencies.
//!
//! # Environment Variables
//!
//! ## Required
//! - `FACILITATOR_URL`: base URL of the settlement facilitator
//! - `CHAIN_RPC_URLS`: comma-separated list of equivalent chain RPC endpoints
//! - `REDIS_URL`: Redis connection URL backing the KV pool
//! - `PAYMENT_ASSET_ADDRESS`: stablecoin contract address collected as payment
//! - `INTERNAL_MINT_SECRET`: opaque path segment gating `/internal/mint/<secret>`
//!
//! A mint's `payTo` is not configured here: every payment challenge pays out
//! to the token address being minted, per request.
//!
//! ## Optional (sensible defaults)
//! - `RUST_LOG`: Logging level (default: "info,mint_gateway=debug,tower_http=debug")
//! - `HOST` (default "0.0.0.0"), `PORT` (default 8080)
//! - `POOL_MIN_CONNECTIONS` (default 2), `POOL_MAX_CONNECTIONS` (default 16)
//! - `POOL_ACQUIRE_TIMEOUT_MS` (default 5000), `POOL_IDLE_TIMEOUT_MS` (default 300000)
//! - `POOL_COMMAND_TIMEOUT_MS` (default 30000)
//! - `ABUSE_WINDOW_SECONDS` (default 60), `ABUSE_MAX_REQUESTS` (default 30)
//! - `ABUSE_BAN_SECONDS` (default 300)
//! - `BATCH_SIZE` (default 10), `BATCH_TIMEOUT_MS` (default 2000)
//! - `BATCH_MAX_RETRIES` (default 3)
//! - `BATCH_STALE_AGE_SECONDS` (default 120), `BATCH_SWEEP_INTERVAL_SECONDS` (default 30)
//! - `MINT_PRICE_MINOR_UNITS` (default 10000000)
//! - `PAYMENT_ASSET_NAME` (default "USD Coin")
//! - `PAYMENT_ASSET_DOMAIN_VERSION` (default "2")
//! - `PAYMENT_NETWORK` (default "bsc")
//! - `PAYMENT_MAX_TIMEOUT_SECONDS` (default 300)
//! - `PAYMENT_CHAIN_ID` (default 56)

use serde::Deserialize;

/// Complete server configuration loaded from environment.
///
/// All fields are populated from environment variables at startup, with
/// sensible defaults provided for everything but the external collaborators'
/// addresses and the payment asset identity.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Server bind address
    pub host: String,
    /// Server port
    pub port: u16,

    /// Redis connection URL backing the pooled KV client
    pub redis_url: String,
    /// Floor on the number of pooled KV connections
    pub pool_min_connections: u32,
    /// Ceiling on the number of pooled KV connections
    pub pool_max_connections: u32,
    /// Max time a caller waits in the acquire queue before a timeout error
    pub pool_acquire_timeout_ms: u64,
    /// Idle connections beyond the floor are closed after this long
    pub pool_idle_timeout_ms: u64,
    /// Per-command timeout enforced on every KV call
    pub pool_command_timeout_ms: u64,

    /// Sliding window length for the abuse detector's request counter
    pub abuse_window_seconds: u64,
    /// Requests allowed per identifier within the window before a ban
    pub abuse_max_requests: u32,
    /// Ban duration once the window limit is exceeded
    pub abuse_ban_seconds: u64,

    /// Coalescer: flush immediately once the queue reaches this size
    pub batch_size: usize,
    /// Coalescer: flush after this many ms if the size trigger never fires
    pub batch_timeout_ms: u64,
    /// Coalescer: retries for the settle-batch HTTP call
    pub batch_max_retries: u32,
    /// Coalescer: items older than this are failed by the stale sweep
    pub batch_stale_age_seconds: u64,
    /// Coalescer: stale-sweep tick interval
    pub batch_sweep_interval_seconds: u64,

    /// Base URL of the downstream settlement facilitator
    pub facilitator_url: String,
    /// Equivalent chain RPC endpoints; one is chosen uniformly at random per client
    pub chain_rpc_urls: Vec<String>,

    /// Mint price, in the asset's minor units, charged per request
    pub mint_price_minor_units: u64,
    /// Stablecoin contract address collected as payment
    pub payment_asset_address: String,
    /// Human-readable asset name used in the EIP-712-style domain
    pub payment_asset_name: String,
    /// Asset domain version used in the payment challenge
    pub payment_asset_domain_version: String,
    /// Network identifier advertised in payment challenges
    pub payment_network: String,
    /// Maximum seconds a client has to return a signed authorization
    pub payment_max_timeout_seconds: u64,
    /// Chain id the authorization is expected to be signed against
    pub payment_chain_id: u64,

    /// Opaque path segment gating `/internal/mint/<secret>`
    pub internal_mint_secret: String,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing or a value fails to parse.
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            host: env_or("HOST", "0.0.0.0".to_string())?,
            port: env_or("PORT", 8080)?,

            redis_url: env_required("REDIS_URL")?,
            pool_min_connections: env_or("POOL_MIN_CONNECTIONS", 2)?,
            pool_max_connections: env_or("POOL_MAX_CONNECTIONS", 16)?,
            pool_acquire_timeout_ms: env_or("POOL_ACQUIRE_TIMEOUT_MS", 5_000)?,
            pool_idle_timeout_ms: env_or("POOL_IDLE_TIMEOUT_MS", 300_000)?,
            pool_command_timeout_ms: env_or("POOL_COMMAND_TIMEOUT_MS", 30_000)?,

            abuse_window_seconds: env_or("ABUSE_WINDOW_SECONDS", 60)?,
            abuse_max_requests: env_or("ABUSE_MAX_REQUESTS", 30)?,
            abuse_ban_seconds: env_or("ABUSE_BAN_SECONDS", 300)?,

            batch_size: env_or("BATCH_SIZE", 10)?,
            batch_timeout_ms: env_or("BATCH_TIMEOUT_MS", 2_000)?,
            batch_max_retries: env_or("BATCH_MAX_RETRIES", 3)?,
            batch_stale_age_seconds: env_or("BATCH_STALE_AGE_SECONDS", 120)?,
            batch_sweep_interval_seconds: env_or("BATCH_SWEEP_INTERVAL_SECONDS", 30)?,

            facilitator_url: env_required("FACILITATOR_URL")?,
            chain_rpc_urls: env_required("CHAIN_RPC_URLS")?
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),

            mint_price_minor_units: env_or("MINT_PRICE_MINOR_UNITS", 10_000_000)?,
            payment_asset_address: env_required("PAYMENT_ASSET_ADDRESS")?,
            payment_asset_name: env_or("PAYMENT_ASSET_NAME", "USD Coin".to_string())?,
            payment_asset_domain_version: env_or("PAYMENT_ASSET_DOMAIN_VERSION", "2".to_string())?,
            payment_network: env_or("PAYMENT_NETWORK", "bsc".to_string())?,
            payment_max_timeout_seconds: env_or("PAYMENT_MAX_TIMEOUT_SECONDS", 300)?,
            payment_chain_id: env_or("PAYMENT_CHAIN_ID", 56)?,

            internal_mint_secret: env_required("INTERNAL_MINT_SECRET")?,
        })
    }
}

/// Load a required environment variable.
///
/// # Errors
///
/// Returns an error if the variable is not set.
fn env_required(key: &str) -> anyhow::Result<String> {
    std::env::var(key).map_err(|_| anyhow::anyhow!("Missing required environment variable: {}", key))
}

/// Load an environment variable with a default value.
///
/// Returns the parsed environment variable if set, otherwise returns the default.
///
/// # Errors
///
/// Returns an error if the variable is set but cannot be parsed.
fn env_or<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(val) => val
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("Failed to parse {}: {}", key, e)),
        Err(_) => Ok(default),
    }
}
