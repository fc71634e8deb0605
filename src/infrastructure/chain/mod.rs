//! Read-only chain RPC client.
//!
//! Consulted for the three contract constants/counters the capacity caches
//! need. One of several equivalent RPC endpoints is chosen uniformly at
//! random per client construction.

use async_trait::async_trait;
use rand::Rng;

/// Read-only contract calls the capacity caches depend on.
#[async_trait]
pub trait ChainClient: Send + Sync {
    async fn max_mint_count(&self, token_address: &str) -> anyhow::Result<u64>;
    async fn mint_count(&self, token_address: &str) -> anyhow::Result<u64>;
    async fn deployment_deadline(&self, token_address: &str) -> anyhow::Result<i64>;
}

/// HTTP JSON-RPC backed chain client.
pub struct HttpChainClient {
    http: reqwest::Client,
    rpc_url: String,
}

impl HttpChainClient {
    /// Pick one of `rpc_urls` uniformly at random for this client instance.
    pub fn new(rpc_urls: &[String]) -> anyhow::Result<Self> {
        if rpc_urls.is_empty() {
            anyhow::bail!("no chain RPC endpoints configured");
        }
        let idx = rand::thread_rng().gen_range(0..rpc_urls.len());
        Ok(Self {
            http: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()?,
            rpc_url: rpc_urls[idx].clone(),
        })
    }

    async fn call_uint(&self, token_address: &str, method: &str) -> anyhow::Result<u64> {
        #[derive(serde::Serialize)]
        struct Request<'a> {
            token_address: &'a str,
            method: &'a str,
        }
        #[derive(serde::Deserialize)]
        struct Response {
            value: String,
        }

        let response: Response = self
            .http
            .post(&self.rpc_url)
            .json(&Request {
                token_address,
                method,
            })
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        response
            .value
            .parse::<u64>()
            .map_err(|e| anyhow::anyhow!("non-numeric chain response for {method}: {e}"))
    }
}

#[async_trait]
impl ChainClient for HttpChainClient {
    async fn max_mint_count(&self, token_address: &str) -> anyhow::Result<u64> {
        self.call_uint(token_address, "maxMintCount").await
    }

    async fn mint_count(&self, token_address: &str) -> anyhow::Result<u64> {
        self.call_uint(token_address, "mintCount").await
    }

    async fn deployment_deadline(&self, token_address: &str) -> anyhow::Result<i64> {
        self.call_uint(token_address, "deploymentDeadline")
            .await
            .map(|v| v as i64)
    }
}
