//! Downstream settlement facilitator client.
//!
//! Consumed only through `/verify`, `/settle/batch`, and `/health`, per the
//! interface contract — the gateway never signs or broadcasts anything
//! itself.

mod types;

pub use types::{SettleBatchItem, SettleBatchResponse, SettleItemResult, VerifyResponse};

use async_trait::async_trait;
use std::time::Duration;

use crate::domain::payment::{PaymentAuthorization, PaymentChallenge};

/// Bound on a single `/verify` call (spec §5).
pub const VERIFY_TIMEOUT: Duration = Duration::from_secs(60);
/// Bound on a `/settle/batch` call (spec §5).
pub const SETTLE_TIMEOUT: Duration = Duration::from_secs(180);
/// Bound on any other facilitator call (spec §5).
pub const GENERIC_TIMEOUT: Duration = Duration::from_secs(30);

#[async_trait]
pub trait FacilitatorClient: Send + Sync {
    async fn verify(
        &self,
        authorization: &PaymentAuthorization,
        challenge: &PaymentChallenge,
    ) -> anyhow::Result<VerifyResponse>;

    async fn settle_batch(
        &self,
        items: &[(PaymentAuthorization, PaymentChallenge)],
    ) -> anyhow::Result<SettleBatchResponse>;

    async fn health(&self) -> anyhow::Result<bool>;
}

pub struct HttpFacilitatorClient {
    http: reqwest::Client,
    base_url: String,
}

impl HttpFacilitatorClient {
    pub fn new(base_url: String) -> anyhow::Result<Self> {
        Ok(Self {
            http: reqwest::Client::builder().build()?,
            base_url,
        })
    }
}

#[async_trait]
impl FacilitatorClient for HttpFacilitatorClient {
    async fn verify(
        &self,
        authorization: &PaymentAuthorization,
        challenge: &PaymentChallenge,
    ) -> anyhow::Result<VerifyResponse> {
        let body = types::VerifyRequest {
            payment_payload: authorization.clone(),
            payment_requirements: challenge.clone(),
        };
        let response = tokio::time::timeout(
            VERIFY_TIMEOUT,
            self.http
                .post(format!("{}/verify", self.base_url))
                .json(&body)
                .send(),
        )
        .await
        .map_err(|_| anyhow::anyhow!("facilitator /verify timed out"))??
        .error_for_status()?
        .json::<VerifyResponse>()
        .await?;
        Ok(response)
    }

    async fn settle_batch(
        &self,
        items: &[(PaymentAuthorization, PaymentChallenge)],
    ) -> anyhow::Result<SettleBatchResponse> {
        let body = types::SettleBatchRequest {
            items: items
                .iter()
                .map(|(authorization, challenge)| SettleBatchItem {
                    payment_payload: authorization.clone(),
                    payment_requirements: challenge.clone(),
                })
                .collect(),
            wait_for_confirmation: true,
        };
        let response = tokio::time::timeout(
            SETTLE_TIMEOUT,
            self.http
                .post(format!("{}/settle/batch", self.base_url))
                .json(&body)
                .send(),
        )
        .await
        .map_err(|_| anyhow::anyhow!("facilitator /settle/batch timed out"))??
        .error_for_status()?
        .json::<SettleBatchResponse>()
        .await?;
        Ok(response)
    }

    async fn health(&self) -> anyhow::Result<bool> {
        let response = tokio::time::timeout(
            GENERIC_TIMEOUT,
            self.http.get(format!("{}/health", self.base_url)).send(),
        )
        .await
        .map_err(|_| anyhow::anyhow!("facilitator /health timed out"))??;
        Ok(response.status().is_success())
    }
}
