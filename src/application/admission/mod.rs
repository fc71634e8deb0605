//! Admission pipeline: the strictly-ordered state machine one `POST /mint`
//! request progresses through, from body validation to the settled receipt.
//!
//! `Admitted -> Verified -> RateLimited -> CapacityChecked -> CapacityReserved
//! -> Settled -> Released -> Done`. Every step from `CapacityReserved` onward
//! releases the reservation before returning, success or failure alike.

mod types;

pub use types::{AdmissionMode, AdmissionOutcome, AdmissionRequest, MintResponse};

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use uuid::Uuid;

use crate::config::Config;
use crate::domain::identifier::Identifier;
use crate::domain::payment::{PaymentAuthorization, PaymentChallenge};
use crate::domain::settle::SettleOutcome;
use crate::error::GatewayError;
use crate::infrastructure::abuse::{AbuseDecision, AbuseDetector};
use crate::infrastructure::cache::TokenDeadlineCache;
use crate::infrastructure::capacity::CapacityManager;
use crate::infrastructure::chain::ChainClient;
use crate::infrastructure::facilitator::{FacilitatorClient, SETTLE_TIMEOUT};

use super::coalescer::SettleBatchCoalescer;

pub struct AdmissionPipeline {
    config: Arc<Config>,
    capacity: Arc<CapacityManager>,
    abuse: Arc<AbuseDetector>,
    deadline_cache: Arc<TokenDeadlineCache>,
    chain: Arc<dyn ChainClient>,
    facilitator: Arc<dyn FacilitatorClient>,
    coalescer: Arc<SettleBatchCoalescer>,
}

impl AdmissionPipeline {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: Arc<Config>,
        capacity: Arc<CapacityManager>,
        abuse: Arc<AbuseDetector>,
        deadline_cache: Arc<TokenDeadlineCache>,
        chain: Arc<dyn ChainClient>,
        facilitator: Arc<dyn FacilitatorClient>,
        coalescer: Arc<SettleBatchCoalescer>,
    ) -> Self {
        Self {
            config,
            capacity,
            abuse,
            deadline_cache,
            chain,
            facilitator,
            coalescer,
        }
    }

    #[tracing::instrument(skip(self, req), fields(token = %req.mint.token_key(), ip = %req.client_ip))]
    pub async fn admit_mint(&self, req: AdmissionRequest) -> Result<AdmissionOutcome, GatewayError> {
        req.mint.validate().map_err(GatewayError::MalformedRequest)?;
        let token = req.mint.token_key();
        let now = unix_now();

        if req.mode == AdmissionMode::Internal {
            let whitelisted = self
                .abuse
                .is_whitelisted(&Identifier::ip(&req.client_ip))
                .await?;
            if !whitelisted {
                return Err(GatewayError::Unauthorized);
            }
        }

        let expired = self
            .deadline_cache
            .is_expired(&token, self.chain.as_ref(), now)
            .await
            .map_err(|e| GatewayError::DependencyUnavailable(e.to_string()))?;
        if expired {
            let decision = self
                .abuse
                .record_request(&Identifier::ip_expired(&req.client_ip))
                .await;
            return Err(GatewayError::TokenExpired {
                minimal: matches!(decision, AbuseDecision::Denied { .. }),
            });
        }

        let challenge = build_challenge(&self.config, &req.mint.token_address);

        let Some(payment_header) = req.payment_header.as_deref() else {
            return Err(GatewayError::PaymentRequired(Box::new(challenge)));
        };
        let authorization =
            PaymentAuthorization::decode(payment_header).map_err(GatewayError::MalformedRequest)?;
        authorization
            .check_invariants(&challenge, now)
            .map_err(|reason| GatewayError::PaymentInvalid { reason })?;

        self.verify(&req, &authorization, &challenge).await?;

        if req.mode == AdmissionMode::Public {
            match self.abuse.record_request(&Identifier::ip(&req.client_ip)).await {
                AbuseDecision::Denied { retry_after } => {
                    return Err(GatewayError::RateLimited { retry_after });
                }
                AbuseDecision::Allowed => {}
            }
        }

        let n = req.mint.recipients.len() as u64;
        self.capacity.check_capacity(&token, n).await?;
        self.capacity.reserve_capacity(&token, n).await?;

        let settle_result = self
            .settle(Uuid::now_v7().to_string(), authorization, challenge)
            .await;

        if let Err(release_err) = self.capacity.release_capacity(&token, n).await {
            tracing::error!(error = %release_err, "capacity release failed after settlement attempt");
        }

        let transaction_hash = settle_result?;

        Ok(AdmissionOutcome {
            response: MintResponse {
                success: true,
                payment_tx_hash: transaction_hash.clone(),
                recipients: req.mint.recipients.len(),
                message: "payment settled".to_string(),
            },
            payment_response_header: encode_payment_response(&transaction_hash),
        })
    }

    /// Step 6: verify with the facilitator, recording an abuse tick on any
    /// rejection (transport failure or semantic invalidity alike).
    async fn verify(
        &self,
        req: &AdmissionRequest,
        authorization: &PaymentAuthorization,
        challenge: &PaymentChallenge,
    ) -> Result<(), GatewayError> {
        match self.facilitator.verify(authorization, challenge).await {
            Err(e) => {
                self.abuse.record_request(&Identifier::ip(&req.client_ip)).await;
                let message = e.to_string();
                if message.contains("mempool_capacity_exceeded") {
                    return Err(GatewayError::PaymentInvalid { reason: message });
                }
                Err(GatewayError::Internal(message))
            }
            Ok(response) if response.is_valid => Ok(()),
            Ok(response) => {
                self.abuse.record_request(&Identifier::ip(&req.client_ip)).await;
                let reason = response
                    .reason
                    .or(response.message)
                    .unwrap_or_else(|| "rejected by facilitator".to_string());
                Err(GatewayError::PaymentInvalid { reason })
            }
        }
    }

    /// Step 10: enqueue with the facilitator's settle bound, mapping the
    /// coalescer's outcome to the status codes spec'd for each known reason.
    async fn settle(
        &self,
        request_id: String,
        authorization: PaymentAuthorization,
        challenge: PaymentChallenge,
    ) -> Result<String, GatewayError> {
        let outcome = tokio::time::timeout(
            SETTLE_TIMEOUT,
            self.coalescer.enqueue(request_id, authorization, challenge),
        )
        .await;

        match outcome {
            Err(_) => Err(GatewayError::CoalescerTimeout),
            Ok(None) => Err(GatewayError::DependencyUnavailable(
                "settlement coalescer is shutting down".to_string(),
            )),
            Ok(Some(SettleOutcome::Success { transaction_hash })) => Ok(transaction_hash),
            Ok(Some(SettleOutcome::Failure { reason })) => Err(classify_settle_failure(reason)),
        }
    }
}

/// Build the fresh, never-persisted payment challenge for one token. Payee
/// is always the token being minted, not a configured collector address.
fn build_challenge(config: &Config, token_address: &str) -> PaymentChallenge {
    PaymentChallenge {
        scheme: "exact".to_string(),
        network: config.payment_network.clone(),
        asset_address: config.payment_asset_address.clone(),
        payee_address: token_address.trim().to_string(),
        amount_minor_units: config.mint_price_minor_units,
        asset_name: config.payment_asset_name.clone(),
        asset_domain_version: config.payment_asset_domain_version.clone(),
        max_timeout_seconds: config.payment_max_timeout_seconds,
    }
}

fn classify_settle_failure(reason: String) -> GatewayError {
    if reason.contains("mempool_capacity_exceeded") {
        GatewayError::MalformedRequest(reason)
    } else if reason.contains("chain_query_failed") {
        GatewayError::DependencyUnavailable(reason)
    } else if reason.contains("without a transaction") {
        GatewayError::PaymentInvalid { reason }
    } else {
        GatewayError::Internal(reason)
    }
}

fn encode_payment_response(transaction_hash: &str) -> String {
    use base64::Engine;
    let payload = serde_json::json!({ "transactionHash": transaction_hash });
    base64::engine::general_purpose::STANDARD.encode(payload.to_string())
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_config() -> Config {
        Config {
            host: "0.0.0.0".into(),
            port: 8080,
            redis_url: "redis://localhost".into(),
            pool_min_connections: 2,
            pool_max_connections: 16,
            pool_acquire_timeout_ms: 5_000,
            pool_idle_timeout_ms: 300_000,
            pool_command_timeout_ms: 30_000,
            abuse_window_seconds: 60,
            abuse_max_requests: 30,
            abuse_ban_seconds: 300,
            batch_size: 10,
            batch_timeout_ms: 2_000,
            batch_max_retries: 3,
            batch_stale_age_seconds: 120,
            batch_sweep_interval_seconds: 30,
            facilitator_url: "https://facilitator.test".into(),
            chain_rpc_urls: vec!["https://rpc.test".into()],
            mint_price_minor_units: 10_000_000,
            payment_asset_address: "0xasset".into(),
            payment_asset_name: "USD Coin".into(),
            payment_asset_domain_version: "2".into(),
            payment_network: "bsc".into(),
            payment_max_timeout_seconds: 300,
            payment_chain_id: 56,
            internal_mint_secret: "secret".into(),
        }
    }

    #[test]
    fn challenge_payee_is_the_token_address() {
        let challenge = build_challenge(&sample_config(), "0xAA ");
        assert_eq!(challenge.payee_address, "0xAA");
        assert_eq!(challenge.asset_address, "0xasset");
        assert_eq!(challenge.amount_minor_units, 10_000_000);
    }

    #[test]
    fn settle_failure_reasons_map_to_spec_status_codes() {
        assert_eq!(
            classify_settle_failure("mempool_capacity_exceeded".into()).status_code(),
            axum::http::StatusCode::BAD_REQUEST
        );
        assert_eq!(
            classify_settle_failure("chain_query_failed".into()).status_code(),
            axum::http::StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            classify_settle_failure("settlement reported success without a transaction".into())
                .status_code(),
            axum::http::StatusCode::PAYMENT_REQUIRED
        );
        assert_eq!(
            classify_settle_failure("something else".into()).status_code(),
            axum::http::StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn payment_response_header_decodes_back_to_the_transaction_hash() {
        use base64::Engine;
        let header = encode_payment_response("0xtx");
        let decoded = base64::engine::general_purpose::STANDARD.decode(header).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&decoded).unwrap();
        assert_eq!(value["transactionHash"], "0xtx");
    }
}
