//! Wire types for the facilitator's JSON API.

use serde::{Deserialize, Serialize};

use crate::domain::payment::{PaymentAuthorization, PaymentChallenge};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct VerifyRequest {
    pub payment_payload: PaymentAuthorization,
    pub payment_requirements: PaymentChallenge,
}

/// `POST /verify` response.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResponse {
    pub is_valid: bool,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub active_transactions: Option<u64>,
    #[serde(default)]
    pub max_capacity: Option<u64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettleBatchItem {
    pub payment_payload: PaymentAuthorization,
    pub payment_requirements: PaymentChallenge,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct SettleBatchRequest {
    pub items: Vec<SettleBatchItem>,
    pub wait_for_confirmation: bool,
}

/// One positional result within a `/settle/batch` response.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettleItemResult {
    pub index: usize,
    pub success: bool,
    #[serde(default)]
    pub transaction: Option<String>,
    #[serde(default)]
    pub nonce: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// `POST /settle/batch` response.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettleBatchResponse {
    pub success: bool,
    pub results: Vec<SettleItemResult>,
    pub total_submitted: usize,
    pub total_success: usize,
    pub total_failed: usize,
}
