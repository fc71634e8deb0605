//! Request/response shapes for the admission pipeline's one public entry
//! point, `AdmissionPipeline::admit_mint`.

use serde::Serialize;

use crate::domain::mint::MintRequest;

/// Which path the request arrived on. Controls the whitelist gate (internal
/// only) and whether the per-payment rate limit applies (public only).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmissionMode {
    Public,
    Internal,
}

/// Everything the pipeline needs about one inbound request, already parsed
/// out of the HTTP layer.
#[derive(Debug, Clone)]
pub struct AdmissionRequest {
    pub mint: MintRequest,
    pub client_ip: String,
    pub payment_header: Option<String>,
    pub mode: AdmissionMode,
}

/// Body of the `200` response.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MintResponse {
    pub success: bool,
    pub payment_tx_hash: String,
    pub recipients: usize,
    pub message: String,
}

/// Successful admission result: the response body plus the encoded
/// `X-Payment-Response` header value.
pub struct AdmissionOutcome {
    pub response: MintResponse,
    pub payment_response_header: String,
}
