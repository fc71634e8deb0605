//! Crate-wide error type and its HTTP response mapping.
//!
//! Every fallible operation in the gateway ultimately returns a `GatewayError`
//! variant. Each variant owns the HTTP status and JSON body fields it needs,
//! mirroring the error kinds a request can fail with: malformed input,
//! payment/capacity/rate-limit refusals, and dependency failures.

use axum::{
    Json,
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

use crate::domain::payment::PaymentChallenge;

/// Sum type for every error a request can terminate with.
#[derive(Debug)]
pub enum GatewayError {
    /// Request body or path failed structural validation (400).
    MalformedRequest(String),

    /// Caller IP is not on the whitelist for a gated endpoint (403).
    Unauthorized,

    /// Token's deployment deadline has passed (410).
    ///
    /// `minimal` switches between the full remaining-time body and the
    /// minimal body served once the expired-token abuse counter bans the IP.
    TokenExpired { minimal: bool },

    /// No payment header present; challenge must be signed and retried (402).
    PaymentRequired(Box<PaymentChallenge>),

    /// Facilitator rejected the authorization, or it failed local invariant
    /// checks, with a machine-readable reason (402).
    PaymentInvalid { reason: String },

    /// Sliding-window or capacity rate limit tripped (429).
    RateLimited { retry_after: u64 },

    /// Mint capacity for the token is exhausted (429).
    CapacityExceeded { available: u64 },

    /// Capacity check could not complete because a chain read failed (503).
    CapacityCheckFailed,

    /// Coalescer did not produce a settlement result within its bound (503).
    CoalescerTimeout,

    /// Transport-level failure talking to the facilitator (503).
    FacilitatorTransport(String),

    /// A required external dependency (KV, chain RPC) is unavailable (503).
    DependencyUnavailable(String),

    /// Anything else (500).
    Internal(String),
}

impl fmt::Display for GatewayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedRequest(msg) => write!(f, "malformed request: {msg}"),
            Self::Unauthorized => write!(f, "unauthorized"),
            Self::TokenExpired { .. } => write!(f, "token deployment period has ended"),
            Self::PaymentRequired(_) => write!(f, "payment required"),
            Self::PaymentInvalid { reason } => write!(f, "payment invalid: {reason}"),
            Self::RateLimited { retry_after } => {
                write!(f, "rate limited, retry after {retry_after}s")
            }
            Self::CapacityExceeded { available } => {
                write!(f, "capacity exceeded, {available} slots available")
            }
            Self::CapacityCheckFailed => write!(f, "capacity check failed"),
            Self::CoalescerTimeout => write!(f, "settlement timed out"),
            Self::FacilitatorTransport(msg) => write!(f, "facilitator transport error: {msg}"),
            Self::DependencyUnavailable(msg) => write!(f, "dependency unavailable: {msg}"),
            Self::Internal(msg) => write!(f, "internal error: {msg}"),
        }
    }
}

impl std::error::Error for GatewayError {}

impl GatewayError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::MalformedRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::FORBIDDEN,
            Self::TokenExpired { .. } => StatusCode::GONE,
            Self::PaymentRequired(_) | Self::PaymentInvalid { .. } => StatusCode::PAYMENT_REQUIRED,
            Self::RateLimited { .. } | Self::CapacityExceeded { .. } => {
                StatusCode::TOO_MANY_REQUESTS
            }
            Self::CapacityCheckFailed
            | Self::CoalescerTimeout
            | Self::FacilitatorTransport(_)
            | Self::DependencyUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        match status {
            StatusCode::INTERNAL_SERVER_ERROR | StatusCode::SERVICE_UNAVAILABLE => {
                tracing::error!(error = %self, "request failed");
            }
            StatusCode::FORBIDDEN | StatusCode::GONE | StatusCode::TOO_MANY_REQUESTS => {
                tracing::warn!(error = %self, "request refused");
            }
            _ => {
                tracing::debug!(error = %self, "request rejected");
            }
        }

        match self {
            Self::MalformedRequest(msg) => {
                (status, Json(json!({ "error": msg }))).into_response()
            }
            Self::Unauthorized => {
                (status, Json(json!({ "error": "not whitelisted" }))).into_response()
            }
            Self::TokenExpired { minimal: true } => (
                status,
                Json(json!({ "error": "Token deployment period has ended" })),
            )
                .into_response(),
            Self::TokenExpired { minimal: false } => (
                status,
                Json(json!({
                    "error": "Token deployment period has ended",
                    "expired": true,
                })),
            )
                .into_response(),
            Self::PaymentRequired(challenge) => {
                let mut response = (
                    status,
                    Json(json!({
                        "price": challenge.amount_minor_units.to_string(),
                        "amount": challenge.amount_minor_units.to_string(),
                        "payTo": challenge.payee_address,
                        "token": challenge.asset_address,
                        "tokenName": challenge.asset_name,
                        "tokenVersion": challenge.asset_domain_version,
                        "network": challenge.network,
                        "paymentRequired": {
                            "scheme": challenge.scheme,
                            "network": challenge.network,
                            "assetAddress": challenge.asset_address,
                            "payeeAddress": challenge.payee_address,
                            "amountMinorUnits": challenge.amount_minor_units,
                            "assetName": challenge.asset_name,
                            "assetDomainVersion": challenge.asset_domain_version,
                            "maxTimeoutSeconds": challenge.max_timeout_seconds,
                        },
                    })),
                )
                    .into_response();
                if let Ok(value) = HeaderValue::from_str(&challenge.to_options_header()) {
                    response.headers_mut().insert("X-Payment-Options", value);
                }
                response
            }
            Self::PaymentInvalid { reason } => {
                (status, Json(json!({ "error": reason, "reason": reason }))).into_response()
            }
            Self::RateLimited { retry_after } => {
                let mut response = (
                    status,
                    Json(json!({
                        "error": "Too many requests",
                        "retryAfter": retry_after,
                    })),
                )
                    .into_response();
                if let Ok(value) = HeaderValue::from_str(&retry_after.to_string()) {
                    response.headers_mut().insert("Retry-After", value);
                }
                response
            }
            Self::CapacityExceeded { available } => (
                status,
                Json(json!({
                    "error": "Mint capacity exceeded",
                    "available": available,
                })),
            )
                .into_response(),
            Self::CapacityCheckFailed => (
                status,
                Json(json!({ "error": "Unable to determine mint capacity" })),
            )
                .into_response(),
            Self::CoalescerTimeout => {
                (status, Json(json!({ "error": "Settlement timed out" }))).into_response()
            }
            Self::FacilitatorTransport(msg) => {
                (status, Json(json!({ "error": msg }))).into_response()
            }
            Self::DependencyUnavailable(msg) => {
                (status, Json(json!({ "error": msg }))).into_response()
            }
            Self::Internal(_) => {
                (status, Json(json!({ "error": "Internal server error" }))).into_response()
            }
        }
    }
}

impl From<crate::infrastructure::kv::KvError> for GatewayError {
    fn from(err: crate::infrastructure::kv::KvError) -> Self {
        tracing::error!(kv_error = %err, "kv pool operation failed");
        Self::DependencyUnavailable(err.to_string())
    }
}

impl From<redis::RedisError> for GatewayError {
    fn from(err: redis::RedisError) -> Self {
        tracing::error!(redis_error = %err, "redis operation failed");
        Self::DependencyUnavailable(format!("redis error: {err}"))
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            tracing::warn!(reqwest_timeout = %err);
            Self::FacilitatorTransport("request timeout".into())
        } else if err.is_connect() {
            tracing::warn!(reqwest_connect = %err);
            Self::FacilitatorTransport("connection failed".into())
        } else if err.is_decode() {
            tracing::warn!(reqwest_decode = %err);
            Self::FacilitatorTransport("malformed response body".into())
        } else {
            tracing::error!(reqwest_error = %err);
            Self::FacilitatorTransport(err.to_string())
        }
    }
}

impl From<anyhow::Error> for GatewayError {
    fn from(err: anyhow::Error) -> Self {
        tracing::error!(error = %err, "unclassified error");
        Self::Internal(err.to_string())
    }
}
