use axum::{
    Json,
    extract::{Path, State},
};
use serde_json::{Value, json};

use crate::error::GatewayError;
use crate::presentation::http::state::AppState;

/// Read-only capacity snapshot. Uses `CapacityManager::snapshot` rather than
/// `checkCapacity`: this endpoint only ever reports the counters, even when
/// the token is already over-subscribed (a normal, self-healing state, not
/// an error this read should refuse).
pub async fn get_capacity(
    State(state): State<AppState>,
    Path(token_address): Path<String>,
) -> Result<Json<Value>, GatewayError> {
    let token = token_address.trim().to_lowercase();
    if token.is_empty() {
        return Err(GatewayError::MalformedRequest("tokenAddress must not be empty".into()));
    }

    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64;
    let expired = state
        .deadline_cache
        .is_expired(&token, state.chain.as_ref(), now)
        .await
        .map_err(|e| GatewayError::DependencyUnavailable(e.to_string()))?;
    if expired {
        return Err(GatewayError::TokenExpired { minimal: false });
    }

    let info = state.capacity.snapshot(&token).await?;

    Ok(Json(json!({
        "capacity": {
            "max": info.max_mint_count,
            "current": info.current_mint_count,
            "pending": info.pending_count,
            "available": info.available_slots(),
            "percentage": info.percentage_used(),
        }
    })))
}
