use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde_json::json;

use crate::presentation::http::state::AppState;

pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let status = state.monitoring.check_health().await;
    let code = if status.healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (code, Json(status))
}

pub async fn payment_health(State(state): State<AppState>) -> impl IntoResponse {
    match state.facilitator.health().await {
        Ok(true) => (StatusCode::OK, Json(json!({ "healthy": true }))),
        Ok(false) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "healthy": false })),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "healthy": false, "error": e.to_string() })),
        ),
    }
}

pub async fn kv_health(State(state): State<AppState>) -> impl IntoResponse {
    let status = state.kv.status().await;
    (StatusCode::OK, Json(status))
}
