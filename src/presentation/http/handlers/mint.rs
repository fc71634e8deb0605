use axum::{
    Json,
    extract::{Path, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};

use crate::application::admission::{AdmissionMode, AdmissionRequest};
use crate::domain::mint::MintRequest;
use crate::error::GatewayError;
use crate::presentation::http::state::AppState;

use super::extract_client_ip;

pub async fn mint(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<MintRequest>,
) -> Result<Response, GatewayError> {
    admit(&state, &headers, body, AdmissionMode::Public).await
}

/// Hidden endpoint: the path secret is opaque routing, not an auth check by
/// itself — the real gate is the IP whitelist enforced inside the pipeline.
pub async fn internal_mint(
    State(state): State<AppState>,
    Path(secret): Path<String>,
    headers: HeaderMap,
    Json(body): Json<MintRequest>,
) -> Result<Response, GatewayError> {
    if secret != state.config.internal_mint_secret {
        return Ok(StatusCode::NOT_FOUND.into_response());
    }
    admit(&state, &headers, body, AdmissionMode::Internal).await
}

async fn admit(
    state: &AppState,
    headers: &HeaderMap,
    body: MintRequest,
    mode: AdmissionMode,
) -> Result<Response, GatewayError> {
    let client_ip = extract_client_ip(headers);
    let payment_header = headers
        .get("x-payment")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let req = AdmissionRequest {
        mint: body,
        client_ip,
        payment_header,
        mode,
    };

    let outcome = state.admission.admit_mint(req).await?;

    let mut response = Json(outcome.response).into_response();
    if let Ok(value) = HeaderValue::from_str(&outcome.payment_response_header) {
        response.headers_mut().insert("X-Payment-Response", value);
    }
    Ok(response)
}
