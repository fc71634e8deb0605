use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;

use crate::domain::identifier::Identifier;
use crate::error::GatewayError;
use crate::infrastructure::abuse::AbuseStats;
use crate::presentation::http::state::AppState;

pub async fn get_stats(
    State(state): State<AppState>,
    Path(identifier): Path<String>,
) -> Result<Json<AbuseStats>, GatewayError> {
    let id = Identifier::parse(&identifier).map_err(GatewayError::MalformedRequest)?;
    let stats = state.abuse.get_stats(&id).await?;
    Ok(Json(stats))
}

#[derive(Debug, Deserialize)]
pub struct BanRequest {
    pub identifier: String,
    #[serde(default)]
    pub seconds: Option<u64>,
}

pub async fn ban(
    State(state): State<AppState>,
    Json(body): Json<BanRequest>,
) -> Result<StatusCode, GatewayError> {
    let id = Identifier::parse(&body.identifier).map_err(GatewayError::MalformedRequest)?;
    let seconds = body.seconds.unwrap_or(state.config.abuse_ban_seconds);
    state.abuse.manual_ban(&id, seconds).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct IdentifierRequest {
    pub identifier: String,
}

pub async fn unban(
    State(state): State<AppState>,
    Json(body): Json<IdentifierRequest>,
) -> Result<StatusCode, GatewayError> {
    let id = Identifier::parse(&body.identifier).map_err(GatewayError::MalformedRequest)?;
    state.abuse.unban(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn whitelist_add(
    State(state): State<AppState>,
    Json(body): Json<IdentifierRequest>,
) -> Result<StatusCode, GatewayError> {
    let id = Identifier::parse(&body.identifier).map_err(GatewayError::MalformedRequest)?;
    state.abuse.add_to_whitelist(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn whitelist_remove(
    State(state): State<AppState>,
    Json(body): Json<IdentifierRequest>,
) -> Result<StatusCode, GatewayError> {
    let id = Identifier::parse(&body.identifier).map_err(GatewayError::MalformedRequest)?;
    state.abuse.remove_from_whitelist(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
