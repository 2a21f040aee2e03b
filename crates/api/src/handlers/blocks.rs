//! Block store admin surface: `/blocks/*`.

use crate::error::ApiError;
use crate::state::AppState;
use axum::{extract::State, response::IntoResponse, Json};
use serde::Deserialize;
use serde_json::json;

pub async fn list_blocks(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({ "blocks": state.app.block_store.active_blocks() }))
}

#[derive(Debug, Deserialize)]
pub struct BlockBody {
    pub entity: String,
    #[serde(default = "default_ttl")]
    pub ttl_seconds: u64,
}

fn default_ttl() -> u64 {
    300
}

pub async fn block_entity(
    State(state): State<AppState>,
    Json(body): Json<BlockBody>,
) -> Result<impl IntoResponse, ApiError> {
    let now_ms = chrono::Utc::now().timestamp_millis();
    state.app.block_store.upsert_block(
        &body.entity,
        state.app.decision_policy.block_threshold,
        body.ttl_seconds,
        abuseguard_detection::BlockSource::Manual,
        now_ms,
    )?;
    Ok(Json(json!({ "entity": body.entity, "blocked": true })))
}

#[derive(Debug, Deserialize)]
pub struct UnblockBody {
    pub entity: String,
}

pub async fn unblock_entity(
    State(state): State<AppState>,
    Json(body): Json<UnblockBody>,
) -> Result<impl IntoResponse, ApiError> {
    state.app.block_store.unblock(&body.entity)?;
    Ok(Json(json!({ "entity": body.entity, "blocked": false })))
}

pub async fn enforcer_health(State(state): State<AppState>) -> impl IntoResponse {
    let healthy = state.app.enforcement.health().await;
    Json(json!({ "enforcer_healthy": healthy }))
}
