//! Detector rules admin surface: `/rules/*`.

use crate::error::ApiError;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use erp_core::Error;
use serde::Deserialize;
use serde_json::json;

pub async fn list_rules(State(state): State<AppState>) -> impl IntoResponse {
    let rules: Vec<_> = state
        .app
        .rules
        .get_all()
        .into_iter()
        .map(|(id, rule)| json!({ "rule_id": id, "enabled": rule.enabled, "threshold": rule.threshold }))
        .collect();

    Json(json!({ "rules": rules }))
}

pub async fn enable_rule(
    State(state): State<AppState>,
    Path(rule_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    if !state.app.rules.exists(&rule_id) {
        return Err(Error::not_found(format!("unknown rule '{}'", rule_id)).into());
    }
    state.app.rules.enable(&rule_id);
    Ok(Json(json!({ "rule_id": rule_id, "enabled": true })))
}

pub async fn disable_rule(
    State(state): State<AppState>,
    Path(rule_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    if !state.app.rules.exists(&rule_id) {
        return Err(Error::not_found(format!("unknown rule '{}'", rule_id)).into());
    }
    state.app.rules.disable(&rule_id);
    Ok(Json(json!({ "rule_id": rule_id, "enabled": false })))
}

#[derive(Debug, Deserialize)]
pub struct ThresholdBody {
    pub threshold: f64,
}

pub async fn set_threshold(
    State(state): State<AppState>,
    Path(rule_id): Path<String>,
    Json(body): Json<ThresholdBody>,
) -> Result<impl IntoResponse, ApiError> {
    if !state.app.rules.exists(&rule_id) {
        return Err(Error::not_found(format!("unknown rule '{}'", rule_id)).into());
    }
    if body.threshold < 0.0 {
        return Err(Error::validation("threshold must be non-negative").into());
    }
    state.app.rules.update_threshold(&rule_id, body.threshold);
    Ok(Json(json!({ "rule_id": rule_id, "threshold": body.threshold })))
}
