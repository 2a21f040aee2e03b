//! Runtime settings admin surface: `/settings*`.

use crate::error::ApiError;
use crate::state::AppState;
use axum::{extract::State, response::IntoResponse, Json};
use erp_core::Error;
use serde::Deserialize;
use serde_json::json;

pub async fn get_settings(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.app.settings_store.get())
}

#[derive(Debug, Deserialize)]
pub struct ModeBody {
    pub mode: String,
}

/// Updates both the in-process enforcement mode used by the processor's
/// downgrade rule and the persisted settings record, then best-effort
/// propagates the new mode to the enforcer.
pub async fn set_mode(
    State(state): State<AppState>,
    Json(body): Json<ModeBody>,
) -> Result<impl IntoResponse, ApiError> {
    if body.mode != "fail-open" && body.mode != "fail-closed" {
        return Err(Error::validation("mode must be 'fail-open' or 'fail-closed'").into());
    }

    let enforcement_mode = if body.mode == "fail-open" { "fail_open" } else { "fail_closed" };
    state.app.set_mode(enforcement_mode);
    state.app.settings_store.set_mode(&body.mode)?;

    if let Err(err) = state.app.enforcement.set_mode(&body.mode).await {
        tracing::warn!(error = %err, "failed to propagate mode change to enforcer");
    }

    Ok(Json(json!({ "mode": body.mode })))
}
