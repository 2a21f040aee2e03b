//! Ingest endpoint: `POST /events/auth`.

use crate::error::ApiError;
use crate::state::AppState;
use abuseguard_detection::{process_event, RawAuthEvent};
use axum::{extract::State, response::IntoResponse, Json};
use serde_json::json;

pub async fn ingest_auth_event(
    State(state): State<AppState>,
    Json(raw): Json<RawAuthEvent>,
) -> Result<impl IntoResponse, ApiError> {
    let result = process_event(&state.app, raw).await?;

    Ok(Json(json!({
        "status": "processed",
        "result": result,
    })))
}
