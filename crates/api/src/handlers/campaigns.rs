//! Read-only campaign listing, consumed by the (out-of-scope) dashboard.

use crate::state::AppState;
use axum::{extract::State, response::IntoResponse, Json};
use serde_json::json;

pub async fn list_campaigns(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({ "campaigns": state.app.campaign_store.list() }))
}
