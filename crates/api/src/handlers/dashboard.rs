//! `GET /dashboard` — a stub passthrough. The dashboard itself is an
//! out-of-scope collaborator; this endpoint exists only so the admin
//! surface named in the external interface list resolves to something.

use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

pub async fn dashboard_stub() -> impl IntoResponse {
    Json(json!({
        "status": "not_implemented",
        "message": "the dashboard is a separate collaborator service; this core exposes /events, /rules, /blocks, /settings, and /campaigns for it to read",
    }))
}
