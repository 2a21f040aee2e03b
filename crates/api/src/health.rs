//! # Health Check Endpoints
//!
//! This module provides health monitoring endpoints for the abuse-detection
//! API server. These endpoints are essential for:
//!
//! - **Load balancer health checks**: Determine if instances should receive traffic
//! - **Container orchestration**: Kubernetes liveness and readiness probes
//! - **Monitoring systems**: Automated alerting on service degradation
//! - **Deployment validation**: Ensure services start correctly
//!
//! ## Health Check Types
//!
//! ### Liveness Check (`/health`)
//! - **Purpose**: Indicates if the service is running and not deadlocked
//! - **Response**: Always returns 200 OK with basic service info
//! - **Use case**: Load balancer health checks, basic monitoring
//!
//! ### Readiness Check (`/ready`)
//! - **Purpose**: Indicates if the service can handle requests
//! - **Dependencies**: Tests the durable event log and the external enforcer
//! - **Response**: 200 OK if ready, 503 Service Unavailable if not
//! - **Use case**: Kubernetes readiness probes, deployment validation
//!
//! ## Integration Examples
//!
//! ### Docker Health Check
//! ```dockerfile
//! HEALTHCHECK --interval=30s --timeout=3s --start-period=5s --retries=3 \
//!   CMD curl -f http://localhost:8080/health || exit 1
//! ```
//!
//! ### Kubernetes Probes
//! ```yaml
//! livenessProbe:
//!   httpGet:
//!     path: /health
//!     port: 8080
//!   initialDelaySeconds: 30
//!   periodSeconds: 10
//!
//! readinessProbe:
//!   httpGet:
//!     path: /ready
//!     port: 8080
//!   initialDelaySeconds: 5
//!   periodSeconds: 5
//! ```

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use tracing::error;

use crate::state::AppState;

/// Basic health check endpoint for liveness monitoring.
///
/// Returns immediately without touching the event log or the enforcer;
/// it is a pure process-alive signal.
pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "service": "abuseguard-api",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Comprehensive readiness check with dependency validation.
///
/// Validates:
/// - **Event log**: the SQLite-backed durable log accepts a trivial query
/// - **Enforcer**: the external rate-limiter responds to `GET /health`
///
/// The enforcer being unreachable does not make the service un-ready — the
/// engine is fail-open by design — but it is surfaced here so operators can
/// tell the two failure modes apart.
pub async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    let event_log_healthy = match state.app.event_log.count_by_decision("ALLOW").await {
        Ok(_) => true,
        Err(err) => {
            error!("event log health check failed: {}", err);
            false
        }
    };

    let enforcer_healthy = state.app.enforcement.health().await;

    let is_ready = event_log_healthy;

    let status = if is_ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(json!({
            "ready": is_ready,
            "checks": {
                "event_log": event_log_healthy,
                "enforcer": enforcer_healthy,
            }
        })),
    )
}
