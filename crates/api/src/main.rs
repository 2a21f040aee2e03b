//! # AbuseGuard API Server
//!
//! The HTTP ingress for the abuse-detection engine, built with Axum. It
//! exposes the thin ingest/admin surface described in the external
//! interfaces list: event ingestion, detector rule management, the block
//! store, runtime settings, and a read-only campaign listing for the
//! (out-of-scope) dashboard collaborator.
//!
//! ## Middleware Stack
//!
//! Requests flow through middleware in this order:
//! 1. **Security Headers**: HSTS, CSP, X-Frame-Options
//! 2. **Request ID**: unique tracking for request tracing
//! 3. **Tracing**: structured logging with correlation IDs
//!
//! ## Usage
//!
//! Start the server:
//! ```bash
//! cargo run --bin abuseguard-server
//! ```

use axum::{http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use erp_core::{Config, MetricsRegistry};
use std::{net::SocketAddr, sync::Arc};
use tower::ServiceBuilder;
use tower_http::trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::{info, Level};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api_middleware;
mod error;
mod error_handler;
mod handlers;
mod health;
mod state;

use abuseguard_detection::Application;
use handlers::{blocks, campaigns, dashboard, events, rules, settings};
use state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    info!("Starting AbuseGuard server...");

    let config = Config::load()?;
    info!("Configuration loaded successfully");

    let app = Arc::new(Application::new(&config).await?);
    info!("Detection engine initialized");

    let metrics_registry = Arc::new(MetricsRegistry::new(config.metrics.clone()));
    if metrics_registry.is_enabled() {
        metrics_registry.register(app.metrics.events_processed_total.clone())?;
        metrics_registry.register(app.metrics.decisions_total.clone())?;
        metrics_registry.register(app.metrics.signals_triggered_total.clone())?;
        metrics_registry.register(app.metrics.enforcement_failures_total.clone())?;
        metrics_registry.register(app.metrics.processing_duration_seconds.clone())?;
    }

    let state = AppState {
        config: config.clone(),
        app,
        metrics: metrics_registry,
    };

    let router = create_app(state)?;

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

fn create_app(state: AppState) -> Result<Router, Box<dyn std::error::Error>> {
    let router = Router::new()
        .nest("/", create_api_routes())
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        .route("/metrics", get(metrics_handler))
        .layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn(
                    api_middleware::security_headers::security_headers_middleware,
                ))
                .layer(axum::middleware::from_fn(
                    api_middleware::request_id::request_id_middleware,
                ))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                        .on_request(DefaultOnRequest::new().level(Level::INFO))
                        .on_response(DefaultOnResponse::new().level(Level::INFO)),
                ),
        )
        .with_state(state)
        .fallback(handler_404);

    Ok(router)
}

fn create_api_routes() -> Router<AppState> {
    Router::new()
        .route("/events/auth", axum::routing::post(events::ingest_auth_event))
        .route("/rules", get(rules::list_rules))
        .route("/rules/enable/:rule_id", axum::routing::post(rules::enable_rule))
        .route("/rules/disable/:rule_id", axum::routing::post(rules::disable_rule))
        .route("/rules/threshold/:rule_id", axum::routing::post(rules::set_threshold))
        .route("/blocks", get(blocks::list_blocks))
        .route("/blocks/block", axum::routing::post(blocks::block_entity))
        .route("/blocks/unblock", axum::routing::post(blocks::unblock_entity))
        .route("/blocks/enforcer/health", get(blocks::enforcer_health))
        .route("/settings", get(settings::get_settings))
        .route("/settings/mode", axum::routing::post(settings::set_mode))
        .route("/campaigns", get(campaigns::list_campaigns))
        .route("/dashboard", get(dashboard::dashboard_stub))
}

async fn metrics_handler(
    axum::extract::State(state): axum::extract::State<AppState>,
) -> impl IntoResponse {
    (StatusCode::OK, state.metrics.metrics_text())
}

async fn handler_404() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({
            "error": "Resource not found"
        })),
    )
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "abuseguard_api=debug,abuseguard_detection=debug,erp_core=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received terminate signal");
        },
    }
}
