//! Enforcement bridge: synchronous RPC to the external rate-limiter.
//!
//! The bridge never retries — the latency budget forbids it — and never
//! propagates a timeout as an error to the caller. On failure it returns a
//! synthetic "allow" response and marks enforcement unavailable; the
//! processor is responsible for the mode-aware BLOCK downgrade.

use crate::decision::Decision;
use erp_core::config::EnforcementConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize)]
struct EnforceRequest<'a> {
    entity: &'a str,
    decision: &'static str,
    ttl_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
struct EnforceResponse {
    allowed: bool,
    reason: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EnforcementResult {
    pub allowed: bool,
    pub reason: String,
    pub available: bool,
}

pub struct EnforcementBridge {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl EnforcementBridge {
    pub fn new(config: &EnforcementConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: config.enforcer_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_millis(config.timeout_ms),
        }
    }

    /// Requests enforcement of `decision` for `entity`. `ttl_seconds` is 300 for
    /// BLOCK, 0 otherwise, per the caller's choice — the processor computes this.
    pub async fn enforce(&self, entity: &str, decision: Decision, ttl_seconds: u64) -> EnforcementResult {
        let body = EnforceRequest {
            entity,
            decision: decision_wire_name(decision),
            ttl_seconds,
        };

        let outcome = self
            .client
            .post(format!("{}/enforce", self.base_url))
            .json(&body)
            .timeout(self.timeout)
            .send()
            .await;

        match outcome {
            Ok(response) => match response.json::<EnforceResponse>().await {
                Ok(parsed) => EnforcementResult {
                    allowed: parsed.allowed,
                    reason: parsed.reason.unwrap_or_default(),
                    available: true,
                },
                Err(err) => EnforcementResult {
                    allowed: true,
                    reason: format!("enforcement unavailable: malformed response ({})", err),
                    available: false,
                },
            },
            Err(err) => EnforcementResult {
                allowed: true,
                reason: format!("enforcement unavailable: {}", err),
                available: false,
            },
        }
    }

    pub async fn set_mode(&self, mode: &str) -> Result<(), reqwest::Error> {
        self.client
            .post(format!("{}/mode", self.base_url))
            .json(&serde_json::json!({ "mode": mode }))
            .timeout(self.timeout)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    pub async fn health(&self) -> bool {
        self.client
            .get(format!("{}/health", self.base_url))
            .timeout(self.timeout)
            .send()
            .await
            .map(|r| r.status().is_success())
            .unwrap_or(false)
    }
}

fn decision_wire_name(decision: Decision) -> &'static str {
    match decision {
        Decision::Block => "BLOCK",
        _ => "ALLOW",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{routing::post, Json, Router};
    use serde_json::Value;
    use tokio::net::TcpListener;

    async fn spawn_enforcer(allowed: bool) -> String {
        let app = Router::new().route(
            "/enforce",
            post(move |Json(_body): Json<Value>| async move {
                Json(serde_json::json!({ "allowed": allowed, "reason": "test" }))
            }),
        );
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn successful_enforce_is_marked_available() {
        let url = spawn_enforcer(true).await;
        let bridge = EnforcementBridge::new(&EnforcementConfig {
            enforcer_url: url,
            timeout_ms: 1000,
            mode: "fail_open".to_string(),
            block_ttl_seconds: 300,
        });

        let result = bridge.enforce("1.2.3.4", Decision::Block, 300).await;
        assert!(result.available);
        assert!(result.allowed);
    }

    #[tokio::test]
    async fn unreachable_enforcer_fails_open() {
        let bridge = EnforcementBridge::new(&EnforcementConfig {
            enforcer_url: "http://127.0.0.1:1".to_string(),
            timeout_ms: 200,
            mode: "fail_open".to_string(),
            block_ttl_seconds: 300,
        });

        let result = bridge.enforce("1.2.3.4", Decision::Block, 300).await;
        assert!(!result.available);
        assert!(result.allowed);
    }
}
