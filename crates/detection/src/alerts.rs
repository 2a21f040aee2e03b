//! Alert manager: severity mapping, campaign-keyed suppression window, and
//! best-effort webhook emission. `emit` must never propagate an error to the
//! caller — alerts are strictly subordinate to the auth decision path.

use crate::decision::Decision;
use crate::event::AuthEvent;
use crate::signals::SignalTrigger;
use chrono::Utc;
use dashmap::DashMap;
use serde::Serialize;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Info,
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Serialize)]
pub struct CampaignRef {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AlertPayload {
    pub alert_type: String,
    pub severity: Severity,
    pub decision: String,
    pub entity: String,
    pub username: Option<String>,
    pub ip_address: String,
    pub endpoint: String,
    pub risk_score: f64,
    pub signals: Vec<SignalTrigger>,
    pub timestamp: String,
    pub source: String,
    pub campaign: Option<CampaignRef>,
}

pub struct AlertManager {
    suppression_window_sec: i64,
    webhook_url: String,
    client: reqwest::Client,
    last_alerts: DashMap<String, i64>,
}

impl AlertManager {
    pub fn new(suppression_window_sec: i64, webhook_url: impl Into<String>) -> Self {
        Self {
            suppression_window_sec,
            webhook_url: webhook_url.into(),
            client: reqwest::Client::new(),
            last_alerts: DashMap::new(),
        }
    }

    fn derive_campaign_id(event: &AuthEvent) -> String {
        match &event.username {
            Some(username) => format!("USER::{}", username),
            None => format!("IP::{}", event.ip_address),
        }
    }

    fn map_severity(decision: Decision, risk: f64) -> Severity {
        match decision {
            Decision::Block => {
                if risk >= 75.0 {
                    Severity::Critical
                } else {
                    Severity::High
                }
            }
            Decision::Challenge => {
                if risk >= 40.0 {
                    Severity::Medium
                } else {
                    Severity::Low
                }
            }
            _ => Severity::Info,
        }
    }

    fn is_suppressed(&self, campaign_id: &str, now_ts: i64) -> bool {
        match self.last_alerts.get(campaign_id) {
            Some(last) => now_ts - *last < self.suppression_window_sec,
            None => false,
        }
    }

    /// Emits an alert if the campaign is not currently suppressed. Never
    /// raises — all failures are logged and swallowed.
    pub async fn emit(
        &self,
        event: &AuthEvent,
        decision: Decision,
        risk: f64,
        signals: Vec<SignalTrigger>,
    ) {
        let now_ts = event.timestamp_ms / 1000;
        let campaign_id = Self::derive_campaign_id(event);

        if self.is_suppressed(&campaign_id, now_ts) {
            return;
        }

        let severity = Self::map_severity(decision, risk);
        let entity = event.ip_address.clone();

        let payload = AlertPayload {
            alert_type: "AUTH_ABUSE".to_string(),
            severity,
            decision: decision_name(decision).to_string(),
            entity,
            username: event.username.clone(),
            ip_address: event.ip_address.clone(),
            endpoint: event.endpoint.as_wire_str().to_string(),
            risk_score: (risk * 100.0).round() / 100.0,
            signals,
            timestamp: Utc::now().to_rfc3339(),
            source: "AbuseGuard".to_string(),
            campaign: Some(CampaignRef {
                id: campaign_id.clone(),
                kind: entity_type_name(event),
            }),
        };

        if let Err(err) = self.send(&payload).await {
            warn!(error = %err, "alert webhook delivery failed");
        }

        self.last_alerts.insert(campaign_id, now_ts);
    }

    async fn send(&self, payload: &AlertPayload) -> Result<(), reqwest::Error> {
        self.client
            .post(&self.webhook_url)
            .json(payload)
            .timeout(std::time::Duration::from_secs(2))
            .send()
            .await?;
        Ok(())
    }
}

fn decision_name(decision: Decision) -> &'static str {
    match decision {
        Decision::Allow => "ALLOW",
        Decision::Monitor => "MONITOR",
        Decision::Challenge => "CHALLENGE",
        Decision::Block => "BLOCK",
    }
}

fn entity_type_name(event: &AuthEvent) -> String {
    if event.username.is_some() {
        "USER".to_string()
    } else {
        "IP".to_string()
    }
}
