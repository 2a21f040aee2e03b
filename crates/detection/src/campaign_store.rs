//! Durable, file-backed aggregation of alert activity into named campaigns.
//!
//! Not part of the core detection pipeline — an alert-dashboard supplement
//! grounded in the original's `storage/campaign_store.py` — but cheap to
//! keep, since the decision/signal data needed to populate it is already
//! produced by the processor.

use erp_core::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::RwLock;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DecisionCounts {
    #[serde(rename = "ALLOW")]
    pub allow: u64,
    #[serde(rename = "MONITOR")]
    pub monitor: u64,
    #[serde(rename = "CHALLENGE")]
    pub challenge: u64,
    #[serde(rename = "BLOCK")]
    pub block: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Campaign {
    pub id: String,
    pub campaign_id: String,
    pub primary_vector: String,
    pub start: i64,
    pub last_seen: i64,
    pub events: u64,
    pub entities: Vec<String>,
    pub signals: HashMap<String, u64>,
    pub risk: f64,
    pub risk_score: f64,
    pub decisions: DecisionCounts,
    pub state: String,
}

pub struct CampaignStore {
    path: PathBuf,
    campaigns: RwLock<HashMap<String, Campaign>>,
}

impl CampaignStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let campaigns = if path.exists() {
            let raw = std::fs::read_to_string(&path)?;
            serde_json::from_str(&raw).unwrap_or_default()
        } else {
            HashMap::new()
        };

        Ok(Self {
            path,
            campaigns: RwLock::new(campaigns),
        })
    }

    fn persist(&self) -> Result<()> {
        let campaigns = self.campaigns.read().unwrap();
        let raw = serde_json::to_string_pretty(&*campaigns)?;
        std::fs::write(&self.path, raw)?;
        Ok(())
    }

    /// Timestamps past the millisecond era boundary are normalized to seconds,
    /// matching the dashboard's expectation.
    fn normalize_ts(ts: i64) -> i64 {
        if ts > 10_000_000_000 {
            ts / 1000
        } else {
            ts
        }
    }

    pub fn upsert(
        &self,
        campaign_id: &str,
        campaign_type: &str,
        entity: &str,
        signal_id: &str,
        risk_score: f64,
        timestamp: i64,
        decision: &str,
    ) -> Result<()> {
        let ts = Self::normalize_ts(timestamp);
        let mut campaigns = self.campaigns.write().unwrap();

        let campaign = campaigns.entry(campaign_id.to_string()).or_insert_with(|| Campaign {
            id: campaign_id.to_string(),
            campaign_id: campaign_id.to_string(),
            primary_vector: campaign_type.to_string(),
            start: ts,
            last_seen: ts,
            events: 0,
            entities: Vec::new(),
            signals: HashMap::new(),
            risk: 0.0,
            risk_score: 0.0,
            decisions: DecisionCounts::default(),
            state: "ACTIVE".to_string(),
        });

        campaign.last_seen = ts;
        campaign.events += 1;
        campaign.risk = campaign.risk.max(risk_score);
        campaign.risk_score = campaign.risk;

        if !campaign.entities.iter().any(|e| e == entity) {
            campaign.entities.push(entity.to_string());
        }

        *campaign.signals.entry(signal_id.to_string()).or_insert(0) += 1;

        match decision {
            "ALLOW" => campaign.decisions.allow += 1,
            "MONITOR" => campaign.decisions.monitor += 1,
            "CHALLENGE" => campaign.decisions.challenge += 1,
            "BLOCK" => campaign.decisions.block += 1,
            _ => {}
        }

        drop(campaigns);
        self.persist()
    }

    pub fn list(&self) -> Vec<Campaign> {
        self.campaigns.read().unwrap().values().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};

    static COUNTER: AtomicU64 = AtomicU64::new(0);

    fn temp_path() -> std::path::PathBuf {
        let id = COUNTER.fetch_add(1, Ordering::Relaxed);
        std::env::temp_dir().join(format!("abuseguard-campaign-store-test-{}.json", id))
    }

    #[test]
    fn upsert_creates_and_accumulates() {
        let path = temp_path();
        let store = CampaignStore::open(&path).unwrap();
        store
            .upsert("IP::1.2.3.4", "brute_force", "1.2.3.4", "failed_login_velocity", 30.0, 0, "CHALLENGE")
            .unwrap();
        store
            .upsert("IP::1.2.3.4", "brute_force", "1.2.3.4", "failed_login_velocity", 30.0, 100, "CHALLENGE")
            .unwrap();

        let campaigns = store.list();
        assert_eq!(campaigns.len(), 1);
        assert_eq!(campaigns[0].events, 2);
        assert_eq!(campaigns[0].decisions.challenge, 2);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn risk_tracks_the_maximum_observed() {
        let path = temp_path();
        let store = CampaignStore::open(&path).unwrap();
        store.upsert("IP::1.2.3.4", "v", "1.2.3.4", "s", 30.0, 0, "CHALLENGE").unwrap();
        store.upsert("IP::1.2.3.4", "v", "1.2.3.4", "s", 10.0, 0, "CHALLENGE").unwrap();

        assert_eq!(store.list()[0].risk, 30.0);
        let _ = std::fs::remove_file(&path);
    }
}
