//! Process-wide rules table: enable/disable and threshold per detector.
//!
//! A single shared instance is read by the processor on the hot path and
//! mutated by the admin API; reads are far more frequent than writes.

use dashmap::DashMap;
use erp_core::config::SignalsConfig;
use serde::Serialize;

#[derive(Debug, Clone, Copy, Serialize)]
pub struct Rule {
    pub enabled: bool,
    pub threshold: f64,
}

pub struct RulesTable {
    rules: DashMap<String, Rule>,
}

impl RulesTable {
    pub fn from_config(config: &SignalsConfig) -> Self {
        let rules = DashMap::new();
        rules.insert(
            "failed_login_velocity".to_string(),
            Rule {
                enabled: config.failed_login_velocity.enabled,
                threshold: config.failed_login_velocity.threshold,
            },
        );
        rules.insert(
            "ip_fan_out".to_string(),
            Rule {
                enabled: config.ip_fan_out.enabled,
                threshold: config.ip_fan_out.threshold,
            },
        );
        rules.insert(
            "user_fan_in".to_string(),
            Rule {
                enabled: config.user_fan_in.enabled,
                threshold: config.user_fan_in.threshold,
            },
        );
        Self { rules }
    }

    pub fn get_all(&self) -> Vec<(String, Rule)> {
        self.rules.iter().map(|e| (e.key().clone(), *e.value())).collect()
    }

    pub fn exists(&self, rule_id: &str) -> bool {
        self.rules.contains_key(rule_id)
    }

    pub fn is_enabled(&self, rule_id: &str) -> bool {
        self.rules.get(rule_id).map(|r| r.enabled).unwrap_or(false)
    }

    pub fn get_threshold(&self, rule_id: &str) -> f64 {
        self.rules.get(rule_id).map(|r| r.threshold).unwrap_or(0.0)
    }

    pub fn enable(&self, rule_id: &str) {
        if let Some(mut rule) = self.rules.get_mut(rule_id) {
            rule.enabled = true;
        }
    }

    pub fn disable(&self, rule_id: &str) {
        if let Some(mut rule) = self.rules.get_mut(rule_id) {
            rule.enabled = false;
        }
    }

    pub fn update_threshold(&self, rule_id: &str, value: f64) {
        if let Some(mut rule) = self.rules.get_mut(rule_id) {
            rule.threshold = value;
        }
    }
}
