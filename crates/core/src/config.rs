//! Layered configuration loading for the abuse-detection engine.
//!
//! Values are loaded in order of increasing precedence:
//!
//! 1. `config/default.yaml` — base values
//! 2. `config/{ENVIRONMENT}.yaml` — environment-specific overrides
//! 3. Environment variables — runtime overrides (highest precedence)
//!
//! ```rust,no_run
//! use erp_core::Config;
//!
//! let config = Config::load().expect("failed to load configuration");
//! println!("enforcer: {}", config.enforcement.enforcer_url);
//! ```

use config::{ConfigError, Environment, File};
use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub detection: DetectionConfig,
    pub signals: SignalsConfig,
    pub risk_engine: RiskEngineConfig,
    pub decision_policy: DecisionPolicyConfig,
    pub alerting: AlertingConfig,
    pub enforcement: EnforcementConfig,
    pub storage: StorageConfig,
    pub app: AppConfig,
    pub server: ServerConfig,
    pub metrics: MetricsConfig,
}

/// Sliding-window sizes shared by the detectors.
#[derive(Debug, Deserialize, Clone)]
pub struct DetectionConfig {
    pub failed_login_window_sec: u64,
    pub ip_fan_out_window_sec: u64,
    pub user_fan_in_window_sec: u64,
}

/// Per-detector enable flag and trigger threshold, mutable at runtime via the rules admin API.
/// These are the defaults loaded into the process-wide `RulesTable` at startup.
#[derive(Debug, Deserialize, Clone)]
pub struct SignalsConfig {
    pub failed_login_velocity: RuleDefault,
    pub ip_fan_out: RuleDefault,
    pub user_fan_in: RuleDefault,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RuleDefault {
    pub enabled: bool,
    pub threshold: f64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RiskEngineConfig {
    pub half_life_sec: f64,
    pub max_risk: f64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DecisionPolicyConfig {
    pub block_threshold: f64,
    pub challenge_threshold: f64,
    pub monitor_threshold: f64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AlertingConfig {
    pub suppression_window_sec: u64,
    pub webhook_url: String,
}

/// Local filesystem / database locations for the durable stores. All are
/// relative to the process working directory by default.
#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    pub database_url: String,
    pub block_store_path: String,
    pub campaign_store_path: String,
    pub settings_store_path: String,
    pub replay_guard_ttl_sec: i64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EnforcementConfig {
    /// Base URL of the external enforcer; `POST {enforcer_url}/enforce`.
    pub enforcer_url: String,
    pub timeout_ms: u64,
    /// `fail_open` allows traffic through when the enforcer is unreachable; `fail_closed` blocks it.
    pub mode: String,
    pub block_ttl_seconds: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub environment: String,
    pub log_level: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub port: u16,
    pub path: String,
    pub namespace: String,
}

impl Config {
    /// Loads configuration from `config/default.yaml`, `config/{ENVIRONMENT}.yaml`, and
    /// environment variables, then validates it and fails fast on misconfiguration.
    ///
    /// `ENVIRONMENT` defaults to `development` if unset. `ENFORCER_URL` overrides
    /// `enforcement.enforcer_url` directly.
    pub fn load() -> Result<Self, ConfigError> {
        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

        let mut builder = config::Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            .add_source(Environment::with_prefix("").separator("_"));

        // `Environment::with_prefix("").separator("_")` maps `FOO_BAR` to the
        // path `foo.bar`, so it cannot express an override of a key that is
        // itself an underscored word (`enforcement.enforcer_url`). Bind the
        // one documented flat override explicitly instead.
        if let Ok(enforcer_url) = env::var("ENFORCER_URL") {
            builder = builder.set_override("enforcement.enforcer_url", enforcer_url)?;
        }

        let config = builder.build()?;
        let loaded_config: Config = config.try_deserialize()?;

        loaded_config.validate()?;

        Ok(loaded_config)
    }

    /// Fail-fast validation mirroring the original loader's `_validate_config`: a missing
    /// section, a non-positive `max_risk`, or an inverted threshold ordering refuses startup
    /// rather than running with nonsensical policy.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.risk_engine.max_risk <= 0.0 {
            return Err(ConfigError::Message(
                "risk_engine.max_risk must be positive".to_string(),
            ));
        }

        if self.risk_engine.half_life_sec <= 0.0 {
            return Err(ConfigError::Message(
                "risk_engine.half_life_sec must be positive".to_string(),
            ));
        }

        let policy = &self.decision_policy;
        if !(policy.block_threshold > policy.challenge_threshold
            && policy.challenge_threshold > policy.monitor_threshold
            && policy.monitor_threshold >= 0.0)
        {
            return Err(ConfigError::Message(
                "decision_policy thresholds must satisfy block > challenge > monitor >= 0"
                    .to_string(),
            ));
        }

        if self.enforcement.mode != "fail_open" && self.enforcement.mode != "fail_closed" {
            return Err(ConfigError::Message(format!(
                "enforcement.mode must be 'fail_open' or 'fail_closed', got '{}'",
                self.enforcement.mode
            )));
        }

        if self.enforcement.timeout_ms == 0 {
            return Err(ConfigError::Message(
                "enforcement.timeout_ms must be positive".to_string(),
            ));
        }

        if self.enforcement.enforcer_url.is_empty() {
            return Err(ConfigError::Message(
                "enforcement.enforcer_url must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> Config {
        Config {
            detection: DetectionConfig {
                failed_login_window_sec: 60,
                ip_fan_out_window_sec: 60,
                user_fan_in_window_sec: 60,
            },
            signals: SignalsConfig {
                failed_login_velocity: RuleDefault {
                    enabled: true,
                    threshold: 5.0,
                },
                ip_fan_out: RuleDefault {
                    enabled: true,
                    threshold: 4.0,
                },
                user_fan_in: RuleDefault {
                    enabled: true,
                    threshold: 3.0,
                },
            },
            risk_engine: RiskEngineConfig {
                half_life_sec: 300.0,
                max_risk: 100.0,
            },
            decision_policy: DecisionPolicyConfig {
                block_threshold: 50.0,
                challenge_threshold: 25.0,
                monitor_threshold: 10.0,
            },
            alerting: AlertingConfig {
                suppression_window_sec: 300,
                webhook_url: "http://localhost:9200/webhook".to_string(),
            },
            enforcement: EnforcementConfig {
                enforcer_url: "http://localhost:9100".to_string(),
                timeout_ms: 1000,
                mode: "fail_open".to_string(),
                block_ttl_seconds: 300,
            },
            storage: StorageConfig {
                database_url: "sqlite://data/events.db".to_string(),
                block_store_path: "data/blocks.json".to_string(),
                campaign_store_path: "data/campaigns.json".to_string(),
                settings_store_path: "data/settings.json".to_string(),
                replay_guard_ttl_sec: 300,
            },
            app: AppConfig {
                environment: "testing".to_string(),
                log_level: "info".to_string(),
            },
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
            },
            metrics: MetricsConfig {
                enabled: true,
                port: 9000,
                path: "/metrics".to_string(),
                namespace: "abuseguard".to_string(),
            },
        }
    }

    #[test]
    fn rejects_non_positive_max_risk() {
        let mut config = base_config();
        config.risk_engine.max_risk = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_inverted_thresholds() {
        let mut config = base_config();
        config.decision_policy.monitor_threshold = 60.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_unknown_enforcement_mode() {
        let mut config = base_config();
        config.enforcement.mode = "sideways".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn accepts_well_formed_config() {
        assert!(base_config().validate().is_ok());
    }
}
