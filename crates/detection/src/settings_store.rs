//! Durable, file-backed runtime settings — the mutable counterpart to the
//! config-file defaults, exposed via the admin `/settings` surface.

use erp_core::error::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::RwLock;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimiterInfo {
    #[serde(rename = "type")]
    pub kind: String,
    pub language: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeSettings {
    pub mode: String,
    pub enforcement_timeout_seconds: u64,
    pub block_ttl_seconds: u64,
    pub rate_limiter: RateLimiterInfo,
}

impl RuntimeSettings {
    fn defaults() -> Self {
        Self {
            mode: "fail-open".to_string(),
            enforcement_timeout_seconds: 1,
            block_ttl_seconds: 300,
            rate_limiter: RateLimiterInfo {
                kind: "token-bucket".to_string(),
                language: "rust".to_string(),
                port: 8081,
            },
        }
    }
}

pub struct SettingsStore {
    path: PathBuf,
    settings: RwLock<RuntimeSettings>,
}

impl SettingsStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let settings = if path.exists() {
            std::fs::read_to_string(&path)
                .ok()
                .and_then(|raw| serde_json::from_str(&raw).ok())
                .unwrap_or_else(RuntimeSettings::defaults)
        } else {
            RuntimeSettings::defaults()
        };

        let store = Self {
            path,
            settings: RwLock::new(settings),
        };
        store.persist()?;
        Ok(store)
    }

    fn persist(&self) -> Result<()> {
        let settings = self.settings.read().unwrap();
        let raw = serde_json::to_string_pretty(&*settings)?;
        std::fs::write(&self.path, raw)?;
        Ok(())
    }

    pub fn get(&self) -> RuntimeSettings {
        self.settings.read().unwrap().clone()
    }

    pub fn set_mode(&self, mode: &str) -> Result<()> {
        self.settings.write().unwrap().mode = mode.to_string();
        self.persist()
    }

    pub fn replace(&self, settings: RuntimeSettings) -> Result<()> {
        *self.settings.write().unwrap() = settings;
        self.persist()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};

    static COUNTER: AtomicU64 = AtomicU64::new(0);

    fn temp_path() -> std::path::PathBuf {
        let id = COUNTER.fetch_add(1, Ordering::Relaxed);
        std::env::temp_dir().join(format!("abuseguard-settings-store-test-{}.json", id))
    }

    #[test]
    fn defaults_are_created_on_first_open() {
        let path = temp_path();
        let store = SettingsStore::open(&path).unwrap();
        assert_eq!(store.get().mode, "fail-open");
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn set_mode_persists_across_reopen() {
        let path = temp_path();
        {
            let store = SettingsStore::open(&path).unwrap();
            store.set_mode("fail-closed").unwrap();
        }
        let reopened = SettingsStore::open(&path).unwrap();
        assert_eq!(reopened.get().mode, "fail-closed");
        let _ = std::fs::remove_file(&path);
    }
}
