//! Durable, file-backed registry of active blocks.
//!
//! A JSON array on local disk, fully rewritten on every mutation — simple
//! and deterministic at the scale this engine operates at. On service start,
//! all active entries are replayed to the enforcer as best-effort BLOCKs
//! (failures logged and ignored: fail-open startup, see
//! [`BlockStore::active_blocks`] and `processor::replay_active_blocks`).

use erp_core::error::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::RwLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockSource {
    Auto,
    Manual,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockRecord {
    pub id: String,
    pub entity: String,
    pub scope: String,
    pub decision: String,
    pub risk: f64,
    pub ttl_seconds: u64,
    pub active: bool,
    pub source: BlockSource,
    pub created_at_ms: i64,
}

pub struct BlockStore {
    path: PathBuf,
    records: RwLock<Vec<BlockRecord>>,
}

impl BlockStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let records = if path.exists() {
            let raw = std::fs::read_to_string(&path)?;
            serde_json::from_str(&raw).unwrap_or_default()
        } else {
            Vec::new()
        };

        let store = Self {
            path,
            records: RwLock::new(records),
        };
        store.persist()?;
        Ok(store)
    }

    fn persist(&self) -> Result<()> {
        let records = self.records.read().unwrap();
        let raw = serde_json::to_string_pretty(&*records)?;
        std::fs::write(&self.path, raw)?;
        Ok(())
    }

    /// Upserts a BLOCK for `entity`: if no active record exists, appends a new
    /// one with `id = "{source}::{entity}"`.
    pub fn upsert_block(
        &self,
        entity: &str,
        risk: f64,
        ttl_seconds: u64,
        source: BlockSource,
        created_at_ms: i64,
    ) -> Result<()> {
        let mut records = self.records.write().unwrap();
        let has_active = records.iter().any(|r| r.entity == entity && r.active);
        if !has_active {
            let prefix = match source {
                BlockSource::Auto => "auto",
                BlockSource::Manual => "manual",
            };
            records.push(BlockRecord {
                id: format!("{}::{}", prefix, entity),
                entity: entity.to_string(),
                scope: "auth".to_string(),
                decision: "HARD_BLOCK".to_string(),
                risk,
                ttl_seconds,
                active: true,
                source,
                created_at_ms,
            });
        }
        drop(records);
        self.persist()
    }

    /// Flips the active record for `entity` to inactive. A no-op if already inactive.
    pub fn unblock(&self, entity: &str) -> Result<()> {
        let mut records = self.records.write().unwrap();
        let mut changed = false;
        for record in records.iter_mut() {
            if record.entity == entity && record.active {
                record.active = false;
                changed = true;
            }
        }
        drop(records);
        if changed {
            self.persist()?;
        }
        Ok(())
    }

    pub fn is_blocked(&self, entity: &str) -> bool {
        self.records
            .read()
            .unwrap()
            .iter()
            .any(|r| r.entity == entity && r.active)
    }

    pub fn all(&self) -> Vec<BlockRecord> {
        self.records.read().unwrap().clone()
    }

    pub fn active_blocks(&self) -> Vec<BlockRecord> {
        self.records
            .read()
            .unwrap()
            .iter()
            .filter(|r| r.active)
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile_path::temp_path;

    mod tempfile_path {
        use std::path::PathBuf;
        use std::sync::atomic::{AtomicU64, Ordering};

        static COUNTER: AtomicU64 = AtomicU64::new(0);

        pub fn temp_path() -> PathBuf {
            let id = COUNTER.fetch_add(1, Ordering::Relaxed);
            std::env::temp_dir().join(format!("abuseguard-block-store-test-{}.json", id))
        }
    }

    #[test]
    fn upsert_then_duplicate_does_not_append() {
        let path = temp_path();
        let store = BlockStore::open(&path).unwrap();
        store.upsert_block("1.2.3.4", 80.0, 300, BlockSource::Auto, 0).unwrap();
        store.upsert_block("1.2.3.4", 95.0, 300, BlockSource::Auto, 100).unwrap();

        assert_eq!(store.active_blocks().len(), 1);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn unblock_flips_active_flag_rather_than_deleting() {
        let path = temp_path();
        let store = BlockStore::open(&path).unwrap();
        store.upsert_block("1.2.3.4", 80.0, 300, BlockSource::Auto, 0).unwrap();
        store.unblock("1.2.3.4").unwrap();

        assert!(!store.is_blocked("1.2.3.4"));
        assert_eq!(store.all().len(), 1);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn unblock_on_inactive_entity_is_idempotent() {
        let path = temp_path();
        let store = BlockStore::open(&path).unwrap();
        store.unblock("never-blocked").unwrap();
        assert!(!store.is_blocked("never-blocked"));
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn manual_block_uses_manual_prefix() {
        let path = temp_path();
        let store = BlockStore::open(&path).unwrap();
        store.upsert_block("5.6.7.8", 100.0, 300, BlockSource::Manual, 0).unwrap();
        let blocks = store.active_blocks();
        assert_eq!(blocks[0].id, "manual::5.6.7.8");
        let _ = std::fs::remove_file(&path);
    }
}
