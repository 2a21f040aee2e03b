//! In-memory state shared by every request: the three detector windows, the
//! risk engine, the active-signal dedup set, and the replay guard. The
//! processor is the sole mutator; concurrent requests for the same entity
//! are serialized via [`StateStore::lock_entity`].

use crate::risk_engine::RiskEngine;
use crate::window::SlidingWindow;
use dashmap::{DashMap, DashSet};
use std::sync::Arc;
use tokio::sync::Mutex;

pub struct StateStore {
    pub ip_failure_window: SlidingWindow,
    pub ip_user_window: SlidingWindow,
    pub user_ip_window: SlidingWindow,
    pub risk_engine: RiskEngine,
    active_signals: DashSet<(String, String)>,
    replay_guard: ReplayGuard,
    entity_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl StateStore {
    pub fn new(
        ip_failure_window_ms: i64,
        ip_fan_out_window_ms: i64,
        user_fan_in_window_ms: i64,
        half_life_sec: f64,
        max_risk: f64,
        replay_ttl_sec: i64,
    ) -> Self {
        Self {
            ip_failure_window: SlidingWindow::new(ip_failure_window_ms),
            ip_user_window: SlidingWindow::new(ip_fan_out_window_ms),
            user_ip_window: SlidingWindow::new(user_fan_in_window_ms),
            risk_engine: RiskEngine::new(half_life_sec, max_risk),
            active_signals: DashSet::new(),
            replay_guard: ReplayGuard::new(replay_ttl_sec),
            entity_locks: DashMap::new(),
        }
    }

    pub fn is_signal_active(&self, signal_id: &str, entity: &str) -> bool {
        self.active_signals
            .contains(&(signal_id.to_string(), entity.to_string()))
    }

    pub fn mark_signal_active(&self, signal_id: &str, entity: &str) {
        self.active_signals
            .insert((signal_id.to_string(), entity.to_string()));
    }

    pub fn clear_signal(&self, signal_id: &str, entity: &str) {
        self.active_signals
            .remove(&(signal_id.to_string(), entity.to_string()));
    }

    pub fn seen_before(&self, fingerprint: &str, now_ts: i64) -> bool {
        self.replay_guard.seen_before(fingerprint, now_ts)
    }

    pub fn mark_seen(&self, fingerprint: &str, now_ts: i64) {
        self.replay_guard.mark_seen(fingerprint, now_ts);
    }

    /// Acquires the per-entity lock serializing detector evaluation, risk
    /// mutation, and decision for a given entity, so that two concurrent
    /// requests for the same entity observe a consistent order.
    pub async fn lock_entity(&self, entity: &str) -> tokio::sync::OwnedMutexGuard<()> {
        let lock = self
            .entity_locks
            .entry(entity.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        lock.lock_owned().await
    }

    /// Acquires locks for every distinct entity in `keys`, in sorted order, so
    /// that two requests sharing any subset of entities (e.g. the same
    /// username fanning in across different IPs) always acquire their shared
    /// locks in the same relative order and never deadlock. The guards must
    /// be held for the duration of detector evaluation and risk mutation.
    pub async fn lock_entities(&self, keys: &[&str]) -> Vec<tokio::sync::OwnedMutexGuard<()>> {
        let mut sorted: Vec<&str> = keys.to_vec();
        sorted.sort_unstable();
        sorted.dedup();

        let mut guards = Vec::with_capacity(sorted.len());
        for key in sorted {
            guards.push(self.lock_entity(key).await);
        }
        guards
    }
}

/// TTL-bounded set of seen event fingerprints, making ingest idempotent
/// under at-least-once delivery from an upstream proxy.
struct ReplayGuard {
    ttl_seconds: i64,
    seen: DashMap<String, i64>,
}

impl ReplayGuard {
    fn new(ttl_seconds: i64) -> Self {
        Self {
            ttl_seconds,
            seen: DashMap::new(),
        }
    }

    fn evict(&self, now_ts: i64) {
        self.seen.retain(|_, ts| *ts >= now_ts - self.ttl_seconds);
    }

    fn seen_before(&self, fingerprint: &str, now_ts: i64) -> bool {
        self.evict(now_ts);
        self.seen.contains_key(fingerprint)
    }

    fn mark_seen(&self, fingerprint: &str, now_ts: i64) {
        self.evict(now_ts);
        self.seen.insert(fingerprint.to_string(), now_ts);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn active_signal_dedup_round_trips() {
        let store = StateStore::new(60_000, 60_000, 60_000, 300.0, 100.0, 300);
        assert!(!store.is_signal_active("failed_login_velocity", "1.2.3.4"));
        store.mark_signal_active("failed_login_velocity", "1.2.3.4");
        assert!(store.is_signal_active("failed_login_velocity", "1.2.3.4"));
        store.clear_signal("failed_login_velocity", "1.2.3.4");
        assert!(!store.is_signal_active("failed_login_velocity", "1.2.3.4"));
    }

    #[test]
    fn replay_guard_flags_duplicate_fingerprint() {
        let store = StateStore::new(60_000, 60_000, 60_000, 300.0, 100.0, 300);
        assert!(!store.seen_before("evt-1", 0));
        store.mark_seen("evt-1", 0);
        assert!(store.seen_before("evt-1", 0));
    }

    #[test]
    fn replay_guard_expires_after_ttl() {
        let store = StateStore::new(60_000, 60_000, 60_000, 300.0, 100.0, 300);
        store.mark_seen("evt-1", 0);
        assert!(!store.seen_before("evt-1", 301));
    }

    #[tokio::test]
    async fn entity_lock_serializes_same_entity() {
        let store = StateStore::new(60_000, 60_000, 60_000, 300.0, 100.0, 300);
        let _guard = store.lock_entity("1.2.3.4").await;
        drop(_guard);
        let _guard2 = store.lock_entity("1.2.3.4").await;
    }

    #[tokio::test]
    async fn lock_entities_dedups_and_acquires_all_distinct_keys() {
        let store = StateStore::new(60_000, 60_000, 60_000, 300.0, 100.0, 300);
        let guards = store.lock_entities(&["1.2.3.4", "jane", "1.2.3.4"]).await;
        assert_eq!(guards.len(), 2);
    }

    #[tokio::test]
    async fn lock_entities_acquires_shared_keys_in_consistent_order() {
        let store = Arc::new(StateStore::new(60_000, 60_000, 60_000, 300.0, 100.0, 300));

        let store_a = store.clone();
        let task_a = tokio::spawn(async move {
            let _guards = store_a.lock_entities(&["1.2.3.4", "jane"]).await;
        });
        let store_b = store.clone();
        let task_b = tokio::spawn(async move {
            let _guards = store_b.lock_entities(&["jane", "5.6.7.8"]).await;
        });

        let (a, b) = tokio::join!(task_a, task_b);
        a.unwrap();
        b.unwrap();
    }
}
