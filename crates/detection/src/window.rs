//! Per-key sliding time windows over event timestamps.
//!
//! Eviction happens on touch (both `add` and `count` evict before returning);
//! there is no background sweep. The key set never shrinks on its own — see
//! the crate-level notes on cold-key memory growth.

use dashmap::DashMap;
use std::collections::VecDeque;

pub struct SlidingWindow {
    window_size_ms: i64,
    store: DashMap<String, VecDeque<i64>>,
}

impl SlidingWindow {
    pub fn new(window_size_ms: i64) -> Self {
        Self {
            window_size_ms,
            store: DashMap::new(),
        }
    }

    /// Appends `ts` under `key` and evicts entries that have fallen out of the window.
    pub fn add(&self, key: &str, ts: i64) {
        let mut entry = self.store.entry(key.to_string()).or_default();
        entry.push_back(ts);
        evict(&mut entry, ts, self.window_size_ms);
    }

    /// Returns the number of timestamps currently retained for `key`, evicting first.
    pub fn count(&self, key: &str, now: i64) -> usize {
        match self.store.get_mut(key) {
            Some(mut entry) => {
                evict(&mut entry, now, self.window_size_ms);
                entry.len()
            }
            None => 0,
        }
    }

    /// Returns the keys currently tracked, for composite-key prefix scans.
    pub fn keys(&self) -> Vec<String> {
        self.store.iter().map(|e| e.key().clone()).collect()
    }

    /// Evicts stale entries under `key` without reading the resulting count.
    pub fn evict(&self, key: &str, now: i64) {
        if let Some(mut entry) = self.store.get_mut(key) {
            evict(&mut entry, now, self.window_size_ms);
        }
    }
}

fn evict(window: &mut VecDeque<i64>, current_time: i64, window_size_ms: i64) {
    let cutoff = current_time - window_size_ms;
    while matches!(window.front(), Some(&front) if front < cutoff) {
        window.pop_front();
    }
}
