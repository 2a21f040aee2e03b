//! Per-entity decaying risk score with a half-life and a hard cap.
//!
//! Exponential decay is the redesigned behavior mandated over the original's
//! simpler linear `decay_rate_per_sec` model — see DESIGN.md.

use dashmap::DashMap;

struct RiskEntry {
    score: f64,
    last_updated_sec: f64,
}

pub struct RiskEngine {
    half_life_sec: f64,
    max_risk: f64,
    entries: DashMap<String, RiskEntry>,
}

impl RiskEngine {
    pub fn new(half_life_sec: f64, max_risk: f64) -> Self {
        Self {
            half_life_sec,
            max_risk,
            entries: DashMap::new(),
        }
    }

    /// Materializes decay up to `ts_ms`, then adds `score` to the entry, capped at `max_risk`.
    pub fn add_signal(&self, key: &str, score: f64, ts_ms: i64) {
        let now_sec = ts_ms as f64 / 1000.0;
        let mut entry = self.entries.entry(key.to_string()).or_insert_with(|| RiskEntry {
            score: 0.0,
            last_updated_sec: now_sec,
        });
        decay(&mut entry, now_sec, self.half_life_sec);
        entry.score = (entry.score + score).min(self.max_risk);
    }

    /// Materializes decay up to `ts_ms` and returns the current score (0 if the key is cold).
    /// This is a read-that-writes: it mutates `last_updated_sec` on the entry.
    pub fn get_risk(&self, key: &str, ts_ms: i64) -> f64 {
        let now_sec = ts_ms as f64 / 1000.0;
        match self.entries.get_mut(key) {
            Some(mut entry) => {
                decay(&mut entry, now_sec, self.half_life_sec);
                entry.score
            }
            None => 0.0,
        }
    }
}

fn decay(entry: &mut RiskEntry, now_sec: f64, half_life_sec: f64) {
    let elapsed = now_sec - entry.last_updated_sec;
    if elapsed > 0.0 {
        entry.score *= 0.5_f64.powf(elapsed / half_life_sec);
        entry.last_updated_sec = now_sec;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cold_key_reads_zero() {
        let engine = RiskEngine::new(300.0, 100.0);
        assert_eq!(engine.get_risk("ip:1", 1_000), 0.0);
    }

    #[test]
    fn add_signal_raises_score() {
        let engine = RiskEngine::new(300.0, 100.0);
        engine.add_signal("ip:1", 30.0, 0);
        assert_eq!(engine.get_risk("ip:1", 0), 30.0);
    }

    #[test]
    fn score_is_capped_at_max_risk() {
        let engine = RiskEngine::new(300.0, 100.0);
        engine.add_signal("ip:1", 80.0, 0);
        engine.add_signal("ip:1", 80.0, 0);
        assert_eq!(engine.get_risk("ip:1", 0), 100.0);
    }

    #[test]
    fn half_life_exact_decay() {
        let engine = RiskEngine::new(300.0, 100.0);
        engine.add_signal("ip:1", 40.0, 0);
        let risk = engine.get_risk("ip:1", 300_000);
        assert!((risk - 20.0).abs() < 1e-9);
    }

    #[test]
    fn two_half_lives_quarter_score() {
        let engine = RiskEngine::new(300.0, 100.0);
        engine.add_signal("ip:1", 40.0, 0);
        let risk = engine.get_risk("ip:1", 600_000);
        assert!((risk - 10.0).abs() < 1e-9);
    }

    #[test]
    fn out_of_order_observation_does_not_rewind() {
        let engine = RiskEngine::new(300.0, 100.0);
        engine.add_signal("ip:1", 40.0, 10_000);
        let before = engine.get_risk("ip:1", 10_000);
        let after_out_of_order = engine.get_risk("ip:1", 5_000);
        assert_eq!(before, after_out_of_order);
    }

    #[test]
    fn decay_is_monotonic_without_new_signals() {
        let engine = RiskEngine::new(300.0, 100.0);
        engine.add_signal("ip:1", 40.0, 0);
        let r0 = engine.get_risk("ip:1", 0);
        let r1 = engine.get_risk("ip:1", 1_000);
        let r2 = engine.get_risk("ip:1", 2_000);
        assert!(r1 <= r0);
        assert!(r2 <= r1);
    }
}
