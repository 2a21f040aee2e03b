//! Decision engine: pure threshold mapping from effective risk to a decision.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Decision {
    Allow,
    Monitor,
    Challenge,
    Block,
}

#[derive(Debug, Clone, Serialize)]
pub struct DecisionOutcome {
    pub decision: Decision,
    pub reason: String,
}

pub struct DecisionPolicy {
    pub block_threshold: f64,
    pub challenge_threshold: f64,
    pub monitor_threshold: f64,
}

impl DecisionPolicy {
    pub fn new(block_threshold: f64, challenge_threshold: f64, monitor_threshold: f64) -> Self {
        Self {
            block_threshold,
            challenge_threshold,
            monitor_threshold,
        }
    }

    pub fn decide(&self, risk: f64) -> DecisionOutcome {
        if risk >= self.block_threshold {
            DecisionOutcome {
                decision: Decision::Block,
                reason: format!("risk {} >= block threshold {}", risk, self.block_threshold),
            }
        } else if risk >= self.challenge_threshold {
            DecisionOutcome {
                decision: Decision::Challenge,
                reason: format!(
                    "risk {} >= challenge threshold {}",
                    risk, self.challenge_threshold
                ),
            }
        } else if risk >= self.monitor_threshold {
            DecisionOutcome {
                decision: Decision::Monitor,
                reason: format!(
                    "risk {} >= monitor threshold {}",
                    risk, self.monitor_threshold
                ),
            }
        } else {
            DecisionOutcome {
                decision: Decision::Allow,
                reason: format!("risk {} below monitor threshold {}", risk, self.monitor_threshold),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> DecisionPolicy {
        DecisionPolicy::new(50.0, 25.0, 10.0)
    }

    #[test]
    fn risk_below_monitor_is_allow() {
        assert_eq!(policy().decide(5.0).decision, Decision::Allow);
    }

    #[test]
    fn risk_at_exact_thresholds() {
        assert_eq!(policy().decide(10.0).decision, Decision::Monitor);
        assert_eq!(policy().decide(25.0).decision, Decision::Challenge);
        assert_eq!(policy().decide(50.0).decision, Decision::Block);
    }

    #[test]
    fn decision_is_monotone_in_risk() {
        let policy = policy();
        let samples = [0.0, 9.0, 10.0, 24.0, 25.0, 49.0, 50.0, 100.0];
        let mut last = Decision::Allow;
        for risk in samples {
            let decision = policy.decide(risk).decision;
            assert!(decision >= last, "decision regressed at risk {}", risk);
            last = decision;
        }
    }
}
