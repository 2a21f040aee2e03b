use prometheus::{HistogramVec, IntCounterVec, Opts, Registry};

/// Metrics for the abuse-detection pipeline: events processed, decisions
/// handed out, signals triggered per detector, enforcement failures, and
/// end-to-end processing latency.
#[derive(Debug, Clone)]
pub struct DetectionMetrics {
    pub events_processed_total: IntCounterVec,
    pub decisions_total: IntCounterVec,
    pub signals_triggered_total: IntCounterVec,
    pub enforcement_failures_total: IntCounterVec,
    pub processing_duration_seconds: HistogramVec,
}

impl DetectionMetrics {
    pub fn new(namespace: &str) -> Result<Self, prometheus::Error> {
        let events_processed_total = IntCounterVec::new(
            Opts::new(
                format!("{}_events_processed_total", namespace),
                "Total number of auth events processed",
            ),
            &["endpoint"],
        )?;

        let decisions_total = IntCounterVec::new(
            Opts::new(
                format!("{}_decisions_total", namespace),
                "Total number of decisions handed out, by kind",
            ),
            &["decision"],
        )?;

        let signals_triggered_total = IntCounterVec::new(
            Opts::new(
                format!("{}_signals_triggered_total", namespace),
                "Total number of detector triggers, by signal id",
            ),
            &["signal_id"],
        )?;

        let enforcement_failures_total = IntCounterVec::new(
            Opts::new(
                format!("{}_enforcement_failures_total", namespace),
                "Total number of enforcer RPC timeouts or connection failures",
            ),
            &["reason"],
        )?;

        let processing_duration_seconds = HistogramVec::new(
            prometheus::HistogramOpts::new(
                format!("{}_processing_duration_seconds", namespace),
                "End-to-end latency of processing one auth event",
            )
            .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5]),
            &["decision"],
        )?;

        Ok(Self {
            events_processed_total,
            decisions_total,
            signals_triggered_total,
            enforcement_failures_total,
            processing_duration_seconds,
        })
    }

    pub fn register_all(&self, registry: &Registry) -> Result<(), prometheus::Error> {
        registry.register(Box::new(self.events_processed_total.clone()))?;
        registry.register(Box::new(self.decisions_total.clone()))?;
        registry.register(Box::new(self.signals_triggered_total.clone()))?;
        registry.register(Box::new(self.enforcement_failures_total.clone()))?;
        registry.register(Box::new(self.processing_duration_seconds.clone()))?;

        Ok(())
    }
}
