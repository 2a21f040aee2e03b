//! Event processor: the single orchestration path from a validated
//! [`AuthEvent`] to a decision.
//!
//! On startup, [`Application::new`] replays every active block to the
//! enforcer (see [`replay_active_blocks`]) before accepting traffic.
//!
//! Steps, in order, under the combined IP + username lock:
//! 1. replay-guard check (idempotent re-ingest)
//! 2. run enabled detectors in a fixed order, gated by the active-signal dedup set
//! 3. read the decayed risk for the IP and username entities, take the max
//! 4. map effective risk to a base decision
//! 5. call the enforcement bridge for BLOCK candidates
//! 6. apply the mode-aware downgrade when enforcement is unavailable
//! 7. persist the event, update the block store, and emit an alert if warranted
//! 8. return the decision alongside per-stage latency telemetry

use crate::alerts::AlertManager;
use crate::block_store::BlockSource;
use crate::block_store::BlockStore;
use crate::campaign_store::CampaignStore;
use crate::decision::{Decision, DecisionPolicy};
use crate::enforcement::EnforcementBridge;
use crate::event::{AuthEvent, RawAuthEvent};
use crate::event_log::EventLog;
use crate::rules::RulesTable;
use crate::settings_store::SettingsStore;
use crate::signals::{self, SignalTrigger};
use crate::state::StateStore;
use erp_core::config::Config;
use erp_core::error::Result;
use erp_core::metrics::DetectionMetrics;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// The risk threshold, independent of decision, above which a CHALLENGE also
/// raises an alert. BLOCK always alerts.
const CHALLENGE_ALERT_RISK_THRESHOLD: f64 = 50.0;

#[derive(Debug, Clone, Serialize)]
pub struct EnforcementTelemetry {
    pub decision_ms: f64,
    pub enforcement_ms: f64,
    pub total_ms: f64,
    pub decision: String,
    pub blocked_at: Option<i64>,
    pub ttl_seconds: u64,
    pub risk_score: f64,
    pub signals: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EnforcementRecord {
    pub allowed: bool,
    pub reason: String,
    pub telemetry: EnforcementTelemetry,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProcessingResult {
    pub decision: Decision,
    pub risk_score: f64,
    pub signals_triggered: Vec<String>,
    pub decision_reason: String,
    pub mode: String,
    pub enforcement_available: bool,
    pub enforcement: EnforcementRecord,
}

/// Holds every shared service the processor needs. Constructed once at
/// startup and handed to request handlers behind an `Arc`.
pub struct Application {
    pub state: StateStore,
    pub rules: RulesTable,
    pub decision_policy: DecisionPolicy,
    pub enforcement: EnforcementBridge,
    pub event_log: EventLog,
    pub block_store: BlockStore,
    pub campaign_store: CampaignStore,
    pub settings_store: SettingsStore,
    pub alerts: AlertManager,
    pub metrics: DetectionMetrics,
    pub enforcement_mode: std::sync::RwLock<String>,
}

impl Application {
    pub async fn new(config: &Config) -> Result<Self> {
        let state = StateStore::new(
            (config.detection.failed_login_window_sec * 1000) as i64,
            (config.detection.ip_fan_out_window_sec * 1000) as i64,
            (config.detection.user_fan_in_window_sec * 1000) as i64,
            config.risk_engine.half_life_sec,
            config.risk_engine.max_risk,
            config.storage.replay_guard_ttl_sec,
        );

        let rules = RulesTable::from_config(&config.signals);
        let decision_policy = DecisionPolicy::new(
            config.decision_policy.block_threshold,
            config.decision_policy.challenge_threshold,
            config.decision_policy.monitor_threshold,
        );
        let enforcement = EnforcementBridge::new(&config.enforcement);
        let event_log = EventLog::connect(&config.storage.database_url).await?;
        let block_store = BlockStore::open(&config.storage.block_store_path)?;
        let campaign_store = CampaignStore::open(&config.storage.campaign_store_path)?;
        let settings_store = SettingsStore::open(&config.storage.settings_store_path)?;
        let alerts = AlertManager::new(
            config.alerting.suppression_window_sec as i64,
            config.alerting.webhook_url.clone(),
        );
        let metrics = DetectionMetrics::new(&config.metrics.namespace)
            .map_err(|err| erp_core::error::Error::internal(err.to_string()))?;

        replay_active_blocks(&block_store, &enforcement).await;

        Ok(Self {
            state,
            rules,
            decision_policy,
            enforcement,
            event_log,
            block_store,
            campaign_store,
            settings_store,
            alerts,
            metrics,
            enforcement_mode: std::sync::RwLock::new(config.enforcement.mode.clone()),
        })
    }

    fn mode(&self) -> String {
        self.enforcement_mode.read().unwrap().clone()
    }

    pub fn set_mode(&self, mode: &str) {
        *self.enforcement_mode.write().unwrap() = mode.to_string();
    }
}

/// Re-asserts every active block against the enforcer on startup, best
/// effort. A freshly (re)started enforcer has no memory of blocks issued
/// before the restart, so without this an entity the store still considers
/// blocked would be let through until its next triggering event.
async fn replay_active_blocks(block_store: &BlockStore, enforcement: &EnforcementBridge) {
    let active = block_store.active_blocks();
    if active.is_empty() {
        return;
    }

    info!(count = active.len(), "replaying active blocks to enforcer");
    for block in active {
        let result = enforcement.enforce(&block.entity, Decision::Block, block.ttl_seconds).await;
        if !result.available {
            warn!(entity = %block.entity, "failed to replay active block to enforcer at startup");
        }
    }
}

/// Runs the full pipeline for a single raw event and returns the outcome.
pub async fn process_event(app: &Arc<Application>, raw: RawAuthEvent) -> Result<ProcessingResult> {
    let event = crate::event::ingest(raw)?;

    let fingerprint = event.replay_id.clone().unwrap_or_else(|| event.event_id.clone());
    let now_ts = event.timestamp_ms / 1000;

    let entity = event.ip_entity().to_string();
    let user_entity = event.user_entity().map(str::to_string);
    let mut lock_keys: Vec<&str> = vec![&entity];
    if let Some(ref username) = user_entity {
        lock_keys.push(username);
    }
    let _guards = app.state.lock_entities(&lock_keys).await;

    if app.state.seen_before(&fingerprint, now_ts) {
        info!(fingerprint = %fingerprint, "duplicate event ignored by replay guard");
        let risk = app.state.risk_engine.get_risk(&entity, event.timestamp_ms);
        let outcome = app.decision_policy.decide(risk);
        return Ok(ProcessingResult {
            decision: outcome.decision,
            risk_score: risk,
            signals_triggered: Vec::new(),
            decision_reason: "duplicate event, returning last known decision".to_string(),
            mode: app.mode(),
            enforcement_available: true,
            enforcement: EnforcementRecord {
                allowed: true,
                reason: "duplicate event, enforcement not re-invoked".to_string(),
                telemetry: EnforcementTelemetry {
                    decision_ms: 0.0,
                    enforcement_ms: 0.0,
                    total_ms: 0.0,
                    decision: decision_wire(outcome.decision).to_string(),
                    blocked_at: None,
                    ttl_seconds: 0,
                    risk_score: risk,
                    signals: Vec::new(),
                },
            },
        });
    }
    app.state.mark_seen(&fingerprint, now_ts);

    let started = Instant::now();
    let mut triggered = Vec::new();
    evaluate_detector(
        app,
        &event,
        "failed_login_velocity",
        &app.state.ip_failure_window,
        signals::failed_login_velocity,
        &mut triggered,
    );
    evaluate_detector(
        app,
        &event,
        "ip_fan_out",
        &app.state.ip_user_window,
        signals::ip_fan_out,
        &mut triggered,
    );
    evaluate_detector(
        app,
        &event,
        "user_fan_in",
        &app.state.user_ip_window,
        signals::user_fan_in,
        &mut triggered,
    );

    let ip_risk = app.state.risk_engine.get_risk(&entity, event.timestamp_ms);
    let user_risk = match event.user_entity() {
        Some(username) => app.state.risk_engine.get_risk(username, event.timestamp_ms),
        None => 0.0,
    };
    let effective_risk = ip_risk.max(user_risk);

    let base = app.decision_policy.decide(effective_risk);
    let decision_elapsed = started.elapsed();
    app.metrics
        .events_processed_total
        .with_label_values(&[event.endpoint.as_wire_str()])
        .inc();

    let block_ttl = if base.decision == Decision::Block { 300 } else { 0 };
    let enforcement_started = Instant::now();
    let enforcement_result = app.enforcement.enforce(&entity, base.decision, block_ttl).await;
    let enforcement_elapsed = enforcement_started.elapsed();

    let (final_decision, reason, enforcement_available) = apply_mode_downgrade(
        base.decision,
        &base.reason,
        &enforcement_result,
        &app.mode(),
    );

    if !enforcement_result.available {
        app.metrics
            .enforcement_failures_total
            .with_label_values(&["unavailable"])
            .inc();
    }

    if final_decision == Decision::Block {
        app.block_store.upsert_block(
            &entity,
            effective_risk,
            300,
            BlockSource::Auto,
            event.timestamp_ms,
        )?;
    }

    let raw_event_json = serde_json::to_string(&event)?;
    let now_ms = chrono::Utc::now().timestamp_millis();
    app.event_log
        .append(
            event.timestamp_ms,
            now_ms,
            &entity,
            event.endpoint.as_wire_str(),
            outcome_wire(&event),
            decision_wire(final_decision),
            effective_risk,
            enforcement_result.allowed,
            Some(enforcement_result.reason.as_str()),
            &raw_event_json,
        )
        .await?;

    app.metrics
        .decisions_total
        .with_label_values(&[decision_wire(final_decision)])
        .inc();
    let total_elapsed = started.elapsed();
    app.metrics
        .processing_duration_seconds
        .with_label_values(&[decision_wire(final_decision)])
        .observe(total_elapsed.as_secs_f64());

    let primary_vector = triggered.first().map(|t| t.tags.clone()).unwrap_or_default();
    if let Some(primary) = triggered.first() {
        let campaign_id = campaign_id_for(&event);
        if let Err(err) = app.campaign_store.upsert(
            &campaign_id,
            primary_vector.first().map(String::as_str).unwrap_or("unknown"),
            &entity,
            &primary.signal_id,
            effective_risk,
            event.timestamp_ms,
            decision_wire(final_decision),
        ) {
            warn!(error = %err, "campaign store update failed");
        }
    }

    if final_decision == Decision::Block
        || (final_decision == Decision::Challenge && effective_risk >= CHALLENGE_ALERT_RISK_THRESHOLD)
    {
        app.alerts
            .emit(&event, final_decision, effective_risk, triggered.clone())
            .await;
    }

    let signal_ids: Vec<String> = triggered.iter().map(|t| t.signal_id.clone()).collect();

    Ok(ProcessingResult {
        decision: final_decision,
        risk_score: effective_risk,
        signals_triggered: signal_ids.clone(),
        decision_reason: reason,
        mode: app.mode(),
        enforcement_available,
        enforcement: EnforcementRecord {
            allowed: enforcement_result.allowed,
            reason: enforcement_result.reason.clone(),
            telemetry: EnforcementTelemetry {
                decision_ms: decision_elapsed.as_secs_f64() * 1000.0,
                enforcement_ms: enforcement_elapsed.as_secs_f64() * 1000.0,
                total_ms: total_elapsed.as_secs_f64() * 1000.0,
                decision: decision_wire(final_decision).to_string(),
                blocked_at: (final_decision == Decision::Block).then_some(event.timestamp_ms),
                ttl_seconds: block_ttl,
                risk_score: effective_risk,
                signals: signal_ids,
            },
        },
    })
}

fn evaluate_detector(
    app: &Application,
    event: &AuthEvent,
    signal_id: &str,
    window: &crate::window::SlidingWindow,
    detector: impl Fn(&AuthEvent, &crate::window::SlidingWindow, f64) -> Option<SignalTrigger>,
    triggered: &mut Vec<SignalTrigger>,
) {
    if !app.rules.is_enabled(signal_id) {
        return;
    }
    let threshold = app.rules.get_threshold(signal_id);
    let Some(trigger) = detector(event, window, threshold) else {
        return;
    };

    app.metrics
        .signals_triggered_total
        .with_label_values(&[&trigger.signal_id])
        .inc();

    if app.state.is_signal_active(&trigger.signal_id, &trigger.entity) {
        triggered.push(trigger);
        return;
    }

    app.state.mark_signal_active(&trigger.signal_id, &trigger.entity);
    app.state
        .risk_engine
        .add_signal(&trigger.entity, trigger.score, event.timestamp_ms);
    triggered.push(trigger);
}

/// BLOCK survives unchanged under `fail_closed`; under `fail_open` a BLOCK
/// whose enforcement call failed downgrades to CHALLENGE so traffic is not
/// silently let through without at least a step-up challenge.
fn apply_mode_downgrade(
    decision: Decision,
    reason: &str,
    enforcement: &crate::enforcement::EnforcementResult,
    mode: &str,
) -> (Decision, String, bool) {
    if decision != Decision::Block || enforcement.available {
        return (decision, reason.to_string(), enforcement.available);
    }

    if mode == "fail_closed" {
        (
            Decision::Block,
            format!("{} (enforcement unavailable, fail_closed retains BLOCK)", reason),
            false,
        )
    } else {
        (
            Decision::Challenge,
            format!("{} (enforcement unavailable, fail_open downgrades to CHALLENGE)", reason),
            false,
        )
    }
}

fn campaign_id_for(event: &AuthEvent) -> String {
    match &event.username {
        Some(username) => format!("USER::{}", username),
        None => format!("IP::{}", event.ip_address),
    }
}

fn outcome_wire(event: &AuthEvent) -> &'static str {
    match event.outcome {
        crate::event::Outcome::Success => "SUCCESS",
        crate::event::Outcome::Failure => "FAILURE",
    }
}

fn decision_wire(decision: Decision) -> &'static str {
    match decision {
        Decision::Allow => "ALLOW",
        Decision::Monitor => "MONITOR",
        Decision::Challenge => "CHALLENGE",
        Decision::Block => "BLOCK",
    }
}
