//! End-to-end scenarios exercising the full processing pipeline through a
//! live [`Application`]: detectors, risk accumulation, decision policy, the
//! enforcement bridge, and the durable stores, wired together the way the
//! HTTP ingest handler wires them in production.

use abuseguard_detection::{process_event, Application, Decision, Endpoint, FailureReason, Method, Outcome, RawAuthEvent};
use axum::{routing::post, Json, Router};
use erp_core::config::{
    AlertingConfig, AppConfig, Config, DecisionPolicyConfig, DetectionConfig, EnforcementConfig,
    MetricsConfig, RiskEngineConfig, RuleDefault, ServerConfig, SignalsConfig, StorageConfig,
};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;

static COUNTER: AtomicU64 = AtomicU64::new(0);

fn temp_path(label: &str) -> String {
    let id = COUNTER.fetch_add(1, Ordering::Relaxed);
    std::env::temp_dir()
        .join(format!("abuseguard-scenario-{}-{}", label, id))
        .to_string_lossy()
        .into_owned()
}

fn test_config(enforcer_url: &str) -> Config {
    let suffix = COUNTER.fetch_add(1, Ordering::Relaxed);
    Config {
        detection: DetectionConfig {
            failed_login_window_sec: 60,
            ip_fan_out_window_sec: 60,
            user_fan_in_window_sec: 60,
        },
        signals: SignalsConfig {
            failed_login_velocity: RuleDefault { enabled: true, threshold: 5.0 },
            ip_fan_out: RuleDefault { enabled: true, threshold: 4.0 },
            user_fan_in: RuleDefault { enabled: true, threshold: 3.0 },
        },
        risk_engine: RiskEngineConfig { half_life_sec: 300.0, max_risk: 100.0 },
        decision_policy: DecisionPolicyConfig {
            block_threshold: 50.0,
            challenge_threshold: 25.0,
            monitor_threshold: 10.0,
        },
        alerting: AlertingConfig {
            suppression_window_sec: 300,
            webhook_url: format!("http://127.0.0.1:1/webhook-{}", suffix),
        },
        enforcement: EnforcementConfig {
            enforcer_url: enforcer_url.to_string(),
            timeout_ms: 300,
            mode: "fail_open".to_string(),
            block_ttl_seconds: 300,
        },
        storage: StorageConfig {
            database_url: format!("sqlite://{}.db?mode=rwc", temp_path("events")),
            block_store_path: temp_path("blocks").to_string() + ".json",
            campaign_store_path: temp_path("campaigns").to_string() + ".json",
            settings_store_path: temp_path("settings").to_string() + ".json",
            replay_guard_ttl_sec: 300,
        },
        app: AppConfig { environment: "testing".to_string(), log_level: "info".to_string() },
        server: ServerConfig { host: "127.0.0.1".to_string(), port: 0 },
        metrics: MetricsConfig {
            enabled: false,
            port: 0,
            path: "/metrics".to_string(),
            namespace: "abuseguard_test".to_string(),
        },
    }
}

async fn spawn_mock_enforcer(allowed: bool) -> String {
    let app = Router::new().route(
        "/enforce",
        post(move |Json(_body): Json<Value>| async move {
            Json(serde_json::json!({ "allowed": allowed, "reason": "mock enforcer" }))
        }),
    );
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn raw_login_failure(ip: &str, username: &str, ts: i64) -> RawAuthEvent {
    RawAuthEvent {
        event_id: None,
        timestamp_ms: Some(ts),
        user_id: None,
        username: Some(username.to_string()),
        ip_address: Some(ip.to_string()),
        asn: None,
        country: None,
        user_agent: Some("scenario-harness/1.0".to_string()),
        device_fingerprint: None,
        endpoint: Some(Endpoint::Login),
        method: Some(Method::Post),
        outcome: Some(Outcome::Failure),
        failure_reason: Some(FailureReason::InvalidPassword),
        latency_ms: Some(20),
        ingest_source: Some("scenario-harness".to_string()),
        replay_id: None,
    }
}

#[tokio::test]
async fn brute_force_from_one_ip_challenges_at_fifth_failure() {
    let enforcer_url = spawn_mock_enforcer(true).await;
    let config = test_config(&enforcer_url);
    let app = Arc::new(Application::new(&config).await.unwrap());

    let mut last = None;
    for i in 0..6 {
        let raw = raw_login_failure("10.0.0.201", "admin", 1_700_000_000_000 + i * 100);
        last = Some(process_event(&app, raw).await.unwrap());
    }

    let fifth_and_sixth = last.unwrap();
    assert_eq!(fifth_and_sixth.decision, Decision::Challenge);
    assert_eq!(fifth_and_sixth.risk_score, 30.0);
}

#[tokio::test]
async fn credential_stuffing_fans_out_across_usernames() {
    let enforcer_url = spawn_mock_enforcer(true).await;
    let config = test_config(&enforcer_url);
    let app = Arc::new(Application::new(&config).await.unwrap());

    let usernames = ["alice", "bob", "charlie", "david"];
    let mut last = None;
    for (i, username) in usernames.iter().enumerate() {
        let raw = raw_login_failure("10.0.0.202", username, 1_700_000_000_000 + i as i64 * 100);
        last = Some(process_event(&app, raw).await.unwrap());
    }

    let result = last.unwrap();
    assert_eq!(result.decision, Decision::Challenge);
    assert_eq!(result.risk_score, 40.0);
    assert!(result.signals_triggered.contains(&"ip_fan_out".to_string()));
}

#[tokio::test]
async fn account_takeover_fans_in_across_ips() {
    let enforcer_url = spawn_mock_enforcer(true).await;
    let config = test_config(&enforcer_url);
    let app = Arc::new(Application::new(&config).await.unwrap());

    let ips = ["10.0.0.11", "10.0.0.12", "10.0.0.13"];
    let mut last = None;
    for (i, ip) in ips.iter().enumerate() {
        let raw = raw_login_failure(ip, "jane", 1_700_000_000_000 + i as i64 * 100);
        last = Some(process_event(&app, raw).await.unwrap());
    }

    let result = last.unwrap();
    assert_eq!(result.decision, Decision::Challenge);
    assert_eq!(result.risk_score, 35.0);
    assert!(result.signals_triggered.contains(&"user_fan_in".to_string()));
}

#[tokio::test]
async fn block_with_enforcer_up_appends_active_block() {
    let enforcer_url = spawn_mock_enforcer(true).await;
    let config = test_config(&enforcer_url);
    let app = Arc::new(Application::new(&config).await.unwrap());

    // failed_login_velocity (30) + ip_fan_out (40) on the same IP clears the
    // block threshold of 50.
    for i in 0..5 {
        let raw = raw_login_failure("10.0.0.50", "userA", 1_700_000_000_000 + i * 100);
        process_event(&app, raw).await.unwrap();
    }
    let usernames = ["userB", "userC", "userD"];
    let mut result = None;
    for (i, username) in usernames.iter().enumerate() {
        let raw = raw_login_failure("10.0.0.50", username, 1_700_000_001_000 + i as i64 * 100);
        result = Some(process_event(&app, raw).await.unwrap());
    }

    let result = result.unwrap();
    assert_eq!(result.decision, Decision::Block);
    assert!(result.enforcement_available);
    assert!(app.block_store.is_blocked("10.0.0.50"));
}

#[tokio::test]
async fn block_with_enforcer_down_downgrades_to_challenge_under_fail_open() {
    // Port 1 is reserved and never accepts connections; the client will time out.
    let config = test_config("http://127.0.0.1:1");
    let app = Arc::new(Application::new(&config).await.unwrap());

    for i in 0..5 {
        let raw = raw_login_failure("10.0.0.60", "userA", 1_700_000_000_000 + i * 100);
        process_event(&app, raw).await.unwrap();
    }
    let usernames = ["userB", "userC", "userD"];
    let mut result = None;
    for (i, username) in usernames.iter().enumerate() {
        let raw = raw_login_failure("10.0.0.60", username, 1_700_000_001_000 + i as i64 * 100);
        result = Some(process_event(&app, raw).await.unwrap());
    }

    let result = result.unwrap();
    assert_eq!(result.decision, Decision::Challenge);
    assert!(!result.enforcement_available);
    assert!(!app.block_store.is_blocked("10.0.0.60"));
}

#[tokio::test]
async fn risk_decays_across_two_half_lives() {
    let enforcer_url = spawn_mock_enforcer(true).await;
    let config = test_config(&enforcer_url);
    let app = Arc::new(Application::new(&config).await.unwrap());

    for i in 0..5 {
        let raw = raw_login_failure("10.0.0.70", "admin", 1_700_000_000_000 + i * 100);
        process_event(&app, raw).await.unwrap();
    }

    // half_life_sec = 300, so 600s later is two half-lives: 30 * 0.25 = 7.5.
    let later = raw_login_failure("10.0.0.71", "someone-else", 1_700_000_000_000 + 600 * 1000);
    let risk = app.state.risk_engine.get_risk("10.0.0.70", later.timestamp_ms.unwrap());
    assert!((risk - 7.5).abs() < 1e-6);
}
