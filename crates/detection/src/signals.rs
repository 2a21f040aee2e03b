//! Detectors: pure functions over windowed state plus the incoming event.
//!
//! Detectors never touch the risk engine; the processor decides whether a
//! trigger actually adds score (subject to the dedup gate).

use crate::event::{AuthEvent, Outcome};
use crate::window::SlidingWindow;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EntityType {
    Ip,
    User,
}

#[derive(Debug, Clone, Serialize)]
pub struct SignalTrigger {
    pub signal_id: String,
    pub entity: String,
    pub entity_type: EntityType,
    pub score: f64,
    pub confidence: f64,
    pub tags: Vec<String>,
    pub reason: String,
}

/// `failed_login_velocity`: fires when a single IP accumulates `threshold`
/// failed logins within the window.
pub fn failed_login_velocity(
    event: &AuthEvent,
    window: &SlidingWindow,
    threshold: f64,
) -> Option<SignalTrigger> {
    if event.outcome != Outcome::Failure {
        return None;
    }

    let ip = event.ip_entity().to_string();
    window.add(&ip, event.timestamp_ms);
    let count = window.count(&ip, event.timestamp_ms);

    if (count as f64) < threshold {
        return None;
    }

    Some(SignalTrigger {
        signal_id: "failed_login_velocity".to_string(),
        entity: ip,
        entity_type: EntityType::Ip,
        score: 30.0,
        confidence: (count as f64 / threshold).min(1.0),
        tags: vec!["brute_force".to_string()],
        reason: format!("{} failed logins within window (threshold {})", count, threshold),
    })
}

/// `ip_fan_out`: fires when a single IP is observed against `threshold` or more distinct usernames.
pub fn ip_fan_out(
    event: &AuthEvent,
    window: &SlidingWindow,
    threshold: f64,
) -> Option<SignalTrigger> {
    let username = event.user_entity()?;
    let ip = event.ip_entity();
    let key = format!("{}:{}", ip, username);
    window.add(&key, event.timestamp_ms);

    let prefix = format!("{}:", ip);
    let distinct_usernames = window
        .keys()
        .into_iter()
        .filter(|k| k.starts_with(&prefix) && window.count(k, event.timestamp_ms) > 0)
        .count();

    if (distinct_usernames as f64) < threshold {
        return None;
    }

    Some(SignalTrigger {
        signal_id: "ip_fan_out".to_string(),
        entity: ip.to_string(),
        entity_type: EntityType::Ip,
        score: 40.0,
        confidence: (distinct_usernames as f64 / threshold).min(1.0),
        tags: vec!["credential_stuffing".to_string()],
        reason: format!(
            "{} distinct usernames from this IP within window (threshold {})",
            distinct_usernames, threshold
        ),
    })
}

/// `user_fan_in`: fires when a single username is observed from `threshold` or more distinct IPs.
pub fn user_fan_in(
    event: &AuthEvent,
    window: &SlidingWindow,
    threshold: f64,
) -> Option<SignalTrigger> {
    let username = event.user_entity()?;
    let ip = event.ip_entity();
    let key = format!("{}:{}", username, ip);
    window.add(&key, event.timestamp_ms);

    let prefix = format!("{}:", username);
    let distinct_ips = window
        .keys()
        .into_iter()
        .filter(|k| k.starts_with(&prefix) && window.count(k, event.timestamp_ms) > 0)
        .count();

    if (distinct_ips as f64) < threshold {
        return None;
    }

    Some(SignalTrigger {
        signal_id: "user_fan_in".to_string(),
        entity: username.to_string(),
        entity_type: EntityType::User,
        score: 35.0,
        confidence: (distinct_ips as f64 / threshold).min(1.0),
        tags: vec!["account_takeover".to_string()],
        reason: format!(
            "{} distinct IPs for this user within window (threshold {})",
            distinct_ips, threshold
        ),
    })
}
