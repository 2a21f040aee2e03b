//! Auth event schema and ingest validation.
//!
//! `ingest` is the single entry point: it turns loosely-typed request input
//! into a frozen [`AuthEvent`], enforcing the field presence and range rules
//! from the data model. Nothing downstream mutates an `AuthEvent` once
//! constructed.

use erp_core::error::{Error, Result};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Endpoint {
    Login,
    Otp,
    PasswordReset,
    TokenRefresh,
}

impl Endpoint {
    pub fn as_wire_str(&self) -> &'static str {
        match self {
            Endpoint::Login => "LOGIN",
            Endpoint::Otp => "OTP",
            Endpoint::PasswordReset => "PASSWORD_RESET",
            Endpoint::TokenRefresh => "TOKEN_REFRESH",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Post,
    Get,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Outcome {
    Success,
    Failure,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureReason {
    InvalidPassword,
    InvalidOtp,
    UserNotFound,
    RateLimited,
    AccountLocked,
}

/// Raw, loosely-typed request input, as received at the ingest boundary.
/// `ingest` is the only place this type is consumed.
#[derive(Debug, Clone, Deserialize)]
pub struct RawAuthEvent {
    pub event_id: Option<String>,
    pub timestamp_ms: Option<i64>,
    pub user_id: Option<String>,
    pub username: Option<String>,
    pub ip_address: Option<String>,
    pub asn: Option<String>,
    pub country: Option<String>,
    pub user_agent: Option<String>,
    pub device_fingerprint: Option<String>,
    pub endpoint: Option<Endpoint>,
    pub method: Option<Method>,
    pub outcome: Option<Outcome>,
    pub failure_reason: Option<FailureReason>,
    pub latency_ms: Option<i64>,
    pub ingest_source: Option<String>,
    pub replay_id: Option<String>,
}

/// A validated, immutable authentication event. Once constructed via
/// [`ingest`], no field is ever mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthEvent {
    pub event_id: String,
    pub timestamp_ms: i64,
    pub user_id: Option<String>,
    pub username: Option<String>,
    pub ip_address: String,
    pub asn: Option<String>,
    pub country: Option<String>,
    pub user_agent: String,
    pub device_fingerprint: Option<String>,
    pub endpoint: Endpoint,
    pub method: Method,
    pub outcome: Outcome,
    pub failure_reason: Option<FailureReason>,
    pub latency_ms: i64,
    pub ingest_source: String,
    pub replay_id: Option<String>,
}

impl AuthEvent {
    /// The per-IP entity key.
    pub fn ip_entity(&self) -> &str {
        &self.ip_address
    }

    /// The per-username entity key, if a username was present on the event.
    pub fn user_entity(&self) -> Option<&str> {
        self.username.as_deref()
    }
}

fn trimmed(s: Option<String>) -> Option<String> {
    s.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Validates and normalizes a [`RawAuthEvent`] into a frozen [`AuthEvent`].
/// Strings are whitespace-trimmed. No side effects.
pub fn ingest(raw: RawAuthEvent) -> Result<AuthEvent> {
    let ip_address = trimmed(raw.ip_address)
        .ok_or_else(|| Error::validation("ip_address is required and must be non-empty"))?;

    let username = trimmed(raw.username);
    let user_id = trimmed(raw.user_id);

    if username.is_none() && ip_address.is_empty() {
        return Err(Error::validation(
            "at least one of username or ip_address must identify the entity",
        ));
    }

    let user_agent = trimmed(raw.user_agent)
        .ok_or_else(|| Error::validation("user_agent is required"))?;

    let endpoint = raw
        .endpoint
        .ok_or_else(|| Error::validation("endpoint is required"))?;
    let method = raw.method.ok_or_else(|| Error::validation("method is required"))?;
    let outcome = raw.outcome.ok_or_else(|| Error::validation("outcome is required"))?;

    let failure_reason = raw.failure_reason;
    match (outcome, failure_reason) {
        (Outcome::Failure, None) => {
            return Err(Error::validation(
                "failure_reason is required when outcome=FAILURE",
            ));
        }
        (Outcome::Success, Some(_)) => {
            return Err(Error::validation(
                "failure_reason must be absent when outcome=SUCCESS",
            ));
        }
        _ => {}
    }

    let timestamp_ms = raw
        .timestamp_ms
        .ok_or_else(|| Error::validation("timestamp_ms is required"))?;
    if timestamp_ms <= 0 {
        return Err(Error::validation("timestamp_ms must be strictly positive"));
    }

    let latency_ms = raw
        .latency_ms
        .ok_or_else(|| Error::validation("latency_ms is required"))?;
    if !(0..=120_000).contains(&latency_ms) {
        return Err(Error::validation("latency_ms must be within [0, 120000]"));
    }

    let ingest_source = trimmed(raw.ingest_source).unwrap_or_else(|| "unknown".to_string());

    let event_id = trimmed(raw.event_id).unwrap_or_else(|| Uuid::new_v4().to_string());

    Ok(AuthEvent {
        event_id,
        timestamp_ms,
        user_id,
        username,
        ip_address,
        asn: trimmed(raw.asn),
        country: trimmed(raw.country),
        user_agent,
        device_fingerprint: trimmed(raw.device_fingerprint),
        endpoint,
        method,
        outcome,
        failure_reason,
        latency_ms,
        ingest_source,
        replay_id: trimmed(raw.replay_id),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_raw() -> RawAuthEvent {
        RawAuthEvent {
            event_id: None,
            timestamp_ms: Some(1_700_000_000_000),
            user_id: None,
            username: Some("admin".to_string()),
            ip_address: Some("10.0.0.1".to_string()),
            asn: None,
            country: None,
            user_agent: Some("curl/8.0".to_string()),
            device_fingerprint: None,
            endpoint: Some(Endpoint::Login),
            method: Some(Method::Post),
            outcome: Some(Outcome::Failure),
            failure_reason: Some(FailureReason::InvalidPassword),
            latency_ms: Some(50),
            ingest_source: Some("gateway".to_string()),
            replay_id: None,
        }
    }

    #[test]
    fn assigns_event_id_when_absent() {
        let event = ingest(base_raw()).unwrap();
        assert!(!event.event_id.is_empty());
    }

    #[test]
    fn rejects_missing_ip() {
        let mut raw = base_raw();
        raw.ip_address = None;
        assert!(ingest(raw).is_err());
    }

    #[test]
    fn rejects_failure_without_reason() {
        let mut raw = base_raw();
        raw.failure_reason = None;
        assert!(ingest(raw).is_err());
    }

    #[test]
    fn rejects_success_with_reason() {
        let mut raw = base_raw();
        raw.outcome = Some(Outcome::Success);
        assert!(ingest(raw).is_err());
    }

    #[test]
    fn rejects_out_of_range_latency() {
        let mut raw = base_raw();
        raw.latency_ms = Some(200_000);
        assert!(ingest(raw).is_err());
    }

    #[test]
    fn trims_whitespace() {
        let mut raw = base_raw();
        raw.ip_address = Some("  10.0.0.1  ".to_string());
        let event = ingest(raw).unwrap();
        assert_eq!(event.ip_address, "10.0.0.1");
    }
}
