//! Security audit logging (§4.H): every session owns a [`SecurityLogger`]
//! keyed by a stable correlation-id, emitting structured events through
//! `tracing`. A process-wide redacting layer keeps secret-shaped fields out
//! of the emitted record regardless of who constructed it.

use std::collections::BTreeMap;

use chrono::Utc;
use tracing::{event, Level};
use uuid::Uuid;

const REDACTED_KEY_FRAGMENTS: &[&str] = &[
    "password", "pass", "secret", "token", "key", "hash", "auth", "ticket", "cred",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecurityEventType {
    Authentication,
    Connection,
    Command,
    Reconnection,
    SessionLifecycle,
}

impl SecurityEventType {
    fn as_str(self) -> &'static str {
        match self {
            SecurityEventType::Authentication => "authentication",
            SecurityEventType::Connection => "connection",
            SecurityEventType::Command => "command",
            SecurityEventType::Reconnection => "reconnection",
            SecurityEventType::SessionLifecycle => "session-lifecycle",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
    Error,
    Critical,
}

impl Severity {
    fn as_str(self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
            Severity::Critical => "critical",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure,
    Denied,
    Attempt,
}

impl Outcome {
    fn as_str(self) -> &'static str {
        match self {
            Outcome::Success => "success",
            Outcome::Failure => "failure",
            Outcome::Denied => "denied",
            Outcome::Attempt => "attempt",
        }
    }
}

/// Redacts any detail value whose key, case-insensitive, contains one of
/// the secret-shaped fragments (§4.H, Testable Property 10).
fn redact_details(details: &BTreeMap<String, String>) -> BTreeMap<String, String> {
    details
        .iter()
        .map(|(k, v)| {
            let lowered = k.to_lowercase();
            if REDACTED_KEY_FRAGMENTS.iter().any(|frag| lowered.contains(frag)) {
                (k.clone(), "[REDACTED]".to_string())
            } else {
                (k.clone(), v.clone())
            }
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct SecurityEvent {
    pub event_type: SecurityEventType,
    pub subtype: String,
    pub severity: Severity,
    pub outcome: Outcome,
    pub user: Option<String>,
    pub target: Option<String>,
    pub details: BTreeMap<String, String>,
}

impl SecurityEvent {
    pub fn new(event_type: SecurityEventType, subtype: impl Into<String>, outcome: Outcome) -> Self {
        let severity = match outcome {
            Outcome::Success | Outcome::Attempt => Severity::Info,
            Outcome::Denied => Severity::Warning,
            Outcome::Failure => Severity::Error,
        };
        Self {
            event_type,
            subtype: subtype.into(),
            severity,
            outcome,
            user: None,
            target: None,
            details: BTreeMap::new(),
        }
    }

    pub fn severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    pub fn target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn detail(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }
}

/// Keyed by a stable per-session correlation-id (§3 "security-logger").
#[derive(Debug, Clone)]
pub struct SecurityLogger {
    correlation_id: Uuid,
}

impl SecurityLogger {
    pub fn new() -> Self {
        Self {
            correlation_id: Uuid::new_v4(),
        }
    }

    pub fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    pub fn emit(&self, mut ev: SecurityEvent) {
        let timestamp = Utc::now().to_rfc3339();
        ev.details = redact_details(&ev.details);

        let user = ev.user.clone().unwrap_or_default();
        let target = ev.target.clone().unwrap_or_default();
        let details = format!("{:?}", ev.details);

        match ev.severity {
            Severity::Info => event!(
                Level::INFO,
                timestamp = %timestamp,
                correlation_id = %self.correlation_id,
                event_type = ev.event_type.as_str(),
                subtype = %ev.subtype,
                outcome = ev.outcome.as_str(),
                user = %user,
                target = %target,
                details = %details,
                "security event"
            ),
            Severity::Warning => event!(
                Level::WARN,
                timestamp = %timestamp,
                correlation_id = %self.correlation_id,
                event_type = ev.event_type.as_str(),
                subtype = %ev.subtype,
                outcome = ev.outcome.as_str(),
                user = %user,
                target = %target,
                details = %details,
                "security event"
            ),
            Severity::Error | Severity::Critical => event!(
                Level::ERROR,
                timestamp = %timestamp,
                correlation_id = %self.correlation_id,
                event_type = ev.event_type.as_str(),
                subtype = %ev.subtype,
                outcome = ev.outcome.as_str(),
                user = %user,
                target = %target,
                details = %details,
                "security event"
            ),
        }
    }
}

impl Default for SecurityLogger {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redact_details_case_insensitive() {
        let mut details = BTreeMap::new();
        details.insert("Password".to_string(), "hunter2".to_string());
        details.insert("API_KEY".to_string(), "abc123".to_string());
        details.insert("host".to_string(), "server01".to_string());

        let redacted = redact_details(&details);
        assert_eq!(redacted["Password"], "[REDACTED]");
        assert_eq!(redacted["API_KEY"], "[REDACTED]");
        assert_eq!(redacted["host"], "server01");
    }

    #[test]
    fn test_logger_has_stable_correlation_id() {
        let logger = SecurityLogger::new();
        let first = logger.correlation_id();
        let second = logger.correlation_id();
        assert_eq!(first, second);
    }

    #[test]
    fn test_emit_does_not_panic() {
        let logger = SecurityLogger::new();
        logger.emit(
            SecurityEvent::new(SecurityEventType::Authentication, "basic", Outcome::Success)
                .user("alice")
                .target("host01")
                .detail("token", "should-be-redacted"),
        );
    }
}
