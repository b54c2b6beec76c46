//! Audit logging for security-relevant operations.
//!
//! Events are emitted on the `audit` tracing target so they can be routed
//! separately from application logs.
//!
//! ```ignore
//! use axum_helpers::audit::{AuditEvent, AuditOutcome};
//!
//! AuditEvent::new(Some(actor), "user.delete", Some(format!("user:{id}")), AuditOutcome::Denied)
//!     .with_details(json!({"reason": "forbidden"}))
//!     .log();
//! ```

use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditOutcome {
    Success,
    /// Validation or system failure
    Failure,
    /// Rejected by an authorization or authentication check
    Denied,
}

/// Structured audit record.
#[derive(Debug, Serialize)]
pub struct AuditEvent {
    /// Subject of the caller's claims, if any
    pub user_id: Option<String>,
    /// e.g. "user.create", "user.authenticate"
    pub action: String,
    /// e.g. "user:0190c3..."
    pub resource: Option<String>,
    pub outcome: AuditOutcome,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub timestamp: DateTime<Utc>,
    pub details: Option<serde_json::Value>,
}

impl AuditEvent {
    pub fn new(
        user_id: Option<String>,
        action: impl Into<String>,
        resource: Option<String>,
        outcome: AuditOutcome,
    ) -> Self {
        Self {
            user_id,
            action: action.into(),
            resource,
            outcome,
            timestamp: Utc::now(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Serialize) -> Self {
        self.details = serde_json::to_value(details).ok();
        self
    }

    /// Emit on the `audit` target.
    pub fn log(self) {
        tracing::info!(
            target: "audit",
            user_id = self.user_id,
            action = %self.action,
            resource = self.resource,
            outcome = ?self.outcome,
            timestamp = %self.timestamp,
            details = ?self.details,
            "{}",
            serde_json::to_string(&self).unwrap_or_else(|_| "Failed to serialize audit event".to_string())
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audit_event_serializes_outcome_lowercase() {
        let event = AuditEvent::new(
            Some("actor".into()),
            "user.delete",
            Some("user:1".into()),
            AuditOutcome::Denied,
        )
        .with_details(serde_json::json!({"kind": "forbidden"}));

        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["outcome"], "denied");
        assert_eq!(value["action"], "user.delete");
        assert_eq!(value["details"]["kind"], "forbidden");
        assert!(value["timestamp"].is_i64());
    }
}
