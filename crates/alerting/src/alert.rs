//! Alert Entity and Lifecycle

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use signal_policy::{SignalKey, SignalType, Tier};
use std::fmt;

/// Alert status
///
/// ```text
/// active ──► investigating ──► resolved
///    │             │
///    └─────────────┴─────────► false-positive
/// ```
/// Auto-resolution moves any open alert straight to `resolved`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AlertStatus {
    Active,
    Investigating,
    Resolved,
    FalsePositive,
}

impl AlertStatus {
    /// Active or investigating
    pub fn is_open(self) -> bool {
        matches!(self, AlertStatus::Active | AlertStatus::Investigating)
    }

    pub fn is_terminal(self) -> bool {
        !self.is_open()
    }

    /// Whether a manual move to `next` is allowed
    pub fn can_transition_to(self, next: AlertStatus) -> bool {
        matches!(
            (self, next),
            (AlertStatus::Active, AlertStatus::Investigating)
                | (AlertStatus::Investigating, AlertStatus::Resolved)
                | (AlertStatus::Active, AlertStatus::FalsePositive)
                | (AlertStatus::Investigating, AlertStatus::FalsePositive)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AlertStatus::Active => "active",
            AlertStatus::Investigating => "investigating",
            AlertStatus::Resolved => "resolved",
            AlertStatus::FalsePositive => "false-positive",
        }
    }
}

impl fmt::Display for AlertStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Percent-escape `%` and `:` so id parts cannot run into each other
fn id_part(part: &str) -> String {
    part.replace('%', "%25").replace(':', "%3A")
}

/// `{subject}:{signal}:{generation}` with `:` escaped inside each part
pub(crate) fn alert_id(key: &SignalKey, generation: u64) -> String {
    format!(
        "{}:{}:{}",
        id_part(&key.subject_id),
        id_part(key.signal_type.as_str()),
        generation
    )
}

/// A raised alert
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    /// `{subject}:{signal}:{generation}`, with `%` and `:` in the subject
    /// and signal escaped as `%25` and `%3A`
    pub id: String,
    pub subject_id: String,
    pub signal_type: SignalType,
    /// Raise count for this (subject, signal type), starting at 1
    pub generation: u64,
    /// Tier when the alert was raised
    pub raised_severity: Tier,
    /// Worst tier seen while open
    pub severity: Tier,
    /// Most recent tier observed
    pub current_tier: Tier,
    pub status: AlertStatus,
    pub description: String,
    pub raised_at: DateTime<Utc>,
    pub last_updated_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub resolution_note: Option<String>,
    /// Ingests applied while open
    pub observations: u64,
}

impl Alert {
    pub(crate) fn raise(key: &SignalKey, generation: u64, tier: Tier, at: DateTime<Utc>) -> Self {
        Self {
            id: alert_id(key, generation),
            subject_id: key.subject_id.clone(),
            signal_type: key.signal_type.clone(),
            generation,
            raised_severity: tier,
            severity: tier,
            current_tier: tier,
            status: AlertStatus::Active,
            description: format!(
                "{} on {} reached {}",
                key.signal_type.label(),
                key.subject_id,
                tier
            ),
            raised_at: at,
            last_updated_at: at,
            resolved_at: None,
            resolution_note: None,
            observations: 1,
        }
    }

    pub fn key(&self) -> SignalKey {
        SignalKey::new(self.subject_id.clone(), self.signal_type.clone())
    }

    pub fn is_open(&self) -> bool {
        self.status.is_open()
    }

    pub(crate) fn escalate(&mut self, tier: Tier) {
        self.severity = tier;
        self.description = format!(
            "{} on {} escalated to {}",
            self.signal_type.label(),
            self.subject_id,
            tier
        );
    }

    pub(crate) fn close(&mut self, status: AlertStatus, at: DateTime<Utc>, note: Option<String>) {
        self.status = status;
        self.last_updated_at = at;
        self.resolved_at = Some(at);
        self.resolution_note = note;
    }
}

/// What an ingest did to the alert for its key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionKind {
    Raised,
    Escalated,
    AutoResolved,
}

/// Alert state change produced by an ingest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertTransition {
    pub kind: TransitionKind,
    /// Alert after the change
    pub alert: Alert,
}
