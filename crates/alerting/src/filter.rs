//! Alert Query Filter

use serde::{Deserialize, Serialize};
use signal_policy::{SignalType, Tier};
use std::cmp::Ordering;

use crate::{Alert, AlertStatus};

/// Criteria for listing alerts; empty fields match everything
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlertFilter {
    pub subject_id: Option<String>,
    pub signal_type: Option<SignalType>,
    pub status: Option<AlertStatus>,
    /// Minimum severity (inclusive)
    pub severity_min: Option<Tier>,
}

impl AlertFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subject(mut self, subject_id: impl Into<String>) -> Self {
        self.subject_id = Some(subject_id.into());
        self
    }

    pub fn signal(mut self, signal_type: SignalType) -> Self {
        self.signal_type = Some(signal_type);
        self
    }

    pub fn status(mut self, status: AlertStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn severity_min(mut self, tier: Tier) -> Self {
        self.severity_min = Some(tier);
        self
    }

    pub fn matches(&self, alert: &Alert) -> bool {
        self.subject_id
            .as_ref()
            .map_or(true, |s| &alert.subject_id == s)
            && self
                .signal_type
                .as_ref()
                .map_or(true, |s| &alert.signal_type == s)
            && self.status.map_or(true, |s| alert.status == s)
            && self.severity_min.map_or(true, |t| alert.severity >= t)
    }
}

/// Triage order: worst severity first, then newest
pub(crate) fn triage_order(a: &Alert, b: &Alert) -> Ordering {
    b.severity
        .cmp(&a.severity)
        .then_with(|| b.raised_at.cmp(&a.raised_at))
        .then_with(|| a.id.cmp(&b.id))
}
