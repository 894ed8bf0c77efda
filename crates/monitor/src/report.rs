//! Cycle Reports and Diagnostics

use alerting::{AlertTransition, TransitionKind};
use posture::SubjectPosture;
use serde::{Deserialize, Serialize};
use signal_policy::{ClassifiedSignal, ConfigurationError, Reading, SignalKey, SignalType, ValidationError};

/// Diagnostic category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// Missing or unusable policy; the reading was kept as `unknown`
    Configuration,
    /// Reading could not be classified and was skipped
    Validation,
    /// Subject processing failed as a whole
    Task,
}

/// A per-subject problem recorded during a cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub subject_id: String,
    pub signal_type: Option<SignalType>,
    pub kind: DiagnosticKind,
    pub message: String,
}

impl Diagnostic {
    pub fn configuration(reading: &Reading, error: &ConfigurationError) -> Self {
        Self {
            subject_id: reading.subject_id.clone(),
            signal_type: Some(reading.signal_type.clone()),
            kind: DiagnosticKind::Configuration,
            message: error.to_string(),
        }
    }

    pub fn validation(reading: &Reading, error: &ValidationError) -> Self {
        Self {
            subject_id: reading.subject_id.clone(),
            signal_type: Some(reading.signal_type.clone()),
            kind: DiagnosticKind::Validation,
            message: error.to_string(),
        }
    }

    pub fn task(subject_id: &str, message: impl Into<String>) -> Self {
        Self {
            subject_id: subject_id.to_string(),
            signal_type: None,
            kind: DiagnosticKind::Task,
            message: message.into(),
        }
    }
}

/// Result of processing one subject's readings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectOutcome {
    pub subject_id: String,
    pub classified: Vec<ClassifiedSignal>,
    pub transitions: Vec<AlertTransition>,
    /// Keys whose tier or trend differs from the previous reading
    pub changed: Vec<SignalKey>,
    pub diagnostics: Vec<Diagnostic>,
    pub posture: SubjectPosture,
}

/// Summary of one monitoring cycle
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CycleReport {
    pub cycle: u64,
    pub readings: usize,
    pub subjects: usize,
    pub classified: usize,
    pub transitions: Vec<AlertTransition>,
    pub changed: Vec<SignalKey>,
    pub diagnostics: Vec<Diagnostic>,
    pub duration_ms: u64,
}

impl CycleReport {
    pub(crate) fn absorb(&mut self, outcome: SubjectOutcome) {
        self.classified += outcome.classified.len();
        self.transitions.extend(outcome.transitions);
        self.changed.extend(outcome.changed);
        self.diagnostics.extend(outcome.diagnostics);
    }

    fn count(&self, kind: TransitionKind) -> usize {
        self.transitions.iter().filter(|t| t.kind == kind).count()
    }

    pub fn raised(&self) -> usize {
        self.count(TransitionKind::Raised)
    }

    pub fn escalated(&self) -> usize {
        self.count(TransitionKind::Escalated)
    }

    pub fn resolved(&self) -> usize {
        self.count(TransitionKind::AutoResolved)
    }

    /// No diagnostics were recorded
    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }
}
