//! Risk Engine Facade

use alerting::{Alert, AlertError, AlertFilter, AlertManager, AlertStatus, AlertSummary};
use parking_lot::{Mutex, RwLock};
use posture::{Aggregator, SubjectPosture};
use signal_policy::{ClassifiedSignal, PolicySet, Reading, SignalKey, SignalType, Trend};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use tracing::{debug, info, warn};
use trend_window::TrendStore;

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::report::{Diagnostic, SubjectOutcome};

/// Latest view of one subject
#[derive(Debug, Default)]
struct SubjectState {
    /// Most recent classified signal per type
    latest: BTreeMap<SignalType, ClassifiedSignal>,
    posture: Option<SubjectPosture>,
}

/// Engine instance owning policies, trend windows, postures, and alerts
///
/// Subjects are independent: each has its own lock, and alert and trend
/// state is keyed per (subject, signal type) below that.
pub struct RiskEngine {
    /// Active policy set, swapped whole on reload
    policies: RwLock<Arc<PolicySet>>,
    aggregator: Aggregator,
    trends: TrendStore,
    subjects: RwLock<HashMap<String, Arc<Mutex<SubjectState>>>>,
    alerts: AlertManager,
    /// Signal types observed without a policy
    config_gaps: RwLock<BTreeSet<SignalType>>,
}

impl RiskEngine {
    /// Create an engine, rejecting an invalid policy set
    pub fn new(config: &EngineConfig) -> Result<Self, EngineError> {
        let policies = config.policy_set();
        policies.validate()?;
        info!(
            "Creating risk engine with {} policies, {:?} aggregation",
            policies.len(),
            config.aggregation
        );

        Ok(Self {
            policies: RwLock::new(Arc::new(policies)),
            aggregator: Aggregator::new(config.aggregation),
            trends: TrendStore::new(config.trend.clone()),
            subjects: RwLock::new(HashMap::new()),
            alerts: AlertManager::new(config.alerts.clone()),
            config_gaps: RwLock::new(BTreeSet::new()),
        })
    }

    /// Current policy set
    pub fn policies(&self) -> Arc<PolicySet> {
        self.policies.read().clone()
    }

    /// Validate and atomically replace the policy set
    pub fn load_policies(&self, policies: PolicySet) -> Result<(), EngineError> {
        if let Err(e) = policies.validate() {
            warn!("Rejected policy reload: {}", e);
            return Err(e.into());
        }

        let count = policies.len();
        // Gaps lock first, then policies (same order as record_gap)
        let mut gaps = self.config_gaps.write();
        gaps.retain(|signal| policies.get(signal).is_none());
        *self.policies.write() = Arc::new(policies);
        drop(gaps);
        info!("Loaded {} threshold policies", count);
        Ok(())
    }

    fn subject(&self, subject_id: &str) -> Arc<Mutex<SubjectState>> {
        {
            let subjects = self.subjects.read();
            if let Some(state) = subjects.get(subject_id) {
                return state.clone();
            }
        }

        let mut subjects = self.subjects.write();
        subjects
            .entry(subject_id.to_string())
            .or_default()
            .clone()
    }

    /// Run one subject's readings through classify, trend, aggregate, and
    /// alert ingestion, in order
    pub fn process_subject(&self, subject_id: &str, readings: &[Reading]) -> SubjectOutcome {
        let policies = self.policies();
        let state = self.subject(subject_id);
        let mut state = state.lock();

        let mut classified = Vec::with_capacity(readings.len());
        let mut transitions = Vec::new();
        let mut changed = Vec::new();
        let mut diagnostics = Vec::new();

        for reading in readings {
            if let Err(e) = reading.validate() {
                warn!("Skipping reading for {}: {}", subject_id, e);
                diagnostics.push(Diagnostic::validation(reading, &e));
                continue;
            }

            let classification = match policies.classify(&reading.signal_type, reading.value) {
                Ok(classification) => classification,
                Err(e) => {
                    warn!("Cannot classify reading for {}: {}", subject_id, e);
                    diagnostics.push(Diagnostic::validation(reading, &e));
                    continue;
                }
            };
            if let Some(issue) = &classification.issue {
                self.record_gap(&reading.signal_type);
                diagnostics.push(Diagnostic::configuration(reading, issue));
            }

            let key = reading.key();
            let trend = self.trends.record(&key, reading.value);
            let signal = ClassifiedSignal {
                reading: reading.clone(),
                tier: classification.tier,
                trend,
            };

            let previous = state
                .latest
                .insert(reading.signal_type.clone(), signal.clone());
            if previous.map_or(true, |p| p.tier != signal.tier || p.trend != signal.trend) {
                debug!("{} now {} ({})", key, signal.tier, signal.trend);
                changed.push(key);
            }

            if let Some(transition) = self.alerts.ingest_at(
                subject_id,
                &reading.signal_type,
                signal.tier,
                reading.timestamp,
            ) {
                transitions.push(transition);
            }
            classified.push(signal);
        }

        let signals: Vec<ClassifiedSignal> = state.latest.values().cloned().collect();
        let posture = self.aggregator.aggregate(subject_id, &signals, &policies);
        state.posture = Some(posture.clone());

        SubjectOutcome {
            subject_id: subject_id.to_string(),
            classified,
            transitions,
            changed,
            diagnostics,
            posture,
        }
    }

    /// Note a signal type seen without a policy
    ///
    /// Checked against the currently loaded set, not the snapshot a subject
    /// was classified with, so a concurrent reload that covers the type is
    /// not undone.
    fn record_gap(&self, signal_type: &SignalType) {
        let mut gaps = self.config_gaps.write();
        if self.policies.read().get(signal_type).is_none() {
            gaps.insert(signal_type.clone());
        }
    }

    /// Posture of a subject; `Unknown` if it has never reported
    pub fn get_posture(&self, subject_id: &str) -> SubjectPosture {
        let state = self.subjects.read().get(subject_id).cloned();
        let posture = state.and_then(|state| {
            let posture = state.lock().posture.clone();
            posture
        });
        posture.unwrap_or_else(|| SubjectPosture::unknown(subject_id, self.aggregator.mode()))
    }

    /// Subjects that have reported at least once
    pub fn subjects(&self) -> Vec<String> {
        let mut subjects: Vec<String> = self.subjects.read().keys().cloned().collect();
        subjects.sort();
        subjects
    }

    pub fn get_trend(&self, subject_id: &str, signal_type: &SignalType) -> Trend {
        self.trends
            .trend(&SignalKey::new(subject_id, signal_type.clone()))
    }

    /// Retained values behind a trend (newest last)
    pub fn trend_history(&self, subject_id: &str, signal_type: &SignalType) -> Vec<f64> {
        self.trends
            .history(&SignalKey::new(subject_id, signal_type.clone()))
    }

    /// Readings recorded for a (subject, signal type) since it was first seen
    pub fn trend_observations(&self, subject_id: &str, signal_type: &SignalType) -> usize {
        self.trends
            .observations(&SignalKey::new(subject_id, signal_type.clone()))
    }

    pub fn list_alerts(&self, filter: &AlertFilter) -> Vec<Alert> {
        self.alerts.query(filter)
    }

    pub fn get_alert(&self, alert_id: &str) -> Option<Alert> {
        self.alerts.get(alert_id)
    }

    pub fn set_alert_status(
        &self,
        alert_id: &str,
        status: AlertStatus,
        note: Option<String>,
    ) -> Result<Alert, AlertError> {
        self.alerts.set_status(alert_id, status, note)
    }

    pub fn alert_summary(&self) -> AlertSummary {
        self.alerts.summary()
    }

    /// Signal types seen without a configured policy
    pub fn config_gaps(&self) -> Vec<SignalType> {
        self.config_gaps.read().iter().cloned().collect()
    }

    pub fn alerts(&self) -> &AlertManager {
        &self.alerts
    }
}
