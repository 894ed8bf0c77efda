//! Alert Manager Implementation

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use signal_policy::{SignalKey, SignalType, Tier};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::filter::triage_order;
use crate::{Alert, AlertError, AlertFilter, AlertStatus, AlertTransition, TransitionKind};

/// Alert configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    /// Lowest tier that raises an alert (default: medium)
    pub alertable_tier: Tier,
    /// Consecutive sub-threshold ingests before auto-resolution (default: 2)
    pub resolve_after: u32,
    /// Closed alerts kept per (subject, signal type) for history
    pub max_closed_per_key: usize,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            alertable_tier: Tier::Medium,
            resolve_after: 2,
            max_closed_per_key: 100,
        }
    }
}

/// Per-key alert state
#[derive(Debug, Default)]
struct KeySlot {
    /// Last generation raised for this key
    generation: u64,
    /// At most one open alert
    open: Option<Alert>,
    /// Consecutive sub-threshold ingests while open
    below_count: u32,
    /// Terminal alerts, oldest first
    closed: VecDeque<Alert>,
}

/// Open alert counts by severity
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityCounts {
    pub low: usize,
    pub medium: usize,
    pub high: usize,
    pub critical: usize,
}

/// Alert counts for dashboard tiles
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertSummary {
    pub total: usize,
    pub active: usize,
    pub investigating: usize,
    pub resolved: usize,
    pub false_positive: usize,
    pub open_by_severity: SeverityCounts,
}

/// Alert manager for deduplication, hysteresis, and lifecycle
///
/// State is kept per (subject, signal type) behind its own lock. Ingests for
/// different keys never block each other; ingests for the same key apply in
/// the order they acquire the key lock.
pub struct AlertManager {
    /// Configuration
    config: AlertConfig,
    /// Alert state by key
    slots: RwLock<HashMap<SignalKey, Arc<Mutex<KeySlot>>>>,
    /// Alert id to key
    index: RwLock<HashMap<String, SignalKey>>,
}

impl AlertManager {
    /// Create a new alert manager
    pub fn new(config: AlertConfig) -> Self {
        info!("Creating alert manager with config: {:?}", config);
        Self {
            config,
            slots: RwLock::new(HashMap::new()),
            index: RwLock::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &AlertConfig {
        &self.config
    }

    /// Get or create the slot for a key
    fn slot(&self, key: &SignalKey) -> Arc<Mutex<KeySlot>> {
        {
            let slots = self.slots.read();
            if let Some(slot) = slots.get(key) {
                return slot.clone();
            }
        }

        let mut slots = self.slots.write();
        slots.entry(key.clone()).or_default().clone()
    }

    fn existing_slots(&self) -> Vec<Arc<Mutex<KeySlot>>> {
        self.slots.read().values().cloned().collect()
    }

    /// Apply one classified tier to the key's alert state, stamped now
    pub fn ingest(
        &self,
        subject_id: &str,
        signal_type: &SignalType,
        tier: Tier,
    ) -> Option<AlertTransition> {
        self.ingest_at(subject_id, signal_type, tier, Utc::now())
    }

    /// Apply one classified tier observed at `at`
    ///
    /// `Unknown` tiers are ignored: they neither raise, escalate, nor count
    /// toward resolution.
    pub fn ingest_at(
        &self,
        subject_id: &str,
        signal_type: &SignalType,
        tier: Tier,
        at: DateTime<Utc>,
    ) -> Option<AlertTransition> {
        if !tier.is_known() {
            debug!(
                "Ignoring unknown tier for {}:{}",
                subject_id, signal_type
            );
            return None;
        }

        let key = SignalKey::new(subject_id, signal_type.clone());
        let slot = self.slot(&key);
        let mut slot = slot.lock();
        let alertable = tier >= self.config.alertable_tier;

        if slot.open.is_none() {
            if !alertable {
                return None;
            }
            return Some(self.raise(&key, &mut slot, tier, at));
        }

        if alertable {
            slot.below_count = 0;
            let alert = slot.open.as_mut()?;
            alert.current_tier = tier;
            alert.last_updated_at = at;
            alert.observations += 1;

            if tier > alert.severity {
                let from = alert.severity;
                alert.escalate(tier);
                warn!("Alert escalated: {} ({} -> {})", alert.id, from, tier);
                metrics::counter!("risk_alerts_escalated_total", "signal_type" => key.signal_type.to_string())
                    .increment(1);
                return Some(AlertTransition {
                    kind: TransitionKind::Escalated,
                    alert: alert.clone(),
                });
            }
            return None;
        }

        slot.below_count += 1;
        let below_count = slot.below_count;
        let alert = slot.open.as_mut()?;
        alert.current_tier = tier;
        alert.last_updated_at = at;
        alert.observations += 1;

        if below_count < self.config.resolve_after.max(1) {
            debug!(
                "Alert {} below threshold ({}/{})",
                alert.id, below_count, self.config.resolve_after
            );
            return None;
        }

        let resolved = self.close(
            &mut slot,
            AlertStatus::Resolved,
            at,
            Some(format!(
                "Auto-resolved after {} consecutive readings below {}",
                below_count, self.config.alertable_tier
            )),
        )?;
        info!("Alert auto-resolved: {}", resolved.id);
        metrics::counter!("risk_alerts_resolved_total", "signal_type" => key.signal_type.to_string())
            .increment(1);
        Some(AlertTransition {
            kind: TransitionKind::AutoResolved,
            alert: resolved,
        })
    }

    fn raise(
        &self,
        key: &SignalKey,
        slot: &mut KeySlot,
        tier: Tier,
        at: DateTime<Utc>,
    ) -> AlertTransition {
        slot.generation += 1;
        slot.below_count = 0;
        let alert = Alert::raise(key, slot.generation, tier, at);
        let previous = self.index.write().insert(alert.id.clone(), key.clone());
        if let Some(previous) = previous.filter(|previous| previous != key) {
            error!("Alert id {} was already assigned to {}", alert.id, previous);
        }
        slot.open = Some(alert.clone());

        info!("Alert raised: {} ({})", alert.id, tier);
        metrics::counter!("risk_alerts_raised_total", "signal_type" => key.signal_type.to_string())
            .increment(1);
        metrics::gauge!("risk_alerts_open").increment(1.0);

        AlertTransition {
            kind: TransitionKind::Raised,
            alert,
        }
    }

    /// Move the open alert of a slot into its history
    fn close(
        &self,
        slot: &mut KeySlot,
        status: AlertStatus,
        at: DateTime<Utc>,
        note: Option<String>,
    ) -> Option<Alert> {
        let mut alert = slot.open.take()?;
        alert.close(status, at, note);
        slot.below_count = 0;
        metrics::gauge!("risk_alerts_open").decrement(1.0);

        slot.closed.push_back(alert.clone());
        while slot.closed.len() > self.config.max_closed_per_key {
            if let Some(evicted) = slot.closed.pop_front() {
                self.index.write().remove(&evicted.id);
            }
        }
        Some(alert)
    }

    /// Manually change an alert's status
    pub fn set_status(
        &self,
        alert_id: &str,
        new_status: AlertStatus,
        note: Option<String>,
    ) -> Result<Alert, AlertError> {
        let key = self
            .index
            .read()
            .get(alert_id)
            .cloned()
            .ok_or_else(|| AlertError::NotFound(alert_id.to_string()))?;
        let slot = self.slot(&key);
        let mut slot = slot.lock();
        let now = Utc::now();

        let current = match slot.open.as_ref() {
            Some(open) if open.id == alert_id => open.status,
            _ => {
                let closed = slot
                    .closed
                    .iter()
                    .find(|a| a.id == alert_id)
                    .ok_or_else(|| AlertError::NotFound(alert_id.to_string()))?;
                return Err(AlertError::InvalidTransition {
                    id: alert_id.to_string(),
                    from: closed.status,
                    to: new_status,
                });
            }
        };

        if !current.can_transition_to(new_status) {
            return Err(AlertError::InvalidTransition {
                id: alert_id.to_string(),
                from: current,
                to: new_status,
            });
        }

        if new_status.is_terminal() {
            let closed = self
                .close(&mut slot, new_status, now, note)
                .ok_or_else(|| AlertError::NotFound(alert_id.to_string()))?;
            info!("Alert {} closed as {}", closed.id, new_status);
            if new_status == AlertStatus::Resolved {
                metrics::counter!("risk_alerts_resolved_total", "signal_type" => key.signal_type.to_string())
                    .increment(1);
            }
            return Ok(closed);
        }

        let alert = slot
            .open
            .as_mut()
            .ok_or_else(|| AlertError::NotFound(alert_id.to_string()))?;
        alert.status = new_status;
        alert.last_updated_at = now;
        if note.is_some() {
            alert.resolution_note = note;
        }
        info!("Alert {} moved to {}", alert.id, new_status);
        Ok(alert.clone())
    }

    /// Look up an alert by id
    pub fn get(&self, alert_id: &str) -> Option<Alert> {
        let key = self.index.read().get(alert_id).cloned()?;
        let slot = self.slots.read().get(&key).cloned()?;
        let slot = slot.lock();
        slot.open
            .iter()
            .chain(slot.closed.iter())
            .find(|a| a.id == alert_id)
            .cloned()
    }

    /// Open alert for a key, if any
    pub fn open_alert(&self, subject_id: &str, signal_type: &SignalType) -> Option<Alert> {
        let key = SignalKey::new(subject_id, signal_type.clone());
        let slot = self.slots.read().get(&key).cloned()?;
        let open = slot.lock().open.clone();
        open
    }

    /// Alerts matching a filter, worst severity then newest first
    pub fn query(&self, filter: &AlertFilter) -> Vec<Alert> {
        let mut alerts: Vec<Alert> = self
            .existing_slots()
            .iter()
            .flat_map(|slot| {
                let slot = slot.lock();
                slot.open
                    .iter()
                    .chain(slot.closed.iter())
                    .filter(|a| filter.matches(a))
                    .cloned()
                    .collect::<Vec<_>>()
            })
            .collect();
        alerts.sort_by(triage_order);
        alerts
    }

    /// Counts by status and open severity
    pub fn summary(&self) -> AlertSummary {
        let mut summary = AlertSummary::default();
        for slot in self.existing_slots() {
            let slot = slot.lock();
            for alert in slot.open.iter().chain(slot.closed.iter()) {
                summary.total += 1;
                match alert.status {
                    AlertStatus::Active => summary.active += 1,
                    AlertStatus::Investigating => summary.investigating += 1,
                    AlertStatus::Resolved => summary.resolved += 1,
                    AlertStatus::FalsePositive => summary.false_positive += 1,
                }
                if alert.is_open() {
                    let counts = &mut summary.open_by_severity;
                    match alert.severity {
                        Tier::Low => counts.low += 1,
                        Tier::Medium => counts.medium += 1,
                        Tier::High => counts.high += 1,
                        Tier::Critical => counts.critical += 1,
                        Tier::Unknown => {}
                    }
                }
            }
        }
        summary
    }

    /// Number of open alerts
    pub fn open_count(&self) -> usize {
        self.existing_slots()
            .iter()
            .filter(|slot| slot.lock().open.is_some())
            .count()
    }

    /// Every retained alert ordered by raise time, for external persistence
    pub fn snapshot(&self) -> Vec<Alert> {
        let mut alerts = self.query(&AlertFilter::default());
        alerts.sort_by(|a, b| a.raised_at.cmp(&b.raised_at).then_with(|| a.id.cmp(&b.id)));
        alerts
    }
}

impl Default for AlertManager {
    fn default() -> Self {
        Self::new(AlertConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    const SUBJECT: &str = "model-a";

    fn drift() -> SignalType {
        SignalType::DataDrift
    }

    #[test]
    fn test_below_threshold_is_noop() {
        let manager = AlertManager::default();
        assert!(manager.ingest(SUBJECT, &drift(), Tier::Low).is_none());
        assert!(manager.query(&AlertFilter::default()).is_empty());
    }

    #[test]
    fn test_raise_and_deduplicate() {
        let manager = AlertManager::default();

        let first = manager.ingest(SUBJECT, &drift(), Tier::High).unwrap();
        assert_eq!(first.kind, TransitionKind::Raised);
        assert_eq!(first.alert.id, "model-a:data_drift:1");
        assert_eq!(first.alert.status, AlertStatus::Active);

        // Identical ingest must not open a second alert
        assert!(manager.ingest(SUBJECT, &drift(), Tier::High).is_none());
        let open = manager.query(&AlertFilter::new().status(AlertStatus::Active));
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].observations, 2);
    }

    #[test]
    fn test_escalation_upgrades_existing() {
        let manager = AlertManager::default();
        manager.ingest(SUBJECT, &drift(), Tier::Medium);

        let escalated = manager.ingest(SUBJECT, &drift(), Tier::Critical).unwrap();
        assert_eq!(escalated.kind, TransitionKind::Escalated);
        assert_eq!(escalated.alert.severity, Tier::Critical);
        assert_eq!(escalated.alert.raised_severity, Tier::Medium);
        assert_eq!(escalated.alert.generation, 1);

        // Dropping back inside the alertable band keeps the worst severity
        assert!(manager.ingest(SUBJECT, &drift(), Tier::Medium).is_none());
        let alert = manager.open_alert(SUBJECT, &drift()).unwrap();
        assert_eq!(alert.severity, Tier::Critical);
        assert_eq!(alert.current_tier, Tier::Medium);
        assert_eq!(manager.summary().total, 1);
    }

    #[test]
    fn test_hysteresis_high_high_low() {
        let manager = AlertManager::default();
        let raised = manager.ingest(SUBJECT, &drift(), Tier::High).unwrap();
        assert!(manager.ingest(SUBJECT, &drift(), Tier::High).is_none());

        // One low reading is not enough
        assert!(manager.ingest(SUBJECT, &drift(), Tier::Low).is_none());
        assert!(manager.get(&raised.alert.id).unwrap().is_open());

        let resolved = manager.ingest(SUBJECT, &drift(), Tier::Low).unwrap();
        assert_eq!(resolved.kind, TransitionKind::AutoResolved);
        assert_eq!(resolved.alert.id, raised.alert.id);
        assert_eq!(resolved.alert.status, AlertStatus::Resolved);
        assert!(resolved.alert.resolved_at.is_some());
    }

    #[test]
    fn test_alertable_reading_resets_counter() {
        let manager = AlertManager::default();
        manager.ingest(SUBJECT, &drift(), Tier::High);
        manager.ingest(SUBJECT, &drift(), Tier::Low);
        manager.ingest(SUBJECT, &drift(), Tier::High);
        assert!(manager.ingest(SUBJECT, &drift(), Tier::Low).is_none());
        assert!(manager.open_alert(SUBJECT, &drift()).is_some());
    }

    #[test]
    fn test_unknown_tier_ignored() {
        let manager = AlertManager::default();
        manager.ingest(SUBJECT, &drift(), Tier::High);
        for _ in 0..5 {
            assert!(manager.ingest(SUBJECT, &drift(), Tier::Unknown).is_none());
        }
        assert!(manager.open_alert(SUBJECT, &drift()).is_some());
        assert!(manager.ingest("model-b", &drift(), Tier::Unknown).is_none());
        assert_eq!(manager.summary().total, 1);
    }

    #[test]
    fn test_reopen_gets_next_generation() {
        let manager = AlertManager::default();
        manager.ingest(SUBJECT, &drift(), Tier::High);
        manager.ingest(SUBJECT, &drift(), Tier::Low);
        manager.ingest(SUBJECT, &drift(), Tier::Low);

        let reopened = manager.ingest(SUBJECT, &drift(), Tier::Medium).unwrap();
        assert_eq!(reopened.kind, TransitionKind::Raised);
        assert_eq!(reopened.alert.id, "model-a:data_drift:2");
        assert_eq!(manager.query(&AlertFilter::new().subject(SUBJECT)).len(), 2);
    }

    #[test]
    fn test_manual_lifecycle() {
        let manager = AlertManager::default();
        let id = manager
            .ingest(SUBJECT, &drift(), Tier::High)
            .unwrap()
            .alert
            .id;

        let invalid = manager.set_status(&id, AlertStatus::Resolved, None);
        assert!(matches!(invalid, Err(AlertError::InvalidTransition { .. })));

        let investigating = manager
            .set_status(&id, AlertStatus::Investigating, None)
            .unwrap();
        assert_eq!(investigating.status, AlertStatus::Investigating);

        let resolved = manager
            .set_status(&id, AlertStatus::Resolved, Some("retrained".to_string()))
            .unwrap();
        assert_eq!(resolved.status, AlertStatus::Resolved);
        assert_eq!(resolved.resolution_note.as_deref(), Some("retrained"));

        // Terminal alerts reject further changes
        assert_eq!(
            manager.set_status(&id, AlertStatus::FalsePositive, None),
            Err(AlertError::InvalidTransition {
                id: id.clone(),
                from: AlertStatus::Resolved,
                to: AlertStatus::FalsePositive,
            })
        );
        assert!(manager.open_alert(SUBJECT, &drift()).is_none());
    }

    #[test]
    fn test_false_positive_from_active() {
        let manager = AlertManager::default();
        let id = manager
            .ingest(SUBJECT, &SignalType::BiasScore, Tier::Medium)
            .unwrap()
            .alert
            .id;
        let closed = manager
            .set_status(&id, AlertStatus::FalsePositive, None)
            .unwrap();
        assert_eq!(closed.status, AlertStatus::FalsePositive);
        assert_eq!(manager.summary().false_positive, 1);
    }

    #[test]
    fn test_unknown_id_not_found() {
        let manager = AlertManager::default();
        assert_eq!(
            manager.set_status("nope", AlertStatus::Investigating, None),
            Err(AlertError::NotFound("nope".to_string()))
        );
        assert!(manager.get("nope").is_none());
    }

    #[test]
    fn test_query_filters_and_order() {
        let manager = AlertManager::default();
        let now = Utc::now();
        manager.ingest_at("model-a", &drift(), Tier::High, now - Duration::minutes(10));
        manager.ingest_at("model-b", &drift(), Tier::High, now);
        manager.ingest_at("vendor-1", &SignalType::SecurityScore, Tier::Critical, now - Duration::hours(1));
        manager.ingest_at("vendor-2", &SignalType::SecurityScore, Tier::Medium, now);

        let all = manager.query(&AlertFilter::default());
        let subjects: Vec<&str> = all.iter().map(|a| a.subject_id.as_str()).collect();
        assert_eq!(subjects, vec!["vendor-1", "model-b", "model-a", "vendor-2"]);

        let high_plus = manager.query(&AlertFilter::new().severity_min(Tier::High));
        assert_eq!(high_plus.len(), 3);

        let security = manager.query(&AlertFilter::new().signal(SignalType::SecurityScore));
        assert_eq!(security.len(), 2);
    }

    #[test]
    fn test_summary_counts() {
        let manager = AlertManager::default();
        manager.ingest("model-a", &drift(), Tier::High);
        manager.ingest("model-b", &drift(), Tier::Critical);
        let id = manager.ingest("model-c", &drift(), Tier::Medium).unwrap().alert.id;
        manager.set_status(&id, AlertStatus::Investigating, None).unwrap();

        let summary = manager.summary();
        assert_eq!(summary.total, 3);
        assert_eq!(summary.active, 2);
        assert_eq!(summary.investigating, 1);
        assert_eq!(summary.open_by_severity.high, 1);
        assert_eq!(summary.open_by_severity.critical, 1);
        assert_eq!(summary.open_by_severity.medium, 1);
        assert_eq!(manager.open_count(), 3);
    }

    #[test]
    fn test_separator_in_names_keeps_ids_distinct() {
        let manager = AlertManager::default();
        let a = manager
            .ingest("org:acme", &SignalType::Custom("latency".into()), Tier::High)
            .unwrap()
            .alert;
        let b = manager
            .ingest("org", &SignalType::Custom("acme:latency".into()), Tier::Critical)
            .unwrap()
            .alert;
        assert_ne!(a.id, b.id);

        let found = manager.get(&a.id).unwrap();
        assert_eq!(found.subject_id, "org:acme");

        let closed = manager
            .set_status(&a.id, AlertStatus::FalsePositive, None)
            .unwrap();
        assert_eq!(closed.subject_id, "org:acme");
        assert_eq!(
            manager.get(&b.id).map(|alert| alert.status),
            Some(AlertStatus::Active)
        );
        assert_eq!(manager.open_count(), 1);
    }

    #[test]
    fn test_closed_retention() {
        let manager = AlertManager::new(AlertConfig {
            max_closed_per_key: 2,
            resolve_after: 1,
            ..AlertConfig::default()
        });
        for _ in 0..4 {
            manager.ingest(SUBJECT, &drift(), Tier::High);
            manager.ingest(SUBJECT, &drift(), Tier::Low);
        }
        let history = manager.snapshot();
        assert_eq!(history.len(), 2);
        assert!(manager.get("model-a:data_drift:1").is_none());
        assert!(manager.get("model-a:data_drift:4").is_some());
    }

    #[test]
    fn test_concurrent_ingest_single_open_alert() {
        let manager = Arc::new(AlertManager::default());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let manager = manager.clone();
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        manager.ingest("shared", &SignalType::DataDrift, Tier::High);
                        manager.ingest(&format!("model-{}", i), &SignalType::DataDrift, Tier::High);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let shared = manager.query(&AlertFilter::new().subject("shared"));
        assert_eq!(shared.len(), 1);
        assert_eq!(shared[0].observations, 800);
        assert_eq!(manager.open_count(), 9);
    }
}
