//! Signal Aggregation
//!
//! Combines the classified signals of one subject (a model, vendor, or data
//! flow) into a single posture:
//! - worst-case: any red signal taints the whole subject
//! - weighted: rank average using per-signal-type policy weights
//!
//! A subject with no usable signals is `Unknown`, never `Low`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use signal_policy::{tier_for, ClassifiedSignal, PolicySet, SignalType, Tier, Trend};
use tracing::debug;

/// Rule used to combine signals
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregationMode {
    /// Overall tier is the worst known signal tier
    #[default]
    WorstCase,
    /// Weighted rank average re-classified against the posture boundaries
    Weighted,
}

/// One signal's contribution to a posture
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalBreakdown {
    pub signal_type: SignalType,
    pub value: f64,
    pub tier: Tier,
    pub trend: Trend,
    pub weight: f64,
    pub observed_at: DateTime<Utc>,
}

/// Aggregated view of one subject
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectPosture {
    pub subject_id: String,
    pub tier: Tier,
    pub mode: AggregationMode,
    /// Weighted rank score (weighted mode with at least one known signal)
    pub score: Option<f64>,
    pub signals: Vec<SignalBreakdown>,
    /// Signals that could not be classified
    pub unknown_signals: usize,
    pub computed_at: DateTime<Utc>,
}

impl SubjectPosture {
    /// Posture for a subject with no data
    pub fn unknown(subject_id: impl Into<String>, mode: AggregationMode) -> Self {
        Self {
            subject_id: subject_id.into(),
            tier: Tier::Unknown,
            mode,
            score: None,
            signals: Vec::new(),
            unknown_signals: 0,
            computed_at: Utc::now(),
        }
    }

    /// Breakdown entry for a signal type
    pub fn signal(&self, signal_type: &SignalType) -> Option<&SignalBreakdown> {
        self.signals.iter().find(|s| &s.signal_type == signal_type)
    }
}

/// Signal aggregator
#[derive(Debug, Clone, Default)]
pub struct Aggregator {
    mode: AggregationMode,
}

impl Aggregator {
    pub fn new(mode: AggregationMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> AggregationMode {
        self.mode
    }

    /// Aggregate a subject's signals, stamped now
    pub fn aggregate(
        &self,
        subject_id: &str,
        signals: &[ClassifiedSignal],
        policies: &PolicySet,
    ) -> SubjectPosture {
        self.aggregate_at(subject_id, signals, policies, Utc::now())
    }

    /// Aggregate a subject's signals with an explicit computation time
    pub fn aggregate_at(
        &self,
        subject_id: &str,
        signals: &[ClassifiedSignal],
        policies: &PolicySet,
        computed_at: DateTime<Utc>,
    ) -> SubjectPosture {
        let breakdown: Vec<SignalBreakdown> = signals
            .iter()
            .map(|s| SignalBreakdown {
                signal_type: s.reading.signal_type.clone(),
                value: s.reading.value,
                tier: s.tier,
                trend: s.trend,
                weight: policies.weight(&s.reading.signal_type),
                observed_at: s.reading.timestamp,
            })
            .collect();
        let unknown_signals = breakdown.iter().filter(|s| !s.tier.is_known()).count();

        let (tier, score) = match self.mode {
            AggregationMode::WorstCase => (worst_case(&breakdown), None),
            AggregationMode::Weighted => weighted(&breakdown, policies),
        };

        debug!(
            "Posture for {}: {} ({} signals, {} unknown)",
            subject_id,
            tier,
            breakdown.len(),
            unknown_signals
        );

        SubjectPosture {
            subject_id: subject_id.to_string(),
            tier,
            mode: self.mode,
            score,
            signals: breakdown,
            unknown_signals,
            computed_at,
        }
    }
}

fn worst_case(signals: &[SignalBreakdown]) -> Tier {
    signals
        .iter()
        .map(|s| s.tier)
        .filter(|t| t.is_known())
        .max()
        .unwrap_or(Tier::Unknown)
}

fn weighted(signals: &[SignalBreakdown], policies: &PolicySet) -> (Tier, Option<f64>) {
    let (weighted_sum, total_weight) = signals
        .iter()
        .filter_map(|s| s.tier.rank().map(|rank| (rank as f64, s.weight)))
        .fold((0.0, 0.0), |(sum, total), (rank, weight)| {
            (sum + rank * weight, total + weight)
        });

    if total_weight <= 0.0 {
        return (Tier::Unknown, None);
    }

    let score = weighted_sum / total_weight;
    (tier_for(&policies.posture_policy(), score), Some(score))
}
