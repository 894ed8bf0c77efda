//! Threshold Policies

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::classifier::{classify, Classification};
use crate::error::{ConfigurationError, PolicyError, ValidationError};
use crate::{SignalType, Tier};

/// Maximum boundaries per policy (Low | Medium | High | Critical)
pub const MAX_BOUNDARIES: usize = 3;

/// Tier boundaries and comparison direction for one signal type
///
/// Boundary `i` is the value at which tier `Low + i + 1` begins. A value
/// equal to a boundary belongs to the worse tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdPolicy {
    /// Ascending when higher is worse, descending when lower is worse
    pub boundaries: Vec<f64>,
    /// Comparison direction (default: higher values are worse)
    #[serde(default = "default_higher_is_worse")]
    pub higher_is_worse: bool,
    /// Weight used by weighted aggregation (default: 1.0)
    #[serde(default = "default_weight")]
    pub weight: f64,
}

fn default_higher_is_worse() -> bool {
    true
}

fn default_weight() -> f64 {
    1.0
}

impl ThresholdPolicy {
    /// Policy where larger values are worse
    pub fn higher_is_worse(boundaries: Vec<f64>) -> Self {
        Self {
            boundaries,
            higher_is_worse: true,
            weight: default_weight(),
        }
    }

    /// Policy where smaller values are worse (rates and scores)
    pub fn lower_is_worse(boundaries: Vec<f64>) -> Self {
        Self {
            boundaries,
            higher_is_worse: false,
            weight: default_weight(),
        }
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    /// Worst tier this policy can produce
    pub fn max_tier(&self) -> Tier {
        Tier::from_rank(self.boundaries.len() + 1)
    }

    /// Validate boundaries and weight
    pub fn validate(&self, signal_type: &SignalType) -> Result<(), PolicyError> {
        if self.boundaries.is_empty() {
            return Err(ValidationError::EmptyPolicy(signal_type.clone()).into());
        }
        if self.boundaries.len() > MAX_BOUNDARIES {
            return Err(ConfigurationError::TooManyBoundaries {
                signal_type: signal_type.clone(),
                count: self.boundaries.len(),
                max: MAX_BOUNDARIES,
            }
            .into());
        }
        if let Some(&value) = self.boundaries.iter().find(|b| !b.is_finite()) {
            return Err(ConfigurationError::NonFiniteBoundary {
                signal_type: signal_type.clone(),
                value,
            }
            .into());
        }

        let ordered = self.boundaries.windows(2).all(|pair| {
            if self.higher_is_worse {
                pair[0] < pair[1]
            } else {
                pair[0] > pair[1]
            }
        });
        if !ordered {
            return Err(ConfigurationError::NonMonotonic {
                signal_type: signal_type.clone(),
                expected: if self.higher_is_worse {
                    "ascending"
                } else {
                    "descending"
                },
                boundaries: self.boundaries.clone(),
            }
            .into());
        }

        if !self.weight.is_finite() || self.weight < 0.0 {
            return Err(ConfigurationError::InvalidWeight {
                signal_type: signal_type.clone(),
                weight: self.weight,
            }
            .into());
        }

        Ok(())
    }
}

/// Complete policy configuration, replaced as a whole on reload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicySet {
    /// Per signal type policies
    #[serde(default)]
    pub policies: BTreeMap<SignalType, ThresholdPolicy>,
    /// Rank-scale boundaries for weighted posture scores (default: 2, 3, 4)
    #[serde(default = "default_posture_boundaries")]
    pub posture_boundaries: Vec<f64>,
}

fn default_posture_boundaries() -> Vec<f64> {
    vec![2.0, 3.0, 4.0]
}

impl Default for PolicySet {
    fn default() -> Self {
        Self {
            policies: BTreeMap::new(),
            posture_boundaries: default_posture_boundaries(),
        }
    }
}

impl PolicySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the policy for a signal type
    pub fn with_policy(mut self, signal_type: SignalType, policy: ThresholdPolicy) -> Self {
        self.policies.insert(signal_type, policy);
        self
    }

    /// Built-in table of the thresholds used across the governance dashboard
    pub fn governance_defaults() -> Self {
        let drift = ThresholdPolicy::higher_is_worse(vec![0.08, 0.10, 0.20]);
        Self::new()
            .with_policy(SignalType::DataDrift, drift.clone())
            .with_policy(SignalType::ConceptDrift, drift.clone())
            .with_policy(SignalType::ModelDrift, drift)
            .with_policy(
                SignalType::BiasScore,
                ThresholdPolicy::higher_is_worse(vec![0.1, 0.2, 0.3]).with_weight(2.0),
            )
            .with_policy(
                SignalType::SecurityScore,
                ThresholdPolicy::lower_is_worse(vec![90.0, 75.0, 60.0]),
            )
            .with_policy(
                SignalType::ComplianceRate,
                ThresholdPolicy::lower_is_worse(vec![90.0, 80.0, 70.0]),
            )
            .with_policy(
                SignalType::ReliabilityScore,
                ThresholdPolicy::lower_is_worse(vec![95.0, 90.0, 80.0]),
            )
    }

    pub fn get(&self, signal_type: &SignalType) -> Option<&ThresholdPolicy> {
        self.policies.get(signal_type)
    }

    /// Aggregation weight for a signal type (1.0 when unconfigured)
    pub fn weight(&self, signal_type: &SignalType) -> f64 {
        self.get(signal_type)
            .map(|p| p.weight)
            .unwrap_or_else(default_weight)
    }

    /// Policy used to re-classify weighted posture scores
    pub fn posture_policy(&self) -> ThresholdPolicy {
        ThresholdPolicy::higher_is_worse(self.posture_boundaries.clone())
    }

    /// Classify a value under this set
    pub fn classify(
        &self,
        signal_type: &SignalType,
        value: f64,
    ) -> Result<Classification, ValidationError> {
        classify(signal_type, value, self.get(signal_type))
    }

    pub fn len(&self) -> usize {
        self.policies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }

    /// Validate every policy; the first problem rejects the set
    pub fn validate(&self) -> Result<(), PolicyError> {
        for (signal_type, policy) in &self.policies {
            policy.validate(signal_type)?;
        }
        self.posture_policy()
            .validate(&SignalType::Custom("posture".to_string()))
    }
}
