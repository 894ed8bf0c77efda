//! Severity Classifier

use tracing::debug;

use crate::error::{ConfigurationError, ValidationError};
use crate::{SignalType, ThresholdPolicy, Tier};

/// Outcome of classifying one value
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub tier: Tier,
    /// Configuration gap that forced an `Unknown` tier
    pub issue: Option<ConfigurationError>,
}

impl Classification {
    fn tier(tier: Tier) -> Self {
        Self { tier, issue: None }
    }

    fn gap(issue: ConfigurationError) -> Self {
        Self {
            tier: Tier::Unknown,
            issue: Some(issue),
        }
    }
}

/// Classify a value against an optional policy
///
/// A missing policy is not an error: the value is tagged `Unknown` and the
/// gap is returned alongside so it can be reported.
pub fn classify(
    signal_type: &SignalType,
    value: f64,
    policy: Option<&ThresholdPolicy>,
) -> Result<Classification, ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::NonFinite {
            signal_type: signal_type.clone(),
            value,
        });
    }

    let Some(policy) = policy else {
        debug!("No policy for {}, classifying as unknown", signal_type);
        return Ok(Classification::gap(ConfigurationError::MissingPolicy(
            signal_type.clone(),
        )));
    };

    if policy.boundaries.is_empty() {
        return Err(ValidationError::EmptyPolicy(signal_type.clone()));
    }

    Ok(Classification::tier(tier_for(policy, value)))
}

/// Tier for a finite value under a non-empty policy
pub fn tier_for(policy: &ThresholdPolicy, value: f64) -> Tier {
    let crossed = policy
        .boundaries
        .iter()
        .filter(|&&boundary| {
            if policy.higher_is_worse {
                value >= boundary
            } else {
                value <= boundary
            }
        })
        .count();
    Tier::from_rank(crossed + 1)
}
