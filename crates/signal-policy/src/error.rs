//! Policy and Validation Error Types

use crate::SignalType;
use thiserror::Error;

/// Errors in a single reading or policy entry
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// Reading value is NaN or infinite
    #[error("{signal_type} value {value} is not a finite number")]
    NonFinite { signal_type: SignalType, value: f64 },

    /// Reading carries no subject
    #[error("Reading for {0} has an empty subject identifier")]
    MissingSubject(SignalType),

    /// Policy has no tier boundaries
    #[error("Policy for {0} has no boundaries")]
    EmptyPolicy(SignalType),
}

/// Gaps and inconsistencies in the configured policies
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigurationError {
    /// No policy for a signal type that was observed
    #[error("No threshold policy configured for {0}")]
    MissingPolicy(SignalType),

    /// Too many boundaries for the tier scale
    #[error("Policy for {signal_type} has {count} boundaries, at most {max} allowed")]
    TooManyBoundaries {
        signal_type: SignalType,
        count: usize,
        max: usize,
    },

    /// Boundaries out of order for the comparison direction
    #[error("Policy for {signal_type} boundaries must be strictly {expected}: {boundaries:?}")]
    NonMonotonic {
        signal_type: SignalType,
        expected: &'static str,
        boundaries: Vec<f64>,
    },

    /// NaN or infinite boundary
    #[error("Policy for {signal_type} has non-finite boundary {value}")]
    NonFiniteBoundary { signal_type: SignalType, value: f64 },

    /// Negative or non-finite aggregation weight
    #[error("Policy for {signal_type} has invalid weight {weight}")]
    InvalidWeight { signal_type: SignalType, weight: f64 },
}

/// Any reason a policy set is rejected
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PolicyError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
}
