//! Engine Error Types

use alerting::AlertError;
use signal_policy::PolicyError;
use thiserror::Error;

/// Errors surfaced by the engine facade
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    /// Policy set rejected as a whole
    #[error("Invalid policy set: {0}")]
    InvalidPolicies(#[from] PolicyError),

    /// Alert operation failed
    #[error(transparent)]
    Alert(#[from] AlertError),

    /// Monitoring loop is no longer accepting readings
    #[error("Reading queue is closed")]
    QueueClosed,

    /// Monitoring loop queue is at capacity
    #[error("Reading queue is full")]
    QueueFull,
}
