//! Alert Error Types

use crate::AlertStatus;
use thiserror::Error;

/// Errors from manual alert operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AlertError {
    /// No alert with this id
    #[error("Alert not found: {0}")]
    NotFound(String),

    /// Status change not allowed by the lifecycle
    #[error("Alert {id} cannot move from {from} to {to}")]
    InvalidTransition {
        id: String,
        from: AlertStatus,
        to: AlertStatus,
    },
}
