//! Alerting System
//!
//! Owns the alert lifecycle: creation when a signal crosses the alertable
//! tier, deduplication per (subject, signal type), escalation, hysteresis
//! based auto-resolution, manual status transitions, and triage queries.

mod alert;
mod error;
mod filter;
mod manager;

pub use alert::{Alert, AlertStatus, AlertTransition, TransitionKind};
pub use error::AlertError;
pub use filter::AlertFilter;
pub use manager::{AlertConfig, AlertManager, AlertSummary, SeverityCounts};
