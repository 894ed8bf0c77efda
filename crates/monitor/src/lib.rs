//! Risk Monitoring Engine
//!
//! Drives readings through classify → trend → aggregate → alert, either
//! directly through [`RiskEngine`] or periodically through
//! [`MonitoringLoop`].

mod config;
mod engine;
mod error;
mod monitor_loop;
mod report;

pub use config::{EngineConfig, MonitorConfig};
pub use engine::RiskEngine;
pub use error::EngineError;
pub use monitor_loop::{MonitoringLoop, ReadingSubmitter};
pub use report::{CycleReport, Diagnostic, DiagnosticKind, SubjectOutcome};
