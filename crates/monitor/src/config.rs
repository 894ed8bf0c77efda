//! Engine Configuration

use alerting::AlertConfig;
use posture::AggregationMode;
use serde::{Deserialize, Serialize};
use signal_policy::PolicySet;
use std::time::Duration;
use trend_window::TrendConfig;

/// Monitoring loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Processing interval in milliseconds (default: 5000)
    pub interval_ms: u64,
    /// Queued batches before submitters wait (default: 256)
    pub queue_capacity: usize,
    /// Process each batch as soon as it is submitted instead of waiting
    /// for the next tick (default: true)
    pub process_on_push: bool,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval_ms: 5000,
            queue_capacity: 256,
            process_on_push: true,
        }
    }
}

impl MonitorConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms.max(1))
    }
}

/// Complete engine configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Posture combination rule
    pub aggregation: AggregationMode,
    pub trend: TrendConfig,
    pub alerts: AlertConfig,
    pub monitor: MonitorConfig,
    /// Threshold policies (default: built-in governance table)
    pub policies: Option<PolicySet>,
}

impl EngineConfig {
    /// Configured policies or the built-in defaults
    pub fn policy_set(&self) -> PolicySet {
        self.policies
            .clone()
            .unwrap_or_else(PolicySet::governance_defaults)
    }
}
