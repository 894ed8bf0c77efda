//! Trend Detection

use serde::{Deserialize, Serialize};
use signal_policy::Trend;

use crate::window::DEFAULT_CAPACITY;

/// Fewest values needed before a direction is reported
pub const MIN_HISTORY: usize = 3;

/// Trend detection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrendConfig {
    /// Relative change needed to leave `Stable` (default: 0.10)
    pub epsilon: f64,
    /// Values retained per signal (default: 10)
    pub window: usize,
}

impl Default for TrendConfig {
    fn default() -> Self {
        Self {
            epsilon: 0.10,
            window: DEFAULT_CAPACITY,
        }
    }
}

/// Direction of the newest values in `history` (newest last)
///
/// Compares the average of the older overlapping pair against the newer
/// pair from the last three values. Fewer than three values is `Unknown`.
pub fn detect_trend(history: &[f64], epsilon: f64) -> Trend {
    let n = history.len();
    if n < MIN_HISTORY {
        return Trend::Unknown;
    }

    let avg_a = (history[n - 3] + history[n - 2]) / 2.0;
    let avg_b = (history[n - 2] + history[n - 1]) / 2.0;

    if avg_b > avg_a * (1.0 + epsilon) {
        Trend::Rising
    } else if avg_b < avg_a * (1.0 - epsilon) {
        Trend::Falling
    } else {
        Trend::Stable
    }
}

/// Trend detector bound to a configuration
#[derive(Debug, Clone, Default)]
pub struct TrendDetector {
    config: TrendConfig,
}

impl TrendDetector {
    pub fn new(config: TrendConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TrendConfig {
        &self.config
    }

    pub fn detect(&self, history: &[f64]) -> Trend {
        detect_trend(history, self.config.epsilon)
    }
}
