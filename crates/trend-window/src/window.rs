//! Bounded Signal Window

use std::collections::VecDeque;

/// Default window capacity (last 10 readings)
pub const DEFAULT_CAPACITY: usize = 10;

/// Fixed-capacity ring of recent values, newest last
///
/// Pushing into a full window drops the oldest value.
#[derive(Debug, Clone)]
pub struct SignalWindow {
    /// Retained values
    values: VecDeque<f64>,
    /// Capacity of the window
    capacity: usize,
    /// Total values pushed (for statistics)
    total_written: usize,
}

impl SignalWindow {
    /// Create a new window with given capacity (at least 1)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            values: VecDeque::with_capacity(capacity),
            capacity,
            total_written: 0,
        }
    }

    /// Push a value (overwrites oldest if full)
    pub fn push(&mut self, value: f64) {
        if self.values.len() == self.capacity {
            self.values.pop_front();
        }
        self.values.push_back(value);
        self.total_written += 1;
    }

    /// Retained values in arrival order (newest last)
    pub fn values(&self) -> Vec<f64> {
        self.values.iter().copied().collect()
    }

    /// Total values ever pushed, including dropped ones
    pub fn total_written(&self) -> usize {
        self.total_written
    }
}
