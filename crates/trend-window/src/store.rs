//! Keyed Window Store

use parking_lot::{Mutex, RwLock};
use signal_policy::{SignalKey, Trend};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::detector::{TrendConfig, TrendDetector};
use crate::window::SignalWindow;

/// Trend windows for every (subject, signal type) seen
///
/// The map lock is only held to look up or insert a window; each window has
/// its own lock, so different keys never wait on each other.
#[derive(Debug, Default)]
pub struct TrendStore {
    detector: TrendDetector,
    windows: RwLock<HashMap<SignalKey, Arc<Mutex<SignalWindow>>>>,
}

impl TrendStore {
    pub fn new(config: TrendConfig) -> Self {
        Self {
            detector: TrendDetector::new(config),
            windows: RwLock::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &TrendConfig {
        self.detector.config()
    }

    /// Get or create the window for a key
    fn window(&self, key: &SignalKey) -> Arc<Mutex<SignalWindow>> {
        // Fast path: check if it exists
        {
            let windows = self.windows.read();
            if let Some(window) = windows.get(key) {
                return window.clone();
            }
        }

        // Slow path: create it
        let mut windows = self.windows.write();
        windows
            .entry(key.clone())
            .or_insert_with(|| {
                debug!("Creating trend window for {}", key);
                Arc::new(Mutex::new(SignalWindow::new(self.detector.config().window)))
            })
            .clone()
    }

    /// Append a value and return the resulting trend
    pub fn record(&self, key: &SignalKey, value: f64) -> Trend {
        let window = self.window(key);
        let mut window = window.lock();
        window.push(value);
        self.detector.detect(&window.values())
    }

    /// Current trend for a key, `Unknown` if never seen
    pub fn trend(&self, key: &SignalKey) -> Trend {
        let history = self.history(key);
        if history.is_empty() {
            return Trend::Unknown;
        }
        self.detector.detect(&history)
    }

    /// Retained values for a key (newest last)
    pub fn history(&self, key: &SignalKey) -> Vec<f64> {
        let Some(window) = self.windows.read().get(key).cloned() else {
            return Vec::new();
        };
        let values = window.lock().values();
        values
    }

    /// Readings ever recorded for a key, including ones dropped from the
    /// window
    pub fn observations(&self, key: &SignalKey) -> usize {
        let Some(window) = self.windows.read().get(key).cloned() else {
            return 0;
        };
        let total = window.lock().total_written();
        total
    }

    /// Number of tracked keys
    pub fn len(&self) -> usize {
        self.windows.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use signal_policy::SignalType;

    fn key(subject: &str) -> SignalKey {
        SignalKey::new(subject, SignalType::DataDrift)
    }

    #[test]
    fn test_unknown_until_three_readings() {
        let store = TrendStore::default();
        let k = key("model-a");

        assert_eq!(store.trend(&k), Trend::Unknown);
        assert_eq!(store.record(&k, 0.02), Trend::Unknown);
        assert_eq!(store.record(&k, 0.05), Trend::Unknown);
        assert_ne!(store.record(&k, 0.08), Trend::Unknown);
    }

    #[test]
    fn test_drift_scenario_trend() {
        let store = TrendStore::default();
        let k = key("model-a");
        let trends: Vec<Trend> = [0.02, 0.05, 0.08, 0.12]
            .iter()
            .map(|&v| store.record(&k, v))
            .collect();
        assert_eq!(trends[3], Trend::Rising);
        assert_eq!(store.trend(&k), Trend::Rising);
    }

    #[test]
    fn test_window_is_bounded() {
        let store = TrendStore::new(TrendConfig {
            window: 5,
            ..TrendConfig::default()
        });
        let k = key("model-a");
        for i in 0..50 {
            store.record(&k, i as f64);
        }
        assert_eq!(store.history(&k), vec![45.0, 46.0, 47.0, 48.0, 49.0]);
        assert_eq!(store.observations(&k), 50);
    }

    #[test]
    fn test_keys_are_independent() {
        let store = TrendStore::default();
        for v in [1.0, 2.0, 4.0] {
            store.record(&key("model-a"), v);
        }
        store.record(&key("model-b"), 9.0);

        assert_eq!(store.trend(&key("model-a")), Trend::Rising);
        assert_eq!(store.trend(&key("model-b")), Trend::Unknown);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_reads_do_not_create_windows() {
        let store = TrendStore::default();
        assert_eq!(store.trend(&key("ghost")), Trend::Unknown);
        assert!(store.history(&key("ghost")).is_empty());
        assert_eq!(store.observations(&key("ghost")), 0);
        assert!(store.is_empty());
    }

    #[test]
    fn test_concurrent_keys() {
        let store = Arc::new(TrendStore::default());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = store.clone();
                std::thread::spawn(move || {
                    let k = key(&format!("model-{}", i));
                    for v in 0..100 {
                        store.record(&k, v as f64);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(store.len(), 8);
        assert_eq!(store.history(&key("model-3")).len(), 10);
    }
}
