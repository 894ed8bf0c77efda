//! Trend Windows
//!
//! Keeps a bounded ring of recent values per (subject, signal type) and
//! derives a short-term direction from it.

mod detector;
mod store;
mod window;

pub use detector::{detect_trend, TrendConfig, TrendDetector, MIN_HISTORY};
pub use store::TrendStore;
pub use window::{SignalWindow, DEFAULT_CAPACITY};
