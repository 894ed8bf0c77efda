//! Signal Policy
//!
//! Provides the shared signal data model, threshold policies, and the
//! severity classifier used by every other stage of the risk engine.

mod classifier;
mod error;
mod policy;
mod signal;

pub use classifier::{classify, tier_for, Classification};
pub use error::{ConfigurationError, PolicyError, ValidationError};
pub use policy::{PolicySet, ThresholdPolicy, MAX_BOUNDARIES};
pub use signal::{ClassifiedSignal, Reading, SignalKey, SignalType, Tier, Trend};
