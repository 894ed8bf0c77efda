//! Signal Data Model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;

/// Kind of measurement a reading carries
///
/// Any name outside the built-in set parses to [`SignalType::Custom`], so an
/// unexpected type still reaches the classifier and comes out `unknown`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SignalType {
    DataDrift,
    ConceptDrift,
    ModelDrift,
    BiasScore,
    SecurityScore,
    ComplianceRate,
    ReliabilityScore,
    Custom(String),
}

impl SignalType {
    /// All built-in signal types
    pub fn builtin() -> [SignalType; 7] {
        [
            SignalType::DataDrift,
            SignalType::ConceptDrift,
            SignalType::ModelDrift,
            SignalType::BiasScore,
            SignalType::SecurityScore,
            SignalType::ComplianceRate,
            SignalType::ReliabilityScore,
        ]
    }

    /// Wire name (snake_case)
    pub fn as_str(&self) -> &str {
        match self {
            SignalType::DataDrift => "data_drift",
            SignalType::ConceptDrift => "concept_drift",
            SignalType::ModelDrift => "model_drift",
            SignalType::BiasScore => "bias_score",
            SignalType::SecurityScore => "security_score",
            SignalType::ComplianceRate => "compliance_rate",
            SignalType::ReliabilityScore => "reliability_score",
            SignalType::Custom(name) => name,
        }
    }

    /// Human-readable label for alert descriptions
    pub fn label(&self) -> String {
        match self {
            SignalType::DataDrift => "Data drift".to_string(),
            SignalType::ConceptDrift => "Concept drift".to_string(),
            SignalType::ModelDrift => "Model drift".to_string(),
            SignalType::BiasScore => "Bias score".to_string(),
            SignalType::SecurityScore => "Security score".to_string(),
            SignalType::ComplianceRate => "Compliance rate".to_string(),
            SignalType::ReliabilityScore => "Reliability score".to_string(),
            SignalType::Custom(name) => format!("Custom signal '{}'", name),
        }
    }
}

impl From<&str> for SignalType {
    fn from(name: &str) -> Self {
        match name {
            "data_drift" => SignalType::DataDrift,
            "concept_drift" => SignalType::ConceptDrift,
            "model_drift" => SignalType::ModelDrift,
            "bias_score" => SignalType::BiasScore,
            "security_score" => SignalType::SecurityScore,
            "compliance_rate" => SignalType::ComplianceRate,
            "reliability_score" => SignalType::ReliabilityScore,
            other => SignalType::Custom(other.to_string()),
        }
    }
}

impl FromStr for SignalType {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(SignalType::from(s))
    }
}

impl fmt::Display for SignalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for SignalType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for SignalType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(SignalType::from(name.as_str()))
    }
}

/// Discrete severity classification
///
/// `Unknown` sorts below `Low` but carries no rank: it means "no usable
/// classification", never "healthy".
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    #[default]
    Unknown,
    Low,
    Medium,
    High,
    Critical,
}

impl Tier {
    /// Severity rank: Low = 1 through Critical = 4
    pub fn rank(self) -> Option<u8> {
        match self {
            Tier::Unknown => None,
            Tier::Low => Some(1),
            Tier::Medium => Some(2),
            Tier::High => Some(3),
            Tier::Critical => Some(4),
        }
    }

    /// Tier for a rank, clamped to the 1..=4 scale
    pub fn from_rank(rank: usize) -> Tier {
        match rank {
            0 | 1 => Tier::Low,
            2 => Tier::Medium,
            3 => Tier::High,
            _ => Tier::Critical,
        }
    }

    pub fn is_known(self) -> bool {
        self != Tier::Unknown
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Tier::Unknown => "unknown",
            Tier::Low => "low",
            Tier::Medium => "medium",
            Tier::High => "high",
            Tier::Critical => "critical",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Short-term direction of a signal
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Rising,
    Falling,
    Stable,
    #[default]
    Unknown,
}

impl Trend {
    pub fn as_str(self) -> &'static str {
        match self {
            Trend::Rising => "rising",
            Trend::Falling => "falling",
            Trend::Stable => "stable",
            Trend::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single scalar measurement about a subject
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub subject_id: String,
    pub signal_type: SignalType,
    pub value: f64,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

impl Reading {
    /// Create a reading stamped with the current time
    pub fn new(subject_id: impl Into<String>, signal_type: SignalType, value: f64) -> Self {
        Self {
            subject_id: subject_id.into(),
            signal_type,
            value,
            timestamp: Utc::now(),
            unit: None,
        }
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    /// Dedup / window key for this reading
    pub fn key(&self) -> SignalKey {
        SignalKey::new(self.subject_id.clone(), self.signal_type.clone())
    }

    /// Check the reading can be classified at all
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.subject_id.trim().is_empty() {
            return Err(ValidationError::MissingSubject(self.signal_type.clone()));
        }
        if !self.value.is_finite() {
            return Err(ValidationError::NonFinite {
                signal_type: self.signal_type.clone(),
                value: self.value,
            });
        }
        Ok(())
    }
}

/// (subject, signal type) pair
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SignalKey {
    pub subject_id: String,
    pub signal_type: SignalType,
}

impl SignalKey {
    pub fn new(subject_id: impl Into<String>, signal_type: SignalType) -> Self {
        Self {
            subject_id: subject_id.into(),
            signal_type,
        }
    }
}

impl fmt::Display for SignalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.subject_id, self.signal_type)
    }
}

/// A reading enriched with its tier and trend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedSignal {
    pub reading: Reading,
    pub tier: Tier,
    pub trend: Trend,
}
