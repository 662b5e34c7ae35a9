//! Confidence tiers for similarity scores.
//!
//! Two independent axes: the descriptive label a score earns, and the
//! configured floor a score must clear to be shown at all. The label
//! mapping is fixed; only the floor is deployment (or per-collection)
//! configurable.

use serde::{Deserialize, Serialize};

/// Descriptive confidence tier, derived purely from the score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceLabel {
    VeryLow,
    Low,
    Moderate,
    High,
    Highest,
}

impl ConfidenceLabel {
    /// Fixed mapping: ≥0.9 Highest, ≥0.8 High, ≥0.7 Moderate,
    /// ≥0.6 Low, else VeryLow.
    pub fn from_similarity(similarity: f32) -> Self {
        let s = sanitize(similarity);
        if s >= 0.9 {
            Self::Highest
        } else if s >= 0.8 {
            Self::High
        } else if s >= 0.7 {
            Self::Moderate
        } else if s >= 0.6 {
            Self::Low
        } else {
            Self::VeryLow
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::VeryLow => "Very Low",
            Self::Low => "Low",
            Self::Moderate => "Moderate",
            Self::High => "High",
            Self::Highest => "Highest",
        }
    }
}

impl std::fmt::Display for ConfidenceLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Named retrieval floor a result must clear to be returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceThreshold {
    Off,
    Lowest,
    #[default]
    Low,
    High,
    Highest,
}

impl ConfidenceThreshold {
    pub fn floor(&self) -> f32 {
        match self {
            Self::Off => 0.0,
            Self::Lowest => 0.5,
            Self::Low => 0.6,
            Self::High => 0.75,
            Self::Highest => 0.85,
        }
    }

    /// Parse a configured level name ("off", "lowest", "low", "high",
    /// "highest").
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "off" => Some(Self::Off),
            "lowest" => Some(Self::Lowest),
            "low" => Some(Self::Low),
            "high" => Some(Self::High),
            "highest" => Some(Self::Highest),
            _ => None,
        }
    }
}

/// Classify a similarity score: its descriptive label, and whether it
/// clears the given threshold. Malformed input (NaN, out of range)
/// defaults to 0.0 rather than erroring.
pub fn classify(similarity: f32, threshold: ConfidenceThreshold) -> (ConfidenceLabel, bool) {
    let s = sanitize(similarity);
    (ConfidenceLabel::from_similarity(s), s >= threshold.floor())
}

fn sanitize(similarity: f32) -> f32 {
    if similarity.is_finite() {
        similarity.clamp(0.0, 1.0)
    } else {
        0.0
    }
}
