use serde::{Deserialize, Serialize};

use super::super::domain::ReportStatus;

pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.9;
pub const DEFAULT_URGENT_CUTOFF: f64 = 60.0;

/// Minimum classifier confidence, as a probability in `[0, 1]`, for a NEGATIVE fragment
/// to count as a distress signal. Comparison is inclusive (`score >= threshold`).
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct ConfidenceThreshold(f64);

impl ConfidenceThreshold {
    pub fn new(value: f64) -> Result<Self, PolicyError> {
        if value.is_finite() && (0.0..=1.0).contains(&value) {
            Ok(Self(value))
        } else {
            Err(PolicyError::ThresholdOutOfRange(value))
        }
    }

    pub const fn value(self) -> f64 {
        self.0
    }

    pub fn admits(self, score: f64) -> bool {
        score >= self.0
    }
}

impl Default for ConfidenceThreshold {
    fn default() -> Self {
        Self(DEFAULT_CONFIDENCE_THRESHOLD)
    }
}

impl TryFrom<f64> for ConfidenceThreshold {
    type Error = PolicyError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ConfidenceThreshold> for f64 {
    fn from(value: ConfidenceThreshold) -> Self {
        value.0
    }
}

/// Distress percentage, in `[0, 100]`, above which a report is escalated to Urgent.
/// Comparison is strict (`percentage > cutoff`) for fresh scores and backfill alike.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct UrgentCutoff(f64);

impl UrgentCutoff {
    pub fn new(value: f64) -> Result<Self, PolicyError> {
        if value.is_finite() && (0.0..=100.0).contains(&value) {
            Ok(Self(value))
        } else {
            Err(PolicyError::CutoffOutOfRange(value))
        }
    }

    pub const fn value(self) -> f64 {
        self.0
    }

    pub fn is_urgent(self, distress_percentage: f64) -> bool {
        distress_percentage > self.0
    }

    pub fn status_for(self, distress_percentage: f64) -> ReportStatus {
        if self.is_urgent(distress_percentage) {
            ReportStatus::Urgent
        } else {
            ReportStatus::Pending
        }
    }
}

impl Default for UrgentCutoff {
    fn default() -> Self {
        Self(DEFAULT_URGENT_CUTOFF)
    }
}

impl TryFrom<f64> for UrgentCutoff {
    type Error = PolicyError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<UrgentCutoff> for f64 {
    fn from(value: UrgentCutoff) -> Self {
        value.0
    }
}

/// Thresholds shared by the scorer, the report service and the startup backfill.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoringPolicy {
    pub confidence_threshold: ConfidenceThreshold,
    pub urgent_cutoff: UrgentCutoff,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PolicyError {
    #[error("confidence threshold {0} must be within [0, 1]")]
    ThresholdOutOfRange(f64),
    #[error("urgent cutoff {0} must be within [0, 100]")]
    CutoffOutOfRange(f64),
}
