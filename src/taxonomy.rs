//! Hazard taxonomy and severity buckets
//!
//! The category set and the score-to-severity mapping are fixed, process-wide
//! constants. The classifier must never emit a label outside this set.

use serde::{Deserialize, Serialize};

/// Closed set of hazard category labels accepted from the classifier.
pub const HAZARD_CATEGORIES: &[&str] = &[
    "Missing PPE",
    "Fall Risk",
    "Fire or Explosion Hazard",
    "Electrical Hazard",
    "Trip or Slip Hazard",
    "Equipment Safety Issue",
    "Improper Storage",
    "Poor Housekeeping",
    "Inadequate Ventilation",
    "Chemical Exposure",
    "Structural Hazard",
    "No Visible Hazard",
    "Poor Lighting",
    "Ergonomic Hazard",
    "Struck-by Hazard",
    "Caught-in or Between Hazard",
    "Vehicle or Mobile Equipment Hazard",
];

/// Sentinel label for images that pass through the filter gate unflagged.
pub const NO_VISIBLE_HAZARD: &str = "No Visible Hazard";

pub fn is_known_category(label: &str) -> bool {
    HAZARD_CATEGORIES.contains(&label)
}

/// Risk severity bucket derived from a 0-10 risk score.
///
/// Thresholds: score < 4 is Low, < 7 is Medium, anything else High.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    pub fn from_score(score: f64) -> Self {
        if score < 4.0 {
            Severity::Low
        } else if score < 7.0 {
            Severity::Medium
        } else {
            Severity::High
        }
    }

    /// Weight used for the weighted site risk score.
    pub fn weight(&self) -> u32 {
        match self {
            Severity::Low => 1,
            Severity::Medium => 2,
            Severity::High => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "Low",
            Severity::Medium => "Medium",
            Severity::High => "High",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "Low" => Ok(Severity::Low),
            "Medium" => Ok(Severity::Medium),
            "High" => Ok(Severity::High),
            _ => Err(format!("Unknown severity: {}", s)),
        }
    }
}
