use crate::aggregate::SiteSummary;
use crate::taxonomy::Severity;
use serde::{Deserialize, Serialize};

/// Per-image result of the inspection pipeline.
///
/// For images the filter gate marks non-actionable, `detected_hazards` and
/// `recommended_actions` stay empty by construction — no downstream call is
/// ever made for them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageAssessment {
    /// Original upload name.
    pub file_name: String,

    /// Content-addressed name within the stage.
    pub staged_name: String,

    #[serde(default)]
    pub staged_path: String,

    #[serde(default)]
    pub captured_at: Option<String>,

    pub has_potential_hazard: bool,

    /// 0-10 integer risk score; 0 for non-actionable images.
    pub score: u8,

    pub severity: Severity,

    /// Subset of the fixed hazard taxonomy.
    pub hazard_categories: Vec<String>,

    #[serde(default)]
    pub detected_hazards: Option<String>,

    #[serde(default)]
    pub recommended_actions: Option<String>,

    pub risk_explanation: String,
}

/// Complete assessment of one inspection batch, the saved JSON artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteAssessment {
    pub site_id: String,

    /// Local timestamp in the configured offset, `YYYY-MM-DD HH:MM:SS`.
    pub inspection_ts: String,

    pub model: String,

    pub images: Vec<ImageAssessment>,

    pub summary: SiteSummary,

    /// Cleaned top-3 corrective actions, highest priority first. `None` when
    /// no image passed the filter gate.
    #[serde(default)]
    pub prioritized_actions: Option<Vec<String>>,

    /// Raw prioritization reply, kept for manual review when the 3-bullet
    /// contract was violated.
    #[serde(default)]
    pub raw_prioritized_actions: Option<String>,
}
