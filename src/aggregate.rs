//! Batch aggregation
//!
//! Folds the complete per-image result set of one site+timestamp batch into
//! the site risk summary and the per-category hazard counts. Pure and
//! deterministic: the same assessments always produce the same rows,
//! regardless of upstream model nondeterminism.

use crate::error::{Result, SafetyAiError};
use crate::pipeline::ImageAssessment;
use crate::taxonomy::{Severity, NO_VISIBLE_HAZARD};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HazardCount {
    pub category: String,
    pub count: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteSummary {
    pub image_count: usize,

    /// Severity-weighted mean of the image scores, rounded to 2 decimals.
    pub weighted_risk_score: f64,

    pub site_severity: Severity,

    pub highest_image_score: u8,

    /// Counts per hazard category, "No Visible Hazard" excluded. Ordered by
    /// count descending, then label ascending.
    pub hazard_counts: Vec<HazardCount>,
}

impl SiteSummary {
    /// Aggregate a complete batch. The caller must pass every assessment that
    /// finished for this batch; an empty set is rejected, never computed.
    pub fn from_assessments(site_id: &str, assessments: &[ImageAssessment]) -> Result<Self> {
        if assessments.is_empty() {
            return Err(SafetyAiError::EmptyBatch(site_id.to_string()));
        }

        // Weighted site score: Σ(score·w) / Σ(w), w = severity weight
        let weight_sum: u32 = assessments.iter().map(|a| a.severity.weight()).sum();
        let weighted_sum: u32 = assessments
            .iter()
            .map(|a| a.score as u32 * a.severity.weight())
            .sum();
        let weighted = weighted_sum as f64 / weight_sum as f64;

        let site_severity = Severity::from_score(weighted);

        let highest_image_score = assessments.iter().map(|a| a.score).max().unwrap_or(0);

        let mut counter: HashMap<&str, u32> = HashMap::new();
        for assessment in assessments {
            for category in &assessment.hazard_categories {
                if category != NO_VISIBLE_HAZARD {
                    *counter.entry(category.as_str()).or_insert(0) += 1;
                }
            }
        }

        let mut hazard_counts: Vec<HazardCount> = counter
            .into_iter()
            .map(|(category, count)| HazardCount {
                category: category.to_string(),
                count,
            })
            .collect();
        hazard_counts.sort_by(|a, b| b.count.cmp(&a.count).then(a.category.cmp(&b.category)));

        Ok(Self {
            image_count: assessments.len(),
            weighted_risk_score: round2(weighted),
            site_severity,
            highest_image_score,
            hazard_counts,
        })
    }

    /// Frequency summary for the prioritization prompt,
    /// e.g. `"Fall Risk (3), Missing PPE (1)"`.
    pub fn hazard_summary_line(&self) -> String {
        self.hazard_counts
            .iter()
            .map(|h| format!("{} ({})", h.category, h.count))
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn has_hazards(&self) -> bool {
        !self.hazard_counts.is_empty()
    }
}

/// Concatenated recommended-action text from every actionable image, the
/// second input to the prioritization prompt.
pub fn collect_actions_text(assessments: &[ImageAssessment]) -> String {
    assessments
        .iter()
        .filter(|a| a.has_potential_hazard)
        .filter_map(|a| a.recommended_actions.as_deref())
        .collect::<Vec<_>>()
        .join("\n")
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
