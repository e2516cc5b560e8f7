//! Corrective actions checklist (CSV)
//!
//! One row per unique corrective action across all actionable images, with
//! empty follow-up columns for the site team to fill in.

use crate::parser;
use crate::pipeline::SiteAssessment;

const HEADER: &str = "Corrective Action,Completed (Yes/No),Responsible Person,Target Date,Remarks";

/// Build the deduplicated checklist. Returns `None` when no actionable image
/// contributed an action.
pub fn generate_checklist(assessment: &SiteAssessment) -> Option<String> {
    let mut seen = std::collections::HashSet::new();
    let mut rows = Vec::new();

    for image in &assessment.images {
        if !image.has_potential_hazard {
            continue;
        }
        let Some(actions) = &image.recommended_actions else {
            continue;
        };

        for action in parser::clean_bullet_lines(actions) {
            if seen.insert(action.clone()) {
                rows.push(action);
            }
        }
    }

    if rows.is_empty() {
        return None;
    }

    let mut csv = String::from(HEADER);
    csv.push('\n');
    for action in rows {
        csv.push_str(&format!("{},,,,\n", escape_field(&action)));
    }

    Some(csv)
}

/// RFC 4180 field quoting.
fn escape_field(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
