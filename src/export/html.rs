//! Site safety report (HTML)
//!
//! Self-contained report: inspection metadata, an image-level summary table
//! with embedded thumbnails, the hazard frequency list, and the prioritized
//! corrective actions.

use crate::parser;
use crate::pipeline::{ImageAssessment, SiteAssessment};
use base64::Engine;
use image::codecs::jpeg::JpegEncoder;
use rayon::prelude::*;
use std::collections::HashMap;
use std::path::Path;

// Thumbnail bounds, matching the medium export quality tier
const THUMB_MAX_PX: u32 = 800;
const THUMB_JPEG_QUALITY: u8 = 75;

pub fn generate_html(assessment: &SiteAssessment) -> String {
    let thumbnails = encode_thumbnails(&assessment.images);

    let mut html = format!(
        r#"<html>
<head>
    <title>Site Safety Report</title>
    <style>
        body {{ font-family: Arial, sans-serif; line-height: 1.6; padding: 24px; }}
        h1 {{ margin-bottom: 4px; }}
        h2 {{ margin-top: 32px; }}
        table {{ border-collapse: collapse; width: 100%; margin-top: 12px; }}
        th, td {{ border: 1px solid #ccc; padding: 8px; vertical-align: top; }}
        th {{ background: #f3f4f6; }}
        .meta {{ margin-bottom: 16px; }}
        .severity {{ font-weight: bold; }}
    </style>
</head>

<body>

<h1>Site Safety Report</h1>

<div class="meta">
    <p><b>Site ID:</b> {site_id}</p>
    <p><b>Assessment Time:</b> {ts}</p>
    <p><b>Weighted Site Risk Score:</b> {score}</p>
    <p><b>Site Severity:</b> <span class="severity">{severity}</span></p>
</div>

<h2>Image-Level Summary</h2>

<table>
    <tr>
        <th>Image</th>
        <th>Risk</th>
        <th>Severity</th>
        <th>Hazards</th>
    </tr>
"#,
        site_id = escape(&assessment.site_id),
        ts = escape(&assessment.inspection_ts),
        score = assessment.summary.weighted_risk_score,
        severity = assessment.summary.site_severity,
    );

    for image in &assessment.images {
        let thumb = thumbnails
            .get(&image.staged_name)
            .map(|data| format!(r#"<img src="{data}" width="160"/><br/>"#))
            .unwrap_or_default();

        html.push_str(&format!(
            r#"    <tr>
        <td>{thumb}{name}</td>
        <td>{score}</td>
        <td>{severity}</td>
        <td>{hazards}</td>
    </tr>
"#,
            name = escape(&image.file_name),
            score = image.score,
            severity = image.severity,
            hazards = escape(&image.hazard_categories.join(", ")),
        ));
    }

    html.push_str("</table>\n\n<h2>Most Frequent Hazards</h2>\n<ul>\n");

    if assessment.summary.hazard_counts.is_empty() {
        html.push_str("    <li>No hazards identified in this inspection</li>\n");
    } else {
        for hazard in &assessment.summary.hazard_counts {
            html.push_str(&format!(
                "    <li>{}: {} images</li>\n",
                escape(&hazard.category),
                hazard.count
            ));
        }
    }

    html.push_str("</ul>\n\n<h2>Top 3 Prioritized Corrective Actions</h2>\n");

    match &assessment.prioritized_actions {
        Some(actions) if !actions.is_empty() => {
            html.push_str("<ul>\n");
            for action in actions {
                html.push_str(&format!(
                    "    <li>{}</li>\n",
                    parser::bold_to_strong(&escape(action))
                ));
            }
            html.push_str("</ul>\n");
        }
        _ => {
            html.push_str("<p>No prioritized corrective actions generated.</p>\n");
        }
    }

    html.push_str(
        r#"
<p style="margin-top:32px; font-size:12px; color:#666;">
    This report was generated automatically from visible site conditions
    and is intended to assist safety inspections.
</p>

</body>
</html>
"#,
    );

    html
}

/// Downscale and embed every readable staged image as a JPEG data URL.
/// Unreadable images simply have no thumbnail in the report.
fn encode_thumbnails(images: &[ImageAssessment]) -> HashMap<String, String> {
    images
        .par_iter()
        .filter_map(|image| {
            let data = thumbnail_data_url(Path::new(&image.staged_path))?;
            Some((image.staged_name.clone(), data))
        })
        .collect()
}

fn thumbnail_data_url(path: &Path) -> Option<String> {
    let img = image::open(path).ok()?;
    let thumb = img.thumbnail(THUMB_MAX_PX, THUMB_MAX_PX);

    let mut bytes = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut bytes, THUMB_JPEG_QUALITY);
    thumb.to_rgb8().write_with_encoder(encoder).ok()?;

    Some(format!(
        "data:image/jpeg;base64,{}",
        base64::engine::general_purpose::STANDARD.encode(bytes)
    ))
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::SiteSummary;
    use crate::taxonomy::Severity;

    fn sample_assessment() -> SiteAssessment {
        let images = vec![ImageAssessment {
            file_name: "scaffold.jpg".into(),
            staged_name: "IMG_deadbeef.jpg".into(),
            staged_path: "/nonexistent/IMG_deadbeef.jpg".into(),
            captured_at: None,
            has_potential_hazard: true,
            score: 8,
            severity: Severity::High,
            hazard_categories: vec!["Fall Risk".into()],
            detected_hazards: Some("- **Unguarded edge**".into()),
            recommended_actions: Some("- Install guardrails".into()),
            risk_explanation: "Workers near an unguarded edge.".into(),
        }];
        let summary = SiteSummary::from_assessments("SITE_A", &images).unwrap();

        SiteAssessment {
            site_id: "SITE_A".into(),
            inspection_ts: "2026-08-07 14:00:00".into(),
            model: "m".into(),
            images,
            summary,
            prioritized_actions: Some(vec![
                "Install **guardrails**".into(),
                "Issue hard hats".into(),
                "Rope off the excavation".into(),
            ]),
            raw_prioritized_actions: None,
        }
    }

    #[test]
    fn test_report_contains_meta_and_rows() {
        let html = generate_html(&sample_assessment());
        assert!(html.contains("<h1>Site Safety Report</h1>"));
        assert!(html.contains("SITE_A"));
        assert!(html.contains("scaffold.jpg"));
        assert!(html.contains("Fall Risk: 1 images"));
        assert!(html.contains("<strong>guardrails</strong>"));
    }

    #[test]
    fn test_report_without_actions() {
        let mut assessment = sample_assessment();
        assessment.prioritized_actions = None;
        let html = generate_html(&assessment);
        assert!(html.contains("No prioritized corrective actions generated."));
    }

    #[test]
    fn test_unreadable_image_has_no_thumbnail() {
        let html = generate_html(&sample_assessment());
        assert!(!html.contains("data:image/jpeg;base64"));
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape("a<b>&c"), "a&lt;b&gt;&amp;c");
    }
}
