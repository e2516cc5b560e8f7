pub mod csv;
pub mod html;

use crate::cli::ReportFormat;
use crate::error::Result;
use crate::pipeline::SiteAssessment;
use std::path::Path;

fn output_path_for_format(output: &Path, stem: &str, extension: &str) -> std::path::PathBuf {
    if output.is_dir() || output.extension().is_none() {
        output.join(format!("{}.{}", stem, extension))
    } else {
        output.to_path_buf()
    }
}

fn output_paths_for_both(output: &Path, stem: &str) -> (std::path::PathBuf, std::path::PathBuf) {
    if output.is_dir() || output.extension().is_none() {
        let html_path = output.join(format!("{}.html", stem));
        let csv_path = output.join(format!("{}_corrective_actions_checklist.csv", stem));
        (html_path, csv_path)
    } else {
        let parent = output.parent().unwrap_or_else(|| Path::new("."));
        let file_stem = output
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(stem);
        let html_path = parent.join(format!("{}.html", file_stem));
        let csv_path = parent.join(format!("{}_corrective_actions_checklist.csv", file_stem));
        (html_path, csv_path)
    }
}

pub fn export_assessment(
    assessment: &SiteAssessment,
    format: &ReportFormat,
    output_dir: &Path,
) -> Result<()> {
    let stem = format!("site_safety_report_{}", assessment.site_id);

    match format {
        ReportFormat::Html => {
            let output_path = output_path_for_format(output_dir, &stem, "html");
            println!("- Generating HTML report...");
            std::fs::write(&output_path, html::generate_html(assessment))?;
            println!("✔ HTML report: {}", output_path.display());
        }
        ReportFormat::Csv => {
            let output_path = output_path_for_format(output_dir, &stem, "csv");
            println!("- Generating corrective actions checklist...");
            match csv::generate_checklist(assessment) {
                Some(checklist) => {
                    std::fs::write(&output_path, checklist)?;
                    println!("✔ Checklist: {}", output_path.display());
                }
                None => println!("- No corrective actions available for a checklist"),
            }
        }
        ReportFormat::Both => {
            let (html_path, csv_path) = output_paths_for_both(output_dir, &stem);

            println!("- Generating HTML report...");
            std::fs::write(&html_path, html::generate_html(assessment))?;
            println!("✔ HTML report: {}", html_path.display());

            println!("- Generating corrective actions checklist...");
            match csv::generate_checklist(assessment) {
                Some(checklist) => {
                    std::fs::write(&csv_path, checklist)?;
                    println!("✔ Checklist: {}", csv_path.display());
                }
                None => println!("- No corrective actions available for a checklist"),
            }
        }
    }

    Ok(())
}
