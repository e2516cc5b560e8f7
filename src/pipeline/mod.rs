//! Inspection pipeline
//!
//! Strictly sequential per-image flow: stage, filter gate, then (only for
//! actionable images) classification, risk scoring, hazard listing, corrective
//! actions, and the risk explanation. A failed image is skipped with a
//! warning; it never aborts the rest of the batch and never contributes
//! downstream rows.

mod cache;
mod types;

pub use cache::CacheFile;
pub use types::{ImageAssessment, SiteAssessment};

use crate::error::{Result, SafetyAiError};
use crate::parser;
use crate::prompts;
use crate::provider::{generate_with_retry, GenerativeProvider, GenerativeRequest};
use crate::scanner::ImageInfo;
use crate::stage::{compute_file_hash, Stage, StagedImage};
use crate::taxonomy::{Severity, HAZARD_CATEGORIES, NO_VISIBLE_HAZARD};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;

/// Documented service limit on images per generative request.
pub const SERVICE_MAX_BATCH: usize = 20;

pub async fn analyze_images(
    provider: &dyn GenerativeProvider,
    stage: &Stage,
    images: &[ImageInfo],
    batch_size: usize,
) -> Result<Vec<ImageAssessment>> {
    let batch_size = batch_size.clamp(1, SERVICE_MAX_BATCH);
    let bar = progress_bar(images.len());
    let mut results = Vec::new();

    for (batch_idx, batch) in images.chunks(batch_size).enumerate() {
        tracing::debug!(batch = batch_idx + 1, images = batch.len(), "analyzing batch");

        for image in batch {
            match stage_and_analyze(provider, stage, image).await {
                Ok(assessment) => results.push(assessment),
                // Per-image failure: skip and log, never substitute a default
                Err(e) => {
                    tracing::warn!(image = %image.file_name, error = %e, "image skipped");
                }
            }
            bar.inc(1);
        }
    }

    bar.finish_and_clear();
    Ok(results)
}

/// Like [`analyze_images`], but unchanged images are served from the folder's
/// analysis cache instead of hitting the service again.
pub async fn analyze_images_with_cache(
    provider: &dyn GenerativeProvider,
    stage: &Stage,
    images: &[ImageInfo],
    folder: &Path,
    batch_size: usize,
) -> Result<Vec<ImageAssessment>> {
    let batch_size = batch_size.clamp(1, SERVICE_MAX_BATCH);
    let mut cache = CacheFile::load(folder);
    let bar = progress_bar(images.len());
    let mut results = Vec::new();

    for batch in images.chunks(batch_size) {
        for image in batch {
            let hash = match compute_file_hash(&image.path) {
                Ok(h) => h,
                Err(e) => {
                    tracing::warn!(image = %image.file_name, error = %e, "image skipped");
                    bar.inc(1);
                    continue;
                }
            };

            if let Some(cached) = cache.get(&hash) {
                tracing::debug!(image = %image.file_name, "cache hit");
                results.push(cached.clone());
                bar.inc(1);
                continue;
            }

            match stage_and_analyze(provider, stage, image).await {
                Ok(assessment) => {
                    let file_size = std::fs::metadata(&image.path).map(|m| m.len()).unwrap_or(0);
                    cache.insert(hash, image.file_name.clone(), file_size, assessment.clone());
                    results.push(assessment);
                }
                Err(e) => {
                    tracing::warn!(image = %image.file_name, error = %e, "image skipped");
                }
            }
            bar.inc(1);
        }
    }

    bar.finish_and_clear();
    cache.save(folder)?;
    Ok(results)
}

async fn stage_and_analyze(
    provider: &dyn GenerativeProvider,
    stage: &Stage,
    image: &ImageInfo,
) -> Result<ImageAssessment> {
    let staged = stage.put(image)?;
    analyze_one(provider, &staged).await
}

/// Analyze one staged image. The filter gate runs first; a `false` verdict
/// short-circuits every other generative call.
async fn analyze_one(
    provider: &dyn GenerativeProvider,
    staged: &StagedImage,
) -> Result<ImageAssessment> {
    let filter_request = GenerativeRequest::with_image(prompts::build_filter_prompt(), staged);
    let has_potential_hazard =
        call_and_parse(provider, &filter_request, parser::parse_filter_reply).await?;

    if !has_potential_hazard {
        return Ok(non_actionable(staged));
    }

    let score_request = GenerativeRequest::with_image(prompts::RISK_SCORE_PROMPT, staged);
    let score = call_and_parse(provider, &score_request, parser::parse_risk_score).await?;

    let classify_request = GenerativeRequest::with_image(
        prompts::build_classify_prompt(HAZARD_CATEGORIES, prompts::CLASSIFY_TASK_DESCRIPTION),
        staged,
    );
    let hazard_categories =
        call_and_parse(provider, &classify_request, parser::parse_labels).await?;

    let hazards_request = GenerativeRequest::with_image(prompts::DETECTED_HAZARDS_PROMPT, staged);
    let detected_hazards = generate_with_retry(provider, &hazards_request).await?;

    let actions_request =
        GenerativeRequest::with_image(prompts::RECOMMENDED_ACTIONS_PROMPT, staged);
    let recommended_actions = generate_with_retry(provider, &actions_request).await?;

    let explanation_request =
        GenerativeRequest::with_image(prompts::RISK_EXPLANATION_PROMPT, staged);
    let risk_explanation =
        parser::clean_explanation(&generate_with_retry(provider, &explanation_request).await?);

    Ok(ImageAssessment {
        file_name: staged.source_name.clone(),
        staged_name: staged.file_name.clone(),
        staged_path: staged.path.display().to_string(),
        captured_at: staged.captured_at.clone(),
        has_potential_hazard: true,
        score,
        severity: Severity::from_score(score as f64),
        hazard_categories,
        detected_hazards: Some(detected_hazards),
        recommended_actions: Some(recommended_actions),
        risk_explanation,
    })
}

/// Site-wide top-3 prioritization over the aggregate.
///
/// A reply that violates the exactly-3-bullets contract (after one re-prompt)
/// is returned with `actions: None` and the raw text preserved for manual
/// review; the violation is flagged, not fatal.
pub struct PrioritizedActions {
    pub actions: Option<Vec<String>>,
    pub raw: String,
}

pub async fn prioritize_actions(
    provider: &dyn GenerativeProvider,
    hazard_summary: &str,
    all_actions_text: &str,
) -> Result<PrioritizedActions> {
    let request = GenerativeRequest::text(prompts::build_prioritized_actions_prompt(
        hazard_summary,
        all_actions_text,
    ));

    let raw = generate_with_retry(provider, &request).await?;
    match parser::parse_prioritized_actions(&raw) {
        Ok(actions) => Ok(PrioritizedActions {
            actions: Some(actions),
            raw,
        }),
        Err(SafetyAiError::FormatViolation(msg)) => {
            tracing::warn!(%msg, "prioritization contract violated, re-prompting once");
            let raw = generate_with_retry(provider, &request).await?;
            match parser::parse_prioritized_actions(&raw) {
                Ok(actions) => Ok(PrioritizedActions {
                    actions: Some(actions),
                    raw,
                }),
                Err(SafetyAiError::FormatViolation(msg)) => {
                    tracing::warn!(%msg, "prioritization flagged for manual review");
                    Ok(PrioritizedActions { actions: None, raw })
                }
                Err(e) => Err(e),
            }
        }
        Err(e) => Err(e),
    }
}

/// Result recorded for images the filter gate marks non-actionable.
fn non_actionable(staged: &StagedImage) -> ImageAssessment {
    ImageAssessment {
        file_name: staged.source_name.clone(),
        staged_name: staged.file_name.clone(),
        staged_path: staged.path.display().to_string(),
        captured_at: staged.captured_at.clone(),
        has_potential_hazard: false,
        score: 0,
        severity: Severity::Low,
        hazard_categories: vec![NO_VISIBLE_HAZARD.to_string()],
        detected_hazards: None,
        recommended_actions: None,
        risk_explanation: prompts::NON_ACTIONABLE_EXPLANATION.to_string(),
    }
}

/// Run one call and parse its reply; a format violation earns a single
/// re-prompt before the violation is surfaced.
async fn call_and_parse<T, F>(
    provider: &dyn GenerativeProvider,
    request: &GenerativeRequest,
    parse: F,
) -> Result<T>
where
    F: Fn(&str) -> Result<T>,
{
    let reply = generate_with_retry(provider, request).await?;
    match parse(&reply) {
        Ok(value) => Ok(value),
        Err(SafetyAiError::FormatViolation(msg)) => {
            tracing::warn!(%msg, "format contract violated, re-prompting once");
            let reply = generate_with_retry(provider, request).await?;
            parse(&reply)
        }
        Err(e) => Err(e),
    }
}

fn progress_bar(len: usize) -> ProgressBar {
    let bar = ProgressBar::new(len as u64);
    bar.set_style(
        ProgressStyle::with_template("  [{bar:30}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> "),
    );
    bar
}
