use chrono::{FixedOffset, Utc};
use clap::Parser;
use site_safety_ai::{
    aggregate, cli, config, error, export, history, notify, pipeline, provider, scanner, stage,
    taxonomy,
};
use cli::{Cli, Commands};
use config::Config;
use error::{Result, SafetyAiError};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let config = Config::load()?;

    match cli.command {
        Commands::Inspect {
            folder,
            site,
            output,
            batch_size,
            format,
            use_cache,
            no_email,
        } => {
            println!("🦺 site-safety-ai - site inspection\n");

            let site = site.trim().to_string();
            if site.is_empty() {
                return Err(SafetyAiError::Config("site id must not be empty".into()));
            }

            // 1. Scan images
            println!("[1/5] Scanning images...");
            let images = scanner::scan_folder(&folder)?;
            println!("✔ {} images found\n", images.len());

            if images.is_empty() {
                return Err(SafetyAiError::NoImagesFound(folder.display().to_string()));
            }

            // 2. Stage + analyze
            println!(
                "[2/5] Analyzing images...{}",
                if use_cache { " (cache enabled)" } else { "" }
            );
            let provider = provider::AnthropicProvider::new(
                config.get_api_key()?,
                config.model.clone(),
                config.timeout_seconds,
            )?;
            let image_stage = stage::Stage::open(
                &config.stage_dir()?,
                config.max_image_bytes,
                config.max_image_dimension,
            )?;

            let assessments = if use_cache {
                pipeline::analyze_images_with_cache(&provider, &image_stage, &images, &folder, batch_size)
                    .await?
            } else {
                pipeline::analyze_images(&provider, &image_stage, &images, batch_size).await?
            };

            if assessments.len() < images.len() {
                println!(
                    "⚠ {} of {} images skipped (run with --verbose for details)",
                    images.len() - assessments.len(),
                    images.len()
                );
            }
            println!("✔ Analysis complete\n");

            // 3. Aggregate + prioritize
            println!("[3/5] Aggregating site risk...");
            let summary = aggregate::SiteSummary::from_assessments(&site, &assessments)?;
            let inspection_ts = local_timestamp(config.timezone_offset_hours);

            let mut prioritized_actions = None;
            let mut raw_prioritized_actions = None;
            if summary.has_hazards() {
                let actions_text = aggregate::collect_actions_text(&assessments);
                if !actions_text.trim().is_empty() {
                    let prioritized = pipeline::prioritize_actions(
                        &provider,
                        &summary.hazard_summary_line(),
                        &actions_text,
                    )
                    .await?;
                    if prioritized.actions.is_none() {
                        println!("⚠ Prioritized actions flagged for manual review");
                    }
                    prioritized_actions = prioritized.actions;
                    raw_prioritized_actions = Some(prioritized.raw);
                }
            }
            println!(
                "✔ Site severity: {} (weighted score {} / 10)\n",
                summary.site_severity, summary.weighted_risk_score
            );

            // 4. Persist history
            println!("[4/5] Recording inspection history...");
            let db = history::History::open(&config.database_path()?).await?;
            db.record_inspection(&site, &inspection_ts, &summary).await?;
            println!("✔ History recorded\n");

            // 5. Save assessment + export
            println!("[5/5] Exporting report...");
            let assessment = pipeline::SiteAssessment {
                site_id: site.clone(),
                inspection_ts,
                model: config.model.clone(),
                images: assessments,
                summary,
                prioritized_actions,
                raw_prioritized_actions,
            };

            let output_path = output.unwrap_or_else(|| folder.join("assessment.json"));
            std::fs::write(&output_path, serde_json::to_string_pretty(&assessment)?)?;
            println!("✔ Assessment saved: {}", output_path.display());

            export::export_assessment(&assessment, &format, &folder)?;

            // Automatic alert to the safety manager on high site risk
            if assessment.summary.site_severity == taxonomy::Severity::High && !no_email {
                match notify::Mailer::from_config(&config.smtp) {
                    Ok(mailer) => {
                        let sent = mailer
                            .send(
                                &config.safety_manager_email,
                                &notify::high_risk_alert_subject(&site),
                                &notify::high_risk_alert_body(&assessment),
                            )
                            .await;
                        match sent {
                            Ok(()) => println!(
                                "⚠ High risk detected – alert sent to {} ({})",
                                config.safety_manager_name, config.safety_manager_email
                            ),
                            Err(e) => eprintln!("❌ Failed to send high-risk alert: {}", e),
                        }
                    }
                    Err(e) => eprintln!("❌ Failed to send high-risk alert: {}", e),
                }
            }

            println!("\n✅ Inspection complete");
        }

        Commands::Export { input, format, output } => {
            println!("📄 site-safety-ai - export\n");

            let content = std::fs::read_to_string(&input)?;
            let assessment: pipeline::SiteAssessment = serde_json::from_str(&content)?;

            let output_dir = output.unwrap_or_else(|| {
                input
                    .parent()
                    .unwrap_or_else(|| std::path::Path::new("."))
                    .to_path_buf()
            });

            export::export_assessment(&assessment, &format, &output_dir)?;

            println!("\n✅ Export complete");
        }

        Commands::History { site, limit } => {
            println!("📈 site-safety-ai - site risk history\n");

            let db = history::History::open(&config.database_path()?).await?;
            let rows = db.site_history(&site, limit).await?;

            if rows.is_empty() {
                println!("No inspection history for site {}", site);
                return Ok(());
            }

            println!(
                "{:<20}  {:>6}  {:>14}  {:>8}  {:>13}",
                "Date & Time", "Images", "Weighted Score", "Severity", "Highest Score"
            );
            for row in &rows {
                println!(
                    "{:<20}  {:>6}  {:>14}  {:>8}  {:>13}",
                    row.inspection_ts,
                    row.image_count,
                    row.weighted_risk_score,
                    row.site_severity,
                    row.highest_image_score
                );
            }

            if let Some(avg) = db.recent_average(&site, 3).await? {
                println!("\nRecent average (last 3 inspections): {} / 10", avg);
            }

            if rows.len() >= 2 {
                let diff = ((rows[0].weighted_risk_score - rows[1].weighted_risk_score) * 10.0)
                    .round()
                    / 10.0;
                if diff > 0.0 {
                    println!("⬆ Site risk increased by {} points since the previous inspection", diff);
                } else if diff < 0.0 {
                    println!("⬇ Site risk decreased by {} points since the previous inspection", -diff);
                } else {
                    println!("➖ Site risk unchanged since the previous inspection");
                }
            }

            let trend = db.hazard_trend(&site, 10).await?;
            if !trend.is_empty() {
                println!("\nMost recurring hazards (last 10 inspections):");
                for row in trend {
                    println!("  {:<40} {}", row.category, row.total_count);
                }
            }
        }

        Commands::Send { input, to } => {
            println!("✉️ site-safety-ai - send assessment\n");

            let content = std::fs::read_to_string(&input)?;
            let assessment: pipeline::SiteAssessment = serde_json::from_str(&content)?;

            let recipient = match to {
                Some(addr) => addr,
                None => dialoguer::Input::<String>::new()
                    .with_prompt("Recipient email address")
                    .interact_text()
                    .map_err(|e| SafetyAiError::Config(format!("input aborted: {e}")))?,
            };

            if !config.is_recipient_allowed(&recipient) {
                return Err(SafetyAiError::RecipientNotAllowed(recipient));
            }

            let mailer = notify::Mailer::from_config(&config.smtp)?;
            mailer
                .send(
                    &recipient,
                    &notify::assessment_subject(&assessment.site_id),
                    &notify::assessment_body(&assessment),
                )
                .await?;

            println!("✅ Assessment sent to {}", recipient);
        }

        Commands::Config { set_api_key, show } => {
            let mut config = config;

            if let Some(key) = set_api_key {
                config.set_api_key(key)?;
                println!("✔ API key saved");
            }

            if show {
                println!("Configuration:");
                println!("  Model: {}", config.model);
                println!("  Batch size: {}", config.batch_size);
                println!("  Timezone offset: UTC{:+03}:00", config.timezone_offset_hours);
                println!("  Safety manager: {} <{}>", config.safety_manager_name, config.safety_manager_email);
                println!("  Allowed recipients: {}", config.allowed_recipients.join(", "));
                println!(
                    "  API key: {}",
                    if config.api_key.is_some() { "set" } else { "not set" }
                );
            }
        }

        Commands::Cache { clear, folder, info } => {
            let target = folder.unwrap_or_else(|| std::path::PathBuf::from("."));
            let cache_path = pipeline::CacheFile::cache_path(&target);

            if info || !clear {
                if cache_path.exists() {
                    let cache = pipeline::CacheFile::load(&target);
                    println!("Cache info:");
                    println!("  Path: {}", cache_path.display());
                    println!("  Entries: {}", cache.len());
                    if let Ok(meta) = std::fs::metadata(&cache_path) {
                        println!("  Size: {} bytes", meta.len());
                    }
                } else {
                    println!("No cache file at: {}", cache_path.display());
                }
            }

            if clear {
                match pipeline::CacheFile::clear(&target) {
                    Ok(true) => println!("✔ Cache deleted: {}", cache_path.display()),
                    Ok(false) => println!("No cache file to delete"),
                    Err(e) => println!("Cache delete error: {}", e),
                }
            }
        }
    }

    Ok(())
}

/// `YYYY-MM-DD HH:MM:SS` in the configured fixed offset.
fn local_timestamp(offset_hours: i32) -> String {
    const FMT: &str = "%Y-%m-%d %H:%M:%S";
    match FixedOffset::east_opt(offset_hours * 3600) {
        Some(offset) => Utc::now().with_timezone(&offset).format(FMT).to_string(),
        None => Utc::now().format(FMT).to_string(),
    }
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "site_safety_ai=debug"
    } else {
        "site_safety_ai=warn"
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
