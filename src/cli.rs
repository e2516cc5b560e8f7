use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "site-safety-ai")]
#[command(about = "AI site safety hazard detection and risk inspection", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbose diagnostics
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a full inspection over a folder of site images
    Inspect {
        /// Folder with inspection images
        #[arg(required = true)]
        folder: PathBuf,

        /// Site identifier
        #[arg(short, long, default_value = "SITE_A")]
        site: String,

        /// Output assessment JSON (default: <folder>/assessment.json)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Images per batch (the service accepts at most 20)
        #[arg(short, long, default_value = "5")]
        batch_size: usize,

        /// Report format (html/csv/both)
        #[arg(short, long, default_value = "both")]
        format: ReportFormat,

        /// Reuse cached results for unchanged images
        #[arg(long)]
        use_cache: bool,

        /// Skip the automatic high-risk email alert
        #[arg(long)]
        no_email: bool,
    },

    /// Render reports from a saved assessment JSON
    Export {
        /// Input assessment JSON
        #[arg(required = true)]
        input: PathBuf,

        /// Report format (html/csv/both)
        #[arg(short, long, default_value = "both")]
        format: ReportFormat,

        /// Output file/directory
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show a site's inspection history and hazard trend
    History {
        /// Site identifier
        #[arg(short, long, default_value = "SITE_A")]
        site: String,

        /// Number of inspections to list
        #[arg(short, long, default_value = "10")]
        limit: i64,
    },

    /// Email an assessment summary to a stakeholder
    Send {
        /// Input assessment JSON
        #[arg(required = true)]
        input: PathBuf,

        /// Recipient address (prompted interactively when omitted)
        #[arg(long)]
        to: Option<String>,
    },

    /// Show or edit configuration
    Config {
        /// Set the API key
        #[arg(long)]
        set_api_key: Option<String>,

        /// Show the current configuration
        #[arg(long)]
        show: bool,
    },

    /// Manage the analysis cache
    Cache {
        /// Delete the cache
        #[arg(long)]
        clear: bool,

        /// Target folder (defaults to the current directory)
        #[arg(short, long)]
        folder: Option<PathBuf>,

        /// Show cache info
        #[arg(long)]
        info: bool,
    },
}

#[derive(Clone, Debug, Default)]
pub enum ReportFormat {
    Html,
    Csv,
    #[default]
    Both,
}

impl std::str::FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "html" => Ok(ReportFormat::Html),
            "csv" => Ok(ReportFormat::Csv),
            "both" => Ok(ReportFormat::Both),
            _ => Err(format!("Unknown format: {}. Use html, csv, or both", s)),
        }
    }
}

impl std::fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReportFormat::Html => write!(f, "html"),
            ReportFormat::Csv => write!(f, "csv"),
            ReportFormat::Both => write!(f, "both"),
        }
    }
}
