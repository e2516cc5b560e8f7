use crate::error::{Result, SafetyAiError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// SMTP settings for outbound notifications.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    pub api_key: Option<String>,
    /// Pinned model identifier. Switching models is an explicit config edit,
    /// never a runtime parameter.
    pub model: String,
    pub max_image_bytes: u64,
    pub max_image_dimension: u32,
    pub batch_size: usize,
    pub timeout_seconds: u64,
    /// Inspection timestamps are recorded in this fixed offset (hours).
    pub timezone_offset_hours: i32,
    /// Staged images and the analysis cache live here.
    pub stage_dir: Option<PathBuf>,
    pub database_path: Option<PathBuf>,
    pub smtp: SmtpConfig,
    pub safety_manager_name: String,
    pub safety_manager_email: String,
    /// Outbound mail is refused for addresses outside this list.
    pub allowed_recipients: Vec<String>,
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = serde_json::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default_config())
        }
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| SafetyAiError::Config("home directory not found".into()))?;
        Ok(home.join(".config").join("site-safety-ai").join("config.json"))
    }

    pub fn default_config() -> Self {
        Self {
            api_key: None,
            model: "claude-sonnet-4-20250514".into(),
            max_image_bytes: 3_750_000, // per-image vendor limit
            max_image_dimension: 8000,
            batch_size: 5,
            timeout_seconds: 120,
            timezone_offset_hours: 8,
            stage_dir: None,
            database_path: None,
            smtp: SmtpConfig {
                host: "localhost".into(),
                port: 587,
                username: None,
                password: None,
                from: "safety-reports@example.com".into(),
            },
            safety_manager_name: "Rafi Hidayat".into(),
            safety_manager_email: "rafi.hidayat@synogize.io".into(),
            allowed_recipients: vec!["rafi.hidayat@synogize.io".into()],
        }
    }

    pub fn get_api_key(&self) -> Result<String> {
        // Environment variable takes precedence
        if let Ok(key) = std::env::var("ANTHROPIC_API_KEY") {
            return Ok(key);
        }

        self.api_key.clone().ok_or(SafetyAiError::MissingApiKey)
    }

    pub fn set_api_key(&mut self, key: String) -> Result<()> {
        self.api_key = Some(key);
        self.save()
    }

    pub fn stage_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.stage_dir {
            return Ok(dir.clone());
        }
        let home = dirs::home_dir()
            .ok_or_else(|| SafetyAiError::Config("home directory not found".into()))?;
        Ok(home.join(".local").join("share").join("site-safety-ai").join("stage"))
    }

    pub fn database_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.database_path {
            return Ok(path.clone());
        }
        let home = dirs::home_dir()
            .ok_or_else(|| SafetyAiError::Config("home directory not found".into()))?;
        Ok(home.join(".local").join("share").join("site-safety-ai").join("history.db"))
    }

    pub fn is_recipient_allowed(&self, address: &str) -> bool {
        self.allowed_recipients
            .iter()
            .any(|a| a.eq_ignore_ascii_case(address))
    }
}
