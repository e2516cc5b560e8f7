use thiserror::Error;

#[derive(Error, Debug)]
pub enum SafetyAiError {
    #[error("config error: {0}")]
    Config(String),

    #[error("API key is not set. Configure it with `site-safety-ai config --set-api-key YOUR_KEY`")]
    MissingApiKey,

    #[error("file not found: {0}")]
    FileNotFound(String),

    #[error("folder not found: {0}")]
    FolderNotFound(String),

    #[error("image rejected: {0}")]
    ImageRejected(String),

    #[error("generative call failed: {0}")]
    ApiCall(String),

    #[error("generated text violated its format contract: {0}")]
    FormatViolation(String),

    #[error("no images found in: {0}")]
    NoImagesFound(String),

    #[error("cannot aggregate an empty inspection batch for site {0}")]
    EmptyBatch(String),

    #[error("recipient not on the configured allow-list: {0}")]
    RecipientNotAllowed(String),

    #[error("email send failed: {0}")]
    Email(String),

    #[error("JSON error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type Result<T> = std::result::Result<T, SafetyAiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_io() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let error = SafetyAiError::Io(io_error);
        let display = format!("{}", error);
        assert!(display.contains("IO error"));
        assert!(display.contains("file not found"));
    }

    #[test]
    fn test_error_display_format_violation() {
        let error = SafetyAiError::FormatViolation("expected 3 bullets, got 5".into());
        let display = format!("{}", error);
        assert!(display.contains("format contract"));
        assert!(display.contains("3 bullets"));
    }

    #[test]
    fn test_error_display_missing_api_key() {
        let display = format!("{}", SafetyAiError::MissingApiKey);
        assert!(display.contains("--set-api-key"));
    }
}
