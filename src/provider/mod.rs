//! Generative call interface
//!
//! Every "hard" operation (image understanding, classification, scoring, text
//! generation) is delegated to a hosted multimodal model behind the
//! [`GenerativeProvider`] trait. The concrete provider is swappable; the rest
//! of the pipeline only sees typed requests and raw text replies.

mod anthropic;

pub use anthropic::AnthropicProvider;

use crate::error::{Result, SafetyAiError};
use crate::stage::StagedImage;
use async_trait::async_trait;
use std::time::Duration;

/// Typed request passed to a provider. Replaces ad-hoc string interpolation
/// of file names into queries.
#[derive(Debug, Clone)]
pub struct GenerativeRequest {
    pub prompt: String,
    /// Staged image the prompt refers to, if any.
    pub image: Option<StagedImage>,
    pub max_tokens: usize,
    pub temperature: f32,
}

impl GenerativeRequest {
    pub fn text(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            image: None,
            max_tokens: 1024,
            temperature: 0.1,
        }
    }

    pub fn with_image(prompt: impl Into<String>, image: &StagedImage) -> Self {
        Self {
            prompt: prompt.into(),
            image: Some(image.clone()),
            max_tokens: 1024,
            temperature: 0.1,
        }
    }
}

#[async_trait]
pub trait GenerativeProvider: Send + Sync {
    /// Pinned model identifier used for every call.
    fn model_name(&self) -> &str;

    /// One generative call. Returns the raw text reply; parsing and contract
    /// validation happen in [`crate::parser`].
    async fn generate(&self, request: &GenerativeRequest) -> Result<String>;
}

const MAX_ATTEMPTS: u32 = 3;

/// Retry wrapper around [`GenerativeProvider::generate`].
///
/// Only transport-level failures are retried; a reply that parses but breaks
/// its format contract is not a transport problem and comes back immediately.
pub async fn generate_with_retry(
    provider: &dyn GenerativeProvider,
    request: &GenerativeRequest,
) -> Result<String> {
    let mut last_err = None;

    for attempt in 0..MAX_ATTEMPTS {
        match provider.generate(request).await {
            Ok(reply) => return Ok(reply),
            Err(e @ SafetyAiError::ApiCall(_)) => {
                tracing::warn!(attempt = attempt + 1, error = %e, "generative call failed, retrying");
                last_err = Some(e);
                if attempt + 1 < MAX_ATTEMPTS {
                    tokio::time::sleep(Duration::from_millis(100 * 2u64.pow(attempt))).await;
                }
            }
            Err(e) => return Err(e),
        }
    }

    Err(last_err.unwrap_or_else(|| SafetyAiError::ApiCall("retries exhausted".into())))
}
