//! Anthropic messages API provider
//!
//! Sends the typed request as a single-turn message; staged images ride along
//! as base64 content blocks ahead of the prompt text.

use crate::error::{Result, SafetyAiError};
use crate::provider::{GenerativeProvider, GenerativeRequest};
use async_trait::async_trait;
use base64::Engine;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const API_URL: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: &str = "2023-06-01";

pub struct AnthropicProvider {
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl AnthropicProvider {
    pub fn new(api_key: String, model: String, timeout_seconds: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()
            .map_err(|e| SafetyAiError::ApiCall(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            api_key,
            model,
            client,
        })
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-api-key",
            HeaderValue::from_str(self.api_key.trim())
                .map_err(|_| SafetyAiError::Config("invalid API key".into()))?,
        );
        headers.insert("anthropic-version", HeaderValue::from_static(API_VERSION));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }
}

#[async_trait]
impl GenerativeProvider for AnthropicProvider {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, request: &GenerativeRequest) -> Result<String> {
        let mut content = Vec::new();

        if let Some(image) = &request.image {
            let bytes = std::fs::read(&image.path)
                .map_err(|_| SafetyAiError::FileNotFound(image.path.display().to_string()))?;
            content.push(ContentBlock::Image {
                source: ImageSource {
                    kind: "base64",
                    media_type: media_type_for(&image.file_name),
                    data: base64::engine::general_purpose::STANDARD.encode(bytes),
                },
            });
        }

        content.push(ContentBlock::Text {
            text: request.prompt.clone(),
        });

        let body = MessagesRequest {
            model: &self.model,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            messages: vec![Message {
                role: "user",
                content,
            }],
        };

        let resp = self
            .client
            .post(API_URL)
            .headers(self.headers()?)
            .json(&body)
            .send()
            .await
            .map_err(|e| SafetyAiError::ApiCall(format!("messages API request failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            return Err(SafetyAiError::ApiCall(format!(
                "messages API returned {status}: {text}"
            )));
        }

        let parsed: MessagesResponse = resp
            .json()
            .await
            .map_err(|e| SafetyAiError::ApiCall(format!("unparseable API response: {e}")))?;

        let reply = parsed
            .content
            .into_iter()
            .filter_map(|block| match block {
                ResponseBlock::Text { text } => Some(text),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n");

        if reply.is_empty() {
            return Err(SafetyAiError::ApiCall("response missing text content".into()));
        }

        Ok(reply)
    }
}

fn media_type_for(file_name: &str) -> &'static str {
    match file_name.rsplit('.').next().map(str::to_ascii_lowercase).as_deref() {
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        _ => "image/jpeg",
    }
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: usize,
    temperature: f32,
    messages: Vec<Message<'a>>,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: Vec<ContentBlock>,
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text { text: String },
    Image { source: ImageSource },
}

#[derive(Serialize)]
struct ImageSource {
    #[serde(rename = "type")]
    kind: &'static str,
    media_type: &'static str,
    data: String,
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ResponseBlock>,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ResponseBlock {
    Text {
        text: String,
    },
    #[serde(other)]
    Other,
}
