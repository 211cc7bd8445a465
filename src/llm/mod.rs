//! Gemini client for content generation.
//!
//! Talks to the `generateContent` REST endpoint. Rate-limit rejections come
//! back as [`LlmError::RateLimited`] with the provider's suggested delay, so
//! callers never have to scrape error text.

mod config;
mod prompts;

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::executor::{parse_duration_str, ClassifyFailure, FailureKind};
use crate::rate_limit::parse_retry_after;

pub use config::LlmConfig;
pub use prompts::{fill_prompt, DEFAULT_QA_PROMPT, DEFAULT_SUMMARY_PROMPT, DEFAULT_TRANSCRIPTION_PROMPT};

/// One piece of a prompt.
#[derive(Debug, Clone, PartialEq)]
pub enum Part {
    Text(String),
    /// Raw bytes sent inline (audio, images).
    InlineData { mime_type: String, data: Vec<u8> },
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Part::Text(text.into())
    }
}

/// Token counts reported by the provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenUsage {
    #[serde(default)]
    pub prompt_token_count: u64,
    #[serde(default)]
    pub candidates_token_count: u64,
    #[serde(default)]
    pub total_token_count: u64,
}

/// Generated text plus usage, when the provider reports it.
#[derive(Debug, Clone, PartialEq)]
pub struct Generation {
    pub text: String,
    pub usage: Option<TokenUsage>,
}

/// Errors that can occur during LLM operations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum LlmError {
    #[error("GEMINI_API_KEY not set. Get an API key from https://ai.google.dev/")]
    MissingApiKey,
    #[error("Connection error: {0}")]
    Connection(String),
    /// 429 / RESOURCE_EXHAUSTED from the provider.
    #[error("429 RESOURCE_EXHAUSTED: {message}")]
    RateLimited {
        message: String,
        retry_after: Option<Duration>,
    },
    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },
    #[error("Parse error: {0}")]
    Parse(String),
}

impl ClassifyFailure for LlmError {
    fn classify(&self) -> FailureKind {
        match self {
            LlmError::RateLimited { retry_after, .. } => FailureKind::RateLimited {
                retry_after: *retry_after,
            },
            _ => FailureKind::Fatal,
        }
    }
}

/// Anything that can turn prompt parts into text for a model.
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    async fn generate(&self, model: &str, parts: &[Part]) -> Result<Generation, LlmError>;
}

#[derive(Debug, Serialize)]
struct GeminiRequest<'a> {
    contents: Vec<GeminiContent<'a>>,
    #[serde(rename = "generationConfig")]
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Serialize)]
struct GeminiContent<'a> {
    role: &'static str,
    parts: Vec<GeminiPart<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum GeminiPart<'a> {
    Text { text: &'a str },
    InlineData { inline_data: GeminiInlineData<'a> },
}

#[derive(Debug, Serialize)]
struct GeminiInlineData<'a> {
    mime_type: &'a str,
    data: String,
}

#[derive(Debug, Serialize)]
struct GeminiGenerationConfig {
    temperature: f32,
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    candidates: Option<Vec<GeminiCandidate>>,
    usage_metadata: Option<TokenUsage>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiResponseContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponseContent {
    #[serde(default)]
    parts: Vec<GeminiResponsePart>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorBody {
    error: GeminiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorDetail {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    details: Vec<serde_json::Value>,
}

/// Turn a non-success response into a structured error.
///
/// 429 responses and `RESOURCE_EXHAUSTED` bodies become
/// [`LlmError::RateLimited`]; the delay comes from the body's `RetryInfo`
/// detail, falling back to the `Retry-After` header.
pub fn error_from_response(status: u16, body: &str, retry_after_header: Option<&str>) -> LlmError {
    let parsed: Option<GeminiErrorDetail> = serde_json::from_str::<GeminiErrorBody>(body)
        .ok()
        .map(|b| b.error);

    let exhausted = parsed
        .as_ref()
        .and_then(|e| e.status.as_deref())
        .is_some_and(|s| s == "RESOURCE_EXHAUSTED");

    let message = parsed
        .as_ref()
        .map(|e| e.message.clone())
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| body.trim().to_string());

    if status == 429 || exhausted {
        let retry_after = parsed
            .as_ref()
            .and_then(|e| {
                e.details
                    .iter()
                    .filter_map(|d| d.get("retryDelay").and_then(|v| v.as_str()))
                    .find_map(parse_duration_str)
            })
            .or_else(|| parse_retry_after(retry_after_header));
        return LlmError::RateLimited {
            message,
            retry_after,
        };
    }

    LlmError::Api { status, message }
}

/// Gemini `generateContent` client.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    config: LlmConfig,
    client: Client,
}

impl GeminiClient {
    /// Create a new client with the given configuration.
    pub fn new(config: LlmConfig) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| LlmError::Connection(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    pub fn config(&self) -> &LlmConfig {
        &self.config
    }

    pub fn is_available(&self) -> bool {
        self.config.api_key.is_some()
    }

    fn build_request<'a>(&self, parts: &'a [Part]) -> GeminiRequest<'a> {
        let parts = parts
            .iter()
            .map(|part| match part {
                Part::Text(text) => GeminiPart::Text { text },
                Part::InlineData { mime_type, data } => GeminiPart::InlineData {
                    inline_data: GeminiInlineData {
                        mime_type,
                        data: base64::engine::general_purpose::STANDARD.encode(data),
                    },
                },
            })
            .collect();

        GeminiRequest {
            contents: vec![GeminiContent { role: "user", parts }],
            generation_config: GeminiGenerationConfig {
                temperature: self.config.temperature,
                max_output_tokens: self.config.max_output_tokens,
            },
        }
    }
}

#[async_trait]
impl ContentGenerator for GeminiClient {
    async fn generate(&self, model: &str, parts: &[Part]) -> Result<Generation, LlmError> {
        let api_key = self.config.api_key.as_ref().ok_or(LlmError::MissingApiKey)?;

        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.endpoint, model
        );
        let request = self.build_request(parts);

        debug!("Gemini request to {} with {} parts", model, parts.len());
        let resp = self
            .client
            .post(&url)
            .query(&[("key", api_key)])
            .json(&request)
            .send()
            .await
            .map_err(|e| LlmError::Connection(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let retry_after = resp
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            let body = resp.text().await.unwrap_or_default();
            return Err(error_from_response(
                status.as_u16(),
                &body,
                retry_after.as_deref(),
            ));
        }

        let gemini: GeminiResponse = resp
            .json()
            .await
            .map_err(|e| LlmError::Parse(e.to_string()))?;

        let text = gemini
            .candidates
            .and_then(|c| c.into_iter().next())
            .and_then(|c| c.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        Ok(Generation {
            text,
            usage: gemini.usage_metadata,
        })
    }
}
