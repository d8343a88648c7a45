//! Google Gemini API backend.
//!
//! Completions go through `models/{model}:generateContent`; embeddings
//! (see [`GeminiEmbedder`](crate::GeminiEmbedder)) go through
//! `models/{model}:batchEmbedContents`. Both authenticate with the
//! `x-goog-api-key` header.

use async_trait::async_trait;
use reqwest::{Client, Response, header};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::backend::LlmBackend;
use crate::error::{LlmError, RateLimitInfo, Result};

/// Default Gemini API base URL.
pub const DEFAULT_GEMINI_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Default completion model.
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";

/// Default timeout for requests.
const DEFAULT_TIMEOUT_SECS: u64 = 120;

const API_KEY_HEADER: &str = "x-goog-api-key";

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Configuration for Gemini completion and embedding clients.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub timeout: Duration,
}

impl GeminiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_GEMINI_BASE.to_string(),
            model: DEFAULT_GEMINI_MODEL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Create config from the `GEMINI_API_KEY` environment variable.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("GEMINI_API_KEY").map_err(|_| {
            LlmError::Config("GEMINI_API_KEY environment variable not set".to_string())
        })?;
        Ok(Self::new(api_key))
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// URL for `method` on the configured model.
    pub(crate) fn model_url(&self, method: &str) -> String {
        format!(
            "{}/models/{}:{}",
            self.base_url.trim_end_matches('/'),
            self.model,
            method
        )
    }

    pub(crate) fn http_client(&self) -> Result<Client> {
        Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| LlmError::Internal(format!("Failed to create HTTP client: {}", e)))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Gemini Backend
// ─────────────────────────────────────────────────────────────────────────────

/// Gemini text completion backend.
pub struct GeminiBackend {
    client: Client,
    config: GeminiConfig,
}

impl GeminiBackend {
    pub fn new(config: GeminiConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(LlmError::Config("Gemini API key is empty".to_string()));
        }
        let client = config.http_client()?;
        Ok(Self { client, config })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(GeminiConfig::from_env()?)
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }
}

#[async_trait]
impl LlmBackend for GeminiBackend {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let request = GenerateContentRequest {
            contents: vec![RequestContent::user(prompt)],
        };

        tracing::debug!(
            backend = "gemini",
            model = %self.config.model,
            prompt_chars = prompt.len(),
            "Sending generateContent request"
        );

        let response = self
            .client
            .post(self.config.model_url("generateContent"))
            .header(API_KEY_HEADER, &self.config.api_key)
            .header(header::CONTENT_TYPE, "application/json")
            .json(&request)
            .send()
            .await?;

        let body: GenerateContentResponse = parse_response(response).await?;

        if let Some(usage) = &body.usage_metadata {
            tracing::debug!(
                backend = "gemini",
                prompt_tokens = usage.prompt_token_count,
                output_tokens = usage.candidates_token_count,
                "generateContent usage"
            );
        }

        body.text().ok_or_else(|| {
            LlmError::Backend("generateContent returned no text candidates".to_string())
        })
    }

    fn name(&self) -> &str {
        "gemini"
    }
}

/// Decode a successful response body or map the error status.
pub(crate) async fn parse_response<T: serde::de::DeserializeOwned>(
    response: Response,
) -> Result<T> {
    if !response.status().is_success() {
        return Err(handle_error_response(response).await);
    }
    let body = response.text().await?;
    serde_json::from_str(&body).map_err(|e| LlmError::Serialization(e.to_string()))
}

/// Map an error response to an [`LlmError`].
async fn handle_error_response(response: Response) -> LlmError {
    let status = response.status();
    let retry_after = response
        .headers()
        .get(header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let body = response.text().await.unwrap_or_default();

    let message = serde_json::from_str::<GeminiErrorResponse>(&body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| format!("HTTP {}: {}", status, body));

    match status.as_u16() {
        400 => LlmError::InvalidRequest(message),
        401 | 403 => LlmError::Auth(format!("Authentication failed: {}", message)),
        429 => LlmError::RateLimit(RateLimitInfo::from_header(message, retry_after.as_deref())),
        500..=599 => LlmError::Backend(format!("Server error: {}", message)),
        _ => LlmError::Backend(message),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Wire Types
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<RequestContent>,
}

#[derive(Debug, Serialize)]
pub(crate) struct RequestContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<TextPart>,
}

impl RequestContent {
    fn user(text: &str) -> Self {
        Self {
            role: Some("user"),
            parts: vec![TextPart {
                text: text.to_string(),
            }],
        }
    }

    pub(crate) fn text(text: &str) -> Self {
        Self {
            role: None,
            parts: vec![TextPart {
                text: text.to_string(),
            }],
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct TextPart {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    usage_metadata: Option<UsageMetadata>,
}

impl GenerateContentResponse {
    /// Concatenated text parts of the first candidate.
    fn text(&self) -> Option<String> {
        let candidate = self.candidates.first()?;
        let content = candidate.content.as_ref()?;
        Some(
            content
                .parts
                .iter()
                .map(|p| p.text.as_str())
                .collect::<String>(),
        )
    }
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<TextPart>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u64,
    #[serde(default)]
    candidates_token_count: u64,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorResponse {
    error: GeminiErrorBody,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorBody {
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults_and_builder() {
        let config = GeminiConfig::new("key");
        assert_eq!(config.base_url, DEFAULT_GEMINI_BASE);
        assert_eq!(config.model, DEFAULT_GEMINI_MODEL);

        let config = config
            .with_base_url("http://localhost:8080/")
            .with_model("gemini-pro")
            .with_timeout(Duration::from_secs(5));
        assert_eq!(
            config.model_url("generateContent"),
            "http://localhost:8080/models/gemini-pro:generateContent"
        );
        assert_eq!(config.timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_empty_key_rejected() {
        assert!(matches!(
            GeminiBackend::new(GeminiConfig::new("  ")),
            Err(LlmError::Config(_))
        ));
    }

    #[test]
    fn test_request_serialization() {
        let request = GenerateContentRequest {
            contents: vec![RequestContent::user("hello")],
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["contents"][0]["role"], "user");
        assert_eq!(json["contents"][0]["parts"][0]["text"], "hello");

        let bare = serde_json::to_value(RequestContent::text("x")).unwrap();
        assert!(bare.get("role").is_none());
    }

    #[test]
    fn test_response_text_joins_parts() {
        let body = r#"{
            "candidates": [{"content": {"parts": [{"text": "a"}, {"text": "b"}], "role": "model"}}],
            "usageMetadata": {"promptTokenCount": 4, "candidatesTokenCount": 2}
        }"#;
        let parsed: GenerateContentResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.text().as_deref(), Some("ab"));
        assert_eq!(parsed.usage_metadata.unwrap().prompt_token_count, 4);
    }

    #[test]
    fn test_response_without_candidates() {
        let parsed: GenerateContentResponse = serde_json::from_str("{}").unwrap();
        assert!(parsed.text().is_none());
    }
}
