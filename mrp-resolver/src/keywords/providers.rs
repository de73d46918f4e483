//! Text-generation providers
//!
//! Each provider turns a prompt into raw text with a single HTTP round trip.
//! Failures are reported as [`ProviderError`] and never retried here; the
//! optimizer moves on to the next provider in its cascade.
//!
//! - [`GeminiProvider`]: Google Generative Language `generateContent`
//! - [`ChatCompletionsProvider`]: OpenAI-style `/chat/completions` (Groq, OpenRouter)

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use thiserror::Error;

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";
const OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";

/// Default timeout for a generation request
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

const TEMPERATURE: f32 = 0.9;
const MAX_OUTPUT_TOKENS: u32 = 40;

/// Text provider errors
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Network error: {0}")]
    Network(String),

    /// Provider reported its own rate or quota limit
    #[error("Rate limit exceeded")]
    RateLimited,

    #[error("API error {0}: {1}")]
    Api(u16, String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Empty response")]
    EmptyResponse,
}

/// A text-generation collaborator
#[async_trait]
pub trait TextProvider: Send + Sync {
    /// Provider name for logging and quota accounting
    fn name(&self) -> &'static str;

    /// Generate a completion for `prompt`
    async fn generate(&self, prompt: &str) -> Result<String, ProviderError>;
}

fn build_client(timeout: Duration) -> Result<Client, ProviderError> {
    Client::builder()
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(5))
        .build()
        .map_err(|e| ProviderError::Network(e.to_string()))
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ProviderError> {
    let status = response.status();
    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(ProviderError::RateLimited);
    }
    if !status.is_success() {
        let error_text = response.text().await.unwrap_or_default();
        return Err(ProviderError::Api(status.as_u16(), error_text));
    }
    Ok(response)
}

// ============================================================================
// Gemini
// ============================================================================

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: String,
}

/// Google Gemini provider
pub struct GeminiProvider {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl GeminiProvider {
    pub fn new(api_key: String, model: String) -> Result<Self, ProviderError> {
        Ok(Self {
            client: build_client(DEFAULT_TIMEOUT)?,
            base_url: GEMINI_BASE_URL.to_string(),
            api_key,
            model,
        })
    }

    /// Point at a different host (tests, proxies)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl TextProvider for GeminiProvider {
    fn name(&self) -> &'static str {
        "gemini"
    }

    async fn generate(&self, prompt: &str) -> Result<String, ProviderError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        );

        tracing::debug!(provider = "gemini", model = %self.model, "Requesting keyword generation");

        let body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": {
                "temperature": TEMPERATURE,
                "maxOutputTokens": MAX_OUTPUT_TOKENS,
            }
        });

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        let parsed: GeminiResponse = check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))?;

        parsed
            .candidates
            .into_iter()
            .filter_map(|c| c.content)
            .flat_map(|c| c.parts)
            .map(|p| p.text)
            .find(|t| !t.trim().is_empty())
            .ok_or(ProviderError::EmptyResponse)
    }
}

// ============================================================================
// OpenAI-style chat completions (Groq, OpenRouter)
// ============================================================================

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

/// OpenAI-compatible chat completions provider
pub struct ChatCompletionsProvider {
    name: &'static str,
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl ChatCompletionsProvider {
    pub fn new(
        name: &'static str,
        base_url: impl Into<String>,
        api_key: String,
        model: String,
    ) -> Result<Self, ProviderError> {
        Ok(Self {
            name,
            client: build_client(DEFAULT_TIMEOUT)?,
            base_url: base_url.into(),
            api_key,
            model,
        })
    }

    pub fn groq(api_key: String, model: String) -> Result<Self, ProviderError> {
        Self::new("groq", GROQ_BASE_URL, api_key, model)
    }

    pub fn openrouter(api_key: String, model: String) -> Result<Self, ProviderError> {
        Self::new("openrouter", OPENROUTER_BASE_URL, api_key, model)
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl TextProvider for ChatCompletionsProvider {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn generate(&self, prompt: &str) -> Result<String, ProviderError> {
        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));

        tracing::debug!(provider = self.name, model = %self.model, "Requesting keyword generation");

        let body = json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": prompt }],
            "temperature": TEMPERATURE,
            "max_tokens": MAX_OUTPUT_TOKENS,
        });

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        let parsed: ChatResponse = check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .filter_map(|c| c.message.content)
            .find(|t| !t.trim().is_empty())
            .ok_or(ProviderError::EmptyResponse)
    }
}
