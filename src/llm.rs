//! LLM provider abstraction and HTTP clients.
//!
//! Defines the [`LlmProvider`] trait and two concrete implementations:
//! - **[`GeminiProvider`]**: Google Generative Language `generateContent`.
//! - **[`OpenAIProvider`]**: OpenAI-compatible `chat/completions`.
//!
//! Use [`create_provider`] to build the configured provider. The API key is
//! resolved at construction, so a missing key fails before any document is
//! touched.
//!
//! API keys travel in headers (`x-goog-api-key`, `Authorization`), never in
//! the URL, and transport errors are stripped of their URL before they are
//! wrapped.
//!
//! Each call is a single attempt bounded by `llm.timeout_secs`. A non-2xx
//! response becomes an error carrying the status and body; the caller
//! ([`DocumentAgent`](crate::agent::DocumentAgent)) turns that into its
//! failure sentinel.

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

use crate::config::LlmConfig;

/// A text-in, text-out completion backend.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Provider identifier, e.g. `"gemini"`.
    fn name(&self) -> &str;

    /// Send one prompt and return the model's reply text.
    async fn complete(&self, prompt: &str) -> Result<String>;
}

fn http_client(config: &LlmConfig) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()
        .context("Failed to build HTTP client")
}

async fn post_json(request: reqwest::RequestBuilder, provider: &str) -> Result<Value> {
    // Error text must not carry the request URL (it can hold credentials).
    let response = request
        .send()
        .await
        .map_err(|e| e.without_url())
        .with_context(|| format!("{} request failed", provider))?;

    let status = response.status();
    if !status.is_success() {
        let body_text = response.text().await.unwrap_or_default();
        bail!("{} API error {}: {}", provider, status, body_text);
    }

    response
        .json()
        .await
        .map_err(|e| e.without_url())
        .with_context(|| format!("{} returned a non-JSON body", provider))
}

// ============ Gemini ============

pub struct GeminiProvider {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
    temperature: f32,
    max_output_tokens: u32,
}

impl GeminiProvider {
    pub fn new(config: &LlmConfig, api_key: String) -> Result<Self> {
        Ok(Self {
            client: http_client(config)?,
            base_url: config.base_url().to_string(),
            model: config.model_name().to_string(),
            api_key,
            temperature: config.temperature,
            max_output_tokens: config.max_output_tokens,
        })
    }
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": {
                "temperature": self.temperature,
                "maxOutputTokens": self.max_output_tokens,
            },
        });

        tracing::debug!(model = %self.model, prompt_len = prompt.len(), "gemini request");
        let request = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body);
        let reply = post_json(request, "Gemini").await?;
        parse_gemini_response(&reply)
    }
}

/// Extract `candidates[0].content.parts[0].text`.
fn parse_gemini_response(json: &Value) -> Result<String> {
    let text = json
        .pointer("/candidates/0/content/parts/0/text")
        .and_then(|t| t.as_str())
        .ok_or_else(|| anyhow!("Invalid Gemini response: missing candidate text"))?;
    non_empty(text, "Gemini")
}

// ============ OpenAI ============

pub struct OpenAIProvider {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
    temperature: f32,
    max_output_tokens: u32,
}

impl OpenAIProvider {
    pub fn new(config: &LlmConfig, api_key: String) -> Result<Self> {
        Ok(Self {
            client: http_client(config)?,
            base_url: config.base_url().to_string(),
            model: config.model_name().to_string(),
            api_key,
            temperature: config.temperature,
            max_output_tokens: config.max_output_tokens,
        })
    }
}

#[async_trait]
impl LlmProvider for OpenAIProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": prompt }],
            "temperature": self.temperature,
            "max_tokens": self.max_output_tokens,
        });

        tracing::debug!(model = %self.model, prompt_len = prompt.len(), "openai request");
        let request = self
            .client
            .post(url)
            .bearer_auth(&self.api_key)
            .json(&body);
        let reply = post_json(request, "OpenAI").await?;
        parse_openai_response(&reply)
    }
}

/// Extract `choices[0].message.content`.
fn parse_openai_response(json: &Value) -> Result<String> {
    let text = json
        .pointer("/choices/0/message/content")
        .and_then(|t| t.as_str())
        .ok_or_else(|| anyhow!("Invalid OpenAI response: missing message content"))?;
    non_empty(text, "OpenAI")
}

fn non_empty(text: &str, provider: &str) -> Result<String> {
    if text.trim().is_empty() {
        bail!("{} returned an empty completion", provider);
    }
    Ok(text.to_string())
}

/// Build the provider named by `llm.provider`.
///
/// | Config Value | Provider |
/// |-------------|----------|
/// | `"gemini"` | [`GeminiProvider`] |
/// | `"openai"` | [`OpenAIProvider`] |
///
/// # Errors
///
/// Unknown provider names and a missing API key.
pub fn create_provider(config: &LlmConfig) -> Result<Arc<dyn LlmProvider>> {
    match config.provider.as_str() {
        "gemini" => {
            let key = config.resolve_api_key()?;
            Ok(Arc::new(GeminiProvider::new(config, key)?))
        }
        "openai" => {
            let key = config.resolve_api_key()?;
            Ok(Arc::new(OpenAIProvider::new(config, key)?))
        }
        other => bail!("Unknown LLM provider: {}", other),
    }
}
