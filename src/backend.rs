//! Model backend abstraction and implementations.
//!
//! Defines the [`ModelBackend`] trait and concrete implementations:
//! - **[`DisabledBackend`]** — reports itself unconfigured; used when no
//!   model provider is set up. The chat engine short-circuits to a fixed
//!   fallback reply without attempting a call.
//! - **[`GeminiBackend`]** — calls the Google Generative Language API with
//!   retry and backoff.
//!
//! # Provider Selection
//!
//! Use [`create_backend`] to instantiate the appropriate backend based on
//! the configuration:
//!
//! ```rust
//! # use chat_harness::config::ModelConfig;
//! # use chat_harness::backend::create_backend;
//! let config = ModelConfig::default(); // provider = "disabled"
//! let backend = create_backend(&config).unwrap();
//! assert_eq!(backend.name(), "disabled");
//! assert!(!backend.is_configured());
//! ```
//!
//! # Retry Strategy
//!
//! The Gemini backend uses exponential backoff for transient errors:
//! - HTTP 429 (rate limited) and 5xx (server error) → retry
//! - HTTP 4xx (client error, not 429) → fail immediately
//! - Network errors → retry
//! - Backoff: 1s, 2s, 4s, 8s, 16s, 32s (capped at 2^5)

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

use crate::config::ModelConfig;

/// A generative-language backend that turns a composed prompt into a
/// response text. The call is atomic from the caller's perspective: the
/// full response text or an error, no streaming.
#[async_trait]
pub trait ModelBackend: Send + Sync {
    /// Returns the backend identifier (e.g. `"gemini"`).
    fn name(&self) -> &str;

    /// Whether the backend is ready to serve calls. When `false`, callers
    /// must not invoke [`generate`](ModelBackend::generate) and should
    /// surface an unavailability notice instead.
    fn is_configured(&self) -> bool {
        true
    }

    /// Generate a response for the composed prompt.
    async fn generate(&self, prompt: &str) -> Result<String>;
}

// ============ Disabled Backend ============

/// A no-op backend used when `model.provider = "disabled"`.
///
/// `is_configured` returns `false` so the engine resolves immediately with
/// its fixed unavailability reply; `generate` errors in case a caller
/// invokes it anyway.
pub struct DisabledBackend;

#[async_trait]
impl ModelBackend for DisabledBackend {
    fn name(&self) -> &str {
        "disabled"
    }

    fn is_configured(&self) -> bool {
        false
    }

    async fn generate(&self, _prompt: &str) -> Result<String> {
        bail!("Model backend is disabled")
    }
}

// ============ Gemini Backend ============

/// Backend for the Google Generative Language API.
///
/// Calls `POST {base_url}/models/{model}:generateContent` with the API key
/// taken from the environment variable named in `model.api_key_env`
/// (default `GEMINI_API_KEY`).
pub struct GeminiBackend {
    model: String,
    api_key: String,
    base_url: String,
    max_retries: u32,
    client: reqwest::Client,
}

impl GeminiBackend {
    /// Create a new Gemini backend from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if `model` is not set in config or the API key
    /// environment variable is not present.
    pub fn new(config: &ModelConfig) -> Result<Self> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| anyhow::anyhow!("model.model required for Gemini backend"))?;

        let api_key = std::env::var(&config.api_key_env)
            .map_err(|_| anyhow::anyhow!("{} environment variable not set", config.api_key_env))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            model,
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            max_retries: config.max_retries,
            client,
        })
    }
}

#[async_trait]
impl ModelBackend for GeminiBackend {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        );

        let body = serde_json::json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
        });

        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                // Exponential backoff: 1s, 2s, 4s, 8s, ...
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                tokio::time::sleep(delay).await;
            }

            debug!(model = %self.model, attempt, "calling generateContent");
            let resp = self.client.post(&url).json(&body).send().await;

            match resp {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let json: serde_json::Value = response.json().await?;
                        return parse_gemini_response(&json);
                    }

                    // Rate limited or server error — retry
                    if status.as_u16() == 429 || status.is_server_error() {
                        let body_text = response.text().await.unwrap_or_default();
                        last_err = Some(anyhow::anyhow!(
                            "Gemini API error {}: {}",
                            status,
                            body_text
                        ));
                        continue;
                    }

                    // Client error (not 429) — don't retry
                    let body_text = response.text().await.unwrap_or_default();
                    bail!("Gemini API error {}: {}", status, body_text);
                }
                Err(e) => {
                    last_err = Some(e.into());
                    continue;
                }
            }
        }

        Err(last_err.unwrap_or_else(|| anyhow::anyhow!("Model call failed after retries")))
    }
}

/// Parse a `generateContent` response: concatenates the text parts of the
/// first candidate.
fn parse_gemini_response(json: &serde_json::Value) -> Result<String> {
    let parts = json
        .get("candidates")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("content"))
        .and_then(|c| c.get("parts"))
        .and_then(|p| p.as_array())
        .ok_or_else(|| anyhow::anyhow!("Invalid Gemini response: missing candidates"))?;

    let mut text = String::new();
    for part in parts {
        if let Some(fragment) = part.get("text").and_then(|t| t.as_str()) {
            text.push_str(fragment);
        }
    }

    if text.is_empty() {
        bail!("Invalid Gemini response: no text parts");
    }
    Ok(text)
}

/// Create the appropriate [`ModelBackend`] based on configuration.
///
/// # Supported Providers
///
/// | Config Value | Backend |
/// |-------------|---------|
/// | `"disabled"` | [`DisabledBackend`] |
/// | `"gemini"` | [`GeminiBackend`] |
///
/// # Errors
///
/// Returns an error for unknown provider names or if the Gemini backend
/// cannot be initialized (missing model name or API key).
pub fn create_backend(config: &ModelConfig) -> Result<Box<dyn ModelBackend>> {
    match config.provider.as_str() {
        "disabled" => Ok(Box::new(DisabledBackend)),
        "gemini" => Ok(Box::new(GeminiBackend::new(config)?)),
        other => bail!("Unknown model provider: {}", other),
    }
}
