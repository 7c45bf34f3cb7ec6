use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub ingestion: IngestionConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ModelConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            api_key_env: default_api_key_env(),
            base_url: default_base_url(),
            max_retries: default_max_retries(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl ModelConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

fn default_provider() -> String {
    "disabled".to_string()
}
fn default_api_key_env() -> String {
    "GEMINI_API_KEY".to_string()
}
fn default_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}
fn default_max_retries() -> u32 {
    3
}
fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct IngestionConfig {
    /// Endpoint that extracts text from an uploaded file (PDF or image).
    #[serde(default)]
    pub extract_endpoint: Option<String>,
    /// Endpoint that fetches a YouTube transcript by video id.
    #[serde(default)]
    pub transcript_endpoint: Option<String>,
    /// Request timestamped transcript segments instead of plain text.
    #[serde(default)]
    pub with_timestamps: bool,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            extract_endpoint: None,
            transcript_endpoint: None,
            with_timestamps: false,
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:7878".to_string()
}

impl Config {
    /// A config with everything defaulted (backend disabled, no endpoints).
    /// Useful for tests and for sessions driven entirely by injected
    /// collaborators.
    pub fn minimal() -> Self {
        Self::default()
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    // Validate model section
    match config.model.provider.as_str() {
        "disabled" | "gemini" => {}
        other => anyhow::bail!(
            "Unknown model provider: '{}'. Must be disabled or gemini.",
            other
        ),
    }
    if config.model.is_enabled() && config.model.model.is_none() {
        anyhow::bail!(
            "model.model must be specified when provider is '{}'",
            config.model.provider
        );
    }
    if config.model.timeout_secs == 0 {
        anyhow::bail!("model.timeout_secs must be > 0");
    }

    // Validate ingestion section
    if config.ingestion.timeout_secs == 0 {
        anyhow::bail!("ingestion.timeout_secs must be > 0");
    }
    for (key, endpoint) in [
        ("ingestion.extract_endpoint", &config.ingestion.extract_endpoint),
        (
            "ingestion.transcript_endpoint",
            &config.ingestion.transcript_endpoint,
        ),
    ] {
        if let Some(endpoint) = endpoint {
            if !crate::validate::is_valid_url(endpoint) {
                anyhow::bail!("{} is not a valid http(s) URL: '{}'", key, endpoint);
            }
        }
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_config(content: &str) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chat.toml");
        std::fs::write(&path, content).unwrap();
        (dir, path)
    }

    #[test]
    fn empty_config_uses_defaults() {
        let (_dir, path) = write_config("");
        let config = load_config(&path).unwrap();
        assert_eq!(config.model.provider, "disabled");
        assert!(!config.model.is_enabled());
        assert_eq!(config.model.api_key_env, "GEMINI_API_KEY");
        assert_eq!(config.server.bind, "127.0.0.1:7878");
        assert!(config.ingestion.extract_endpoint.is_none());
    }

    #[test]
    fn full_config_parses() {
        let (_dir, path) = write_config(
            r#"
[model]
provider = "gemini"
model = "gemini-pro"
timeout_secs = 10

[ingestion]
extract_endpoint = "http://127.0.0.1:9000/api/uploadPdf"
transcript_endpoint = "http://127.0.0.1:9000/api/youtube"
with_timestamps = true

[server]
bind = "0.0.0.0:8080"
"#,
        );
        let config = load_config(&path).unwrap();
        assert!(config.model.is_enabled());
        assert_eq!(config.model.model.as_deref(), Some("gemini-pro"));
        assert!(config.ingestion.with_timestamps);
        assert_eq!(config.server.bind, "0.0.0.0:8080");
    }

    #[test]
    fn unknown_provider_rejected() {
        let (_dir, path) = write_config("[model]\nprovider = \"gpt\"\n");
        assert!(load_config(&path).is_err());
    }

    #[test]
    fn enabled_provider_requires_model() {
        let (_dir, path) = write_config("[model]\nprovider = \"gemini\"\n");
        assert!(load_config(&path).is_err());
    }

    #[test]
    fn malformed_endpoint_rejected() {
        let (_dir, path) = write_config("[ingestion]\nextract_endpoint = \"not a url\"\n");
        assert!(load_config(&path).is_err());
    }
}
