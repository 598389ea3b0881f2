//! TOML configuration parsing and validation.
//!
//! Every section is optional; omitted values fall back to the defaults
//! below. A missing config file is not an error for the CLI, which then runs
//! with [`Config::minimal`]: SQLite at `./data/intake.sqlite`, so results
//! survive between invocations.
//!
//! ```toml
//! [storage]
//! backend = "sqlite"                 # memory | sqlite | redis
//! sqlite_path = "./data/intake.sqlite"
//! redis_url = "redis://localhost:6379"
//!
//! [llm]
//! provider = "gemini"                # gemini | openai
//! model = "gemini-1.5-flash"
//! api_key_env = "GOOGLE_API_KEY"
//! temperature = 0.3
//! max_output_tokens = 2048
//! timeout_secs = 60
//!
//! [history]
//! display_limit = 5
//!
//! [server]
//! bind = "127.0.0.1:7340"
//! ```

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    #[serde(default = "default_backend")]
    pub backend: String,
    #[serde(default = "default_sqlite_path")]
    pub sqlite_path: PathBuf,
    #[serde(default = "default_redis_url")]
    pub redis_url: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            sqlite_path: default_sqlite_path(),
            redis_url: default_redis_url(),
        }
    }
}

fn default_backend() -> String {
    "sqlite".to_string()
}
fn default_sqlite_path() -> PathBuf {
    PathBuf::from("./data/intake.sqlite")
}
fn default_redis_url() -> String {
    "redis://localhost:6379".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    /// Base URL override (e.g. a proxy or a local OpenAI-compatible server).
    #[serde(default)]
    pub url: Option<String>,
    /// Name of the environment variable holding the API key.
    #[serde(default)]
    pub api_key_env: Option<String>,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            url: None,
            api_key_env: None,
            temperature: default_temperature(),
            max_output_tokens: default_max_output_tokens(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_provider() -> String {
    "gemini".to_string()
}
fn default_temperature() -> f32 {
    0.3
}
fn default_max_output_tokens() -> u32 {
    2048
}
fn default_timeout_secs() -> u64 {
    60
}

impl LlmConfig {
    pub fn model_name(&self) -> &str {
        match (&self.model, self.provider.as_str()) {
            (Some(m), _) => m.as_str(),
            (None, "openai") => "gpt-4o-mini",
            (None, _) => "gemini-1.5-flash",
        }
    }

    pub fn base_url(&self) -> &str {
        match (&self.url, self.provider.as_str()) {
            (Some(u), _) => u.trim_end_matches('/'),
            (None, "openai") => "https://api.openai.com/v1",
            (None, _) => "https://generativelanguage.googleapis.com/v1beta",
        }
    }

    pub fn api_key_var(&self) -> &str {
        match (&self.api_key_env, self.provider.as_str()) {
            (Some(v), _) => v.as_str(),
            (None, "openai") => "OPENAI_API_KEY",
            (None, _) => "GOOGLE_API_KEY",
        }
    }

    /// Read the API key from the environment, loading `.env` first.
    ///
    /// # Errors
    ///
    /// Returns an error if the variable is unset or empty.
    pub fn resolve_api_key(&self) -> Result<String> {
        dotenvy::dotenv().ok();
        let var = self.api_key_var();
        match std::env::var(var) {
            Ok(key) if !key.trim().is_empty() => Ok(key),
            _ => bail!(
                "{} not found in environment; set it or add it to a .env file",
                var
            ),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct HistoryConfig {
    #[serde(default = "default_display_limit")]
    pub display_limit: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            display_limit: default_display_limit(),
        }
    }
}

fn default_display_limit() -> usize {
    5
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
    "127.0.0.1:7340".to_string()
}

impl Config {
    /// Defaults for every section: SQLite at `./data/intake.sqlite`, Gemini provider.
    pub fn minimal() -> Self {
        Self::default()
    }
}

/// Parse and validate a configuration file.
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

/// Load `path` if it exists, otherwise fall back to [`Config::minimal`].
pub fn load_or_default(path: &Path) -> Result<Config> {
    if path.exists() {
        load_config(path)
    } else {
        tracing::info!(path = %path.display(), "config file not found, using defaults");
        Ok(Config::minimal())
    }
}

pub fn validate(config: &Config) -> Result<()> {
    match config.storage.backend.as_str() {
        "memory" | "sqlite" | "redis" => {}
        other => bail!(
            "Unknown storage backend: '{}'. Must be memory, sqlite, or redis.",
            other
        ),
    }

    match config.llm.provider.as_str() {
        "gemini" | "openai" => {}
        other => bail!(
            "Unknown LLM provider: '{}'. Must be gemini or openai.",
            other
        ),
    }

    if !(0.0..=2.0).contains(&config.llm.temperature) {
        bail!("llm.temperature must be in [0.0, 2.0]");
    }
    if config.llm.max_output_tokens == 0 {
        bail!("llm.max_output_tokens must be > 0");
    }
    if config.llm.timeout_secs == 0 {
        bail!("llm.timeout_secs must be > 0");
    }
    if config.history.display_limit == 0 {
        bail!("history.display_limit must be >= 1");
    }

    Ok(())
}
