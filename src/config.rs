//! Service configuration
//!
//! Values are layered, lowest precedence first:
//! built-in defaults, an optional TOML file, `OBJECT_QA__*` environment
//! variables (nested keys separated by `__`), then a handful of well-known
//! variables such as `OPENAI_API_KEY`.

use crate::error::{Result, ServiceError};
use crate::session::SessionKeyStrategy;
use secrecy::SecretString;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

/// Prefix for structured environment overrides
pub const ENV_PREFIX: &str = "OBJECT_QA";

/// Environment variable naming the config file
pub const CONFIG_PATH_ENV: &str = "OBJECT_QA_CONFIG";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub followup: FollowUpConfig,
    #[serde(default)]
    pub detect: DetectConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP listener settings
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Upper bound on a request body, multipart uploads included
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 5001 }
fn default_max_upload_bytes() -> usize { 10 * 1024 * 1024 }

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Hosted vision model settings
#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    /// Base URL of an OpenAI-compatible API, without the `/chat/completions` suffix
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// API key (read from env OPENAI_API_KEY if not set)
    #[serde(default)]
    pub api_key: Option<SecretString>,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Token cap for the identification call
    #[serde(default = "default_detect_max_tokens")]
    pub detect_max_tokens: u32,

    /// Token cap for a follow-up answer
    #[serde(default = "default_answer_max_tokens")]
    pub answer_max_tokens: u32,
}

fn default_base_url() -> String { "https://api.openai.com/v1".to_string() }
fn default_model() -> String { "gpt-4o".to_string() }
fn default_timeout_secs() -> u64 { 30 }
fn default_detect_max_tokens() -> u32 { 20 }
fn default_answer_max_tokens() -> u32 { 120 }

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
            model: default_model(),
            timeout_secs: default_timeout_secs(),
            detect_max_tokens: default_detect_max_tokens(),
            answer_max_tokens: default_answer_max_tokens(),
        }
    }
}

impl ModelConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Session store sizing and keying
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    #[serde(default)]
    pub key_strategy: SessionKeyStrategy,

    #[serde(default = "default_max_entries")]
    pub max_entries: u64,

    /// Entries untouched for this long are dropped
    #[serde(default = "default_idle_ttl_secs")]
    pub idle_ttl_secs: u64,
}

fn default_max_entries() -> u64 { 10_000 }
fn default_idle_ttl_secs() -> u64 { 3600 }

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            key_strategy: SessionKeyStrategy::default(),
            max_entries: default_max_entries(),
            idle_ttl_secs: default_idle_ttl_secs(),
        }
    }
}

impl SessionConfig {
    pub fn idle_ttl(&self) -> Duration {
        Duration::from_secs(self.idle_ttl_secs)
    }
}

/// Vague follow-up detection
#[derive(Debug, Clone, Deserialize)]
pub struct FollowUpConfig {
    #[serde(default = "default_phrases")]
    pub phrases: Vec<String>,
}

fn default_phrases() -> Vec<String> {
    crate::session::followup::DEFAULT_PHRASES
        .iter()
        .map(|p| p.to_string())
        .collect()
}

impl Default for FollowUpConfig {
    fn default() -> Self {
        Self {
            phrases: default_phrases(),
        }
    }
}

/// Detection response shaping
#[derive(Debug, Clone, Deserialize)]
pub struct DetectConfig {
    /// Friendlier `desc` text keyed by label, matched case-insensitively
    #[serde(default = "default_descriptions")]
    pub descriptions: HashMap<String, String>,
}

fn default_descriptions() -> HashMap<String, String> {
    HashMap::from([
        ("gum".to_string(), "gum, it's delicious".to_string()),
        ("ukit".to_string(), "uKit, let's learn robotics".to_string()),
    ])
}

impl Default for DetectConfig {
    fn default() -> Self {
        Self {
            descriptions: default_descriptions(),
        }
    }
}

impl DetectConfig {
    /// Description for a detected label, falling back to the label itself
    pub fn describe(&self, label: &str) -> String {
        let lowered = label.to_lowercase();
        self.descriptions
            .iter()
            .find(|(key, _)| key.to_lowercase() == lowered)
            .map(|(_, desc)| desc.clone())
            .unwrap_or_else(|| label.to_string())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_level")]
    pub level: String,

    #[serde(default)]
    pub format: LogFormat,
}

fn default_level() -> String { "info".to_string() }

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: LogFormat::default(),
        }
    }
}

impl Config {
    /// Load `.env`, then the file named by `OBJECT_QA_CONFIG` (default `config.toml`)
    pub fn load() -> Result<Self> {
        let _ = dotenvy::dotenv();
        let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| "config.toml".to_string());
        Self::from_file(path)
    }

    /// Load from a TOML file; a missing file means all defaults
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let builder = config::Config::builder()
            .add_source(config::File::from(path.as_ref()).required(false));
        Self::build(builder)
    }

    /// Load from TOML text
    pub fn from_toml_str(toml: &str) -> Result<Self> {
        let builder = config::Config::builder()
            .add_source(config::File::from_str(toml, config::FileFormat::Toml));
        Self::build(builder)
    }

    fn build(builder: config::ConfigBuilder<config::builder::DefaultState>) -> Result<Self> {
        let settings = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Config = settings.try_deserialize()?;
        let config = config.from_env();
        config.validate()?;
        Ok(config)
    }

    /// Apply well-known environment variables on top of loaded values
    pub fn from_env(mut self) -> Self {
        if let Ok(val) = std::env::var("OPENAI_API_KEY") {
            if !val.trim().is_empty() {
                self.model.api_key = Some(SecretString::new(val));
            }
        }

        if let Ok(val) = std::env::var("OPENAI_BASE_URL") {
            self.model.base_url = val;
        }

        if let Ok(val) = std::env::var("OBJECT_QA_MODEL") {
            self.model.model = val;
        }

        if let Ok(val) = std::env::var("PORT") {
            if let Ok(port) = val.parse() {
                self.server.port = port;
            }
        }

        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(ServiceError::Config("server.port must be non-zero".to_string()));
        }
        if self.server.max_upload_bytes == 0 {
            return Err(ServiceError::Config(
                "server.max_upload_bytes must be non-zero".to_string(),
            ));
        }
        if self.model.model.trim().is_empty() {
            return Err(ServiceError::Config("model.model cannot be empty".to_string()));
        }
        if self.model.base_url.trim().is_empty() {
            return Err(ServiceError::Config("model.base_url cannot be empty".to_string()));
        }
        if self.session.max_entries == 0 {
            return Err(ServiceError::Config(
                "session.max_entries must be non-zero".to_string(),
            ));
        }
        if self.followup.phrases.iter().any(|p| p.trim().is_empty()) {
            return Err(ServiceError::Config(
                "followup.phrases cannot contain blank entries".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.port, 5001);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.model.model, "gpt-4o");
        assert_eq!(config.model.detect_max_tokens, 20);
        assert_eq!(config.model.answer_max_tokens, 120);
        assert_eq!(config.session.key_strategy, SessionKeyStrategy::Token);
        assert!(config.followup.phrases.contains(&"name another".to_string()));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_toml_sections() {
        let config = Config::from_toml_str(
            r#"
            [server]
            port = 8088

            [model]
            model = "gpt-4o-mini"
            api_key = "sk-from-file"
            timeout_secs = 5

            [session]
            key_strategy = "address"
            max_entries = 16

            [followup]
            phrases = ["again"]

            [logging]
            format = "json"
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 8088);
        assert_eq!(config.model.model, "gpt-4o-mini");
        assert_eq!(config.model.timeout(), Duration::from_secs(5));
        assert_eq!(config.session.key_strategy, SessionKeyStrategy::Address);
        assert_eq!(config.session.max_entries, 16);
        assert_eq!(config.followup.phrases, vec!["again".to_string()]);
        assert_eq!(config.logging.format, LogFormat::Json);
        // Unset sections keep their defaults
        assert_eq!(config.session.idle_ttl_secs, 3600);
        assert_eq!(config.server.host, "0.0.0.0");
    }

    #[test]
    fn test_api_key_file_value_is_secret() {
        let config = Config::from_toml_str("[model]\napi_key = \"sk-hidden\"\n").unwrap();
        // An OPENAI_API_KEY in the test environment would take precedence
        if std::env::var("OPENAI_API_KEY").is_err() {
            let key = config.model.api_key.as_ref().unwrap();
            assert_eq!(key.expose_secret(), "sk-hidden");
        }
        assert!(!format!("{:?}", config.model).contains("sk-hidden"));
    }

    #[test]
    fn test_validate_rejects_zero_capacity() {
        let mut config = Config::default();
        config.session.max_entries = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_blank_phrase() {
        let mut config = Config::default();
        config.followup.phrases.push("  ".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_description_overrides() {
        let detect = DetectConfig::default();
        assert_eq!(detect.describe("Gum"), "gum, it's delicious");
        assert_eq!(detect.describe("UKIT"), "uKit, let's learn robotics");
        assert_eq!(detect.describe("Coca-Cola bottle"), "Coca-Cola bottle");
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = Config::from_file("/nonexistent/object-qa.toml").unwrap();
        assert_eq!(config.session.max_entries, 10_000);
    }
}
