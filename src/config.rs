//! Configuration loading and management for summa-web3.
//!
//! Loads settings from `summa-web3.toml` with environment variable overrides for
//! API keys and endpoints. Every section has defaults, so running without a
//! config file is supported.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

const CONFIG_FILE: &str = "summa-web3.toml";

/// Browser-like User-Agent; some news sites refuse unknown clients
const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

/// Secondary models known to work well with the inference API, with a short note each
pub const RECOMMENDED_MODELS: &[(&str, &str)] = &[
    ("facebook/bart-large-cnn", "Good general-purpose news summarizer"),
    ("sshleifer/distilbart-cnn-12-6", "Faster, smaller version of BART"),
    ("google/pegasus-xsum", "Higher quality but slower"),
    ("t5-base", "Versatile text-to-text model"),
    ("facebook/bart-large-xsum", "Extreme summarization (very concise)"),
];

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Primary LLM provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// LLM provider: "openai" or "gemini"
    pub provider: String,
    /// Model identifier (e.g., "gpt-3.5-turbo")
    pub model: String,
    /// System persona for the agent
    pub persona: String,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Override for the OpenAI-compatible endpoint
    pub base_url: String,
}

/// Hosted inference API (secondary backend)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceConfig {
    pub model: String,
    /// Model URLs are `{base_url}{model}`
    pub base_url: String,
}

/// Local model server used as the secondary backend's fallback
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalModelConfig {
    pub url: Option<String>,
    pub model: String,
}

/// Article fetching
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Total attempts, including the first one
    pub max_retries: u32,
    pub retry_delay_secs: u64,
    pub timeout_secs: u64,
    pub user_agent: String,
}

/// Summarization engine limits
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SummarizerConfig {
    /// Characters kept before any backend sees the text
    pub max_input_length: usize,
    /// Window size for the chunked path
    pub chunk_size: usize,
    /// Per-request timeout for remote backends
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Web3Config {
    /// Node endpoint; recorded for operators, addresses are checksummed locally
    pub provider_url: Option<String>,
}

/// API keys configuration (loaded from environment)
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ApiConfig {
    #[serde(default)]
    pub openai_key: Option<String>,
    #[serde(default)]
    pub gemini_key: Option<String>,
    #[serde(default)]
    pub huggingface_key: Option<String>,
}

/// Storage paths configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Base path for data storage
    pub path: PathBuf,
}

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub inference: InferenceConfig,
    #[serde(default)]
    pub local: LocalModelConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub summarizer: SummarizerConfig,
    #[serde(default)]
    pub web3: Web3Config,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

impl Config {
    /// Load configuration from the default location, falling back to defaults
    /// when no file exists. Environment overrides are always applied.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match Self::find_config_file() {
            Some(path) => Self::parse_file(&path)?,
            None => Config::default(),
        };
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &PathBuf) -> Result<Self, ConfigError> {
        let mut config = Self::parse_file(path)?;
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    fn parse_file(path: &PathBuf) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Override keys and endpoints from environment variables
    pub fn apply_env(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(key) = var("OPENAI_API_KEY") {
            self.api.openai_key = Some(key);
        }
        if let Some(key) = var("GEMINI_API_KEY") {
            self.api.gemini_key = Some(key);
        }
        if let Some(key) = var("HUGGINGFACE_API_KEY") {
            self.api.huggingface_key = Some(key);
        }
        if let Some(model) = var("HUGGINGFACE_MODEL") {
            self.inference.model = model;
        }
        if let Some(url) = var("LOCAL_MODEL_URL") {
            self.local.url = Some(url);
        }
        if let Some(model) = var("LOCAL_MODEL_NAME") {
            self.local.model = model;
        }
        if let Some(url) = var("WEB3_PROVIDER_URL") {
            self.web3.provider_url = Some(url);
        }
        if let Some(dir) = var("SUMMA_DATA_DIR") {
            self.storage.path = PathBuf::from(dir);
        }
    }

    /// Reject settings the pipeline cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.fetch.max_retries == 0 {
            return Err(ConfigError::Invalid("fetch.max_retries must be at least 1".into()));
        }
        if self.summarizer.max_input_length == 0 {
            return Err(ConfigError::Invalid(
                "summarizer.max_input_length must be positive".into(),
            ));
        }
        if self.summarizer.chunk_size == 0 {
            return Err(ConfigError::Invalid("summarizer.chunk_size must be positive".into()));
        }
        match self.agent.provider.as_str() {
            "openai" | "gemini" => Ok(()),
            other => Err(ConfigError::Invalid(format!("unknown provider: {}", other))),
        }
    }

    /// Find the config file in standard locations
    fn find_config_file() -> Option<PathBuf> {
        // Check current directory first
        let local_config = PathBuf::from(CONFIG_FILE);
        if local_config.exists() {
            return Some(local_config);
        }

        // Check home directory
        let home_config = dirs::home_dir()?
            .join(".config")
            .join("summa-web3")
            .join(CONFIG_FILE);
        home_config.exists().then_some(home_config)
    }

    /// The primary API key, if one is configured for the selected provider
    pub fn primary_key(&self) -> Option<&str> {
        match self.agent.provider.as_str() {
            "openai" => self.api.openai_key.as_deref(),
            "gemini" => self.api.gemini_key.as_deref(),
            _ => None,
        }
    }

    /// The secondary (inference API) key
    pub fn secondary_key(&self) -> Option<&str> {
        self.api.huggingface_key.as_deref()
    }
}

impl FetchConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl SummarizerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "gpt-3.5-turbo".to_string(),
            persona: "You are a helpful assistant that summarizes articles.".to_string(),
            max_tokens: 500,
            temperature: 0.5,
            base_url: "https://api.openai.com/v1".to_string(),
        }
    }
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            model: "facebook/bart-large-cnn".to_string(),
            base_url: "https://api-inference.huggingface.co/models/".to_string(),
        }
    }
}

impl Default for LocalModelConfig {
    fn default() -> Self {
        Self {
            url: None,
            model: "llama3".to_string(),
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay_secs: 2,
            timeout_secs: 30,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            max_input_length: 1500,
            chunk_size: 3000,
            timeout_secs: 60,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./data"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_match_pipeline_constants() {
        let config = Config::default();
        assert_eq!(config.fetch.max_retries, 3);
        assert_eq!(config.fetch.retry_delay(), Duration::from_secs(2));
        assert_eq!(config.fetch.timeout(), Duration::from_secs(30));
        assert_eq!(config.summarizer.max_input_length, 1500);
        assert_eq!(config.summarizer.chunk_size, 3000);
        assert_eq!(config.summarizer.timeout(), Duration::from_secs(60));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
            [agent]
            provider = "gemini"
            model = "gemini-2.5-flash"

            [fetch]
            max_retries = 5
            "#,
        )
        .unwrap();

        assert_eq!(config.agent.provider, "gemini");
        assert_eq!(config.agent.max_tokens, 500);
        assert_eq!(config.fetch.max_retries, 5);
        assert_eq!(config.fetch.retry_delay_secs, 2);
        assert_eq!(config.inference.model, "facebook/bart-large-cnn");
    }

    #[test]
    fn env_overrides_select_keys() {
        let env: HashMap<&str, &str> = [
            ("OPENAI_API_KEY", "sk-test"),
            ("HUGGINGFACE_API_KEY", "hf-test"),
            ("HUGGINGFACE_MODEL", "t5-base"),
            ("GEMINI_API_KEY", "  "),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_overrides(|name| env.get(name).map(|v| v.to_string()));

        assert_eq!(config.primary_key(), Some("sk-test"));
        assert_eq!(config.secondary_key(), Some("hf-test"));
        assert_eq!(config.inference.model, "t5-base");
        assert!(config.api.gemini_key.is_none());
    }

    #[test]
    fn primary_key_follows_provider() {
        let mut config = Config::default();
        config.api.openai_key = Some("sk-test".into());
        config.agent.provider = "gemini".into();
        assert_eq!(config.primary_key(), None);
    }

    #[test]
    fn validate_rejects_zero_limits() {
        let mut config = Config::default();
        config.fetch.max_retries = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = Config::default();
        config.summarizer.chunk_size = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.agent.provider = "anthropic".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn load_from_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "[storage]\npath = \"/tmp/summa\"\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        // SUMMA_DATA_DIR may be set in the environment running the tests
        if std::env::var("SUMMA_DATA_DIR").is_err() {
            assert_eq!(config.storage.path, PathBuf::from("/tmp/summa"));
        }
    }
}
