//! Configuration loading and management for shelfscout.
//!
//! Loads settings from `shelfscout.toml` with environment variable overrides for sensitive data.

use crate::retry::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("missing required API key for provider: {0}")]
    MissingApiKey(String),
}

/// Generative model settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Model identifier (e.g., "gemini-2.5-flash")
    pub name: String,
    /// Base URL of the generateContent API
    pub endpoint: String,
    /// Send a response schema hint with each request
    pub response_schema: bool,
    /// Let the model ground its answer with web search
    pub google_search: bool,
}

/// Web search settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Custom Search JSON API endpoint
    pub endpoint: String,
}

/// Book catalog settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Root of the catalog site, used for read-shelf lookups
    pub base_url: String,
    /// Domain restricting web search results (`site:` operator)
    pub site: String,
    /// Substring identifying a book detail page URL
    pub detail_path: String,
}

/// Backoff settings for rate-limited calls
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub multiplier: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_secs: u64,
}

/// API keys configuration (loaded from environment)
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ApiConfig {
    #[serde(default)]
    pub gemini_key: Option<String>,
    #[serde(default)]
    pub search_key: Option<String>,
    #[serde(default)]
    pub search_cx: Option<String>,
}

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub api: ApiConfig,
}

/// Search API credentials
#[derive(Debug, Clone, Default)]
pub struct SearchCredentials {
    pub api_key: String,
    pub cx: String,
}

impl SearchCredentials {
    pub fn is_complete(&self) -> bool {
        !self.api_key.trim().is_empty() && !self.cx.trim().is_empty()
    }
}

/// Everything needed to talk to the model and search providers
#[derive(Debug, Clone)]
pub struct Credentials {
    pub model_api_key: String,
    pub search: SearchCredentials,
}

impl Config {
    /// Load configuration from the default location (shelfscout.toml in cwd or home)
    ///
    /// Falls back to built-in defaults when no config file exists.
    pub fn load() -> Result<Self, ConfigError> {
        match Self::find_config_file() {
            Some(path) => Self::load_from(&path),
            None => {
                let mut config = Config::default();
                config.apply_env();
                Ok(config)
            }
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&content)?;
        config.apply_env();
        Ok(config)
    }

    /// Override API keys from environment variables
    fn apply_env(&mut self) {
        if let Ok(key) = std::env::var("GEMINI_API_KEY") {
            self.api.gemini_key = Some(key);
        }
        if let Ok(key) = std::env::var("GOOGLE_SEARCH_API_KEY") {
            self.api.search_key = Some(key);
        }
        if let Ok(cx) = std::env::var("GOOGLE_SEARCH_CX") {
            self.api.search_cx = Some(cx);
        }
    }

    /// Find the config file in standard locations
    fn find_config_file() -> Option<PathBuf> {
        // Check current directory first
        let local_config = PathBuf::from("shelfscout.toml");
        if local_config.exists() {
            return Some(local_config);
        }

        // Check home directory
        dirs::home_dir()
            .map(|home| home.join(".config").join("shelfscout").join("shelfscout.toml"))
            .filter(|path| path.exists())
    }

    /// Collect credentials. Only the model key is mandatory; without search
    /// credentials recommendations come back unenriched.
    pub fn credentials(&self) -> Result<Credentials, ConfigError> {
        let model_api_key = self
            .api
            .gemini_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingApiKey("gemini".to_string()))?;

        Ok(Credentials {
            model_api_key,
            search: self.search_credentials(),
        })
    }

    pub fn search_credentials(&self) -> SearchCredentials {
        SearchCredentials {
            api_key: self.api.search_key.clone().unwrap_or_default(),
            cx: self.api.search_cx.clone().unwrap_or_default(),
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            base_delay: Duration::from_millis(self.retry.base_delay_ms),
            multiplier: self.retry.multiplier,
            max_attempts: self.retry.max_attempts,
            ..RetryPolicy::default()
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.http.timeout_secs)
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: "gemini-2.5-flash".to_string(),
            endpoint: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            response_schema: true,
            google_search: true,
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://www.googleapis.com/customsearch/v1".to_string(),
        }
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.goodreads.com".to_string(),
            site: "goodreads.com".to_string(),
            detail_path: "goodreads.com/book/show".to_string(),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay_ms: 1000,
            multiplier: 2,
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self { timeout_secs: 30 }
    }
}
