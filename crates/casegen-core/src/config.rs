//! Project configuration for test generation and execution

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

pub const DEFAULT_BASE_URL: &str = "https://petstore.swagger.io/v2";

/// Project configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Target API
    #[serde(default)]
    pub api: ApiConfig,

    /// Language model used for generation
    #[serde(default)]
    pub llm: LlmConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL every case endpoint is appended to
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_api_timeout")]
    pub timeout_secs: u64,

    /// Headers sent with every case (a case's own headers take precedence).
    /// Applied in key order, so of two names differing only in case the
    /// later one wins.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_api_timeout(),
            headers: BTreeMap::new(),
        }
    }
}

impl ApiConfig {
    /// Usable base URL without a trailing slash.
    ///
    /// Falls back to [`DEFAULT_BASE_URL`] when the configured value is empty
    /// or not an http(s) URL.
    #[must_use]
    pub fn base_url(&self) -> String {
        let trimmed = self.base_url.trim();
        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            return trimmed.trim_end_matches('/').to_string();
        }
        warn!(
            configured = %self.base_url,
            "invalid base_url, using {DEFAULT_BASE_URL}"
        );
        DEFAULT_BASE_URL.to_string()
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// OpenAI-compatible chat completions URL
    #[serde(default = "default_llm_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_model")]
    pub model: String,

    /// Environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            endpoint: default_llm_endpoint(),
            model: default_model(),
            api_key_env: default_api_key_env(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_llm_timeout(),
        }
    }
}

impl LlmConfig {
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

const fn default_api_timeout() -> u64 {
    10
}

fn default_llm_endpoint() -> String {
    "https://api.openai.com/v1/chat/completions".to_string()
}

fn default_model() -> String {
    "gpt-4.1-2025-04-14".to_string()
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

const fn default_temperature() -> f32 {
    0.2
}

const fn default_max_tokens() -> u32 {
    2048
}

const fn default_llm_timeout() -> u64 {
    120
}

impl Config {
    /// Load config from file
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be read or parsed
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e.to_string()))?;

        if path.extension().is_some_and(|ext| ext == "json") {
            serde_json::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
        } else {
            toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
        }
    }

    /// Load from the first default location that exists (.casegen.toml, ...)
    ///
    /// # Errors
    ///
    /// Returns error if a config file exists but cannot be read or parsed
    pub fn load_default() -> Result<Self, ConfigError> {
        Self::load_from_dir(Path::new("."))
    }

    /// Same as [`Config::load_default`], searching `dir` instead of the
    /// working directory.
    ///
    /// # Errors
    ///
    /// Returns error if a config file exists but cannot be read or parsed
    pub fn load_from_dir(dir: &Path) -> Result<Self, ConfigError> {
        for name in Self::CANDIDATES {
            let path = dir.join(name);
            if path.exists() {
                return Self::load(&path);
            }
        }

        // No config file, return default
        Ok(Self::default())
    }

    pub const CANDIDATES: [&str; 3] = [".casegen.toml", ".casegen.json", "casegen.toml"];

    /// Create example config file
    pub fn example() -> &'static str {
        r#"# casegen configuration

[api]
# Target API; case endpoints are appended to this
base_url = "https://petstore.swagger.io/v2"

# Per-request timeout in seconds
timeout_secs = 10

# Headers sent with every test case (case headers override these)
[api.headers]
# Authorization = "Bearer your-token-here"
# api_key = "special-key"

[llm]
# OpenAI-compatible chat completions endpoint
endpoint = "https://api.openai.com/v1/chat/completions"
model = "gpt-4.1-2025-04-14"

# Environment variable that holds the API key
api_key_env = "OPENAI_API_KEY"

temperature = 0.2
max_tokens = 2048

# Generation timeout in seconds
timeout_secs = 120
"#
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Cannot read {0}: {1}")]
    Io(PathBuf, String),
    #[error("Parse error: {0}")]
    Parse(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.api.base_url(), DEFAULT_BASE_URL);
        assert_eq!(config.api.timeout(), Duration::from_secs(10));
        assert_eq!(config.llm.model, "gpt-4.1-2025-04-14");
        assert_eq!(config.llm.api_key_env, "OPENAI_API_KEY");
        assert_eq!(config.llm.timeout(), Duration::from_secs(120));
    }

    #[test]
    fn parse_toml() {
        let toml = r#"
[api]
base_url = "http://localhost:3000/"
timeout_secs = 3

[api.headers]
Authorization = "Bearer token123"

[llm]
model = "local-model"
"#;
        let config: Config = toml::from_str(toml).unwrap();

        assert_eq!(config.api.base_url(), "http://localhost:3000");
        assert_eq!(config.api.timeout_secs, 3);
        assert_eq!(
            config.api.headers.get("Authorization"),
            Some(&"Bearer token123".to_string())
        );
        assert_eq!(config.llm.model, "local-model");
        assert_eq!(config.llm.max_tokens, 2048);
    }

    #[test]
    fn base_url_falls_back_when_unusable() {
        for bad in ["", "   ", "petstore.swagger.io/v2", "ftp://example.com"] {
            let api = ApiConfig {
                base_url: bad.into(),
                ..ApiConfig::default()
            };
            assert_eq!(api.base_url(), DEFAULT_BASE_URL, "{bad:?}");
        }
    }

    #[test]
    fn example_parses_to_defaults() {
        let config: Config = toml::from_str(Config::example()).unwrap();
        assert_eq!(config.api.base_url(), DEFAULT_BASE_URL);
        assert_eq!(config.llm.endpoint, LlmConfig::default().endpoint);
        assert!(config.api.headers.is_empty());
    }

    #[test]
    fn missing_file_means_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from_dir(dir.path()).unwrap();
        assert_eq!(config.api.timeout_secs, 10);
    }

    #[test]
    fn candidate_order_is_respected() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("casegen.toml"), "[api]\ntimeout_secs = 7\n").unwrap();
        std::fs::write(
            dir.path().join(".casegen.json"),
            r#"{"api": {"timeout_secs": 5}}"#,
        )
        .unwrap();
        let config = Config::load_from_dir(dir.path()).unwrap();
        assert_eq!(config.api.timeout_secs, 5);
    }

    #[test]
    fn unparsable_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".casegen.toml");
        std::fs::write(&path, "[api\nbase_url = ").unwrap();
        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn unreadable_path_is_io_error() {
        let err = Config::load(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(err.to_string().starts_with("Cannot read /definitely/not/here.toml"));
    }
}
