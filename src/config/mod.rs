//! Configuration management.
//!
//! Settings come from built-in defaults, then an optional TOML file, then
//! `PATENT_SEARCH_*` environment variables (nested keys use `__`, e.g.
//! `PATENT_SEARCH_SEARCH__DEBOUNCE_MS=300`).

mod file_config;

pub use file_config::{write_default_config, ConfigFileError};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// Application name used for config and data directories
pub const APP_NAME: &str = "patent-search";

/// Config file looked up in the working directory
pub const LOCAL_CONFIG_FILE: &str = "patent-search.toml";

const ENV_PREFIX: &str = "PATENT_SEARCH";

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub search: SearchConfig,

    #[serde(default)]
    pub providers: ProvidersConfig,

    #[serde(default)]
    pub history: HistoryConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Timing and limits for the search pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Quiet period before typed input is searched
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Shortest trimmed query that reaches a provider
    #[serde(default = "default_min_query_len")]
    pub min_query_len: usize,

    /// Bound on a single provider call
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_max_results")]
    pub max_results: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            min_query_len: default_min_query_len(),
            timeout_secs: default_timeout_secs(),
            max_results: default_max_results(),
        }
    }
}

impl SearchConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_debounce_ms() -> u64 {
    500
}

fn default_min_query_len() -> usize {
    crate::models::MIN_QUERY_LEN
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_max_results() -> usize {
    20
}

/// Search backends
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvidersConfig {
    /// Full-text search endpoint
    #[serde(default)]
    pub text_endpoint: Option<String>,

    /// Image similarity endpoint
    #[serde(default)]
    pub image_endpoint: Option<String>,

    /// Sent as `x-api-key` when set
    #[serde(default)]
    pub api_key: Option<String>,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            text_endpoint: None,
            image_endpoint: None,
            api_key: std::env::var("PATENT_SEARCH_API_KEY").ok(),
        }
    }
}

impl ProvidersConfig {
    pub fn text_url(&self) -> Result<Option<Url>, ConfigError> {
        parse_endpoint("providers.text_endpoint", self.text_endpoint.as_deref())
    }

    pub fn image_url(&self) -> Result<Option<Url>, ConfigError> {
        parse_endpoint("providers.image_endpoint", self.image_endpoint.as_deref())
    }
}

fn parse_endpoint(key: &'static str, value: Option<&str>) -> Result<Option<Url>, ConfigError> {
    let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(None);
    };
    let url = Url::parse(value).map_err(|e| ConfigError::InvalidEndpoint {
        key,
        reason: e.to_string(),
    })?;
    match url.scheme() {
        "http" | "https" => Ok(Some(url)),
        other => Err(ConfigError::InvalidEndpoint {
            key,
            reason: format!("unsupported scheme '{}'", other),
        }),
    }
}

/// Saved search history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// History file; defaults to `history.jsonl` in the data directory
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: None,
        }
    }
}

impl HistoryConfig {
    pub fn resolved_path(&self) -> PathBuf {
        self.path.clone().unwrap_or_else(|| {
            dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(APP_NAME)
                .join("history.jsonl")
        })
    }
}

fn default_true() -> bool {
    true
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// `json` for machine-readable logs, anything else for plain text
    #[serde(default)]
    pub format: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: None,
        }
    }
}

impl LoggingConfig {
    pub fn is_json(&self) -> bool {
        self.format
            .as_deref()
            .is_some_and(|f| f.eq_ignore_ascii_case("json"))
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid {key}: {reason}")]
    InvalidEndpoint { key: &'static str, reason: String },

    #[error("invalid {key}: {reason}")]
    InvalidValue { key: &'static str, reason: String },
}

impl Config {
    /// Check values the type system cannot
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.providers.text_url()?;
        self.providers.image_url()?;

        if self.search.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "search.timeout_secs",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.search.max_results == 0 {
            return Err(ConfigError::InvalidValue {
                key: "search.max_results",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

/// Where `config init` writes and where lookup ends
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_NAME).join("config.toml"))
}

/// First existing config file: `./patent-search.toml`, then the user
/// config directory.
pub fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from(LOCAL_CONFIG_FILE);
    if local.is_file() {
        return Some(local);
    }
    default_config_path().filter(|path| path.is_file())
}

/// Load configuration, layering an optional file under environment
/// variables. A missing `path` is an error; pass `None` to skip the file.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let mut builder = config::Config::builder();
    if let Some(path) = path {
        builder = builder.add_source(config::File::from(path));
    }

    let settings = builder
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    let mut config: Config = settings.try_deserialize()?;
    if config.providers.api_key.is_none() {
        config.providers.api_key = std::env::var("PATENT_SEARCH_API_KEY").ok();
    }
    config.validate()?;
    Ok(config)
}

/// Configuration from the first config file found, or env vars and defaults
pub fn get_config() -> Result<Config, ConfigError> {
    load_config(find_config_file().as_deref())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.search.debounce(), Duration::from_millis(500));
        assert_eq!(config.search.min_query_len, 2);
        assert_eq!(config.search.timeout(), Duration::from_secs(10));
        assert_eq!(config.search.max_results, 20);
        assert!(config.history.enabled);
        assert!(!config.logging.is_json());
    }

    #[test]
    fn test_load_config_from_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[search]
debounce_ms = 250
timeout_secs = 3

[providers]
text_endpoint = "https://api.example.com/search"

[logging]
format = "json"
"#,
        )
        .unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.search.debounce_ms, 250);
        assert_eq!(config.search.timeout_secs, 3);
        assert_eq!(config.search.max_results, 20);
        assert_eq!(
            config.providers.text_url().unwrap().unwrap().as_str(),
            "https://api.example.com/search"
        );
        assert_eq!(config.providers.image_url().unwrap(), None);
        assert!(config.logging.is_json());
    }

    #[test]
    fn test_invalid_endpoint_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[providers]\nimage_endpoint = \"ftp://example.com\"\n").unwrap();

        let err = load_config(Some(&path)).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidEndpoint {
                key: "providers.image_endpoint",
                ..
            }
        ));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let mut config = Config::default();
        config.search.timeout_secs = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue {
                key: "search.timeout_secs",
                ..
            })
        ));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let result = load_config(Some(Path::new("/nonexistent/patent-search.toml")));
        assert!(matches!(result, Err(ConfigError::Load(_))));
    }

    #[test]
    fn test_history_path_override() {
        let history = HistoryConfig {
            enabled: true,
            path: Some(PathBuf::from("/tmp/searches.jsonl")),
        };
        assert_eq!(history.resolved_path(), PathBuf::from("/tmp/searches.jsonl"));
        assert!(HistoryConfig::default()
            .resolved_path()
            .ends_with("patent-search/history.jsonl"));
    }
}
