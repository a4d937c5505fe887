//! Writing configuration files.
//!
//! # Configuration File Format
//!
//! ```toml
//! [search]
//! debounce_ms = 500
//! min_query_len = 2
//! timeout_secs = 10
//! max_results = 20
//!
//! [providers]
//! text_endpoint = "https://api.example.com/search"
//! image_endpoint = "https://api.example.com/image-search"
//!
//! [history]
//! enabled = true
//!
//! [logging]
//! level = "info"
//! format = "json"
//! ```
//!
//! The API key is best left to `PATENT_SEARCH_API_KEY` rather than written
//! to disk.

use std::path::Path;

use super::Config;

/// Configuration file errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigFileError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("{0} already exists (use --force to overwrite)")]
    Exists(String),
}

impl Config {
    /// Render as TOML, leaving the API key out
    pub fn to_toml(&self) -> Result<String, ConfigFileError> {
        let mut redacted = self.clone();
        redacted.providers.api_key = None;
        Ok(toml::to_string_pretty(&redacted)?)
    }
}

/// Write a default configuration file to `path`, creating parent
/// directories. Refuses to replace an existing file unless `force` is set.
pub fn write_default_config(path: &Path, force: bool) -> Result<(), ConfigFileError> {
    if path.exists() && !force {
        return Err(ConfigFileError::Exists(path.display().to_string()));
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let content = Config::default().to_toml()?;
    std::fs::write(path, content)?;
    tracing::info!("Wrote default configuration to {}", path.display());
    Ok(())
}
