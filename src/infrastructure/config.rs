//! Application configuration.

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use super::store::DEFAULT_CACHE_PATH;

const APP_QUALIFIER: &str = "com";
const APP_ORGANIZATION: &str = "linuxmobile";
const APP_NAME: &str = "imgvault";
const CONFIG_FILE_NAME: &str = "config.toml";

/// Log level configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Trace level.
    Trace,
    /// Debug level.
    Debug,
    /// Info level.
    #[default]
    Info,
    /// Warning level.
    Warn,
    /// Error level.
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Trace => write!(f, "trace"),
            Self::Debug => write!(f, "debug"),
            Self::Info => write!(f, "info"),
            Self::Warn => write!(f, "warn"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
#[allow(missing_docs)]
pub enum ConfigError {
    #[error("failed to determine config directory")]
    ConfigDirNotFound,
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("toml serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),
    #[error("toml deserialization error: {0}")]
    TomlDe(#[from] toml::de::Error),
}

/// Image cache configuration, loaded from TOML and overridable per field
/// from the CLI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageCacheConfig {
    /// Base URL of the system, used when no CDN endpoints are set.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// CDN base URLs rotated round-robin. Empty means direct serving.
    #[serde(default)]
    pub cdn_base_urls: Vec<String>,

    /// Path prefix stripped from artifact paths before CDN prefixing.
    #[serde(default)]
    pub cdn_path_prefix: Option<String>,

    /// Absolute path of the public directory.
    pub public_root: PathBuf,

    /// Extra search roots tried after the public root when resolving
    /// relative identifiers.
    #[serde(default)]
    pub search_roots: Vec<PathBuf>,

    /// Cache path inside the public directory.
    #[serde(default = "default_cache_path")]
    pub cache_path: String,

    /// Timeout for remote source fetches, in seconds.
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,

    /// Log verbosity level.
    #[serde(default)]
    pub log_level: LogLevel,

    /// Log file path. Unset logs to stderr.
    #[serde(default)]
    pub log_path: Option<PathBuf>,
}

fn default_base_url() -> String {
    "http://localhost".to_string()
}

fn default_cache_path() -> String {
    DEFAULT_CACHE_PATH.to_string()
}

const fn default_fetch_timeout() -> u64 {
    super::fetch::DEFAULT_TIMEOUT_SECS
}

impl ImageCacheConfig {
    /// Creates a config for the given public root with defaults elsewhere.
    #[must_use]
    pub fn for_public_root(public_root: PathBuf) -> Self {
        Self {
            base_url: default_base_url(),
            cdn_base_urls: Vec::new(),
            cdn_path_prefix: None,
            public_root,
            search_roots: Vec::new(),
            cache_path: default_cache_path(),
            fetch_timeout_secs: default_fetch_timeout(),
            log_level: LogLevel::default(),
            log_path: None,
        }
    }

    /// Returns all search roots in priority order, public root first.
    #[must_use]
    pub fn all_search_roots(&self) -> Vec<PathBuf> {
        let mut roots = Vec::with_capacity(1 + self.search_roots.len());
        roots.push(self.public_root.clone());
        roots.extend(self.search_roots.iter().cloned());
        roots
    }

    /// Returns the default config file path.
    ///
    /// # Errors
    /// Returns `ConfigDirNotFound` when no home directory is available.
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        ProjectDirs::from(APP_QUALIFIER, APP_ORGANIZATION, APP_NAME)
            .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
            .ok_or(ConfigError::ConfigDirNotFound)
    }

    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    /// Returns I/O or TOML errors.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        debug!(path = %path.display(), "Loading configuration");
        let raw = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&raw)?)
    }

    /// Writes configuration to a TOML file, creating parent directories.
    ///
    /// # Errors
    /// Returns I/O or TOML errors.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, toml::to_string_pretty(self)?)?;
        info!(path = %path.display(), "Saved configuration");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_toml_fills_defaults() {
        let config: ImageCacheConfig = toml::from_str("public_root = \"/srv/public\"").unwrap();
        assert_eq!(config.public_root, PathBuf::from("/srv/public"));
        assert_eq!(config.cache_path, "cache/img");
        assert_eq!(config.fetch_timeout_secs, 30);
        assert!(config.cdn_base_urls.is_empty());
        assert_eq!(config.log_level, LogLevel::Info);
    }

    #[test]
    fn public_root_leads_search_order() {
        let mut config = ImageCacheConfig::for_public_root(PathBuf::from("/srv/public"));
        config.search_roots = vec![PathBuf::from("/srv/assets")];

        assert_eq!(
            config.all_search_roots(),
            vec![PathBuf::from("/srv/public"), PathBuf::from("/srv/assets")]
        );
    }

    #[test]
    fn round_trips_through_toml() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = ImageCacheConfig::for_public_root(PathBuf::from("/srv/public"));
        config.cdn_base_urls = vec!["https://cdn1.example.com".to_string()];
        config.cdn_path_prefix = Some("/cache/img".to_string());
        config.save(&path).unwrap();

        let loaded = ImageCacheConfig::load(&path).unwrap();
        assert_eq!(loaded.cdn_base_urls, config.cdn_base_urls);
        assert_eq!(loaded.cdn_path_prefix, config.cdn_path_prefix);
        assert_eq!(loaded.public_root, config.public_root);
    }
}
