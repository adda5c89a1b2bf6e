//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use crate::container::{Compression, DEFAULT_CHUNK_TARGET_BYTES};
use crate::storage::StorageOptions;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub storage: StoreConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Series storage configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// Directory for temporary storage files; system temp dir when unset
    #[serde(default)]
    pub directory: Option<String>,

    #[serde(default)]
    pub compression: Compression,

    #[serde(default = "default_chunk_target_bytes")]
    pub chunk_target_bytes: usize,
}

fn default_chunk_target_bytes() -> usize {
    DEFAULT_CHUNK_TARGET_BYTES
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            directory: None,
            compression: Compression::default(),
            chunk_target_bytes: default_chunk_target_bytes(),
        }
    }
}

impl StoreConfig {
    /// Options for a new ephemeral storage built from this config
    pub fn storage_options(&self) -> StorageOptions {
        let mut options = StorageOptions::new()
            .compression(self.compression)
            .chunk_target_bytes(self.chunk_target_bytes);
        if let Some(directory) = &self.directory {
            options = options.directory(expand_home(directory));
        }
        options
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("seriesvault").join("config.toml")),
            Some(PathBuf::from("./seriesvault.toml")),
        ];

        for path in config_paths.iter().flatten() {
            if path.exists() {
                match Self::load_with_env(path) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path, e);
                    }
                }
            }
        }

        tracing::debug!("Using default config with environment overrides");
        Self::from_env()
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.storage.chunk_target_bytes < 8 {
            return Err(ConfigError::Invalid(format!(
                "storage.chunk_target_bytes must hold at least one value, got {}",
                self.storage.chunk_target_bytes
            )));
        }
        Ok(())
    }

    /// Apply environment variable overrides to an existing config
    fn apply_env_overrides(&mut self) {
        if let Ok(directory) = std::env::var("SERIESVAULT_DIR") {
            self.storage.directory = Some(directory);
        }
        if let Ok(compression) = std::env::var("SERIESVAULT_COMPRESSION") {
            match compression.parse::<Compression>() {
                Ok(c) => self.storage.compression = c,
                Err(e) => tracing::warn!("Ignoring SERIESVAULT_COMPRESSION: {}", e),
            }
        }

        if let Ok(level) = std::env::var("SERIESVAULT_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("SERIESVAULT_LOG_FORMAT") {
            self.logging.format = format;
        }
    }
}

/// Expand a leading `~/` using the home directory
fn expand_home(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# seriesvault configuration
#
# Environment variables override these settings:
# - SERIESVAULT_DIR
# - SERIESVAULT_COMPRESSION
# - SERIESVAULT_LOG_LEVEL
# - SERIESVAULT_LOG_FORMAT

[storage]
# Directory for temporary storage files (default: system temp dir)
# directory = "~/.cache/seriesvault"

# Chunk compression: lz4 or none
compression = "lz4"

# Target uncompressed size of one dataset chunk (bytes)
chunk_target_bytes = 65536

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_template_parses() {
        let config: Config = toml::from_str(&generate_default_config()).unwrap();
        assert_eq!(config.storage.compression, Compression::Lz4);
        assert_eq!(config.storage.chunk_target_bytes, 65536);
        assert_eq!(config.storage.directory, None);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, "pretty");
    }

    #[test]
    fn test_load_partial_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[storage]\ncompression = \"none\"\ndirectory = \"/tmp/sv\"\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.storage.compression, Compression::None);
        assert_eq!(config.storage.chunk_target_bytes, DEFAULT_CHUNK_TARGET_BYTES);

        let options = config.storage.storage_options();
        assert_eq!(options.directory, Some(PathBuf::from("/tmp/sv")));
        assert_eq!(options.compression, Compression::None);
        assert!(options.path.is_none());
        assert!(!options.read_only);
    }

    #[test]
    fn test_load_errors() {
        let dir = tempdir().unwrap();
        assert!(matches!(
            Config::load(&dir.path().join("missing.toml")).unwrap_err(),
            ConfigError::Io { .. }
        ));

        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[storage]\ncompression = \"zstd\"\n").unwrap();
        assert!(matches!(
            Config::load(&path).unwrap_err(),
            ConfigError::Parse { .. }
        ));

        std::fs::write(&path, "[storage]\nchunk_target_bytes = 0\n").unwrap();
        assert!(matches!(
            Config::load(&path).unwrap_err(),
            ConfigError::Invalid(_)
        ));
    }

    #[test]
    fn test_env_overrides() {
        std::env::set_var("SERIESVAULT_COMPRESSION", "none");
        std::env::set_var("SERIESVAULT_LOG_FORMAT", "json");
        let config = Config::from_env();
        std::env::remove_var("SERIESVAULT_COMPRESSION");
        std::env::remove_var("SERIESVAULT_LOG_FORMAT");

        assert_eq!(config.storage.compression, Compression::None);
        assert_eq!(config.logging.format, "json");
    }

    #[test]
    fn test_expand_home() {
        assert_eq!(expand_home("/var/tmp"), PathBuf::from("/var/tmp"));
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_home("~/sv"), home.join("sv"));
        }
    }
}
