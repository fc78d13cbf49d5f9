//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub splicer: SplicerConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Query splicer configuration
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SplicerConfig {
    /// Bucket size for spliced queries, in seconds
    #[serde(default = "default_bucket_size")]
    pub bucket_size_secs: u64,

    /// Upper bound on bucket fetches running at once
    #[serde(default = "default_max_concurrent_buckets")]
    pub max_concurrent_buckets: usize,

    /// Windows needing more buckets than this get wider buckets
    #[serde(default = "default_max_buckets")]
    pub max_buckets: usize,

    /// When false every query runs directly
    #[serde(default = "default_splicing_enabled")]
    pub enabled: bool,
}

fn default_bucket_size() -> u64 {
    3600 // 1 hour
}

fn default_max_concurrent_buckets() -> usize {
    16
}

fn default_max_buckets() -> usize {
    1024
}

fn default_splicing_enabled() -> bool {
    true
}

impl SplicerConfig {
    /// Bucket size in milliseconds (at least 1)
    pub fn bucket_size_millis(&self) -> i64 {
        i64::try_from(self.bucket_size_secs.saturating_mul(1000))
            .unwrap_or(i64::MAX)
            .max(1)
    }
}

impl Default for SplicerConfig {
    fn default() -> Self {
        Self {
            bucket_size_secs: default_bucket_size(),
            max_concurrent_buckets: default_max_concurrent_buckets(),
            max_buckets: default_max_buckets(),
            enabled: default_splicing_enabled(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Deserialize)]
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
            dirs::config_dir().map(|p| p.join("chronicle").join("pipeline.toml")),
            Some(PathBuf::from("/etc/chronicle/pipeline.toml")),
            Some(PathBuf::from("./pipeline.toml")),
        ];

        for path_opt in config_paths.iter().flatten() {
            if path_opt.exists() {
                match Self::load_with_env(path_opt) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path_opt);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path_opt, e);
                    }
                }
            }
        }

        // Fall back to environment-only config
        tracing::info!("Using default config with environment overrides");
        Self::from_env()
    }

    /// Apply environment variable overrides to an existing config
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        // Splicer overrides
        if let Some(size) = lookup("CHRONICLE_BUCKET_SIZE_SECS") {
            match size.parse() {
                Ok(secs) => self.splicer.bucket_size_secs = secs,
                Err(_) => tracing::warn!("Ignoring invalid CHRONICLE_BUCKET_SIZE_SECS: {}", size),
            }
        }
        if let Some(max) = lookup("CHRONICLE_MAX_CONCURRENT_BUCKETS") {
            match max.parse() {
                Ok(n) => self.splicer.max_concurrent_buckets = n,
                Err(_) => {
                    tracing::warn!("Ignoring invalid CHRONICLE_MAX_CONCURRENT_BUCKETS: {}", max)
                }
            }
        }
        if let Some(max) = lookup("CHRONICLE_MAX_BUCKETS") {
            match max.parse() {
                Ok(n) => self.splicer.max_buckets = n,
                Err(_) => tracing::warn!("Ignoring invalid CHRONICLE_MAX_BUCKETS: {}", max),
            }
        }
        if let Some(enabled) = lookup("CHRONICLE_SPLICING_ENABLED") {
            match enabled.parse() {
                Ok(b) => self.splicer.enabled = b,
                Err(_) => tracing::warn!("Ignoring invalid CHRONICLE_SPLICING_ENABLED: {}", enabled),
            }
        }

        // Logging overrides
        if let Some(level) = lookup("CHRONICLE_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = lookup("CHRONICLE_LOG_FORMAT") {
            self.logging.format = format;
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# Chronicle Pipeline Configuration
#
# Environment variables override these settings:
# - CHRONICLE_BUCKET_SIZE_SECS
# - CHRONICLE_MAX_CONCURRENT_BUCKETS
# - CHRONICLE_MAX_BUCKETS
# - CHRONICLE_SPLICING_ENABLED
# - CHRONICLE_LOG_LEVEL
# - CHRONICLE_LOG_FORMAT

[splicer]
# Queries spanning more than two buckets are split and fetched in parallel
bucket_size_secs = 3600

# Upper bound on concurrent bucket fetches
max_concurrent_buckets = 16

# Longer windows are split into wider buckets instead
max_buckets = 1024

# Set to false to always run queries directly
enabled = true

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"#
    .to_string()
}
