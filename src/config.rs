//! Configuration module for cloudvault.

use serde::Deserialize;
use std::path::Path;

use crate::{Result, VaultError};

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: String,
}

fn default_db_path() -> String {
    "data/cloudvault.db".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Blob storage and quota configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Path to the blob storage directory.
    #[serde(default = "default_blob_path")]
    pub blob_path: String,
    /// Account-wide storage ceiling in bytes.
    #[serde(default = "default_quota_bytes")]
    pub quota_bytes: u64,
    /// Maximum length of a node name (in characters).
    #[serde(default = "default_max_name_length")]
    pub max_name_length: usize,
}

fn default_blob_path() -> String {
    "data/blobs".to_string()
}

fn default_quota_bytes() -> u64 {
    crate::node::DEFAULT_QUOTA_BYTES
}

fn default_max_name_length() -> usize {
    crate::node::MAX_NAME_LENGTH
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            blob_path: default_blob_path(),
            quota_bytes: default_quota_bytes(),
            max_name_length: default_max_name_length(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Path to the log file.
    #[serde(default = "default_log_file")]
    pub file: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> String {
    "logs/cloudvault.log".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Blob storage configuration.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(VaultError::Io)?;
        Self::parse(&content)
    }

    /// Load configuration from a TOML file and apply environment variable overrides.
    pub fn load_with_env<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| VaultError::Config(format!("config parse error: {e}")))
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported environment variables:
    /// - `CLOUDVAULT_DB_PATH`: database file path
    /// - `CLOUDVAULT_BLOB_PATH`: blob storage directory
    /// - `CLOUDVAULT_QUOTA_BYTES`: storage ceiling (ignored unless it parses as an integer)
    pub fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var("CLOUDVAULT_DB_PATH") {
            if !path.is_empty() {
                self.database.path = path;
            }
        }
        if let Ok(path) = std::env::var("CLOUDVAULT_BLOB_PATH") {
            if !path.is_empty() {
                self.storage.blob_path = path;
            }
        }
        if let Ok(quota) = std::env::var("CLOUDVAULT_QUOTA_BYTES") {
            if let Ok(quota) = quota.trim().parse::<u64>() {
                self.storage.quota_bytes = quota;
            }
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.storage.quota_bytes == 0 {
            return Err(VaultError::Config(
                "storage.quota_bytes must be greater than zero".to_string(),
            ));
        }
        if self.storage.max_name_length == 0 {
            return Err(VaultError::Config(
                "storage.max_name_length must be greater than zero".to_string(),
            ));
        }
        if self.database.path.trim().is_empty() {
            return Err(VaultError::Config("database.path is empty".to_string()));
        }
        if self.storage.blob_path.trim().is_empty() {
            return Err(VaultError::Config("storage.blob_path is empty".to_string()));
        }
        Ok(())
    }
}
