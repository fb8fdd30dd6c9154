//! Application configuration.
//!
//! Defaults can be overridden through environment variables:
//! - `HOSTVAR_DATA`: path of the storage file
//! - `HOSTVAR_CACHE_TTL_MS`: cache lifetime in milliseconds
//! - `HOSTVAR_QUOTA_BYTES`: storage quota in bytes
//!
//! The storage file defaults to the platform data directory:
//! - Linux: ~/.local/share/hostvar/storage.json
//! - macOS: ~/Library/Application Support/hostvar/storage.json
//! - Windows: %APPDATA%/hostvar/storage.json

use std::path::PathBuf;
use std::time::Duration;

use hostvar_application::ports::DEFAULT_QUOTA_BYTES;
use hostvar_application::{DEFAULT_CACHE_TTL, StoreConfig};

/// Environment variable overriding the storage file path.
pub const DATA_PATH_VAR: &str = "HOSTVAR_DATA";
/// Environment variable overriding the cache lifetime.
pub const CACHE_TTL_VAR: &str = "HOSTVAR_CACHE_TTL_MS";
/// Environment variable overriding the storage quota.
pub const QUOTA_VAR: &str = "HOSTVAR_QUOTA_BYTES";

const APP_DIR: &str = "hostvar";
const STORAGE_FILE: &str = "storage.json";

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// No platform data directory and no explicit path.
    #[error("Could not determine data directory; set HOSTVAR_DATA")]
    NoDataDir,

    /// A numeric override could not be parsed.
    #[error("Invalid value for {var}: {value:?} (expected a non-negative integer)")]
    InvalidNumber {
        /// Variable name.
        var: &'static str,
        /// Offending value.
        value: String,
    },
}

/// Resolved application configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Storage file.
    pub data_path: PathBuf,
    /// Lifetime of the store's read cache.
    pub cache_ttl: Duration,
    /// Maximum storage size in bytes.
    pub quota_bytes: u64,
}

impl AppConfig {
    /// Returns the default storage file path, if the platform has a data
    /// directory.
    #[must_use]
    pub fn default_data_path() -> Option<PathBuf> {
        dirs::data_dir().map(|dir| dir.join(APP_DIR).join(STORAGE_FILE))
    }

    /// Loads configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if an override is malformed or no data directory
    /// can be found.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Loads configuration from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// Returns an error if an override is malformed or no data directory
    /// can be found.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let data_path = match lookup(DATA_PATH_VAR).filter(|p| !p.trim().is_empty()) {
            Some(path) => PathBuf::from(path),
            None => Self::default_data_path().ok_or(ConfigError::NoDataDir)?,
        };

        let cache_ttl = parse_number(&lookup, CACHE_TTL_VAR)?
            .map_or(DEFAULT_CACHE_TTL, Duration::from_millis);
        let quota_bytes = parse_number(&lookup, QUOTA_VAR)?.unwrap_or(DEFAULT_QUOTA_BYTES);

        Ok(Self {
            data_path,
            cache_ttl,
            quota_bytes,
        })
    }

    /// Replaces the storage file path.
    #[must_use]
    pub fn with_data_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.data_path = path.into();
        self
    }

    /// Returns the part of the configuration the store needs.
    #[must_use]
    pub const fn store_config(&self) -> StoreConfig {
        StoreConfig {
            cache_ttl: self.cache_ttl,
        }
    }
}

fn parse_number<F>(lookup: &F, var: &'static str) -> Result<Option<u64>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(var)
        .map(|value| {
            value
                .trim()
                .parse::<u64>()
                .map_err(|_| ConfigError::InvalidNumber { var, value })
        })
        .transpose()
}
