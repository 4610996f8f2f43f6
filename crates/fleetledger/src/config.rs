//! Configuration management for fleetledger.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::path::PathBuf;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::fleet::DEFAULT_MAX_ATTEMPTS;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "fleetledger";

/// Default record database file name.
const RECORDS_FILE_NAME: &str = "records.db";

/// Default operations database file name.
const OPERATIONS_FILE_NAME: &str = "operations.db";

/// Prefix for environment variable overrides.
const ENV_PREFIX: &str = "FLEETLEDGER_";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `FLEETLEDGER_`, sections split on `__`)
/// 2. TOML config file at `~/.config/fleetledger/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Identifier generation configuration.
    pub ids: IdsConfig,
}

/// Storage-related configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the driver and package database.
    /// Defaults to `~/.local/share/fleetledger/records.db`
    pub records_path: Option<PathBuf>,
    /// Path to the counters and accounts database.
    /// Defaults to `~/.local/share/fleetledger/operations.db`
    pub operations_path: Option<PathBuf>,
}

/// Identifier generation configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdsConfig {
    /// How many generated ids to try before giving up on a collision.
    pub max_attempts: u32,
}

impl Default for IdsConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// A missing file is not an error; defaults and environment still apply.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading, parsing or validation fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);
        Self::from_figment(Self::figment(&config_file))
    }

    fn from_figment(figment: Figment) -> Result<Self> {
        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    fn figment(config_file: &std::path::Path) -> Figment {
        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(config_file))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        if self.ids.max_attempts == 0 {
            return Err(Error::ConfigValidation {
                message: "ids.max_attempts must be at least 1".to_string(),
            });
        }

        if let (Some(records), Some(operations)) =
            (&self.storage.records_path, &self.storage.operations_path)
        {
            if records == operations {
                return Err(Error::ConfigValidation {
                    message: format!(
                        "records_path and operations_path must differ (both {})",
                        records.display()
                    ),
                });
            }
        }

        Ok(())
    }

    /// Get the record database path, resolving defaults if not set.
    #[must_use]
    pub fn records_path(&self) -> PathBuf {
        self.storage
            .records_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(RECORDS_FILE_NAME))
    }

    /// Get the operations database path, resolving defaults if not set.
    #[must_use]
    pub fn operations_path(&self) -> PathBuf {
        self.storage
            .operations_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(OPERATIONS_FILE_NAME))
    }
}
