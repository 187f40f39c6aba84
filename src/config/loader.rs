//! Configuration loader for memory-tree
//!
//! Handles loading configuration from TOML files and merging with defaults.

use super::defaults::default_config;
use crate::binding::BindingOptions;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// File read by [`load_config`]
pub const DEFAULT_CONFIG_FILE: &str = "memory-tree.toml";

/// Configuration error type
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_engine")]
    pub engine: EngineConfig,

    #[serde(default = "default_refresh")]
    pub refresh: RefreshConfig,

    #[serde(default = "default_logging")]
    pub logging: LoggingConfig,
}

/// Engine configuration, applied to every binding
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
    #[serde(default = "default_pointer_width")]
    pub pointer_width: usize,
    #[serde(default = "default_verify_writes")]
    pub verify_writes: bool,
}

/// Refresh loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshConfig {
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
}

impl RefreshConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl From<&EngineConfig> for BindingOptions {
    fn from(engine: &EngineConfig) -> Self {
        BindingOptions {
            max_depth: engine.max_depth,
            pointer_width: engine.pointer_width,
            verify_writes: engine.verify_writes,
        }
    }
}

/// Configuration loader
pub struct ConfigLoader {
    config_path: PathBuf,
}

impl ConfigLoader {
    /// Creates a new configuration loader
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        ConfigLoader {
            config_path: path.as_ref().to_path_buf(),
        }
    }

    /// Loads configuration from file
    pub fn load(&self) -> Result<Config, ConfigError> {
        if !self.config_path.exists() {
            return Err(ConfigError::FileNotFound(
                self.config_path.display().to_string(),
            ));
        }

        let contents = fs::read_to_string(&self.config_path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Loads configuration, falling back to defaults only when the file is missing
    pub fn load_or_default(&self) -> Result<Config, ConfigError> {
        match self.load() {
            Err(ConfigError::FileNotFound(_)) => Ok(Config::default()),
            other => other,
        }
    }

    /// Saves configuration to file
    pub fn save(&self, config: &Config) -> Result<(), ConfigError> {
        let contents = toml::to_string_pretty(config)?;
        fs::write(&self.config_path, contents)?;
        Ok(())
    }
}

/// Loads configuration from the default location
pub fn load_config() -> Result<Config, ConfigError> {
    ConfigLoader::new(DEFAULT_CONFIG_FILE).load_or_default()
}

// Default functions for serde
fn default_engine() -> EngineConfig {
    let defaults = default_config();
    EngineConfig {
        max_depth: defaults.engine.max_depth,
        pointer_width: defaults.engine.pointer_width,
        verify_writes: defaults.engine.verify_writes,
    }
}

fn default_refresh() -> RefreshConfig {
    RefreshConfig {
        interval_ms: default_config().refresh.interval_ms,
    }
}

fn default_logging() -> LoggingConfig {
    let defaults = default_config();
    LoggingConfig {
        level: defaults.logging.level,
        format: defaults.logging.format,
    }
}

// Individual field defaults
fn default_max_depth() -> usize {
    default_config().engine.max_depth
}

fn default_pointer_width() -> usize {
    default_config().engine.pointer_width
}

fn default_verify_writes() -> bool {
    default_config().engine.verify_writes
}

fn default_interval_ms() -> u64 {
    default_config().refresh.interval_ms
}

fn default_log_level() -> String {
    default_config().logging.level
}

fn default_log_format() -> String {
    default_config().logging.format
}

impl Default for Config {
    fn default() -> Self {
        Config {
            engine: default_engine(),
            refresh: default_refresh(),
            logging: default_logging(),
        }
    }
}
