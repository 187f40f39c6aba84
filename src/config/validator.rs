//! Configuration validator for memory-tree
//!
//! Validates configuration values to ensure they are within acceptable ranges.

use super::loader::{Config, ConfigError, EngineConfig, LoggingConfig, RefreshConfig};

/// Log levels accepted in `[logging] level`
pub const LOG_LEVELS: [&str; 6] = ["trace", "debug", "info", "warn", "error", "off"];

/// Output formats accepted in `[logging] format`
pub const LOG_FORMATS: [&str; 3] = ["pretty", "compact", "json"];

/// Largest accepted `[engine] max_depth`
pub const MAX_DEPTH_LIMIT: usize = 256;

/// Configuration validator
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validates the entire configuration
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        Self::validate_engine(&config.engine)?;
        Self::validate_refresh(&config.refresh)?;
        Self::validate_logging(&config.logging)?;
        Ok(())
    }

    /// Validates engine configuration
    fn validate_engine(engine: &EngineConfig) -> Result<(), ConfigError> {
        if engine.max_depth == 0 {
            return Err(ConfigError::Invalid(
                "Maximum depth must be at least 1".to_string(),
            ));
        }

        if engine.max_depth > MAX_DEPTH_LIMIT {
            return Err(ConfigError::Invalid(format!(
                "Maximum depth cannot exceed {}",
                MAX_DEPTH_LIMIT
            )));
        }

        if !matches!(engine.pointer_width, 4 | 8) {
            return Err(ConfigError::Invalid(format!(
                "Pointer width must be 4 or 8, got {}",
                engine.pointer_width
            )));
        }

        Ok(())
    }

    /// Validates refresh configuration
    fn validate_refresh(refresh: &RefreshConfig) -> Result<(), ConfigError> {
        if refresh.interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "Refresh interval must be at least 1 ms".to_string(),
            ));
        }

        Ok(())
    }

    /// Validates logging configuration
    fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
        if !LOG_LEVELS.contains(&logging.level.to_lowercase().as_str()) {
            return Err(ConfigError::Invalid(format!(
                "Invalid log level: {}. Must be one of: {:?}",
                logging.level, LOG_LEVELS
            )));
        }

        if !LOG_FORMATS.contains(&logging.format.to_lowercase().as_str()) {
            return Err(ConfigError::Invalid(format!(
                "Invalid log format: {}. Must be one of: {:?}",
                logging.format, LOG_FORMATS
            )));
        }

        Ok(())
    }
}

/// Validates a configuration
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    ConfigValidator::validate(config)
}
