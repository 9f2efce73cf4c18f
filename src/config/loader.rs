use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::level_filters::LevelFilter;

use crate::config::types::Config;

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file '{path}': {source}")]
    ParseError {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Config validation failed: {message}")]
    ValidationError { message: String },
}

impl Config {
    /// Returns the path to the configuration file.
    ///
    /// Uses `~/.config/spawnargs/config.toml` on Unix, or the platform
    /// equivalent via `dirs::config_dir()`. Falls back to the current
    /// directory if config_dir is unavailable.
    pub fn config_path() -> PathBuf {
        let config_dir = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        config_dir.join("spawnargs").join("config.toml")
    }

    /// Loads configuration from the default config file.
    ///
    /// A missing file yields `Config::default()`.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::config_path();

        if !path.exists() {
            return Ok(Config::default());
        }

        Self::load_from(&path)
    }

    /// Loads and validates configuration from an explicit path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration.
    ///
    /// Checks:
    /// - Precedence names at least one parser type, each at most once
    /// - Dividers are non-empty, and present when separate values are off
    /// - The logging level is a known filter
    /// - Declared dictionaries are named and every argument has a form
    pub fn validate(&self) -> Result<(), ConfigError> {
        let resolution = &self.resolution;

        if resolution.precedence.is_empty() {
            return Err(invalid("Precedence must name at least one parser type"));
        }
        let mut seen = HashSet::new();
        for backend_type in &resolution.precedence {
            if !seen.insert(backend_type.as_str()) {
                return Err(invalid(format!(
                    "Parser type '{}' appears more than once in precedence",
                    backend_type
                )));
            }
        }

        if resolution.dividers.is_empty() && !resolution.separate_value {
            return Err(invalid(
                "At least one divider is required when separate values are disabled",
            ));
        }
        if resolution.dividers.iter().any(|d| d.is_empty()) {
            return Err(invalid("Dividers must not be empty"));
        }

        if self.logging.level.parse::<LevelFilter>().is_err() {
            return Err(invalid(format!(
                "Unknown logging level '{}'",
                self.logging.level
            )));
        }

        for dictionary in &self.dictionaries {
            if dictionary.name.is_empty() {
                return Err(invalid("Dictionary names must not be empty"));
            }
            for argument in &dictionary.arguments {
                if argument.forms.is_empty() || argument.forms.iter().any(|f| f.is_empty()) {
                    return Err(invalid(format!(
                        "Argument '{}' in dictionary '{}' needs at least one non-empty form",
                        argument.tag, dictionary.name
                    )));
                }
            }
        }

        Ok(())
    }
}

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        message: message.into(),
    }
}
