use serde::{Deserialize, Serialize};

use crate::args::{
    ArgumentDefinition, EnvironmentBinding, OnError, CONSOLE_PARSER, ENVIRONMENT_PARSER,
};

/// Root configuration container.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub resolution: ResolutionConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Extra dictionaries declared by the user.
    #[serde(default)]
    pub dictionaries: Vec<DictionaryConfig>,
}

/// Engine-wide resolution policies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolutionConfig {
    /// Policy for tokens no parser accepts (default: die).
    #[serde(default = "default_on_unmatched")]
    pub on_unmatched: OnError,
    /// Parser types in precedence order, highest first.
    #[serde(default = "default_precedence")]
    pub precedence: Vec<String>,
    /// Inline value dividers for console parsers (default: `=`).
    #[serde(default = "default_dividers")]
    pub dividers: Vec<String>,
    /// Accept `-o value` in addition to inline values (default: true).
    #[serde(default = "default_separate_value")]
    pub separate_value: bool,
    /// Prefix for the system environment variables (default: `SP_`).
    #[serde(default = "default_environment_prefix")]
    pub environment_prefix: String,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter level; `RUST_LOG` takes priority (default: warn).
    #[serde(default = "default_log_level")]
    pub level: String,
}

/// A user-declared dictionary.
///
/// Console arguments become a parser named after the dictionary,
/// environment bindings a parser named `<name>_environment`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DictionaryConfig {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub arguments: Vec<ArgumentDefinition>,
    #[serde(default)]
    pub environment: Vec<EnvironmentBinding>,
}

fn default_on_unmatched() -> OnError {
    OnError::Die
}

fn default_precedence() -> Vec<String> {
    vec![CONSOLE_PARSER.to_string(), ENVIRONMENT_PARSER.to_string()]
}

fn default_dividers() -> Vec<String> {
    vec!["=".to_string()]
}

fn default_separate_value() -> bool {
    true
}

fn default_environment_prefix() -> String {
    "SP_".to_string()
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for ResolutionConfig {
    fn default() -> Self {
        Self {
            on_unmatched: default_on_unmatched(),
            precedence: default_precedence(),
            dividers: default_dividers(),
            separate_value: default_separate_value(),
            environment_prefix: default_environment_prefix(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}
