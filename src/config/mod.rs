//! Configuration: file location, loading, validation and engine assembly.

mod engine;
mod loader;
mod types;

pub use loader::ConfigError;
pub use types::{Config, DictionaryConfig, LoggingConfig, ResolutionConfig};
