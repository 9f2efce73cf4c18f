//! Error types for argument resolution.

use thiserror::Error;

/// Errors that can occur while registering parsers or resolving arguments.
///
/// Registration errors (`Unregistered*`, `InvalidDescriptor`) surface when
/// dictionaries are enabled or the active parser list is rebuilt, before any
/// token is examined. `StalledParser` flags a backend that broke the cursor
/// contract and is always fatal. The rest are raised during a pass and only
/// escape when the owning argument's error policy is `die`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ResolveError {
    #[error("Dictionary '{name}' is not registered")]
    UnregisteredDictionary { name: String },

    #[error("Parser '{name}' (member of dictionary '{dictionary}') is not registered")]
    UnregisteredParser { name: String, dictionary: String },

    #[error("No constructor registered for parser type '{backend_type}' (parser '{parser}')")]
    UnregisteredParserType { parser: String, backend_type: String },

    #[error("Parser '{parser}' has invalid settings: {reason}")]
    InvalidDescriptor { parser: String, reason: String },

    #[error("Parser '{parser}' claimed position {position} without consuming a token")]
    StalledParser { parser: String, position: usize },

    #[error("Unrecognized argument '{token}' at position {position}")]
    UnmatchedToken { token: String, position: usize },

    #[error("Argument '{tag}' was given more than once")]
    RepeatedArgument { tag: String },

    #[error("Argument '{tag}' ({form}) is missing its value")]
    MissingArgumentValue { tag: String, form: String },

    #[error("Invalid value '{value}' for argument '{tag}': expected {expected}")]
    InvalidValue {
        tag: String,
        value: String,
        expected: &'static str,
    },
}
