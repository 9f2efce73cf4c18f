//! Argument definitions: what a backend accepts and how conflicts behave.

use serde::{Deserialize, Serialize};

use crate::args::compact_list::CompactList;

/// Canonical tag for the stream bound to the child's standard output.
pub const OUTPUT_STREAM: &str = "output_stream";
/// Canonical tag for the stream bound to the child's standard input.
pub const INPUT_STREAM: &str = "input_stream";
/// Canonical tag for the stream bound to the child's standard error.
pub const ERROR_STREAM: &str = "error_stream";

/// What happens when an argument cannot be completed or converted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnError {
    /// Drop the argument, leave the cursor where it was and keep going.
    Skip,
    /// Abort the whole pass.
    #[default]
    Die,
}

/// What happens when the same canonical tag is resolved again.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnRepeat {
    /// Keep every value, in encounter order.
    Stack,
    /// Last value wins.
    #[default]
    Replace,
    /// A second value is fatal.
    Die,
}

/// Type of value an argument produces.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    #[default]
    String,
    Integer,
    Real,
    /// Switch; a bare form means `true` and never consumes a separate token.
    Bool,
}

impl ValueKind {
    /// Human-readable name used in error messages.
    pub fn describe(&self) -> &'static str {
        match self {
            Self::String => "a string",
            Self::Integer => "an integer",
            Self::Real => "a number",
            Self::Bool => "a boolean",
        }
    }
}

/// A single console argument definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArgumentDefinition {
    /// Canonical tag the value is stored under (e.g. "output_stream").
    pub tag: String,
    /// Accepted surface forms, in preference order for help output.
    pub forms: CompactList,
    #[serde(default)]
    pub kind: ValueKind,
    #[serde(default)]
    pub on_error: OnError,
    #[serde(default)]
    pub on_repeat: OnRepeat,
    /// Human-readable description for help text.
    #[serde(default)]
    pub description: String,
}

impl ArgumentDefinition {
    /// String argument with the default behavior (`die` on error, `replace`
    /// on repeat).
    pub fn new(tag: impl Into<String>, forms: CompactList) -> Self {
        Self {
            tag: tag.into(),
            forms,
            kind: ValueKind::default(),
            on_error: OnError::default(),
            on_repeat: OnRepeat::default(),
            description: String::new(),
        }
    }

    pub fn with_kind(mut self, kind: ValueKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_behavior(mut self, on_error: OnError, on_repeat: OnRepeat) -> Self {
        self.on_error = on_error;
        self.on_repeat = on_repeat;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// Maps one environment variable onto a canonical tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentBinding {
    /// Variable name probed in the environment (e.g. "SP_OUTPUT_STREAM").
    pub variable: String,
    pub tag: String,
    #[serde(default)]
    pub kind: ValueKind,
    #[serde(default)]
    pub on_error: OnError,
    #[serde(default)]
    pub on_repeat: OnRepeat,
}

impl EnvironmentBinding {
    pub fn new(variable: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            variable: variable.into(),
            tag: tag.into(),
            kind: ValueKind::default(),
            on_error: OnError::default(),
            on_repeat: OnRepeat::default(),
        }
    }
}
