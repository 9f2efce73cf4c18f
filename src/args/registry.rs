//! Registry tables: dictionaries, parser descriptors and constructors.
//!
//! Adding a backend type: implement [`ParserBackend`], give it a type tag
//! and register a [`ConstructorEntry`] for that tag. Descriptors naming the
//! tag then become constructible from any dictionary.

use std::collections::HashMap;

use crate::args::backend::ParserBackend;
use crate::args::compact_list::{long_arg, short_arg, CompactList};
use crate::args::console::ConsoleArgumentParser;
use crate::args::definition::{
    ArgumentDefinition, EnvironmentBinding, ERROR_STREAM, INPUT_STREAM, OUTPUT_STREAM,
};
use crate::args::environment::EnvironmentVariableParser;
use crate::args::error::ResolveError;
use crate::c_lst;

/// Backend type tag of [`ConsoleArgumentParser`].
pub const CONSOLE_PARSER: &str = "console_parser";
/// Backend type tag of [`EnvironmentVariableParser`].
pub const ENVIRONMENT_PARSER: &str = "environment_parser";

/// Name of the built-in stream redirection dictionary.
pub const SYSTEM_DICTIONARY: &str = "system";
/// Console parser of the system dictionary.
pub const SYSTEM_PARSER: &str = "system";
/// Environment parser of the system dictionary.
pub const SYSTEM_ENVIRONMENT_PARSER: &str = "system_environment";

/// Named, describable group of parser names, enabled as a unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dictionary {
    pub name: String,
    pub description: String,
    /// Member parser descriptor names, in construction order.
    pub parsers: CompactList,
}

impl Dictionary {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        parsers: CompactList,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parsers,
        }
    }
}

/// Divider configuration for a console parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsoleSettings {
    /// Separators accepted between a form and an inline value (`-o=x`).
    pub dividers: CompactList,
    /// Whether `-o x` (value in the following token) is accepted.
    pub separate_value: bool,
}

impl ConsoleSettings {
    pub fn new(dividers: CompactList) -> Self {
        Self {
            dividers,
            separate_value: true,
        }
    }

    /// Spawner-style inline values: `-o:out.txt`.
    pub fn spawner() -> Self {
        Self::new(c_lst![":"])
    }
}

impl Default for ConsoleSettings {
    fn default() -> Self {
        Self::new(c_lst!["="])
    }
}

/// Backend-specific settings, one variant per built-in backend type.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendSettings {
    Console {
        settings: ConsoleSettings,
        arguments: Vec<ArgumentDefinition>,
    },
    Environment {
        bindings: Vec<EnvironmentBinding>,
    },
    /// For backend types that carry their own configuration.
    None,
}

impl BackendSettings {
    /// Variant name for error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Console { .. } => "console",
            Self::Environment { .. } => "environment",
            Self::None => "none",
        }
    }
}

/// Everything needed to construct one backend instance.
#[derive(Debug, Clone, PartialEq)]
pub struct ParserDescriptor {
    pub name: String,
    /// Key into the constructor table.
    pub backend_type: String,
    pub settings: BackendSettings,
}

impl ParserDescriptor {
    pub fn console(
        name: impl Into<String>,
        settings: ConsoleSettings,
        arguments: Vec<ArgumentDefinition>,
    ) -> Self {
        Self {
            name: name.into(),
            backend_type: CONSOLE_PARSER.to_string(),
            settings: BackendSettings::Console {
                settings,
                arguments,
            },
        }
    }

    pub fn environment(name: impl Into<String>, bindings: Vec<EnvironmentBinding>) -> Self {
        Self {
            name: name.into(),
            backend_type: ENVIRONMENT_PARSER.to_string(),
            settings: BackendSettings::Environment { bindings },
        }
    }

    /// Error for a descriptor whose settings variant does not fit its backend.
    pub fn mismatch(&self, expected: &str) -> ResolveError {
        ResolveError::InvalidDescriptor {
            parser: self.name.clone(),
            reason: format!(
                "expected {} settings, found {}",
                expected,
                self.settings.kind()
            ),
        }
    }
}

/// Factory producing a backend instance from its descriptor.
pub type ParserConstructor = fn(&ParserDescriptor) -> Result<Box<dyn ParserBackend>, ResolveError>;

/// Backend type tag → factory.
#[derive(Clone)]
pub struct ConstructorEntry {
    pub backend_type: String,
    pub constructor: ParserConstructor,
}

impl ConstructorEntry {
    pub fn new(backend_type: impl Into<String>, constructor: ParserConstructor) -> Self {
        Self {
            backend_type: backend_type.into(),
            constructor,
        }
    }
}

/// The three lookup tables. Later registrations overwrite earlier ones
/// with the same key.
#[derive(Default)]
pub struct Registry {
    dictionaries: HashMap<String, Dictionary>,
    parsers: HashMap<String, ParserDescriptor>,
    constructors: HashMap<String, ParserConstructor>,
}

impl Registry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with the built-in constructors and the system
    /// dictionary.
    pub fn with_builtins(console: ConsoleSettings, environment_prefix: &str) -> Self {
        let mut registry = Self::new();
        registry.register_constructors(builtin_constructors());
        registry.register_parsers(system_parsers(console, environment_prefix));
        registry.register_dictionaries(system_dictionaries());
        registry
    }

    pub fn register_dictionary(&mut self, dictionary: Dictionary) {
        if self.dictionaries.contains_key(&dictionary.name) {
            tracing::debug!(dictionary = %dictionary.name, "Overwriting registered dictionary");
        }
        self.dictionaries.insert(dictionary.name.clone(), dictionary);
    }

    pub fn register_dictionaries(&mut self, dictionaries: impl IntoIterator<Item = Dictionary>) {
        for dictionary in dictionaries {
            self.register_dictionary(dictionary);
        }
    }

    pub fn register_parsers(&mut self, parsers: impl IntoIterator<Item = ParserDescriptor>) {
        for parser in parsers {
            if self.parsers.contains_key(&parser.name) {
                tracing::debug!(parser = %parser.name, "Overwriting registered parser");
            }
            self.parsers.insert(parser.name.clone(), parser);
        }
    }

    pub fn register_constructors(
        &mut self,
        constructors: impl IntoIterator<Item = ConstructorEntry>,
    ) {
        for entry in constructors {
            self.constructors.insert(entry.backend_type, entry.constructor);
        }
    }

    pub fn dictionary(&self, name: &str) -> Option<&Dictionary> {
        self.dictionaries.get(name)
    }

    pub fn parser(&self, name: &str) -> Option<&ParserDescriptor> {
        self.parsers.get(name)
    }

    pub fn constructor(&self, backend_type: &str) -> Option<ParserConstructor> {
        self.constructors.get(backend_type).copied()
    }

    /// Registered dictionary names, sorted.
    pub fn dictionary_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.dictionaries.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

/// Constructors for the built-in backend types.
pub fn builtin_constructors() -> Vec<ConstructorEntry> {
    vec![
        ConstructorEntry::new(CONSOLE_PARSER, ConsoleArgumentParser::construct),
        ConstructorEntry::new(ENVIRONMENT_PARSER, EnvironmentVariableParser::construct),
    ]
}

/// Stream redirection flags understood by every caller.
pub fn system_arguments() -> Vec<ArgumentDefinition> {
    vec![
        ArgumentDefinition::new(OUTPUT_STREAM, c_lst![short_arg("o"), long_arg("out")])
            .with_description("Redirect standard output"),
        ArgumentDefinition::new(INPUT_STREAM, c_lst![short_arg("i"), long_arg("in")])
            .with_description("Redirect standard input"),
        ArgumentDefinition::new(ERROR_STREAM, c_lst![short_arg("e"), long_arg("err")])
            .with_description("Redirect standard error"),
    ]
}

/// Environment fallbacks for the stream tags: `<prefix>OUTPUT_STREAM`, ...
pub fn system_environment(prefix: &str) -> Vec<EnvironmentBinding> {
    [OUTPUT_STREAM, INPUT_STREAM, ERROR_STREAM]
        .into_iter()
        .map(|tag| EnvironmentBinding::new(format!("{}{}", prefix, tag.to_uppercase()), tag))
        .collect()
}

pub fn system_parsers(console: ConsoleSettings, environment_prefix: &str) -> Vec<ParserDescriptor> {
    vec![
        ParserDescriptor::console(SYSTEM_PARSER, console, system_arguments()),
        ParserDescriptor::environment(
            SYSTEM_ENVIRONMENT_PARSER,
            system_environment(environment_prefix),
        ),
    ]
}

pub fn system_dictionaries() -> Vec<Dictionary> {
    vec![Dictionary::new(
        SYSTEM_DICTIONARY,
        "Default system commands",
        c_lst![SYSTEM_PARSER, SYSTEM_ENVIRONMENT_PARSER],
    )]
}
