//! Multi-source argument resolution.
//!
//! Named runtime settings (which file to bind to stdin/stdout/stderr, and
//! whatever a caller's own dictionaries declare) are resolved from several
//! sources into one table before anything is spawned:
//!
//! ```text
//! Registry → enable dictionaries → rebuild parsers
//!        → parse(tokens): console backends compete per token
//!        → initialize: environment fallbacks
//!        → Resolution { values, unmatched, warnings }
//! ```
//!
//! The [`SettingsParser`] owns the only cursor over the token stream;
//! backends read tokens through [`ParseContext`] and roll back with the
//! checkpoint pair when a match fails.

mod backend;
mod compact_list;
mod console;
mod definition;
mod environment;
mod error;
mod registry;
mod settings;
mod stream;
mod value;

pub use backend::{EnvLookup, MatchOutcome, ParseContext, ParserBackend, ProcessEnv};
pub use compact_list::{long_arg, short_arg, CompactList};
pub use console::{ConsoleArgumentParser, ParsingState};
pub use definition::{
    ArgumentDefinition, EnvironmentBinding, OnError, OnRepeat, ValueKind, ERROR_STREAM,
    INPUT_STREAM, OUTPUT_STREAM,
};
pub use environment::EnvironmentVariableParser;
pub use error::ResolveError;
pub use registry::{
    builtin_constructors, system_arguments, system_dictionaries, system_environment,
    system_parsers, BackendSettings, ConsoleSettings, ConstructorEntry, Dictionary,
    ParserConstructor, ParserDescriptor, Registry, CONSOLE_PARSER, ENVIRONMENT_PARSER,
    SYSTEM_DICTIONARY, SYSTEM_ENVIRONMENT_PARSER, SYSTEM_PARSER,
};
pub use settings::{EngineOptions, Resolution, SettingsParser};
pub use stream::{ParserId, SavedPosition, TokenStream};
pub use value::{ArgumentValue, Precedence, Recorded, ResolvedValues};
