//! Core traits for backend parsers.
//!
//! ```text
//!            ParserBackend (trait)
//!                   ▲
//!          ┌────────┴─────────┐
//!          │                  │
//!       Console          Environment
//!          │                  │
//!          └────────┬─────────┘
//!                   ▼
//!     ParseContext (cursor, table, env lookup)
//! ```

use std::collections::HashMap;

use crate::args::definition::OnRepeat;
use crate::args::error::ResolveError;
use crate::args::stream::{ParserId, SavedPosition, TokenStream};
use crate::args::value::{ArgumentValue, Precedence, Recorded, ResolvedValues};

/// Read-only environment lookup.
pub trait EnvLookup {
    fn var(&self, name: &str) -> Option<String>;
}

/// The real process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvLookup for ProcessEnv {
    fn var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

impl EnvLookup for HashMap<String, String> {
    fn var(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

/// Result of offering the current token to a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchOutcome {
    /// Tokens consumed; the backend is ready to `invoke`. At least one
    /// token must have been read, or the pass fails with `StalledParser`.
    Accepted,
    /// Not ours. The backend restored its checkpoint before returning.
    Declined,
    /// The argument name was consumed but its value is pending; a saved
    /// position was pushed for later completion.
    Suspended,
}

/// Everything a backend may touch during a pass.
///
/// Owned by the orchestrator and lent to one backend at a time, so only
/// one party ever moves the cursor.
pub struct ParseContext<'s, 'a> {
    stream: &'s mut TokenStream<'a>,
    values: &'s mut ResolvedValues,
    warnings: &'s mut Vec<String>,
    precedence: &'s Precedence,
    env: &'s dyn EnvLookup,
    parser: ParserId,
    backend_type: &'s str,
}

impl<'s, 'a> ParseContext<'s, 'a> {
    pub(crate) fn new(
        stream: &'s mut TokenStream<'a>,
        values: &'s mut ResolvedValues,
        warnings: &'s mut Vec<String>,
        precedence: &'s Precedence,
        env: &'s dyn EnvLookup,
        parser: ParserId,
        backend_type: &'s str,
    ) -> Self {
        Self {
            stream,
            values,
            warnings,
            precedence,
            env,
            parser,
            backend_type,
        }
    }

    pub fn get_next_argument(&mut self) -> Option<&'a str> {
        self.stream.get_next_argument()
    }

    /// Commit the read cursor. Reserved to the orchestrator.
    pub(crate) fn fetch_current_position(&mut self) -> usize {
        self.stream.fetch_current_position()
    }

    pub(crate) fn fetched_position(&self) -> usize {
        self.stream.fetched_position()
    }

    pub fn restore_position(&mut self) {
        self.stream.restore_position()
    }

    pub fn current_position(&self) -> usize {
        self.stream.current_position()
    }

    /// Suspend the argument being matched; this backend owns the entry.
    pub fn save_current_position(&mut self) {
        self.stream.save_current_position(self.parser)
    }

    pub fn saved_count(&self) -> usize {
        self.stream.saved_count()
    }

    /// Write a value under this backend's source type.
    pub fn store(
        &mut self,
        tag: &str,
        value: ArgumentValue,
        on_repeat: OnRepeat,
    ) -> Result<Recorded, ResolveError> {
        let recorded = self
            .values
            .record(tag, value, self.backend_type, on_repeat, self.precedence)?;
        tracing::debug!(
            tag = %tag,
            source = %self.backend_type,
            outcome = ?recorded,
            "Recorded argument value"
        );
        Ok(recorded)
    }

    pub fn is_resolved(&self, tag: &str) -> bool {
        self.values.contains(tag)
    }

    pub fn env_var(&self, name: &str) -> Option<String> {
        self.env.var(name)
    }

    /// Record a non-fatal problem for the caller.
    pub fn warn(&mut self, message: String) {
        tracing::warn!(source = %self.backend_type, "{}", message);
        self.warnings.push(message);
    }
}

/// Capability set every backend parser implements.
///
/// Every method has a no-op default so a backend only overrides the
/// capabilities it actually has: the console parser matches tokens, the
/// environment parser only contributes during `initialize`.
pub trait ParserBackend {
    /// Descriptor name this instance was built from (for logging).
    fn name(&self) -> &str;

    /// Clear per-pass state. Called at the start of every pass.
    fn reset(&mut self) {}

    /// Contribute values that do not come from the token stream.
    ///
    /// Called once per pass, after the token stream is exhausted, so
    /// token-sourced values are already in the table.
    fn initialize(&mut self, _ctx: &mut ParseContext<'_, '_>) -> Result<(), ResolveError> {
        Ok(())
    }

    /// Try to match the token at the cursor.
    ///
    /// `Accepted` and `Suspended` must consume at least one token. Tokens
    /// read before a `Declined` are handed back by the orchestrator.
    fn parse(&mut self, _ctx: &mut ParseContext<'_, '_>) -> Result<MatchOutcome, ResolveError> {
        Ok(MatchOutcome::Declined)
    }

    /// Complete a suspended argument with the token at the cursor.
    fn resume(
        &mut self,
        _ctx: &mut ParseContext<'_, '_>,
        _saved: SavedPosition,
    ) -> Result<MatchOutcome, ResolveError> {
        Ok(MatchOutcome::Declined)
    }

    /// The stream ran out while `saved` was still pending.
    fn abandon(
        &mut self,
        _ctx: &mut ParseContext<'_, '_>,
        _saved: SavedPosition,
    ) -> Result<(), ResolveError> {
        Ok(())
    }

    /// Write the last accepted argument into the table.
    fn invoke(&mut self, _ctx: &mut ParseContext<'_, '_>) -> Result<(), ResolveError> {
        Ok(())
    }

    /// Usage text for the arguments this backend accepts.
    fn help(&self) -> String {
        String::new()
    }
}
