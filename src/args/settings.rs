//! Settings parser: drives the backends over one token stream and merges
//! their values.
//!
//! ```text
//! tokens ─► [console backends compete per token] ─► suspended leftovers
//!                                                         │
//!        table ◄── [initialize: environment, ...] ◄───────┘
//! ```

use std::collections::HashSet;

use crate::args::backend::{EnvLookup, MatchOutcome, ParseContext, ParserBackend, ProcessEnv};
use crate::args::definition::OnError;
use crate::args::error::ResolveError;
use crate::args::registry::{
    ConstructorEntry, Dictionary, ParserDescriptor, Registry, SYSTEM_DICTIONARY,
};
use crate::args::stream::TokenStream;
use crate::args::value::{Precedence, ResolvedValues};

/// Engine-wide policies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineOptions {
    /// What to do with a token no backend accepts.
    pub on_unmatched: OnError,
    /// Which backend type wins when two sources resolve the same tag.
    pub precedence: Precedence,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            on_unmatched: OnError::Die,
            precedence: Precedence::default(),
        }
    }
}

/// Outcome of one resolution pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub values: ResolvedValues,
    /// Tokens no backend accepted (only under a `skip` unmatched policy).
    pub unmatched: Vec<String>,
    /// Non-fatal problems (skipped arguments, dropped values).
    pub warnings: Vec<String>,
    /// Final committed cursor.
    pub position: usize,
}

struct ActiveParser {
    descriptor: String,
    backend_type: String,
    backend: Box<dyn ParserBackend>,
}

/// The resolution engine. Owns its registry, the enabled dictionaries and
/// the active backend instances built from them.
pub struct SettingsParser {
    registry: Registry,
    options: EngineOptions,
    env: Box<dyn EnvLookup>,
    enabled: Vec<String>,
    parsers: Vec<ActiveParser>,
    stale: bool,
}

impl SettingsParser {
    /// Engine over `registry`, reading the real process environment.
    pub fn new(registry: Registry) -> Self {
        Self {
            registry,
            options: EngineOptions::default(),
            env: Box::new(ProcessEnv),
            enabled: Vec::new(),
            parsers: Vec::new(),
            stale: true,
        }
    }

    pub fn with_options(mut self, options: EngineOptions) -> Self {
        self.options = options;
        self
    }

    /// Replace the environment lookup (tests, sandboxed callers).
    pub fn with_env(mut self, env: impl EnvLookup + 'static) -> Self {
        self.env = Box::new(env);
        self
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn register_dictionaries(&mut self, dictionaries: impl IntoIterator<Item = Dictionary>) {
        self.registry.register_dictionaries(dictionaries);
        self.stale = true;
    }

    pub fn register_parsers(&mut self, parsers: impl IntoIterator<Item = ParserDescriptor>) {
        self.registry.register_parsers(parsers);
        self.stale = true;
    }

    pub fn register_constructors(
        &mut self,
        constructors: impl IntoIterator<Item = ConstructorEntry>,
    ) {
        self.registry.register_constructors(constructors);
        self.stale = true;
    }

    /// Disable every dictionary.
    pub fn clear_dictionaries(&mut self) {
        self.enabled.clear();
        self.stale = true;
    }

    /// Enable a registered dictionary and rebuild the active parsers.
    ///
    /// On failure the dictionary is not left enabled.
    pub fn enable_dictionary(&mut self, name: &str) -> Result<(), ResolveError> {
        if self.registry.dictionary(name).is_none() {
            return Err(ResolveError::UnregisteredDictionary {
                name: name.to_string(),
            });
        }
        if self.enabled.iter().any(|n| n == name) {
            return Ok(());
        }
        self.enabled.push(name.to_string());
        if let Err(error) = self.rebuild_parsers() {
            self.enabled.pop();
            return Err(error);
        }
        Ok(())
    }

    /// Enabled dictionaries, in enable order.
    pub fn enabled_dictionaries(&self) -> &[String] {
        &self.enabled
    }

    /// Descriptor names of the active parsers, in offer order.
    pub fn active_parsers(&self) -> Vec<&str> {
        self.parsers.iter().map(|p| p.descriptor.as_str()).collect()
    }

    /// Construct one backend per distinct descriptor reachable from the
    /// enabled dictionaries (dictionary order, then member order).
    ///
    /// The previous list is kept if any lookup or constructor fails.
    pub fn rebuild_parsers(&mut self) -> Result<(), ResolveError> {
        let mut seen = HashSet::new();
        let mut parsers = Vec::new();

        for dictionary_name in &self.enabled {
            let dictionary = self.registry.dictionary(dictionary_name).ok_or_else(|| {
                ResolveError::UnregisteredDictionary {
                    name: dictionary_name.clone(),
                }
            })?;
            for member in dictionary.parsers.iter() {
                if !seen.insert(member) {
                    continue;
                }
                let descriptor =
                    self.registry
                        .parser(member)
                        .ok_or_else(|| ResolveError::UnregisteredParser {
                            name: member.to_string(),
                            dictionary: dictionary.name.clone(),
                        })?;
                let constructor = self
                    .registry
                    .constructor(&descriptor.backend_type)
                    .ok_or_else(|| ResolveError::UnregisteredParserType {
                        parser: descriptor.name.clone(),
                        backend_type: descriptor.backend_type.clone(),
                    })?;
                parsers.push(ActiveParser {
                    descriptor: descriptor.name.clone(),
                    backend_type: descriptor.backend_type.clone(),
                    backend: constructor(descriptor)?,
                });
            }
        }

        tracing::debug!(
            dictionaries = ?self.enabled,
            parsers = parsers.len(),
            "Rebuilt active parsers"
        );
        self.parsers = parsers;
        self.stale = false;
        Ok(())
    }

    /// Resolve `tokens` with every enabled dictionary.
    ///
    /// Returns no table at all when any `die` policy fires.
    pub fn parse(&mut self, tokens: &[String]) -> Result<Resolution, ResolveError> {
        if self.stale {
            self.rebuild_parsers()?;
        }
        for active in &mut self.parsers {
            active.backend.reset();
        }

        let Self {
            parsers,
            options,
            env,
            ..
        } = self;
        let env: &dyn EnvLookup = &**env;
        let mut stream = TokenStream::new(tokens);
        let mut values = ResolvedValues::new();
        let mut warnings = Vec::new();
        let mut unmatched = Vec::new();

        tracing::debug!(
            tokens = tokens.len(),
            parsers = parsers.len(),
            "Starting resolution pass"
        );

        'tokens: while let Some(token) = stream.current_token() {
            let start = stream.current_position();
            for (id, active) in parsers.iter_mut().enumerate() {
                let mut ctx = ParseContext::new(
                    &mut stream,
                    &mut values,
                    &mut warnings,
                    &options.precedence,
                    env,
                    id,
                    &active.backend_type,
                );
                tracing::trace!(token = %token, parser = %active.descriptor, "Offering token");
                match active.backend.parse(&mut ctx)? {
                    MatchOutcome::Declined => ctx.restore_position(),
                    MatchOutcome::Accepted => {
                        commit_match(&mut ctx, start, &active.descriptor)?;
                        active.backend.invoke(&mut ctx)?;
                        continue 'tokens;
                    }
                    MatchOutcome::Suspended => {
                        commit_match(&mut ctx, start, &active.descriptor)?;
                        continue 'tokens;
                    }
                }
            }

            if let Some(saved) = stream.pop_saved_parser() {
                let active = &mut parsers[saved.parser];
                let mut ctx = ParseContext::new(
                    &mut stream,
                    &mut values,
                    &mut warnings,
                    &options.precedence,
                    env,
                    saved.parser,
                    &active.backend_type,
                );
                match active.backend.resume(&mut ctx, saved)? {
                    MatchOutcome::Declined => ctx.restore_position(),
                    MatchOutcome::Accepted => {
                        commit_match(&mut ctx, start, &active.descriptor)?;
                        active.backend.invoke(&mut ctx)?;
                        continue 'tokens;
                    }
                    MatchOutcome::Suspended => {
                        commit_match(&mut ctx, start, &active.descriptor)?;
                        continue 'tokens;
                    }
                }
            }

            let position = stream.current_position();
            match options.on_unmatched {
                OnError::Die => {
                    return Err(ResolveError::UnmatchedToken {
                        token: token.to_string(),
                        position,
                    });
                }
                OnError::Skip => {
                    tracing::debug!(token = %token, position, "Skipping unmatched token");
                    unmatched.push(token.to_string());
                    stream.skip_current();
                }
            }
        }

        while let Some(saved) = stream.pop_saved_parser() {
            let active = &mut parsers[saved.parser];
            let mut ctx = ParseContext::new(
                &mut stream,
                &mut values,
                &mut warnings,
                &options.precedence,
                env,
                saved.parser,
                &active.backend_type,
            );
            active.backend.abandon(&mut ctx, saved)?;
        }

        for (id, active) in parsers.iter_mut().enumerate() {
            let mut ctx = ParseContext::new(
                &mut stream,
                &mut values,
                &mut warnings,
                &options.precedence,
                env,
                id,
                &active.backend_type,
            );
            active.backend.initialize(&mut ctx)?;
        }

        tracing::debug!(
            resolved = values.len(),
            unmatched = unmatched.len(),
            warnings = warnings.len(),
            "Resolution pass complete"
        );

        Ok(Resolution {
            position: stream.current_position(),
            values,
            unmatched,
            warnings,
        })
    }

    /// Resolve only the built-in stream redirection flags.
    ///
    /// Tokens the system dictionary does not know are returned in
    /// [`Resolution::unmatched`] instead of failing, so the caller can hand
    /// them to its own dictionaries. The previously enabled set is restored
    /// afterwards.
    pub fn system_parse(&mut self, tokens: &[String]) -> Result<Resolution, ResolveError> {
        let enabled = std::mem::take(&mut self.enabled);
        let on_unmatched = self.options.on_unmatched;
        self.stale = true;
        self.options.on_unmatched = OnError::Skip;

        let result = self
            .enable_dictionary(SYSTEM_DICTIONARY)
            .and_then(|_| self.parse(tokens));

        self.options.on_unmatched = on_unmatched;
        self.enabled = enabled;
        self.stale = true;
        result
    }

    /// Usage text for every enabled dictionary.
    pub fn help(&mut self) -> Result<String, ResolveError> {
        if self.stale {
            self.rebuild_parsers()?;
        }
        let mut out = String::new();
        let mut printed = HashSet::new();
        for name in &self.enabled {
            let Some(dictionary) = self.registry.dictionary(name) else {
                continue;
            };
            let mut section = String::new();
            for member in dictionary.parsers.iter() {
                if !printed.insert(member) {
                    continue;
                }
                if let Some(active) = self.parsers.iter().find(|p| p.descriptor == member) {
                    section.push_str(&active.backend.help());
                }
            }
            if !section.is_empty() {
                out.push_str(&format!("{}:\n{}", dictionary.description, section));
            }
        }
        Ok(out)
    }
}

/// Commit a match, or fail if the backend claimed it without reading a
/// token. Keeps every pass bounded by the stream length.
fn commit_match(
    ctx: &mut ParseContext<'_, '_>,
    start: usize,
    parser: &str,
) -> Result<(), ResolveError> {
    if ctx.fetched_position() <= start {
        return Err(ResolveError::StalledParser {
            parser: parser.to_string(),
            position: start,
        });
    }
    ctx.fetch_current_position();
    Ok(())
}
