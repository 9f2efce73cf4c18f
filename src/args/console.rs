//! Console argument parser: matches command-line tokens against argument
//! definitions.
//!
//! Accepted shapes for a string argument with forms `-o`/`--out` and
//! divider `=`:
//!
//! ```text
//! -o out.txt        separate-token value
//! --out=out.txt     inline value
//! -o -e x out.txt   -o suspended, completed later by the stray `out.txt`
//! ```

use crate::args::backend::{MatchOutcome, ParseContext, ParserBackend};
use crate::args::definition::{ArgumentDefinition, OnError, ValueKind};
use crate::args::error::ResolveError;
use crate::args::registry::{BackendSettings, ConsoleSettings, ParserDescriptor};
use crate::args::stream::SavedPosition;
use crate::args::value::ArgumentValue;

/// Per-token matching state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParsingState {
    /// A form matched; its value has not been read yet.
    ArgumentStarted,
    /// Name and value are complete.
    ArgumentOk,
    /// The token is not one of ours, or its value is unusable.
    ArgumentError,
}

/// A token recognized as one of our forms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct TokenMatch<'t> {
    /// Index into `arguments`.
    index: usize,
    /// The surface form that matched.
    form: &'t str,
    /// Text after the divider, for inline values.
    inline: Option<&'t str>,
}

/// An argument whose name was read but whose value has not arrived.
#[derive(Debug, Clone)]
struct Pending {
    position: usize,
    index: usize,
    form: String,
}

pub struct ConsoleArgumentParser {
    name: String,
    settings: ConsoleSettings,
    arguments: Vec<ArgumentDefinition>,
    state: Option<ParsingState>,
    /// Argument currently being matched.
    current: Option<usize>,
    form: String,
    value: Option<ArgumentValue>,
    pending: Vec<Pending>,
}

impl ConsoleArgumentParser {
    pub fn new(
        name: impl Into<String>,
        settings: ConsoleSettings,
        arguments: Vec<ArgumentDefinition>,
    ) -> Self {
        Self {
            name: name.into(),
            settings,
            arguments,
            state: None,
            current: None,
            form: String::new(),
            value: None,
            pending: Vec::new(),
        }
    }

    /// Constructor registered under `console_parser`.
    pub fn construct(
        descriptor: &ParserDescriptor,
    ) -> Result<Box<dyn ParserBackend>, ResolveError> {
        match &descriptor.settings {
            BackendSettings::Console {
                settings,
                arguments,
            } => Ok(Box::new(Self::new(
                descriptor.name.clone(),
                settings.clone(),
                arguments.clone(),
            ))),
            _ => Err(descriptor.mismatch("console")),
        }
    }

    /// Last state reached, `None` before the first token.
    pub fn state(&self) -> Option<ParsingState> {
        self.state
    }

    /// Classify `token` and start matching it.
    ///
    /// Yields `ArgumentOk` when the token carries everything (inline value
    /// or a bool switch), `ArgumentStarted` when a separate value must
    /// follow, `ArgumentError` when the token is not ours or its value does
    /// not convert.
    pub fn process_argument(&mut self, token: &str) -> ParsingState {
        self.current = None;
        self.value = None;
        self.form.clear();

        let Some(matched) = self.classify(token) else {
            return self.set_state(ParsingState::ArgumentError);
        };
        self.current = Some(matched.index);
        self.form = matched.form.to_string();

        let kind = self.arguments[matched.index].kind;
        match matched.inline {
            Some(text) if !text.is_empty() => self.process_value(Some(text)),
            None if kind == ValueKind::Bool => {
                self.value = Some(ArgumentValue::Bool(true));
                self.set_state(ParsingState::ArgumentOk)
            }
            _ => self.set_state(ParsingState::ArgumentStarted),
        }
    }

    /// Supply the value for the argument being matched.
    pub fn process_value(&mut self, token: Option<&str>) -> ParsingState {
        let (Some(index), Some(text)) = (self.current, token) else {
            return self.set_state(ParsingState::ArgumentError);
        };
        let def = &self.arguments[index];
        match ArgumentValue::parse(def.kind, &def.tag, text) {
            Ok(value) => {
                self.value = Some(value);
                self.set_state(ParsingState::ArgumentOk)
            }
            Err(_) => self.set_state(ParsingState::ArgumentError),
        }
    }

    fn set_state(&mut self, state: ParsingState) -> ParsingState {
        self.state = Some(state);
        state
    }

    /// Longest matching form wins; ties go to the earlier definition.
    fn classify<'t>(&self, token: &'t str) -> Option<TokenMatch<'t>> {
        let mut best: Option<TokenMatch<'t>> = None;
        for (index, def) in self.arguments.iter().enumerate() {
            for form in def.forms.iter() {
                let Some(rest) = token.strip_prefix(form) else {
                    continue;
                };
                let inline = if rest.is_empty() {
                    None
                } else {
                    match self.settings.dividers.iter().find_map(|d| rest.strip_prefix(d)) {
                        Some(text) => Some(text),
                        None => continue,
                    }
                };
                if best.map_or(true, |b| form.len() > b.form.len()) {
                    best = Some(TokenMatch {
                        index,
                        form: &token[..form.len()],
                        inline,
                    });
                }
            }
        }
        best
    }

    fn is_own_form(&self, token: &str) -> bool {
        self.classify(token).is_some()
    }

    /// Conversion failure on the argument being matched.
    fn reject_value(
        &mut self,
        ctx: &mut ParseContext<'_, '_>,
        index: usize,
        raw: Option<&str>,
    ) -> Result<MatchOutcome, ResolveError> {
        let def = &self.arguments[index];
        let error = match raw {
            Some(text) if !text.is_empty() => ResolveError::InvalidValue {
                tag: def.tag.clone(),
                value: text.to_string(),
                expected: def.kind.describe(),
            },
            _ => ResolveError::MissingArgumentValue {
                tag: def.tag.clone(),
                form: self.form.clone(),
            },
        };
        match def.on_error {
            OnError::Die => Err(error),
            OnError::Skip => {
                ctx.warn(format!("{} (skipped)", error));
                self.current = None;
                self.value = None;
                ctx.restore_position();
                Ok(MatchOutcome::Declined)
            }
        }
    }

    /// Park the argument at the cursor. Only its name stays consumed; the
    /// look-ahead token is handed back.
    fn suspend(&mut self, ctx: &mut ParseContext<'_, '_>, index: usize) -> MatchOutcome {
        ctx.restore_position();
        ctx.save_current_position();
        self.pending.push(Pending {
            position: ctx.current_position(),
            index,
            form: self.form.clone(),
        });
        ctx.get_next_argument();
        tracing::debug!(
            parser = %self.name,
            form = %self.form,
            position = ctx.current_position(),
            "Suspended argument awaiting value"
        );
        self.current = None;
        MatchOutcome::Suspended
    }

    fn take_pending(&mut self, saved: SavedPosition) -> Option<Pending> {
        let at = self.pending.iter().position(|p| p.position == saved.position)?;
        Some(self.pending.remove(at))
    }
}

impl ParserBackend for ConsoleArgumentParser {
    fn name(&self) -> &str {
        &self.name
    }

    fn reset(&mut self) {
        self.state = None;
        self.current = None;
        self.value = None;
        self.form.clear();
        self.pending.clear();
    }

    fn parse(&mut self, ctx: &mut ParseContext<'_, '_>) -> Result<MatchOutcome, ResolveError> {
        let Some(token) = ctx.get_next_argument() else {
            ctx.restore_position();
            return Ok(MatchOutcome::Declined);
        };

        let inline_text = self.classify(token).and_then(|m| m.inline);
        match self.process_argument(token) {
            ParsingState::ArgumentOk => Ok(MatchOutcome::Accepted),
            ParsingState::ArgumentError => match self.current {
                // Ours, but the inline value did not convert.
                Some(index) => self.reject_value(ctx, index, inline_text),
                None => {
                    ctx.restore_position();
                    Ok(MatchOutcome::Declined)
                }
            },
            ParsingState::ArgumentStarted => {
                let Some(index) = self.current else {
                    ctx.restore_position();
                    return Ok(MatchOutcome::Declined);
                };
                if inline_text.is_some() || !self.settings.separate_value {
                    // `-o=` or a bare form where only inline values are allowed.
                    return self.reject_value(ctx, index, None);
                }

                match ctx.get_next_argument() {
                    Some(next) if !self.is_own_form(next) => {
                        if self.process_value(Some(next)) == ParsingState::ArgumentOk {
                            Ok(MatchOutcome::Accepted)
                        } else {
                            self.reject_value(ctx, index, Some(next))
                        }
                    }
                    _ => Ok(self.suspend(ctx, index)),
                }
            }
        }
    }

    fn resume(
        &mut self,
        ctx: &mut ParseContext<'_, '_>,
        saved: SavedPosition,
    ) -> Result<MatchOutcome, ResolveError> {
        let Some(pending) = self.take_pending(saved) else {
            return Ok(MatchOutcome::Declined);
        };
        let Some(token) = ctx.get_next_argument() else {
            ctx.restore_position();
            return Ok(MatchOutcome::Declined);
        };
        self.current = Some(pending.index);
        self.form = pending.form;
        if self.process_value(Some(token)) == ParsingState::ArgumentOk {
            tracing::debug!(
                parser = %self.name,
                form = %self.form,
                suspended_at = saved.position,
                "Completed suspended argument"
            );
            Ok(MatchOutcome::Accepted)
        } else {
            self.reject_value(ctx, pending.index, Some(token))
        }
    }

    fn abandon(
        &mut self,
        ctx: &mut ParseContext<'_, '_>,
        saved: SavedPosition,
    ) -> Result<(), ResolveError> {
        let Some(pending) = self.take_pending(saved) else {
            return Ok(());
        };
        let def = &self.arguments[pending.index];
        let error = ResolveError::MissingArgumentValue {
            tag: def.tag.clone(),
            form: pending.form,
        };
        match def.on_error {
            OnError::Die => Err(error),
            OnError::Skip => {
                ctx.warn(format!("{} (dropped)", error));
                Ok(())
            }
        }
    }

    fn invoke(&mut self, ctx: &mut ParseContext<'_, '_>) -> Result<(), ResolveError> {
        if self.state != Some(ParsingState::ArgumentOk) {
            return Ok(());
        }
        let (Some(index), Some(value)) = (self.current.take(), self.value.take()) else {
            return Ok(());
        };
        let def = &self.arguments[index];
        ctx.store(&def.tag, value, def.on_repeat)?;
        self.state = None;
        Ok(())
    }

    fn help(&self) -> String {
        let mut out = String::new();
        for def in &self.arguments {
            let mut spellings = Vec::new();
            for form in def.forms.iter() {
                if def.kind == ValueKind::Bool {
                    spellings.push(form.to_string());
                    continue;
                }
                if self.settings.separate_value {
                    spellings.push(format!("{} <value>", form));
                }
                for divider in self.settings.dividers.iter() {
                    spellings.push(format!("{}{}<value>", form, divider));
                }
            }
            let about = if def.description.is_empty() {
                def.tag.as_str()
            } else {
                def.description.as_str()
            };
            out.push_str(&format!("  {:<40} {}\n", spellings.join(", "), about));
        }
        out
    }
}
