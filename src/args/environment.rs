//! Environment variable parser: fallback values from the process
//! environment.

use crate::args::backend::{ParseContext, ParserBackend};
use crate::args::definition::{EnvironmentBinding, OnError};
use crate::args::error::ResolveError;
use crate::args::registry::{BackendSettings, ParserDescriptor};
use crate::args::value::{ArgumentValue, Recorded};

/// Probes a fixed set of variables and records the ones that are set.
///
/// Never touches the token stream. Its values land after the console pass,
/// so a slot the command line already filled is only displaced when the
/// binding says `replace` and the engine's precedence ranks the environment
/// higher.
pub struct EnvironmentVariableParser {
    name: String,
    bindings: Vec<EnvironmentBinding>,
}

impl EnvironmentVariableParser {
    pub fn new(name: impl Into<String>, bindings: Vec<EnvironmentBinding>) -> Self {
        Self {
            name: name.into(),
            bindings,
        }
    }

    /// Constructor registered under `environment_parser`.
    pub fn construct(
        descriptor: &ParserDescriptor,
    ) -> Result<Box<dyn ParserBackend>, ResolveError> {
        match &descriptor.settings {
            BackendSettings::Environment { bindings } => {
                Ok(Box::new(Self::new(descriptor.name.clone(), bindings.clone())))
            }
            _ => Err(descriptor.mismatch("environment")),
        }
    }
}

impl ParserBackend for EnvironmentVariableParser {
    fn name(&self) -> &str {
        &self.name
    }

    fn initialize(&mut self, ctx: &mut ParseContext<'_, '_>) -> Result<(), ResolveError> {
        for binding in &self.bindings {
            let Some(raw) = ctx.env_var(&binding.variable) else {
                continue;
            };
            let value = match ArgumentValue::parse(binding.kind, &binding.tag, &raw) {
                Ok(value) => value,
                Err(error) => match binding.on_error {
                    OnError::Die => return Err(error),
                    OnError::Skip => {
                        ctx.warn(format!("{} (from ${}, skipped)", error, binding.variable));
                        continue;
                    }
                },
            };
            if ctx.store(&binding.tag, value, binding.on_repeat)? == Recorded::Ignored {
                tracing::debug!(
                    variable = %binding.variable,
                    tag = %binding.tag,
                    "Environment value shadowed by higher-ranked source"
                );
            }
        }
        Ok(())
    }
}
