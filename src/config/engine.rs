//! Engine assembly: turns a loaded [`Config`] into a ready
//! [`SettingsParser`].

use crate::args::{
    CompactList, ConsoleSettings, Dictionary, EngineOptions, ParserDescriptor, Precedence,
    Registry, SettingsParser,
};
use crate::config::types::{Config, DictionaryConfig, ResolutionConfig};

impl ResolutionConfig {
    pub fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            on_unmatched: self.on_unmatched,
            precedence: Precedence::new(self.precedence.iter().cloned()),
        }
    }

    pub fn console_settings(&self) -> ConsoleSettings {
        ConsoleSettings {
            dividers: CompactList::new(self.dividers.iter().cloned()),
            separate_value: self.separate_value,
        }
    }
}

impl DictionaryConfig {
    /// Name of the environment parser generated for this dictionary.
    pub fn environment_parser_name(&self) -> String {
        format!("{}_environment", self.name)
    }

    /// Registry entries for this dictionary: the dictionary itself and one
    /// descriptor per non-empty source.
    pub fn to_registry_entries(
        &self,
        console: &ConsoleSettings,
    ) -> (Dictionary, Vec<ParserDescriptor>) {
        let mut descriptors = Vec::new();
        if !self.arguments.is_empty() {
            descriptors.push(ParserDescriptor::console(
                self.name.clone(),
                console.clone(),
                self.arguments.clone(),
            ));
        }
        if !self.environment.is_empty() {
            descriptors.push(ParserDescriptor::environment(
                self.environment_parser_name(),
                self.environment.clone(),
            ));
        }
        let members = CompactList::new(descriptors.iter().map(|d| d.name.clone()));
        let dictionary = Dictionary::new(self.name.clone(), self.description.clone(), members);
        (dictionary, descriptors)
    }
}

impl Config {
    /// Registry with the built-in tables, then the configured dictionaries
    /// (which may overwrite built-ins by name).
    pub fn build_registry(&self) -> Registry {
        let console = self.resolution.console_settings();
        let mut registry =
            Registry::with_builtins(console.clone(), &self.resolution.environment_prefix);
        for declared in &self.dictionaries {
            let (dictionary, descriptors) = declared.to_registry_entries(&console);
            tracing::debug!(
                dictionary = %dictionary.name,
                parsers = descriptors.len(),
                "Registering configured dictionary"
            );
            registry.register_parsers(descriptors);
            registry.register_dictionary(dictionary);
        }
        registry
    }

    /// Engine over [`Config::build_registry`] with the configured policies.
    pub fn build_engine(&self) -> SettingsParser {
        SettingsParser::new(self.build_registry()).with_options(self.resolution.engine_options())
    }
}
