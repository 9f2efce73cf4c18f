//! Integration tests for the resolution engine.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use spawnargs::args::{
    ArgumentDefinition, ArgumentValue, BackendSettings, ConsoleSettings, ConstructorEntry,
    Dictionary, EngineOptions, EnvironmentBinding, MatchOutcome, OnError, OnRepeat,
    ParseContext, ParserBackend, ParserConstructor, ParserDescriptor, Precedence, Registry,
    ResolveError, SettingsParser, ValueKind, CONSOLE_PARSER, ENVIRONMENT_PARSER, ERROR_STREAM,
    INPUT_STREAM, OUTPUT_STREAM, SYSTEM_DICTIONARY,
};
use spawnargs::c_lst;

fn tokens(args: &[&str]) -> Vec<String> {
    args.iter().map(|s| s.to_string()).collect()
}

fn env(vars: &[(&str, &str)]) -> HashMap<String, String> {
    vars.iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn engine_with_env(vars: &[(&str, &str)]) -> SettingsParser {
    SettingsParser::new(Registry::with_builtins(ConsoleSettings::default(), "SP_"))
        .with_env(env(vars))
}

fn engine() -> SettingsParser {
    engine_with_env(&[])
}

/// Registers an "app" dictionary with a single console parser.
fn register_app(engine: &mut SettingsParser, arguments: Vec<ArgumentDefinition>) {
    engine.register_parsers([ParserDescriptor::console(
        "app",
        ConsoleSettings::default(),
        arguments,
    )]);
    engine.register_dictionaries([Dictionary::new("app", "Application options", c_lst!["app"])]);
}

// =============================================================================
// SYSTEM DICTIONARY
// =============================================================================

#[test]
fn system_flags_resolve_both_value_styles() {
    let mut engine = engine();
    engine.enable_dictionary(SYSTEM_DICTIONARY).unwrap();

    let raw = tokens(&["-o", "out.txt", "-i=in.txt"]);
    let resolution = engine.parse(&raw).unwrap();

    assert_eq!(resolution.values.get_str(OUTPUT_STREAM), Some("out.txt"));
    assert_eq!(resolution.values.get_str(INPUT_STREAM), Some("in.txt"));
    assert!(!resolution.values.contains(ERROR_STREAM));
    assert_eq!(resolution.position, raw.len());
    assert!(resolution.unmatched.is_empty());
}

#[test]
fn long_forms_work_too() {
    let mut engine = engine();
    engine.enable_dictionary(SYSTEM_DICTIONARY).unwrap();

    let resolution = engine
        .parse(&tokens(&["--err", "err.log", "--out=out.log"]))
        .unwrap();

    assert_eq!(resolution.values.get_str(ERROR_STREAM), Some("err.log"));
    assert_eq!(resolution.values.get_str(OUTPUT_STREAM), Some("out.log"));
}

#[test]
fn unknown_token_is_fatal_by_default() {
    let mut engine = engine();
    engine.enable_dictionary(SYSTEM_DICTIONARY).unwrap();

    let err = engine.parse(&tokens(&["--unknown"])).unwrap_err();

    assert_eq!(
        err,
        ResolveError::UnmatchedToken {
            token: "--unknown".into(),
            position: 0,
        }
    );
}

#[test]
fn unknown_token_after_valid_ones_still_returns_no_table() {
    let mut engine = engine();
    engine.enable_dictionary(SYSTEM_DICTIONARY).unwrap();

    let result = engine.parse(&tokens(&["-o", "out.txt", "--unknown"]));

    assert!(matches!(
        result,
        Err(ResolveError::UnmatchedToken { position: 2, .. })
    ));
}

#[test]
fn unmatched_tokens_collected_under_skip_policy() {
    let mut engine = engine().with_options(EngineOptions {
        on_unmatched: OnError::Skip,
        precedence: Precedence::default(),
    });
    engine.enable_dictionary(SYSTEM_DICTIONARY).unwrap();

    let resolution = engine.parse(&tokens(&["run", "-o", "x", "--fast"])).unwrap();

    assert_eq!(resolution.unmatched, vec!["run", "--fast"]);
    assert_eq!(resolution.values.get_str(OUTPUT_STREAM), Some("x"));
    assert_eq!(resolution.position, 4);
}

#[test]
fn system_parse_collects_foreign_tokens_and_restores_dictionaries() {
    let mut engine = engine();
    register_app(
        &mut engine,
        vec![ArgumentDefinition::new("mode", c_lst!["--mode"])],
    );
    engine.enable_dictionary("app").unwrap();

    let resolution = engine
        .system_parse(&tokens(&["--mode", "fast", "-e", "err.txt"]))
        .unwrap();

    assert_eq!(resolution.values.get_str(ERROR_STREAM), Some("err.txt"));
    assert!(!resolution.values.contains("mode"));
    assert_eq!(resolution.unmatched, vec!["--mode", "fast"]);
    assert_eq!(engine.enabled_dictionaries(), ["app".to_string()]);
    assert_eq!(engine.options().on_unmatched, OnError::Die);

    // The application pass still works with its own dictionary.
    let app = engine.parse(&tokens(&["--mode", "fast"])).unwrap();
    assert_eq!(app.values.get_str("mode"), Some("fast"));
}

// =============================================================================
// ENVIRONMENT FALLBACK & PRECEDENCE
// =============================================================================

#[test]
fn environment_fills_tags_the_console_left_empty() {
    let mut engine = engine_with_env(&[("SP_ERROR_STREAM", "env-err.log")]);
    engine.enable_dictionary(SYSTEM_DICTIONARY).unwrap();

    let resolution = engine.parse(&tokens(&["-o", "out.txt"])).unwrap();

    assert_eq!(resolution.values.get_str(OUTPUT_STREAM), Some("out.txt"));
    assert_eq!(resolution.values.get_str(ERROR_STREAM), Some("env-err.log"));
    assert_eq!(resolution.values.source_of(ERROR_STREAM), Some(ENVIRONMENT_PARSER));
}

#[test]
fn console_outranks_environment_by_default() {
    let mut engine = engine_with_env(&[("SP_OUTPUT_STREAM", "env.txt")]);
    engine.enable_dictionary(SYSTEM_DICTIONARY).unwrap();

    let resolution = engine.parse(&tokens(&["-o", "cli.txt"])).unwrap();

    assert_eq!(resolution.values.get_str(OUTPUT_STREAM), Some("cli.txt"));
    assert_eq!(resolution.values.source_of(OUTPUT_STREAM), Some(CONSOLE_PARSER));
}

#[test]
fn configured_precedence_lets_environment_replace() {
    let mut engine = engine_with_env(&[("SP_OUTPUT_STREAM", "env.txt")]).with_options(
        EngineOptions {
            on_unmatched: OnError::Die,
            precedence: Precedence::new([ENVIRONMENT_PARSER, CONSOLE_PARSER]),
        },
    );
    engine.enable_dictionary(SYSTEM_DICTIONARY).unwrap();

    let resolution = engine.parse(&tokens(&["-o", "cli.txt"])).unwrap();

    assert_eq!(resolution.values.get_str(OUTPUT_STREAM), Some("env.txt"));
}

#[test]
fn environment_never_overrides_without_replace() {
    let mut engine = engine_with_env(&[("APP_LEVEL", "9")]).with_options(EngineOptions {
        on_unmatched: OnError::Die,
        precedence: Precedence::new([ENVIRONMENT_PARSER, CONSOLE_PARSER]),
    });
    let mut binding = EnvironmentBinding::new("APP_LEVEL", "level");
    binding.kind = ValueKind::Integer;
    binding.on_repeat = OnRepeat::Die;
    engine.register_parsers([
        ParserDescriptor::console(
            "app",
            ConsoleSettings::default(),
            vec![ArgumentDefinition::new("level", c_lst!["--level"])
                .with_kind(ValueKind::Integer)
                .with_behavior(OnError::Die, OnRepeat::Die)],
        ),
        ParserDescriptor::environment("app_environment", vec![binding]),
    ]);
    engine.register_dictionaries([Dictionary::new(
        "app",
        "Application options",
        c_lst!["app", "app_environment"],
    )]);
    engine.enable_dictionary("app").unwrap();

    let resolution = engine.parse(&tokens(&["--level", "3"])).unwrap();

    assert_eq!(resolution.values.get("level"), Some(&ArgumentValue::Integer(3)));
}

// =============================================================================
// REPEAT POLICIES
// =============================================================================

#[test]
fn repeat_die_is_fatal() {
    let mut engine = engine();
    register_app(
        &mut engine,
        vec![ArgumentDefinition::new("name", c_lst!["-n"])
            .with_behavior(OnError::Die, OnRepeat::Die)],
    );
    engine.enable_dictionary("app").unwrap();

    let err = engine.parse(&tokens(&["-n", "a", "-n", "b"])).unwrap_err();

    assert_eq!(err, ResolveError::RepeatedArgument { tag: "name".into() });
}

#[test]
fn repeat_stack_keeps_encounter_order() {
    let mut engine = engine();
    register_app(
        &mut engine,
        vec![ArgumentDefinition::new("include", c_lst!["-I", "--include"])
            .with_behavior(OnError::Die, OnRepeat::Stack)],
    );
    engine.enable_dictionary("app").unwrap();

    let resolution = engine
        .parse(&tokens(&["-I", "a", "--include=b", "-I=c"]))
        .unwrap();

    let values: Vec<&str> = resolution
        .values
        .get_all("include")
        .iter()
        .filter_map(ArgumentValue::as_str)
        .collect();
    assert_eq!(values, vec!["a", "b", "c"]);
}

#[test]
fn repeat_replace_keeps_last() {
    let mut engine = engine();
    engine.enable_dictionary(SYSTEM_DICTIONARY).unwrap();

    let resolution = engine.parse(&tokens(&["-o", "first", "-o", "second"])).unwrap();

    assert_eq!(resolution.values.get_all(OUTPUT_STREAM).len(), 1);
    assert_eq!(resolution.values.get_str(OUTPUT_STREAM), Some("second"));
}

// =============================================================================
// SUSPENDED ARGUMENTS & ERROR POLICIES
// =============================================================================

#[test]
fn suspended_argument_completed_by_later_stray_token() {
    let mut engine = engine();
    engine.enable_dictionary(SYSTEM_DICTIONARY).unwrap();

    let resolution = engine
        .parse(&tokens(&["-o", "-e", "err.txt", "out.txt"]))
        .unwrap();

    assert_eq!(resolution.values.get_str(ERROR_STREAM), Some("err.txt"));
    assert_eq!(resolution.values.get_str(OUTPUT_STREAM), Some("out.txt"));
    assert_eq!(resolution.position, 4);
}

#[test]
fn suspended_arguments_complete_most_recent_first() {
    let mut engine = engine();
    engine.enable_dictionary(SYSTEM_DICTIONARY).unwrap();

    let resolution = engine
        .parse(&tokens(&["-o", "-e", "-i", "in", "a", "b"]))
        .unwrap();

    assert_eq!(resolution.values.get_str(INPUT_STREAM), Some("in"));
    assert_eq!(resolution.values.get_str(ERROR_STREAM), Some("a"));
    assert_eq!(resolution.values.get_str(OUTPUT_STREAM), Some("b"));
    assert_eq!(resolution.position, 6);
    assert!(resolution.warnings.is_empty());
}

#[test]
fn missing_value_at_end_is_fatal_under_die() {
    let mut engine = engine();
    engine.enable_dictionary(SYSTEM_DICTIONARY).unwrap();

    let err = engine.parse(&tokens(&["-i", "in.txt", "-o"])).unwrap_err();

    assert_eq!(
        err,
        ResolveError::MissingArgumentValue {
            tag: OUTPUT_STREAM.into(),
            form: "-o".into(),
        }
    );
}

#[test]
fn missing_value_dropped_under_skip() {
    let mut engine = engine();
    register_app(
        &mut engine,
        vec![ArgumentDefinition::new("target", c_lst!["-t"])
            .with_behavior(OnError::Skip, OnRepeat::Replace)],
    );
    engine.enable_dictionary("app").unwrap();

    let resolution = engine.parse(&tokens(&["-t"])).unwrap();

    assert!(!resolution.values.contains("target"));
    assert_eq!(resolution.warnings.len(), 1);
    assert!(resolution.warnings[0].contains("missing its value"));
}

#[test]
fn invalid_value_under_skip_leaves_tokens_for_others() {
    let mut engine = engine().with_options(EngineOptions {
        on_unmatched: OnError::Skip,
        precedence: Precedence::default(),
    });
    register_app(
        &mut engine,
        vec![ArgumentDefinition::new("count", c_lst!["-n"])
            .with_kind(ValueKind::Integer)
            .with_behavior(OnError::Skip, OnRepeat::Replace)],
    );
    engine.enable_dictionary("app").unwrap();

    let resolution = engine.parse(&tokens(&["-n", "ten"])).unwrap();

    assert!(!resolution.values.contains("count"));
    assert_eq!(resolution.unmatched, vec!["-n", "ten"]);
    assert!(resolution.warnings[0].contains("expected an integer"));
}

#[test]
fn invalid_value_under_die_is_fatal() {
    let mut engine = engine();
    register_app(
        &mut engine,
        vec![ArgumentDefinition::new("count", c_lst!["-n"]).with_kind(ValueKind::Integer)],
    );
    engine.enable_dictionary("app").unwrap();

    let err = engine.parse(&tokens(&["-n=ten"])).unwrap_err();

    assert!(matches!(err, ResolveError::InvalidValue { ref tag, .. } if tag == "count"));
}

#[test]
fn bool_switch_and_typed_values() {
    let mut engine = engine();
    register_app(
        &mut engine,
        vec![
            ArgumentDefinition::new("verbose", c_lst!["-v"]).with_kind(ValueKind::Bool),
            ArgumentDefinition::new("ratio", c_lst!["--ratio"]).with_kind(ValueKind::Real),
        ],
    );
    engine.enable_dictionary("app").unwrap();

    let resolution = engine.parse(&tokens(&["-v", "--ratio", "0.5"])).unwrap();

    assert_eq!(
        resolution.values.get("verbose").and_then(ArgumentValue::as_bool),
        Some(true)
    );
    assert_eq!(resolution.values.get("ratio"), Some(&ArgumentValue::Real(0.5)));
}

// =============================================================================
// REGISTRY & REBUILD
// =============================================================================

#[test]
fn enabling_unregistered_dictionary_fails() {
    let mut engine = engine();
    let err = engine.enable_dictionary("nope").unwrap_err();
    assert_eq!(err, ResolveError::UnregisteredDictionary { name: "nope".into() });
    assert!(engine.enabled_dictionaries().is_empty());
}

#[test]
fn dictionary_member_without_descriptor_fails() {
    let mut engine = engine();
    engine.register_dictionaries([Dictionary::new("broken", "", c_lst!["ghost"])]);

    let err = engine.enable_dictionary("broken").unwrap_err();

    assert_eq!(
        err,
        ResolveError::UnregisteredParser {
            name: "ghost".into(),
            dictionary: "broken".into(),
        }
    );
    assert!(engine.enabled_dictionaries().is_empty());
}

#[test]
fn descriptor_without_constructor_fails() {
    let mut engine = engine();
    engine.register_parsers([ParserDescriptor {
        name: "system_json".into(),
        backend_type: "json_parser".into(),
        settings: BackendSettings::None,
    }]);
    engine.register_dictionaries([Dictionary::new("json", "", c_lst!["system_json"])]);

    let err = engine.enable_dictionary("json").unwrap_err();

    assert_eq!(
        err,
        ResolveError::UnregisteredParserType {
            parser: "system_json".into(),
            backend_type: "json_parser".into(),
        }
    );
}

#[test]
fn shared_parser_is_built_once() {
    let mut engine = engine();
    register_app(
        &mut engine,
        vec![ArgumentDefinition::new("mode", c_lst!["--mode"])],
    );
    engine.register_dictionaries([Dictionary::new(
        "bundle",
        "System plus app",
        c_lst!["system", "app"],
    )]);

    engine.enable_dictionary(SYSTEM_DICTIONARY).unwrap();
    engine.enable_dictionary("app").unwrap();
    engine.enable_dictionary("bundle").unwrap();
    engine.rebuild_parsers().unwrap();

    assert_eq!(
        engine.active_parsers(),
        vec!["system", "system_environment", "app"]
    );
    assert_eq!(
        engine.registry().dictionary_names(),
        vec!["app", "bundle", "system"]
    );
}

#[test]
fn clear_dictionaries_empties_the_active_list() {
    let mut engine = engine();
    engine.enable_dictionary(SYSTEM_DICTIONARY).unwrap();
    engine.clear_dictionaries();
    engine.rebuild_parsers().unwrap();

    assert!(engine.active_parsers().is_empty());
    let err = engine.parse(&tokens(&["-o", "x"])).unwrap_err();
    assert!(matches!(err, ResolveError::UnmatchedToken { .. }));
}

static FIXED_CONSTRUCTED: AtomicUsize = AtomicUsize::new(0);

/// Extension backend: contributes a constant and a default output stream
/// during `initialize`.
struct FixedBackend {
    name: String,
}

impl ParserBackend for FixedBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn initialize(&mut self, ctx: &mut ParseContext<'_, '_>) -> Result<(), ResolveError> {
        ctx.store("profile", ArgumentValue::Str("fixed".into()), OnRepeat::Replace)?;
        if !ctx.is_resolved(OUTPUT_STREAM) {
            let fallback = ArgumentValue::Str("fixed.log".into());
            ctx.store(OUTPUT_STREAM, fallback, OnRepeat::Replace)?;
        }
        Ok(())
    }
}

fn construct_fixed(
    descriptor: &ParserDescriptor,
) -> Result<Box<dyn ParserBackend>, ResolveError> {
    FIXED_CONSTRUCTED.fetch_add(1, Ordering::SeqCst);
    Ok(Box::new(FixedBackend {
        name: descriptor.name.clone(),
    }))
}

#[test]
fn custom_backend_type_plugs_in_and_is_constructed_once() {
    let mut engine = engine();
    engine.register_constructors([ConstructorEntry::new("fixed_parser", construct_fixed)]);
    engine.register_parsers([ParserDescriptor {
        name: "fixed".into(),
        backend_type: "fixed_parser".into(),
        settings: BackendSettings::None,
    }]);
    engine.register_dictionaries([
        Dictionary::new("one", "", c_lst!["fixed"]),
        Dictionary::new("two", "", c_lst!["fixed", "system"]),
    ]);
    engine.enable_dictionary("one").unwrap();
    engine.enable_dictionary("two").unwrap();

    let before = FIXED_CONSTRUCTED.load(Ordering::SeqCst);
    engine.rebuild_parsers().unwrap();
    assert_eq!(FIXED_CONSTRUCTED.load(Ordering::SeqCst) - before, 1);
    assert_eq!(engine.active_parsers(), vec!["fixed", "system"]);

    let resolution = engine.parse(&tokens(&["-o", "x"])).unwrap();
    assert_eq!(resolution.values.get_str("profile"), Some("fixed"));
    assert_eq!(resolution.values.source_of("profile"), Some("fixed_parser"));
    assert_eq!(resolution.values.get_str(OUTPUT_STREAM), Some("x"));

    let defaulted = engine.parse(&tokens(&["-e", "y"])).unwrap();
    assert_eq!(defaulted.values.get_str(OUTPUT_STREAM), Some("fixed.log"));
    assert_eq!(defaulted.values.source_of(OUTPUT_STREAM), Some("fixed_parser"));
}

/// Claims every token without reading it.
struct GreedyBackend;

impl ParserBackend for GreedyBackend {
    fn name(&self) -> &str {
        "greedy"
    }

    fn parse(&mut self, _ctx: &mut ParseContext<'_, '_>) -> Result<MatchOutcome, ResolveError> {
        Ok(MatchOutcome::Accepted)
    }
}

/// Reads ahead, then declines without restoring.
struct PeekingBackend;

impl ParserBackend for PeekingBackend {
    fn name(&self) -> &str {
        "peeking"
    }

    fn parse(&mut self, ctx: &mut ParseContext<'_, '_>) -> Result<MatchOutcome, ResolveError> {
        while ctx.get_next_argument().is_some() {}
        Ok(MatchOutcome::Declined)
    }
}

fn construct_greedy(_: &ParserDescriptor) -> Result<Box<dyn ParserBackend>, ResolveError> {
    Ok(Box::new(GreedyBackend))
}

fn construct_peeking(_: &ParserDescriptor) -> Result<Box<dyn ParserBackend>, ResolveError> {
    Ok(Box::new(PeekingBackend))
}

fn engine_with_custom(backend_type: &str, constructor: ParserConstructor) -> SettingsParser {
    let mut engine = engine();
    engine.register_constructors([ConstructorEntry::new(backend_type, constructor)]);
    engine.register_parsers([ParserDescriptor {
        name: "custom".into(),
        backend_type: backend_type.into(),
        settings: BackendSettings::None,
    }]);
    engine.register_dictionaries([Dictionary::new("custom", "", c_lst!["custom", "system"])]);
    engine.enable_dictionary("custom").unwrap();
    engine
}

#[test]
fn match_without_consuming_fails_instead_of_looping() {
    let mut engine = engine_with_custom("greedy_parser", construct_greedy);

    let err = engine.parse(&tokens(&["-o", "x"])).unwrap_err();

    assert_eq!(
        err,
        ResolveError::StalledParser {
            parser: "custom".into(),
            position: 0,
        }
    );
}

#[test]
fn tokens_read_before_decline_are_handed_back() {
    let mut engine = engine_with_custom("peeking_parser", construct_peeking);

    let resolution = engine.parse(&tokens(&["-o", "x", "-e", "y"])).unwrap();

    assert_eq!(resolution.values.get_str(OUTPUT_STREAM), Some("x"));
    assert_eq!(resolution.values.get_str(ERROR_STREAM), Some("y"));
    assert_eq!(resolution.position, 4);
}

#[test]
fn help_groups_by_dictionary() {
    let mut engine = engine();
    register_app(
        &mut engine,
        vec![ArgumentDefinition::new("mode", c_lst!["--mode"]).with_description("Run mode")],
    );
    engine.enable_dictionary(SYSTEM_DICTIONARY).unwrap();
    engine.enable_dictionary("app").unwrap();

    let help = engine.help().unwrap();

    assert!(help.contains("Default system commands:"));
    assert!(help.contains("-o <value>, -o=<value>, --out <value>, --out=<value>"));
    assert!(help.contains("Redirect standard error"));
    assert!(help.contains("Application options:"));
    assert!(help.contains("--mode <value>"));
    assert!(help.contains("Run mode"));
}

#[test]
fn passes_are_independent() {
    let mut engine = engine();
    engine.enable_dictionary(SYSTEM_DICTIONARY).unwrap();

    assert!(engine.parse(&tokens(&["-o"])).is_err());
    let resolution = engine.parse(&tokens(&["-o", "ok.txt"])).unwrap();

    assert_eq!(resolution.values.get_str(OUTPUT_STREAM), Some("ok.txt"));
    assert!(resolution.warnings.is_empty());
}
