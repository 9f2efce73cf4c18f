use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};

use spawnargs::args::{Resolution, SettingsParser, SYSTEM_DICTIONARY};
use spawnargs::config::Config;
use spawnargs::logging::init_tracing;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// JSON object, one key per tag
    Json,
    /// `tag=value` lines
    Text,
}

#[derive(Debug, Parser)]
#[command(
    name = "spawnargs",
    version,
    about = "Resolve spawn settings from command-line tokens and the environment"
)]
struct Cli {
    /// Config file (default: ~/.config/spawnargs/config.toml)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Dictionary to enable on top of `system` (repeatable)
    #[arg(short = 'd', long = "dictionary", value_name = "NAME")]
    dictionaries: Vec<String>,

    /// Print usage for the enabled dictionaries and exit
    #[arg(long)]
    usage: bool,

    /// Output format for the resolved table
    #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
    format: OutputFormat,

    /// Tokens to resolve, after `--`
    #[arg(last = true, value_name = "TOKENS")]
    tokens: Vec<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    init_tracing(&config.logging.level);

    let mut engine = config.build_engine();

    if cli.usage {
        enable_requested(&mut engine, &cli.dictionaries)?;
        print!("{}", engine.help()?);
        return Ok(());
    }

    let resolution = if cli.dictionaries.is_empty() {
        engine.system_parse(&cli.tokens)?
    } else {
        enable_requested(&mut engine, &cli.dictionaries)?;
        engine.parse(&cli.tokens)?
    };

    for warning in &resolution.warnings {
        eprintln!("warning: {}", warning);
    }
    for token in &resolution.unmatched {
        eprintln!("warning: unrecognized argument '{}'", token);
    }

    println!("{}", render(&resolution, cli.format)?);
    Ok(())
}

fn enable_requested(engine: &mut SettingsParser, dictionaries: &[String]) -> Result<()> {
    engine.enable_dictionary(SYSTEM_DICTIONARY)?;
    for name in dictionaries {
        engine
            .enable_dictionary(name)
            .with_context(|| format!("Cannot enable dictionary '{}'", name))?;
    }
    Ok(())
}

fn render(resolution: &Resolution, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(&resolution.values)?),
        OutputFormat::Text => {
            let lines: Vec<String> = resolution
                .values
                .iter()
                .flat_map(|(tag, values)| values.iter().map(move |v| format!("{}={}", tag, v)))
                .collect();
            Ok(lines.join("\n"))
        }
    }
}
