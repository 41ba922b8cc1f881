mod error_formatter;
mod formatter;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dimcalc::serializers::{from_json, to_json};
use dimcalc::{parse_keys, Engine, ResourceLimits};
use formatter::Formatter;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Parser)]
#[command(name = "dimcalc")]
#[command(about = "A unit-aware RPN calculator.")]
#[command(
    long_about = "dimcalc runs key scripts against a unit-aware RPN calculator engine.\nValues carry units; operators check and combine them, and macros can be recorded and replayed."
)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a key script and print the resulting stack
    ///
    /// Keys are separated by whitespace or commas; `#` starts a comment.
    ///
    /// Examples:
    ///   dimcalc run "5 enter 3 +"
    ///   dimcalc run "5 [km] [mi]"
    ///   dimcalc run "rec(sq2) 2 ^ stop 3 play(sq2)"
    Run {
        /// Key script to run
        #[arg(value_name = "KEYS", required_unless_present = "file")]
        script: Option<String>,
        /// Read the key script from a file instead
        #[arg(short = 'f', long, conflicts_with = "script")]
        file: Option<PathBuf>,
        /// Number of stack registers
        #[arg(short = 'n', long, default_value_t = ResourceLimits::default().register_count)]
        registers: usize,
        /// Snapshot file to start from; created if it does not exist
        #[arg(short = 's', long)]
        snapshot: Option<PathBuf>,
        /// Write the final state back to the snapshot file
        #[arg(long, requires = "snapshot")]
        save: bool,
        /// Print the state as JSON instead of tables
        #[arg(long)]
        json: bool,
    },
    /// List the units and types the calculator knows
    Units {
        /// Only show types whose symbol contains this text
        filter: Option<String>,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dimcalc=warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match &cli.command {
        Commands::Run {
            script,
            file,
            registers,
            snapshot,
            save,
            json,
        } => run_command(
            script.as_deref(),
            file.as_deref(),
            *registers,
            snapshot.as_deref(),
            *save,
            *json,
        ),
        Commands::Units { filter } => units_command(filter.as_deref()),
    };

    if let Err(e) = result {
        std::process::exit(report(&e));
    }
}

/// Print an error, using the script source for parse errors when available
fn report(error: &anyhow::Error) -> i32 {
    match error.downcast_ref::<ScriptError>() {
        Some(script_error) => eprintln!(
            "{}",
            error_formatter::format_error(&script_error.error, &script_error.source_id, &script_error.source)
        ),
        None => match error.downcast_ref::<dimcalc::CalcError>() {
            Some(calc_error) => eprintln!("{}", error_formatter::format_error(calc_error, "<keys>", "")),
            None => eprintln!("Error: {:#}", error),
        },
    }
    1
}

/// A calculator error together with the script that caused it
#[derive(Debug)]
struct ScriptError {
    error: dimcalc::CalcError,
    source_id: String,
    source: String,
}

impl std::fmt::Display for ScriptError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.error)
    }
}

impl std::error::Error for ScriptError {}

fn run_command(
    script: Option<&str>,
    file: Option<&Path>,
    registers: usize,
    snapshot: Option<&Path>,
    save: bool,
    json: bool,
) -> Result<()> {
    let (source_id, source) = match (script, file) {
        (_, Some(path)) => (
            path.display().to_string(),
            fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?,
        ),
        (Some(text), None) => ("<keys>".to_string(), text.to_string()),
        (None, None) => anyhow::bail!("no key script given"),
    };

    let mut engine = Engine::with_limits(ResourceLimits::default().with_registers(registers));
    if let Some(path) = snapshot.filter(|p| p.exists()) {
        let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        engine.restore(from_json(&text)?)?;
        debug!(path = %path.display(), "restored snapshot");
    }

    let keys = parse_keys(&source, engine.registry()).map_err(|error| ScriptError {
        error,
        source_id: source_id.clone(),
        source: source.clone(),
    })?;
    let outcome = engine.handle_events(keys);

    let formatter = Formatter::default();
    if json {
        println!("{}", serde_json::to_string_pretty(engine.state())?);
    } else {
        print!("{}", formatter.format_state(&engine));
    }

    outcome.map_err(|error| ScriptError {
        error,
        source_id,
        source,
    })?;

    if let (true, Some(path)) = (save, snapshot) {
        fs::write(path, to_json(&engine.snapshot())?)
            .with_context(|| format!("writing {}", path.display()))?;
        debug!(path = %path.display(), "saved snapshot");
    }
    Ok(())
}

fn units_command(filter: Option<&str>) -> Result<()> {
    let engine = Engine::new();
    let formatter = Formatter::default();
    print!("{}", formatter.format_units(engine.registry(), filter));
    Ok(())
}
