//! # automap-cli
//!
//! Command-line interface for automap.
//!
//! Loads a YAML mapping document, then either maps a JSON document through
//! one of its mappings or validates the configuration.

use anyhow::{Context, Result, bail};
use automap::{Mapper, MappingDocument};
use automap_validation::{ConfigurationValidator, ValidationReporter};
use clap::{Parser, Subcommand};
use serde_json::Value;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "automap")]
#[command(about = "Convention-based JSON object mapping")]
#[command(version)]
struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Map a JSON document through a configured mapping
    Map {
        /// Mapping document (YAML)
        #[arg(short, long)]
        mappings: PathBuf,

        /// Source key of the mapping
        #[arg(short, long)]
        source: String,

        /// Destination key of the mapping
        #[arg(short, long)]
        destination: String,

        /// Input JSON file, stdin when omitted
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Output JSON file, stdout when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Use the asynchronous engine
        #[arg(long = "async")]
        run_async: bool,
    },

    /// Validate the mappings of a mapping document
    Validate {
        /// Mapping document (YAML)
        #[arg(short, long)]
        mappings: PathBuf,

        /// Treat mappings without type metadata as errors
        #[arg(long)]
        strict: bool,
    },
}

fn load_mapper(path: &Path) -> Result<Mapper> {
    let document = MappingDocument::parse_file(path)
        .with_context(|| format!("Failed to load mapping document '{}'", path.display()))?;
    let mut mapper = Mapper::with_builtin_extensions()?;
    document
        .apply(&mut mapper)
        .with_context(|| format!("Failed to configure mappings from '{}'", path.display()))?;
    Ok(mapper)
}

fn read_input(input: Option<&Path>) -> Result<Value> {
    let content = match input {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read input '{}'", path.display()))?,
        None => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .context("Failed to read input from stdin")?;
            buffer
        }
    };
    serde_json::from_str(&content).context("Input is not valid JSON")
}

fn write_output(output: Option<&Path>, value: &Value) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value)?;
    match output {
        Some(path) => std::fs::write(path, rendered + "\n")
            .with_context(|| format!("Failed to write output '{}'", path.display()))?,
        None => {
            let mut stdout = std::io::stdout().lock();
            writeln!(stdout, "{rendered}")?;
        }
    }
    Ok(())
}

async fn run_map(
    mappings: &Path,
    source: &str,
    destination: &str,
    input: Option<&Path>,
    output: Option<&Path>,
    run_async: bool,
) -> Result<()> {
    let mapper = load_mapper(mappings)?;
    if !mapper.registry().contains(source, destination) {
        bail!("No mapping from '{source}' to '{destination}' in '{}'", mappings.display());
    }

    let value = read_input(input)?;
    tracing::info!(source, destination, run_async, "mapping document");
    let mapped = if run_async {
        mapper.map_async(source, destination, Some(&value)).await?
    } else {
        mapper.map(source, destination, Some(&value))?
    };

    write_output(output, &mapped.unwrap_or(Value::Null))
}

/// Exit code 0 when valid without warnings, 1 with warnings, 2 with errors
fn run_validate(mappings: &Path, strict: bool) -> Result<u8> {
    let mapper = load_mapper(mappings)?;
    let report = ConfigurationValidator::strict(strict).validate(mapper.registry());

    println!("Mappings: {}", mapper.registry().len());
    println!("{}", ValidationReporter::new().render(&report));

    Ok(if report.has_errors() {
        2
    } else if report.has_warnings() {
        1
    } else {
        0
    })
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Map {
            mappings,
            source,
            destination,
            input,
            output,
            run_async,
        } => run_map(
            &mappings,
            &source,
            &destination,
            input.as_deref(),
            output.as_deref(),
            run_async,
        )
        .await
        .map(|()| 0),
        Commands::Validate { mappings, strict } => run_validate(&mappings, strict),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::from(2)
        }
    }
}
