//! Binary entry point for the kloc-mapper CLI.
//!
//! ## Usage
//!
//! ```bash
//! # Map a bare SCIP index
//! kloc-mapper map --scip index.scip --out graph.json
//!
//! # Map an archive, linking its call records
//! kloc-mapper map --archive project.kloc --out graph.json --pretty
//!
//! # Map with a separate calls file and longer estimated method bodies
//! kloc-mapper map --scip index.scip --calls calls.json --out graph.json \
//!     --callable-fallback-lines 60
//! ```

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand, ValueEnum};

use kloc_mapper::cli::{run_map, InputSource, MapOptions};
use kloc_mapper::error::{KlocError, OutputErrorCode};
use kloc_mapper::output::{emit_response, emit_response_compact, ErrorResponse};

// ============================================================================
// CLI Structure
// ============================================================================

/// Map SCIP indexes into a unified code property graph.
///
/// The graph is written to the `--out` file; stdout carries a single JSON
/// summary (or error) object.
#[derive(Parser, Debug)]
#[command(
    name = "kloc-mapper",
    version,
    about = "Map SCIP indexes into a unified code property graph"
)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,
    #[command(subcommand)]
    command: Command,
}

/// Global arguments shared by all subcommands.
#[derive(Parser, Debug)]
struct GlobalArgs {
    /// Log level for tracing output.
    #[arg(long, global = true, value_enum, default_value = "warn")]
    log_level: LogLevel,

    /// Format of the log lines written to stderr.
    #[arg(long, global = true, value_enum, default_value = "text")]
    log_format: LogFormat,
}

/// Log level for tracing output.
#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    fn to_tracing_level(self) -> tracing::Level {
        match self {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

/// Log line format.
#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogFormat {
    /// Human-readable lines.
    Text,
    /// One JSON object per line.
    Json,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Map a SCIP index (and optional call records) to graph JSON.
    Map(MapArgs),
}

#[derive(Args, Debug)]
#[command(group(
    clap::ArgGroup::new("input")
        .required(true)
        .args(["scip", "archive"])
))]
struct MapArgs {
    /// Path to a SCIP index file.
    #[arg(long, short = 's')]
    scip: Option<PathBuf>,

    /// Path to a `.kloc` archive (index.scip plus optional calls.json).
    #[arg(long, short = 'a')]
    archive: Option<PathBuf>,

    /// Path to a calls.json file (overrides the archive's calls.json).
    #[arg(long, short = 'c', conflicts_with = "no_calls")]
    calls: Option<PathBuf>,

    /// Ignore call records even when they are available.
    #[arg(long)]
    no_calls: bool,

    /// Output path for the graph JSON.
    #[arg(long, short = 'o')]
    out: PathBuf,

    /// Pretty-print the graph JSON.
    #[arg(long, short = 'p')]
    pretty: bool,

    /// Estimated body length (lines) of a method or function with no known extent.
    #[arg(long)]
    callable_fallback_lines: Option<u32>,

    /// Estimated body length (lines) of a type with no known extent.
    #[arg(long)]
    type_fallback_lines: Option<u32>,
}

impl MapArgs {
    fn into_options(self) -> Result<MapOptions, KlocError> {
        let input = match (self.scip, self.archive) {
            (Some(path), None) => InputSource::Scip(path),
            (None, Some(path)) => InputSource::Archive(path),
            _ => {
                return Err(KlocError::invalid_args(
                    "exactly one of --scip or --archive is required",
                ))
            }
        };

        let mut options = MapOptions::new(input, self.out);
        options.calls = self.calls;
        options.link_calls = !self.no_calls;
        options.pretty = self.pretty;
        options.callable_fallback_lines = self.callable_fallback_lines;
        options.type_fallback_lines = self.type_fallback_lines;
        Ok(options)
    }
}

// ============================================================================
// Main
// ============================================================================

fn main() -> ExitCode {
    let cli = Cli::parse();

    init_tracing(cli.global.log_level, cli.global.log_format);

    match execute(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let code = OutputErrorCode::from(&err);
            let response = ErrorResponse::from_error(&err);
            let _ = emit_response(&response, &mut io::stdout());
            let _ = io::stdout().flush();
            ExitCode::from(code.code())
        }
    }
}

/// Initialize tracing to stderr. `RUST_LOG` takes precedence over `--log-level`.
fn init_tracing(level: LogLevel, format: LogFormat) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_tracing_level().to_string()));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr);

    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

/// Execute the CLI command.
fn execute(cli: Cli) -> Result<(), KlocError> {
    match cli.command {
        Command::Map(args) => execute_map(args),
    }
}

fn execute_map(args: MapArgs) -> Result<(), KlocError> {
    let options = args.into_options()?;
    let response = run_map(&options)?;
    let mut stdout = io::stdout();
    emit_response_compact(&response, &mut stdout)?;
    stdout.flush()?;
    Ok(())
}
