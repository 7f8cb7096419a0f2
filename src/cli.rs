//! CLI front door for the map command.
//!
//! `run_map` loads the inputs, resolves the engine configuration, runs the
//! mapper and writes the graph. It is independent of argument parsing so it
//! can be driven directly from tests.
//!
//! ## Configuration Precedence
//!
//! Range fallback lengths resolve as built-in default < environment variable
//! < CLI flag. An environment value that is not a non-negative integer is an
//! invalid-arguments error rather than silently ignored.
//!
//! ## Error Handling
//!
//! All functions return `Result<T, KlocError>`, so every failure carries a
//! stable exit code.

use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use kloc_core::calls::CallsData;
use kloc_core::config::{
    ConfigSource, ConfigValue, MapperConfig, DEFAULT_CALLABLE_FALLBACK_LINES,
    DEFAULT_TYPE_FALLBACK_LINES,
};
use kloc_core::index::Index;
use kloc_scip::Mapper;

use crate::archive::KlocArchive;
use crate::decode::{decode_index, read_index};
use crate::error::KlocError;
use crate::output::MapResponse;

/// Environment variable overriding the callable fallback length.
pub const ENV_CALLABLE_FALLBACK_LINES: &str = "KLOC_CALLABLE_FALLBACK_LINES";

/// Environment variable overriding the type fallback length.
pub const ENV_TYPE_FALLBACK_LINES: &str = "KLOC_TYPE_FALLBACK_LINES";

// ============================================================================
// Options
// ============================================================================

/// Where the index comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSource {
    /// A bare SCIP protobuf file.
    Scip(PathBuf),
    /// A `.kloc` archive with `index.scip` and optional `calls.json`.
    Archive(PathBuf),
}

impl InputSource {
    pub fn path(&self) -> &Path {
        match self {
            InputSource::Scip(path) | InputSource::Archive(path) => path,
        }
    }
}

/// Options for one map run.
#[derive(Debug, Clone)]
pub struct MapOptions {
    pub input: InputSource,
    /// Call records file; takes precedence over an archive's `calls.json`.
    pub calls: Option<PathBuf>,
    /// Link call records when any are available.
    pub link_calls: bool,
    pub out: PathBuf,
    pub pretty: bool,
    pub callable_fallback_lines: Option<u32>,
    pub type_fallback_lines: Option<u32>,
    /// Fixed `generated_at` stamp for reproducible output.
    pub generated_at: Option<String>,
}

impl MapOptions {
    pub fn new(input: InputSource, out: impl Into<PathBuf>) -> Self {
        MapOptions {
            input,
            calls: None,
            link_calls: true,
            out: out.into(),
            pretty: false,
            callable_fallback_lines: None,
            type_fallback_lines: None,
            generated_at: None,
        }
    }
}

// ============================================================================
// Configuration Resolution
// ============================================================================

/// Resolve one fallback length from default, environment and flag.
fn resolve_lines(
    default: u32,
    env_name: &str,
    env_value: Option<String>,
    flag: Option<u32>,
) -> Result<ConfigValue<u32>, KlocError> {
    let from_env = match env_value {
        Some(raw) => {
            let value = raw.trim().parse::<u32>().map_err(|_| {
                KlocError::invalid_args(format!(
                    "{} must be a non-negative integer, got '{}'",
                    env_name, raw
                ))
            })?;
            Some(ConfigValue::new(value, ConfigSource::EnvVar))
        }
        None => None,
    };

    Ok(ConfigValue::new(default, ConfigSource::Default)
        .merge_opt(from_env)
        .merge_opt(flag.map(|value| ConfigValue::new(value, ConfigSource::CliFlag))))
}

/// Build the engine configuration for a run.
///
/// `lookup_env` is consulted for the fallback overrides; `run_map` passes the
/// process environment.
pub fn resolve_config(
    options: &MapOptions,
    lookup_env: impl Fn(&str) -> Option<String>,
) -> Result<MapperConfig, KlocError> {
    let callable = resolve_lines(
        DEFAULT_CALLABLE_FALLBACK_LINES,
        ENV_CALLABLE_FALLBACK_LINES,
        lookup_env(ENV_CALLABLE_FALLBACK_LINES),
        options.callable_fallback_lines,
    )?;
    let types = resolve_lines(
        DEFAULT_TYPE_FALLBACK_LINES,
        ENV_TYPE_FALLBACK_LINES,
        lookup_env(ENV_TYPE_FALLBACK_LINES),
        options.type_fallback_lines,
    )?;
    debug!(
        callable_fallback_lines = callable.value,
        callable_source = ?callable.source,
        type_fallback_lines = types.value,
        type_source = ?types.source,
        "resolved configuration"
    );

    let mut config = MapperConfig::default()
        .with_callable_fallback_lines(callable.value)
        .with_type_fallback_lines(types.value)
        .with_link_calls(options.link_calls)
        .with_source_name(options.input.path().display().to_string());
    if let Some(stamp) = &options.generated_at {
        config = config.with_generated_at(stamp.clone());
    }
    Ok(config)
}

// ============================================================================
// Input Loading
// ============================================================================

/// Read a standalone `calls.json`.
fn read_calls(path: &Path) -> Result<CallsData, KlocError> {
    let display = path.display().to_string();
    let bytes = fs::read(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => KlocError::file_not_found(display.clone()),
        _ => KlocError::invalid_input(display.clone(), e.to_string()),
    })?;
    CallsData::from_slice(&bytes).map_err(|e| KlocError::invalid_input(display, e.to_string()))
}

/// Load the index and whatever call records the inputs carry.
fn load_inputs(options: &MapOptions) -> Result<(Index, Option<CallsData>), KlocError> {
    let (index, archive) = match &options.input {
        InputSource::Scip(path) => (read_index(path)?, None),
        InputSource::Archive(path) => {
            let archive = KlocArchive::load(path)?;
            let label = format!("{}!index.scip", path.display());
            (decode_index(&archive.index_bytes, &label)?, Some(archive))
        }
    };

    // Calls are never read, let alone parsed, when linking is off.
    if !options.link_calls {
        return Ok((index, None));
    }
    let calls = match (&options.calls, &archive) {
        (Some(path), _) => Some(read_calls(path)?),
        (None, Some(archive)) => archive.calls()?,
        (None, None) => None,
    };
    Ok((index, calls))
}

// ============================================================================
// Map Command
// ============================================================================

/// Run the map command with configuration from the process environment.
pub fn run_map(options: &MapOptions) -> Result<MapResponse, KlocError> {
    run_map_with_env(options, |name| env::var(name).ok())
}

/// Run the map command with an explicit environment lookup.
pub fn run_map_with_env(
    options: &MapOptions,
    lookup_env: impl Fn(&str) -> Option<String>,
) -> Result<MapResponse, KlocError> {
    let config = resolve_config(options, lookup_env)?;
    let (index, calls) = load_inputs(options)?;

    let output = Mapper::new(config).map(&index, calls.as_ref())?;
    let json = output.graph.to_json(options.pretty)?;

    if let Some(parent) = options.out.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(&options.out, json)?;

    let out = options.out.display().to_string();
    info!(
        out = %out,
        nodes = output.graph.nodes.len(),
        edges = output.graph.edges.len(),
        "wrote graph"
    );

    Ok(MapResponse::new(
        out,
        output.graph.nodes.len(),
        output.graph.edges.len(),
        calls.is_some(),
        output.diagnostics,
    ))
}
