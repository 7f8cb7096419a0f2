//! JSON response types for CLI output.
//!
//! Every CLI invocation writes exactly one JSON object to stdout: a
//! [`MapResponse`] on success or an [`ErrorResponse`] on failure. The graph
//! itself goes to the `--out` file, never to stdout.

use std::io::{self, Write};

use serde::{Deserialize, Serialize};

use kloc_scip::Diagnostics;

use crate::error::{KlocError, OutputErrorCode};

/// Schema version of the stdout responses.
pub const SCHEMA_VERSION: &str = "1";

// ============================================================================
// Success Response
// ============================================================================

/// Response for the map command.
#[derive(Debug, Clone, Serialize)]
pub struct MapResponse {
    /// Status: "ok".
    pub status: String,
    /// Schema version for compatibility.
    pub schema_version: String,
    /// Where the graph was written.
    pub out: String,
    pub nodes: usize,
    pub edges: usize,
    /// Whether call records were linked into the graph.
    pub calls_linked: bool,
    /// Input that was skipped or approximated.
    pub diagnostics: Diagnostics,
}

impl MapResponse {
    pub fn new(
        out: impl Into<String>,
        nodes: usize,
        edges: usize,
        calls_linked: bool,
        diagnostics: Diagnostics,
    ) -> Self {
        MapResponse {
            status: "ok".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            out: out.into(),
            nodes,
            edges,
            calls_linked,
            diagnostics,
        }
    }
}

// ============================================================================
// Error Response
// ============================================================================

/// Error details for JSON output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Numeric error code (also the exit code).
    pub code: u8,
    /// Human-readable message.
    pub message: String,
    /// Error-specific structured data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorInfo {
    /// Create from a KlocError.
    pub fn from_error(err: &KlocError) -> Self {
        let code = OutputErrorCode::from(err).code();
        let message = err.to_string();

        let details = match err {
            KlocError::InvalidArguments { details, .. } => details.clone(),
            KlocError::FileNotFound { path } | KlocError::InvalidInput { path, .. } => {
                Some(serde_json::json!({ "path": path }))
            }
            KlocError::Map(_) | KlocError::InternalError { .. } => None,
        };

        ErrorInfo {
            code,
            message,
            details,
        }
    }
}

/// Error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Status: "error".
    pub status: String,
    /// Schema version for compatibility.
    pub schema_version: String,
    /// Error information.
    pub error: ErrorInfo,
}

impl ErrorResponse {
    /// Create an error response from a KlocError.
    pub fn from_error(err: &KlocError) -> Self {
        ErrorResponse {
            status: "error".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            error: ErrorInfo::from_error(err),
        }
    }
}

// ============================================================================
// Emitters
// ============================================================================

/// Emit a response as pretty-printed JSON to a writer.
pub fn emit_response<T: Serialize>(response: &T, writer: &mut impl Write) -> io::Result<()> {
    let json = serde_json::to_string_pretty(response)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    writeln!(writer, "{}", json)
}

/// Emit a response as compact JSON (single line) to a writer.
pub fn emit_response_compact<T: Serialize>(
    response: &T,
    writer: &mut impl Write,
) -> io::Result<()> {
    let json = serde_json::to_string(response)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    writeln!(writer, "{}", json)
}
