//! Error types and error code constants for kloc-mapper.
//!
//! `KlocError` is the single error type the CLI renders. Each subsystem keeps
//! its own error enum (`MapError` in the engine, `ArchiveError` and
//! `DecodeError` for input loading) and is bridged in with `From`.
//!
//! ## Error Code Mapping
//!
//! - `2`: Invalid arguments (bad input from caller)
//! - `3`: Input not found
//! - `4`: Input unreadable (invalid archive, undecodable index, bad calls JSON)
//! - `10`: Internal errors (bugs, unexpected state)

use std::fmt;
use std::io;

use thiserror::Error;

use kloc_core::error::MapError;

use crate::archive::ArchiveError;
use crate::decode::DecodeError;

// ============================================================================
// Output Error Codes
// ============================================================================

/// Error codes for JSON output.
///
/// These codes map to CLI exit codes and appear in JSON error responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OutputErrorCode {
    /// Invalid arguments from caller.
    InvalidArguments = 2,
    /// An input file does not exist.
    NotFound = 3,
    /// An input exists but cannot be read or decoded.
    InvalidInput = 4,
    /// Internal errors (bugs, unexpected state, output write failures).
    InternalError = 10,
}

impl OutputErrorCode {
    /// Get the numeric code value.
    pub fn code(&self) -> u8 {
        *self as u8
    }
}

impl fmt::Display for OutputErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

// ============================================================================
// Unified Error Type
// ============================================================================

/// Unified error type for CLI output.
#[derive(Debug, Error)]
pub enum KlocError {
    /// Invalid arguments from caller.
    #[error("invalid arguments: {message}")]
    InvalidArguments {
        message: String,
        details: Option<serde_json::Value>,
    },

    /// Input file not found.
    #[error("file not found: {path}")]
    FileNotFound { path: String },

    /// Input could not be read or decoded.
    #[error("invalid input {path}: {message}")]
    InvalidInput { path: String, message: String },

    /// Fatal engine error.
    #[error("{0}")]
    Map(MapError),

    /// Internal error (bug, unexpected state, output write failure).
    #[error("internal error: {message}")]
    InternalError { message: String },
}

impl KlocError {
    /// Create an invalid arguments error.
    pub fn invalid_args(message: impl Into<String>) -> Self {
        KlocError::InvalidArguments {
            message: message.into(),
            details: None,
        }
    }

    /// Create a file not found error.
    pub fn file_not_found(path: impl Into<String>) -> Self {
        KlocError::FileNotFound { path: path.into() }
    }

    /// Create an invalid input error.
    pub fn invalid_input(path: impl Into<String>, message: impl Into<String>) -> Self {
        KlocError::InvalidInput {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        KlocError::InternalError {
            message: message.into(),
        }
    }

    /// Get the output error code for this error.
    pub fn error_code(&self) -> OutputErrorCode {
        OutputErrorCode::from(self)
    }
}

// ============================================================================
// Error Code Mapping
// ============================================================================

impl From<&KlocError> for OutputErrorCode {
    fn from(err: &KlocError) -> Self {
        match err {
            KlocError::InvalidArguments { .. } => OutputErrorCode::InvalidArguments,
            KlocError::FileNotFound { .. } => OutputErrorCode::NotFound,
            KlocError::InvalidInput { .. } => OutputErrorCode::InvalidInput,
            KlocError::Map(MapError::EmptyIndex) => OutputErrorCode::InvalidInput,
            KlocError::Map(MapError::InvalidCalls { .. }) => OutputErrorCode::InvalidInput,
            KlocError::Map(MapError::Serialization { .. }) => OutputErrorCode::InternalError,
            KlocError::InternalError { .. } => OutputErrorCode::InternalError,
        }
    }
}

impl From<KlocError> for OutputErrorCode {
    fn from(err: KlocError) -> Self {
        OutputErrorCode::from(&err)
    }
}

// ============================================================================
// Bridges
// ============================================================================

impl From<MapError> for KlocError {
    fn from(err: MapError) -> Self {
        KlocError::Map(err)
    }
}

impl From<ArchiveError> for KlocError {
    fn from(err: ArchiveError) -> Self {
        match err {
            ArchiveError::NotFound { path } => KlocError::FileNotFound { path },
            ArchiveError::Io { path, message } => KlocError::InvalidInput { path, message },
            other => KlocError::InvalidInput {
                path: other.path().to_string(),
                message: other.to_string(),
            },
        }
    }
}

impl From<DecodeError> for KlocError {
    fn from(err: DecodeError) -> Self {
        match err {
            DecodeError::NotFound { path } => KlocError::FileNotFound { path },
            DecodeError::Io { path, message } => KlocError::InvalidInput { path, message },
            DecodeError::Protobuf { path, message } => KlocError::InvalidInput { path, message },
        }
    }
}

impl From<io::Error> for KlocError {
    fn from(err: io::Error) -> Self {
        KlocError::internal(err.to_string())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    mod output_error_code_tests {
        use super::*;

        #[test]
        fn codes_are_stable() {
            assert_eq!(OutputErrorCode::InvalidArguments.code(), 2);
            assert_eq!(OutputErrorCode::NotFound.code(), 3);
            assert_eq!(OutputErrorCode::InvalidInput.code(), 4);
            assert_eq!(OutputErrorCode::InternalError.code(), 10);
            assert_eq!(OutputErrorCode::InvalidInput.to_string(), "4");
        }

        #[test]
        fn error_variants_map_to_codes() {
            let cases = [
                (KlocError::invalid_args("bad"), 2),
                (KlocError::file_not_found("x.scip"), 3),
                (KlocError::invalid_input("x.scip", "truncated"), 4),
                (KlocError::from(MapError::EmptyIndex), 4),
                (
                    KlocError::from(MapError::Serialization {
                        message: "oops".to_string(),
                    }),
                    10,
                ),
                (KlocError::internal("bug"), 10),
            ];
            for (err, code) in cases {
                assert_eq!(err.error_code().code(), code, "{}", err);
            }
        }
    }

    mod bridge_tests {
        use super::*;

        #[test]
        fn archive_errors() {
            let err = KlocError::from(ArchiveError::NotFound {
                path: "a.kloc".to_string(),
            });
            assert!(matches!(err, KlocError::FileNotFound { ref path } if path == "a.kloc"));

            let err = KlocError::from(ArchiveError::MissingIndex {
                path: "a.kloc".to_string(),
            });
            assert_eq!(err.error_code(), OutputErrorCode::InvalidInput);
            assert!(err.to_string().contains("index.scip"));
        }

        #[test]
        fn decode_errors() {
            let err = KlocError::from(DecodeError::Protobuf {
                path: "index.scip".to_string(),
                message: "unexpected EOF".to_string(),
            });
            assert_eq!(err.error_code(), OutputErrorCode::InvalidInput);
            assert!(err.to_string().contains("unexpected EOF"));
        }

        #[test]
        fn io_errors_are_internal() {
            let err = KlocError::from(io::Error::other("disk full"));
            assert_eq!(err.error_code(), OutputErrorCode::InternalError);
        }
    }
}
