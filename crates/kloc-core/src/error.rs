//! Engine error type.
//!
//! Only conditions that stop a run are errors. Unparseable symbols,
//! unresolved edge targets and malformed ranges are skipped and counted in
//! the run diagnostics instead.

use thiserror::Error;

/// Fatal mapping error.
#[derive(Debug, Error)]
pub enum MapError {
    /// The index has no documents to map.
    #[error("index contains no documents")]
    EmptyIndex,

    /// Call data could not be parsed.
    #[error("invalid calls data: {message}")]
    InvalidCalls { message: String },

    /// Graph JSON could not be written or read.
    #[error("graph serialization failed: {message}")]
    Serialization { message: String },
}

/// Result type for engine operations.
pub type MapResult<T> = Result<T, MapError>;
