//! `.kloc` archive loading.
//!
//! A `.kloc` archive is a ZIP file holding the SCIP index (`index.scip`,
//! required) and the call records (`calls.json`, optional). Both entries are
//! read in memory; nothing is extracted to disk. `calls.json` is parsed only
//! when [`KlocArchive::calls`] is asked for it.

use std::fs;
use std::io::{self, Cursor, Read};
use std::path::Path;

use thiserror::Error;
use tracing::debug;
use zip::result::ZipError;
use zip::ZipArchive;

use kloc_core::calls::CallsData;

/// Archive entry holding the SCIP index.
pub const INDEX_ENTRY: &str = "index.scip";

/// Archive entry holding the call records.
pub const CALLS_ENTRY: &str = "calls.json";

/// Errors raised while loading an archive.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("archive not found: {path}")]
    NotFound { path: String },

    #[error("cannot read archive {path}: {message}")]
    Io { path: String, message: String },

    #[error("{path} is not a valid ZIP archive: {message}")]
    InvalidZip { path: String, message: String },

    #[error("archive {path} is missing index.scip")]
    MissingIndex { path: String },

    #[error("archive {path} has invalid calls.json: {message}")]
    InvalidCalls { path: String, message: String },
}

impl ArchiveError {
    /// Path of the archive the error refers to.
    pub fn path(&self) -> &str {
        match self {
            ArchiveError::NotFound { path }
            | ArchiveError::Io { path, .. }
            | ArchiveError::InvalidZip { path, .. }
            | ArchiveError::MissingIndex { path }
            | ArchiveError::InvalidCalls { path, .. } => path,
        }
    }
}

/// Contents of a loaded `.kloc` archive.
#[derive(Debug, Clone)]
pub struct KlocArchive {
    /// Raw SCIP protobuf bytes.
    pub index_bytes: Vec<u8>,
    /// Raw `calls.json` bytes, when the archive carries them.
    pub calls_bytes: Option<Vec<u8>>,
    label: String,
}

impl KlocArchive {
    /// Load an archive from disk.
    pub fn load(path: &Path) -> Result<Self, ArchiveError> {
        let display = path.display().to_string();
        let bytes = fs::read(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => ArchiveError::NotFound {
                path: display.clone(),
            },
            _ => ArchiveError::Io {
                path: display.clone(),
                message: e.to_string(),
            },
        })?;
        Self::from_bytes(bytes, &display)
    }

    /// Read an archive already held in memory. `label` names it in errors.
    pub fn from_bytes(bytes: Vec<u8>, label: &str) -> Result<Self, ArchiveError> {
        let mut archive =
            ZipArchive::new(Cursor::new(bytes)).map_err(|e| ArchiveError::InvalidZip {
                path: label.to_string(),
                message: e.to_string(),
            })?;

        let index_bytes =
            read_entry(&mut archive, INDEX_ENTRY, label)?.ok_or_else(|| {
                ArchiveError::MissingIndex {
                    path: label.to_string(),
                }
            })?;

        let calls_bytes = read_entry(&mut archive, CALLS_ENTRY, label)?;

        debug!(
            archive = label,
            index_bytes = index_bytes.len(),
            has_calls = calls_bytes.is_some(),
            "loaded archive"
        );
        Ok(KlocArchive {
            index_bytes,
            calls_bytes,
            label: label.to_string(),
        })
    }

    /// Check if the archive carried call records.
    pub fn has_calls(&self) -> bool {
        self.calls_bytes.is_some()
    }

    /// Parse the bundled call records.
    pub fn calls(&self) -> Result<Option<CallsData>, ArchiveError> {
        self.calls_bytes
            .as_deref()
            .map(|bytes| {
                CallsData::from_slice(bytes).map_err(|e| ArchiveError::InvalidCalls {
                    path: self.label.clone(),
                    message: e.to_string(),
                })
            })
            .transpose()
    }
}

/// Read a whole entry, or `None` when the archive has no such entry.
fn read_entry(
    archive: &mut ZipArchive<Cursor<Vec<u8>>>,
    name: &str,
    label: &str,
) -> Result<Option<Vec<u8>>, ArchiveError> {
    let mut file = match archive.by_name(name) {
        Ok(file) => file,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(e) => {
            return Err(ArchiveError::InvalidZip {
                path: label.to_string(),
                message: format!("failed to read {}: {}", name, e),
            })
        }
    };

    let mut content = Vec::new();
    file.read_to_end(&mut content)
        .map_err(|e| ArchiveError::InvalidZip {
            path: label.to_string(),
            message: format!("failed to read {}: {}", name, e),
        })?;
    Ok(Some(content))
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Write;
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    fn zip_with(entries: &[(&str, &str)]) -> Vec<u8> {
        let mut buffer = Cursor::new(Vec::new());
        {
            let mut zip = ZipWriter::new(&mut buffer);
            let options =
                SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);
            for (name, content) in entries {
                zip.start_file(*name, options).unwrap();
                zip.write_all(content.as_bytes()).unwrap();
            }
            zip.finish().unwrap();
        }
        buffer.into_inner()
    }

    #[test]
    fn reads_index_and_calls() {
        let calls = r#"{"values":[],"calls":[]}"#;
        let bytes = zip_with(&[(INDEX_ENTRY, "\n\0"), (CALLS_ENTRY, calls)]);
        let archive = KlocArchive::from_bytes(bytes, "a.kloc").unwrap();
        assert_eq!(archive.index_bytes, b"\n\0");
        assert!(archive.has_calls());
        assert!(archive.calls().unwrap().unwrap().is_empty());
    }

    #[test]
    fn calls_are_optional() {
        let bytes = zip_with(&[(INDEX_ENTRY, "")]);
        let archive = KlocArchive::from_bytes(bytes, "a.kloc").unwrap();
        assert!(!archive.has_calls());
        assert!(archive.calls().unwrap().is_none());
    }

    #[test]
    fn missing_index_is_an_error() {
        let bytes = zip_with(&[(CALLS_ENTRY, r#"{"values":[],"calls":[]}"#)]);
        let err = KlocArchive::from_bytes(bytes, "a.kloc").unwrap_err();
        assert!(matches!(err, ArchiveError::MissingIndex { .. }));
        assert_eq!(err.to_string(), "archive a.kloc is missing index.scip");
    }

    #[test]
    fn invalid_calls_json() {
        let bytes = zip_with(&[(INDEX_ENTRY, ""), (CALLS_ENTRY, "{not json")]);
        // Loading succeeds; the error surfaces only when the calls are parsed.
        let archive = KlocArchive::from_bytes(bytes, "a.kloc").unwrap();
        assert!(archive.has_calls());
        let err = archive.calls().unwrap_err();
        assert!(matches!(err, ArchiveError::InvalidCalls { .. }));
        assert_eq!(err.path(), "a.kloc");
    }

    #[test]
    fn not_a_zip() {
        let err = KlocArchive::from_bytes(b"not a zip file".to_vec(), "a.kloc").unwrap_err();
        assert!(matches!(err, ArchiveError::InvalidZip { .. }));
        assert_eq!(err.path(), "a.kloc");
    }

    #[test]
    fn missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = KlocArchive::load(&dir.path().join("absent.kloc")).unwrap_err();
        assert!(matches!(err, ArchiveError::NotFound { .. }));
    }
}
