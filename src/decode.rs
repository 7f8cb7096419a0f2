//! SCIP protobuf decoding.
//!
//! Parses index bytes with the `scip` crate and converts the generated
//! protobuf types into the engine's [`Index`] model. Only the fields the
//! mapper reads are carried over.

use std::fs;
use std::io;
use std::path::Path;

use protobuf::Message;
use scip::types::{self, symbol_information::Kind};
use thiserror::Error;
use tracing::debug;

use kloc_core::index::{
    Document, Index, Occurrence, Relationship, SymbolHint, SymbolInformation, SymbolRoles,
};

/// Errors raised while reading a SCIP index.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("SCIP index not found: {path}")]
    NotFound { path: String },

    #[error("cannot read SCIP index {path}: {message}")]
    Io { path: String, message: String },

    #[error("cannot decode SCIP index {path}: {message}")]
    Protobuf { path: String, message: String },
}

/// Read and decode a SCIP index file.
pub fn read_index(path: &Path) -> Result<Index, DecodeError> {
    let display = path.display().to_string();
    let bytes = fs::read(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => DecodeError::NotFound {
            path: display.clone(),
        },
        _ => DecodeError::Io {
            path: display.clone(),
            message: e.to_string(),
        },
    })?;
    decode_index(&bytes, &display)
}

/// Decode SCIP protobuf bytes. `label` names the source in errors.
pub fn decode_index(bytes: &[u8], label: &str) -> Result<Index, DecodeError> {
    let raw = types::Index::parse_from_bytes(bytes).map_err(|e| DecodeError::Protobuf {
        path: label.to_string(),
        message: e.to_string(),
    })?;
    let index = convert_index(&raw);
    debug!(
        source = label,
        documents = index.documents.len(),
        occurrences = index.occurrence_count(),
        "decoded SCIP index"
    );
    Ok(index)
}

/// Convert a parsed SCIP index into the engine model.
pub fn convert_index(raw: &types::Index) -> Index {
    let project_root = raw
        .metadata
        .as_ref()
        .map(|m| m.project_root.clone())
        .unwrap_or_default();

    Index {
        project_root,
        documents: raw.documents.iter().map(convert_document).collect(),
    }
}

fn convert_document(doc: &types::Document) -> Document {
    Document {
        relative_path: doc.relative_path.clone(),
        occurrences: doc
            .occurrences
            .iter()
            .map(|occ| Occurrence {
                symbol: occ.symbol.clone(),
                range: occ.range.clone(),
                enclosing_range: occ.enclosing_range.clone(),
                roles: SymbolRoles::from_bits(occ.symbol_roles),
            })
            .collect(),
        symbols: doc.symbols.iter().map(convert_symbol).collect(),
    }
}

fn convert_symbol(info: &types::SymbolInformation) -> SymbolInformation {
    let signature = info
        .signature_documentation
        .as_ref()
        .map(|doc| doc.text.clone())
        .filter(|text| !text.is_empty());

    SymbolInformation {
        symbol: info.symbol.clone(),
        documentation: info.documentation.clone(),
        relationships: info
            .relationships
            .iter()
            .map(|rel| Relationship {
                symbol: rel.symbol.clone(),
                is_reference: rel.is_reference,
                is_implementation: rel.is_implementation,
                is_type_definition: rel.is_type_definition,
                is_definition: rel.is_definition,
            })
            .collect(),
        hint: info.kind.enum_value().ok().and_then(hint_for_kind),
        signature,
    }
}

/// Kind hint for the SCIP symbol kinds the graph distinguishes.
fn hint_for_kind(kind: Kind) -> Option<SymbolHint> {
    let hint = match kind {
        Kind::Class => SymbolHint::Class,
        Kind::Interface => SymbolHint::Interface,
        Kind::Trait => SymbolHint::Trait,
        Kind::Enum => SymbolHint::Enum,
        Kind::EnumMember => SymbolHint::EnumMember,
        Kind::Method | Kind::StaticMethod | Kind::Constructor => SymbolHint::Method,
        Kind::Function => SymbolHint::Function,
        Kind::Property | Kind::Field | Kind::StaticProperty => SymbolHint::Property,
        Kind::Constant => SymbolHint::Constant,
        Kind::Parameter => SymbolHint::Parameter,
        _ => return None,
    };
    Some(hint)
}
