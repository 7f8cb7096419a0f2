//! Symbol metadata collection.
//!
//! One pass over every document's symbol table gathers documentation,
//! relationships, signatures and kind hints per symbol. Indexers may emit
//! the same symbol more than once (for example partial classes, or a symbol
//! repeated in several documents); entries merge instead of overwriting.

use std::collections::BTreeMap;

use kloc_core::graph::NodeKind;
use kloc_core::index::{Index, Relationship, SymbolHint, SymbolInformation};

use crate::docs::{hint_from_signature, infer_type_kind};
use crate::symbol::KindHints;

/// Everything known about a symbol apart from its occurrences.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SymbolMetadata {
    pub documentation: Vec<String>,
    pub relationships: Vec<Relationship>,
    pub signature: Option<String>,
    pub hint: Option<SymbolHint>,
    /// First document the symbol appeared in.
    pub file: Option<String>,
}

impl SymbolMetadata {
    /// Fold another emission of the same symbol into this entry.
    ///
    /// Documentation concatenates (an exact duplicate string is kept once),
    /// relationships union, and the first signature, hint and file win.
    fn merge(&mut self, info: &SymbolInformation, file: &str) {
        for doc in &info.documentation {
            if !self.documentation.contains(doc) {
                self.documentation.push(doc.clone());
            }
        }
        for rel in &info.relationships {
            if !self.relationships.contains(rel) {
                self.relationships.push(rel.clone());
            }
        }
        if self.signature.is_none() {
            self.signature = info.signature.clone().filter(|s| !s.is_empty());
        }
        if self.hint.is_none() {
            self.hint = info
                .hint
                .or_else(|| info.signature.as_deref().and_then(hint_from_signature));
        }
        if self.file.is_none() {
            self.file = Some(file.to_string());
        }
    }

    /// Relationships that describe inheritance (not type annotations).
    pub fn inheritance(&self) -> impl Iterator<Item = &Relationship> {
        self.relationships
            .iter()
            .filter(|r| !r.is_type_definition && (r.is_implementation || r.is_reference))
    }

    /// Relationships that describe a type annotation.
    pub fn type_definitions(&self) -> impl Iterator<Item = &Relationship> {
        self.relationships.iter().filter(|r| r.is_type_definition)
    }
}

/// Symbol to metadata, in symbol order.
#[derive(Debug, Clone, Default)]
pub struct MetadataTable {
    entries: BTreeMap<String, SymbolMetadata>,
}

impl MetadataTable {
    /// Walk every document's symbol table once.
    pub fn collect(index: &Index) -> Self {
        let mut table = MetadataTable::default();
        for doc in &index.documents {
            for info in &doc.symbols {
                table.insert(info, &doc.relative_path);
            }
        }
        table
    }

    pub fn insert(&mut self, info: &SymbolInformation, file: &str) {
        if info.symbol.is_empty() {
            return;
        }
        self.entries
            .entry(info.symbol.clone())
            .or_default()
            .merge(info, file);
    }

    pub fn get(&self, symbol: &str) -> Option<&SymbolMetadata> {
        self.entries.get(symbol)
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SymbolMetadata)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn documentation(&self, symbol: &str) -> &[String] {
        self.get(symbol)
            .map(|m| m.documentation.as_slice())
            .unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KindHints for MetadataTable {
    fn hint(&self, symbol: &str) -> Option<SymbolHint> {
        self.get(symbol).and_then(|m| m.hint)
    }

    fn documented_kind(&self, symbol: &str) -> Option<NodeKind> {
        infer_type_kind(self.documentation(symbol))
    }
}
