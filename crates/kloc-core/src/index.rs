//! In-memory model of a decoded source index.
//!
//! This mirrors the parts of a SCIP index the mapper consumes. Raw ranges
//! are kept as they arrive so the engine can tell malformed ranges apart
//! from valid ones.

use std::fmt;

// ============================================================================
// Symbol Roles
// ============================================================================

/// Role bitmask of an occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SymbolRoles(pub u32);

impl SymbolRoles {
    pub const REFERENCE: SymbolRoles = SymbolRoles(0);
    pub const DEFINITION: SymbolRoles = SymbolRoles(0x1);
    pub const IMPORT: SymbolRoles = SymbolRoles(0x2);
    pub const WRITE_ACCESS: SymbolRoles = SymbolRoles(0x4);
    pub const READ_ACCESS: SymbolRoles = SymbolRoles(0x8);
    pub const GENERATED: SymbolRoles = SymbolRoles(0x10);
    pub const TEST: SymbolRoles = SymbolRoles(0x20);
    pub const FORWARD_DEFINITION: SymbolRoles = SymbolRoles(0x40);

    pub fn from_bits(bits: i32) -> Self {
        SymbolRoles(bits as u32)
    }

    pub fn bits(&self) -> u32 {
        self.0
    }

    pub fn contains(&self, other: SymbolRoles) -> bool {
        other.0 != 0 && self.0 & other.0 == other.0
    }

    pub fn is_definition(&self) -> bool {
        self.contains(SymbolRoles::DEFINITION)
    }

    pub fn is_forward_definition(&self) -> bool {
        self.contains(SymbolRoles::FORWARD_DEFINITION)
    }

    /// Whether the occurrence introduces the symbol rather than referring to it.
    pub fn is_declaration(&self) -> bool {
        self.is_definition() || self.is_forward_definition()
    }

    /// Names of the set roles; a plain reference reports `["Reference"]`.
    pub fn names(&self) -> Vec<&'static str> {
        const NAMED: [(SymbolRoles, &str); 7] = [
            (SymbolRoles::DEFINITION, "Definition"),
            (SymbolRoles::IMPORT, "Import"),
            (SymbolRoles::WRITE_ACCESS, "WriteAccess"),
            (SymbolRoles::READ_ACCESS, "ReadAccess"),
            (SymbolRoles::GENERATED, "Generated"),
            (SymbolRoles::TEST, "Test"),
            (SymbolRoles::FORWARD_DEFINITION, "ForwardDefinition"),
        ];
        let names: Vec<_> = NAMED
            .iter()
            .filter(|(role, _)| self.contains(*role))
            .map(|(_, name)| *name)
            .collect();
        if names.is_empty() {
            vec!["Reference"]
        } else {
            names
        }
    }
}

impl std::ops::BitOr for SymbolRoles {
    type Output = SymbolRoles;

    fn bitor(self, rhs: SymbolRoles) -> SymbolRoles {
        SymbolRoles(self.0 | rhs.0)
    }
}

impl fmt::Display for SymbolRoles {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.names().join("|"))
    }
}

// ============================================================================
// Symbol Information
// ============================================================================

/// Kind suggested by the indexer for a symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolHint {
    Class,
    Interface,
    Trait,
    Enum,
    EnumMember,
    Method,
    Function,
    Property,
    Constant,
    Parameter,
}

/// A typed relationship from one symbol to another.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Relationship {
    pub symbol: String,
    pub is_reference: bool,
    pub is_implementation: bool,
    pub is_type_definition: bool,
    pub is_definition: bool,
}

impl Relationship {
    pub fn new(symbol: impl Into<String>) -> Self {
        Relationship {
            symbol: symbol.into(),
            ..Default::default()
        }
    }

    pub fn reference(mut self) -> Self {
        self.is_reference = true;
        self
    }

    pub fn implementation(mut self) -> Self {
        self.is_implementation = true;
        self
    }

    pub fn type_definition(mut self) -> Self {
        self.is_type_definition = true;
        self
    }
}

/// Per-symbol information from a document's symbol table.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SymbolInformation {
    pub symbol: String,
    pub documentation: Vec<String>,
    pub relationships: Vec<Relationship>,
    pub hint: Option<SymbolHint>,
    /// Rendered signature, when the indexer provides one.
    pub signature: Option<String>,
}

impl SymbolInformation {
    pub fn new(symbol: impl Into<String>) -> Self {
        SymbolInformation {
            symbol: symbol.into(),
            ..Default::default()
        }
    }

    pub fn with_documentation(mut self, doc: impl Into<String>) -> Self {
        self.documentation.push(doc.into());
        self
    }

    pub fn with_relationship(mut self, relationship: Relationship) -> Self {
        self.relationships.push(relationship);
        self
    }

    pub fn with_hint(mut self, hint: SymbolHint) -> Self {
        self.hint = Some(hint);
        self
    }

    pub fn with_signature(mut self, signature: impl Into<String>) -> Self {
        self.signature = Some(signature.into());
        self
    }
}

// ============================================================================
// Documents
// ============================================================================

/// One occurrence of a symbol in a document.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Occurrence {
    pub symbol: String,
    /// Identifier range, 3 or 4 elements.
    pub range: Vec<i32>,
    /// Full syntactic extent, when the indexer provides one.
    pub enclosing_range: Vec<i32>,
    pub roles: SymbolRoles,
}

impl Occurrence {
    pub fn new(symbol: impl Into<String>, range: Vec<i32>, roles: SymbolRoles) -> Self {
        Occurrence {
            symbol: symbol.into(),
            range,
            enclosing_range: Vec::new(),
            roles,
        }
    }

    /// A definition occurrence.
    pub fn definition(symbol: impl Into<String>, range: Vec<i32>) -> Self {
        Occurrence::new(symbol, range, SymbolRoles::DEFINITION)
    }

    /// A plain reference occurrence.
    pub fn reference(symbol: impl Into<String>, range: Vec<i32>) -> Self {
        Occurrence::new(symbol, range, SymbolRoles::REFERENCE)
    }

    pub fn with_enclosing_range(mut self, range: Vec<i32>) -> Self {
        self.enclosing_range = range;
        self
    }
}

/// A source file in the index.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Document {
    pub relative_path: String,
    pub occurrences: Vec<Occurrence>,
    pub symbols: Vec<SymbolInformation>,
}

impl Document {
    pub fn new(relative_path: impl Into<String>) -> Self {
        Document {
            relative_path: relative_path.into(),
            ..Default::default()
        }
    }

    pub fn with_occurrence(mut self, occurrence: Occurrence) -> Self {
        self.occurrences.push(occurrence);
        self
    }

    pub fn with_symbol(mut self, symbol: SymbolInformation) -> Self {
        self.symbols.push(symbol);
        self
    }
}

/// A decoded index.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Index {
    pub project_root: String,
    pub documents: Vec<Document>,
}

impl Index {
    pub fn new(project_root: impl Into<String>) -> Self {
        Index {
            project_root: project_root.into(),
            documents: Vec::new(),
        }
    }

    pub fn with_document(mut self, document: Document) -> Self {
        self.documents.push(document);
        self
    }

    pub fn occurrence_count(&self) -> usize {
        self.documents.iter().map(|d| d.occurrences.len()).sum()
    }
}
