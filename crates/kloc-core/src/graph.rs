//! The unified property graph.
//!
//! Nodes describe code entities (files, types, members, call sites, values);
//! typed edges describe structure, inheritance, usage and calls. The graph
//! serializes to a stable JSON document:
//!
//! ```json
//! {
//!   "version": "2.0",
//!   "metadata": {"generated_at": "...", "project_root": "..."},
//!   "nodes": [...],
//!   "edges": [...]
//! }
//! ```
//!
//! Nodes are ordered by ID and edges by `(source, type, target, position)`,
//! so identical inputs produce byte-identical output.

use std::cmp::Ordering;
use std::fmt;
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::calls::{CallShape, ReceiverKind, ValueKind};
use crate::error::MapError;
use crate::ids::NodeId;

/// Graph format version.
pub const GRAPH_VERSION: &str = "2.0";

// ============================================================================
// Kinds
// ============================================================================

/// Kind of graph node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum NodeKind {
    File,
    Class,
    Interface,
    Trait,
    Enum,
    Method,
    Function,
    Property,
    #[serde(rename = "Const")]
    Constant,
    Argument,
    EnumCase,
    /// Runtime value: parameter, local, call result, literal, constant.
    Value,
    /// Call site: method call, property access, construction.
    Call,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::File => "File",
            NodeKind::Class => "Class",
            NodeKind::Interface => "Interface",
            NodeKind::Trait => "Trait",
            NodeKind::Enum => "Enum",
            NodeKind::Method => "Method",
            NodeKind::Function => "Function",
            NodeKind::Property => "Property",
            NodeKind::Constant => "Const",
            NodeKind::Argument => "Argument",
            NodeKind::EnumCase => "EnumCase",
            NodeKind::Value => "Value",
            NodeKind::Call => "Call",
        }
    }

    /// Class, Interface, Trait or Enum.
    pub fn is_type_like(&self) -> bool {
        matches!(
            self,
            NodeKind::Class | NodeKind::Interface | NodeKind::Trait | NodeKind::Enum
        )
    }

    /// Method or Function.
    pub fn is_callable(&self) -> bool {
        matches!(self, NodeKind::Method | NodeKind::Function)
    }

    /// Kinds whose bodies can enclose references.
    pub fn is_scope(&self) -> bool {
        self.is_type_like() || self.is_callable()
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Type of graph edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeType {
    // Structure (from the index)
    Contains,
    Extends,
    Implements,
    UsesTrait,
    Overrides,
    Uses,
    TypeHint,

    // Calls (from call records)
    Calls,
    Receiver,
    Argument,
    Produces,
    AssignedFrom,
    TypeOf,
}

impl EdgeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeType::Contains => "contains",
            EdgeType::Extends => "extends",
            EdgeType::Implements => "implements",
            EdgeType::UsesTrait => "uses_trait",
            EdgeType::Overrides => "overrides",
            EdgeType::Uses => "uses",
            EdgeType::TypeHint => "type_hint",
            EdgeType::Calls => "calls",
            EdgeType::Receiver => "receiver",
            EdgeType::Argument => "argument",
            EdgeType::Produces => "produces",
            EdgeType::AssignedFrom => "assigned_from",
            EdgeType::TypeOf => "type_of",
        }
    }
}

impl fmt::Display for EdgeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Positions
// ============================================================================

/// A source range. Lines and columns are 0-based.
///
/// A range whose end line is not after its start line is "collapsed": it
/// marks an identifier position whose body extent is unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct Range {
    pub start_line: u32,
    pub start_col: u32,
    pub end_line: u32,
    pub end_col: u32,
}

impl Range {
    pub fn new(start_line: u32, start_col: u32, end_line: u32, end_col: u32) -> Self {
        Range {
            start_line,
            start_col,
            end_line,
            end_col,
        }
    }

    /// A single position.
    pub fn point(line: u32, col: u32) -> Self {
        Range::new(line, col, line, col)
    }

    /// Decode an index range.
    ///
    /// Three elements are `[line, start_col, end_col]` on a single line; four
    /// are `[start_line, start_col, end_line, end_col]`. Any other length or a
    /// negative element is malformed.
    pub fn from_scip(raw: &[i32]) -> Option<Range> {
        let get = |i: usize| raw.get(i).and_then(|v| u32::try_from(*v).ok());
        match raw.len() {
            3 => Some(Range::new(get(0)?, get(1)?, get(0)?, get(2)?)),
            4 => Some(Range::new(get(0)?, get(1)?, get(2)?, get(3)?)),
            _ => None,
        }
    }

    /// Whether the body extent is unknown.
    pub fn is_collapsed(&self) -> bool {
        self.end_line <= self.start_line
    }

    pub fn contains_line(&self, line: u32) -> bool {
        self.start_line <= line && line <= self.end_line
    }

    pub fn line_span(&self) -> u32 {
        self.end_line.saturating_sub(self.start_line)
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}-{}:{}",
            self.start_line, self.start_col, self.end_line, self.end_col
        )
    }
}

/// A source location: file, line, column (0-based).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Location {
    pub file: String,
    pub line: u32,
    #[serde(default)]
    pub col: u32,
}

impl Location {
    pub fn new(file: impl Into<String>, line: u32, col: u32) -> Self {
        Location {
            file: file.into(),
            line,
            col,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.col)
    }
}

// ============================================================================
// Nodes and Edges
// ============================================================================

fn is_false(value: &bool) -> bool {
    !*value
}

/// A node in the graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub kind: NodeKind,
    pub name: String,
    pub fqn: String,
    /// Index symbol, `file:<path>` for files, empty for call sites.
    pub symbol: String,
    pub file: Option<String>,
    /// Body extent (possibly estimated).
    pub range: Option<Range>,
    /// Identifier position of the definition.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_range: Option<Range>,
    /// Set when `range` was produced by range estimation.
    #[serde(default, skip_serializing_if = "is_false")]
    pub range_estimated: bool,
    #[serde(default)]
    pub documentation: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_kind: Option<ValueKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_symbol: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub call_kind: Option<CallShape>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receiver_kind: Option<ReceiverKind>,
}

impl Node {
    pub fn new(
        id: NodeId,
        kind: NodeKind,
        name: impl Into<String>,
        fqn: impl Into<String>,
        symbol: impl Into<String>,
    ) -> Self {
        Node {
            id,
            kind,
            name: name.into(),
            fqn: fqn.into(),
            symbol: symbol.into(),
            file: None,
            range: None,
            name_range: None,
            range_estimated: false,
            documentation: Vec::new(),
            value_kind: None,
            type_symbol: None,
            call_kind: None,
            receiver_kind: None,
        }
    }

    /// A file node for `path`.
    pub fn file(path: &str) -> Self {
        let name = path.rsplit('/').next().unwrap_or(path);
        Node::new(
            NodeId::for_file(path),
            NodeKind::File,
            name,
            path,
            format!("file:{}", path),
        )
        .with_file(path)
    }

    pub fn with_file(mut self, file: impl Into<String>) -> Self {
        self.file = Some(file.into());
        self
    }

    pub fn with_range(mut self, range: Range) -> Self {
        self.range = Some(range);
        self
    }

    pub fn with_name_range(mut self, range: Range) -> Self {
        self.name_range = Some(range);
        self
    }

    pub fn with_documentation(mut self, documentation: Vec<String>) -> Self {
        self.documentation = documentation;
        self
    }
}

/// An edge in the graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edge {
    #[serde(rename = "type")]
    pub edge_type: EdgeType,
    pub source: NodeId,
    pub target: NodeId,
    /// Where the relationship originates, for occurrence-backed edges.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    /// 0-based argument index on `argument` edges.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<u32>,
}

impl Edge {
    pub fn new(edge_type: EdgeType, source: NodeId, target: NodeId) -> Self {
        Edge {
            edge_type,
            source,
            target,
            location: None,
            position: None,
        }
    }

    pub fn with_location(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    pub fn with_position(mut self, position: u32) -> Self {
        self.position = Some(position);
        self
    }

    /// Identity of the edge for deduplication.
    pub fn key(&self) -> EdgeKey {
        EdgeKey {
            edge_type: self.edge_type,
            source: self.source.clone(),
            target: self.target.clone(),
            position: self.position,
        }
    }

    /// Output ordering: source, type name, target, position.
    pub fn sort_cmp(&self, other: &Self) -> Ordering {
        self.source
            .cmp(&other.source)
            .then_with(|| self.edge_type.as_str().cmp(other.edge_type.as_str()))
            .then_with(|| self.target.cmp(&other.target))
            .then_with(|| self.position.cmp(&other.position))
    }
}

/// Deduplication identity of an edge. Location is not part of it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeKey {
    pub edge_type: EdgeType,
    pub source: NodeId,
    pub target: NodeId,
    pub position: Option<u32>,
}

// ============================================================================
// Graph
// ============================================================================

/// Provenance of a graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct GraphMetadata {
    pub generated_at: String,
    #[serde(default)]
    pub project_root: String,
    /// File name of the index the graph was built from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_scip: Option<String>,
}

/// Complete mapping output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Graph {
    pub version: String,
    pub metadata: GraphMetadata,
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

impl Graph {
    /// Build a graph in canonical order.
    pub fn new(metadata: GraphMetadata, nodes: Vec<Node>, edges: Vec<Edge>) -> Self {
        let mut graph = Graph {
            version: GRAPH_VERSION.to_string(),
            metadata,
            nodes,
            edges,
        };
        graph.sort();
        graph
    }

    /// Put nodes and edges in canonical order.
    pub fn sort(&mut self) {
        self.nodes.sort_by(|a, b| a.id.cmp(&b.id));
        self.edges.sort_by(Edge::sort_cmp);
    }

    /// Look up a node by ID. Requires canonical order.
    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.nodes
            .binary_search_by(|n| n.id.cmp(id))
            .ok()
            .map(|i| &self.nodes[i])
    }

    /// Look up a node by its index symbol.
    pub fn node_by_symbol(&self, symbol: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.symbol == symbol)
    }

    pub fn nodes_of_kind(&self, kind: NodeKind) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter(move |n| n.kind == kind)
    }

    pub fn edges_of_type(&self, edge_type: EdgeType) -> impl Iterator<Item = &Edge> {
        self.edges.iter().filter(move |e| e.edge_type == edge_type)
    }

    /// Serialize to JSON.
    pub fn to_json(&self, pretty: bool) -> Result<String, MapError> {
        let result = if pretty {
            serde_json::to_string_pretty(self)
        } else {
            serde_json::to_string(self)
        };
        result.map_err(|e| MapError::Serialization {
            message: e.to_string(),
        })
    }

    /// Parse a graph previously written by [`Graph::to_json`].
    pub fn from_json(json: &str) -> Result<Self, MapError> {
        let mut graph: Graph =
            serde_json::from_str(json).map_err(|e| MapError::Serialization {
                message: e.to_string(),
            })?;
        graph.sort();
        Ok(graph)
    }
}

/// Format a SystemTime as ISO 8601 string.
pub fn format_timestamp(time: SystemTime) -> String {
    let datetime: DateTime<Utc> = time.into();
    datetime.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}
