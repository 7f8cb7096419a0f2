//! Graph builder: the mutable state shared by every mapping pass.
//!
//! The builder owns the node set, the deduplicated edge list and the lookup
//! tables passes need (symbol to node, file to node, structural containers,
//! definition sites). Passes receive it by `&mut`; nothing is global.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use serde::Serialize;

use kloc_core::graph::{Edge, EdgeKey, Graph, GraphMetadata, Location, Node, NodeKind};
use kloc_core::ids::NodeId;

use crate::symbol::ParsedSymbol;

/// Counters for input that was skipped or approximated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Diagnostics {
    /// Symbols that decode to nothing the graph models.
    pub unparseable_symbols: usize,
    /// Occurrences whose range is neither 3 nor 4 non-negative elements.
    pub malformed_ranges: usize,
    /// Relationship, call or type targets with no matching node.
    pub unresolved_targets: usize,
    /// References to symbols defined outside the index.
    pub external_references: usize,
    /// Edges dropped because an identical edge already existed.
    pub duplicate_edges: usize,
    /// Nodes whose body extent was estimated.
    pub estimated_ranges: usize,
}

/// Per-symbol bookkeeping for a synthesized node.
#[derive(Debug, Clone, PartialEq, Eq)]
struct SymbolEntry {
    id: NodeId,
    container: Option<String>,
}

/// Trim the punctuation that distinguishes terms, types and methods so
/// loosely written targets (`App/Model`, `App/Model#`) compare equal.
fn normalize_path(path: &str) -> &str {
    path.trim_start_matches('/').trim_end_matches(['#', '.'])
}

/// Last name of a normalized path: `App/Entity/User` -> `User`.
fn short_name(path: &str) -> &str {
    path.rsplit(['/', '#', '.']).next().unwrap_or(path)
}

/// Mutable graph under construction.
#[derive(Debug, Default)]
pub struct GraphBuilder {
    nodes: BTreeMap<NodeId, Node>,
    edges: Vec<Edge>,
    edge_keys: HashSet<EdgeKey>,
    symbols: BTreeMap<String, SymbolEntry>,
    files: BTreeMap<String, NodeId>,
    /// Short name -> (normalized descriptor path, node), in symbol order.
    paths: HashMap<String, Vec<(String, NodeId)>>,
    definition_sites: HashMap<NodeId, Location>,
    pending_extents: BTreeSet<NodeId>,
    pub diagnostics: Diagnostics,
}

impl GraphBuilder {
    pub fn new() -> Self {
        GraphBuilder::default()
    }

    // ========================================================================
    // Nodes
    // ========================================================================

    /// Insert a node. An existing node with the same ID is kept.
    pub fn add_node(&mut self, node: Node) -> NodeId {
        let id = node.id.clone();
        self.nodes.entry(id.clone()).or_insert(node);
        id
    }

    /// Return the file node for `path`, creating it on first use.
    pub fn ensure_file(&mut self, path: &str) -> NodeId {
        if let Some(id) = self.files.get(path) {
            return id.clone();
        }
        let id = self.add_node(Node::file(path));
        self.files.insert(path.to_string(), id.clone());
        id
    }

    /// Register a symbol node so later passes can find it.
    pub fn register_symbol(
        &mut self,
        symbol: &str,
        id: NodeId,
        container: Option<String>,
        descriptor_path: &str,
    ) {
        let path = normalize_path(descriptor_path);
        self.paths
            .entry(short_name(path).to_string())
            .or_default()
            .push((path.to_string(), id.clone()));
        self.symbols
            .insert(symbol.to_string(), SymbolEntry { id, container });
    }

    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn node_mut(&mut self, id: &NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn file_node(&self, path: &str) -> Option<&NodeId> {
        self.files.get(path)
    }

    /// Symbol nodes in symbol order.
    pub fn symbol_nodes(&self) -> impl Iterator<Item = (&str, &NodeId)> {
        self.symbols.iter().map(|(s, e)| (s.as_str(), &e.id))
    }

    pub fn node_for_symbol(&self, symbol: &str) -> Option<&NodeId> {
        self.symbols.get(symbol).map(|e| &e.id)
    }

    /// Symbol of the node's structural parent, as decoded from its symbol.
    pub fn container_symbol(&self, id: &NodeId) -> Option<&str> {
        let node = self.nodes.get(id)?;
        self.symbols.get(&node.symbol)?.container.as_deref()
    }

    /// The node of the structural parent, when that parent has a node.
    pub fn container_node(&self, id: &NodeId) -> Option<&NodeId> {
        self.container_symbol(id)
            .and_then(|symbol| self.node_for_symbol(symbol))
    }

    /// Nesting depth along the container chain (top-level symbols are 0).
    pub fn depth(&self, id: &NodeId) -> u32 {
        let mut depth = 0;
        let mut visited = HashSet::new();
        let mut current = id;
        while let Some(parent) = self.container_node(current) {
            if !visited.insert(parent.clone()) {
                break;
            }
            depth += 1;
            current = parent;
        }
        depth
    }

    // ========================================================================
    // Definition sites and range estimation
    // ========================================================================

    pub fn set_definition_site(&mut self, id: NodeId, location: Location) {
        self.definition_sites.entry(id).or_insert(location);
    }

    pub fn definition_site(&self, id: &NodeId) -> Option<&Location> {
        self.definition_sites.get(id)
    }

    /// Queue a node whose body extent must be estimated.
    pub fn mark_pending_extent(&mut self, id: NodeId) {
        self.pending_extents.insert(id);
    }

    pub fn is_pending_extent(&self, id: &NodeId) -> bool {
        self.pending_extents.contains(id)
    }

    /// Take the queue of nodes awaiting estimation.
    pub fn take_pending_extents(&mut self) -> BTreeSet<NodeId> {
        std::mem::take(&mut self.pending_extents)
    }

    // ========================================================================
    // Edges
    // ========================================================================

    /// Add an edge unless an edge with the same type, endpoints and
    /// position exists. The first edge wins, so its location is kept.
    pub fn add_edge(&mut self, edge: Edge) -> bool {
        if self.edge_keys.insert(edge.key()) {
            self.edges.push(edge);
            true
        } else {
            self.diagnostics.duplicate_edges += 1;
            false
        }
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    // ========================================================================
    // Target resolution
    // ========================================================================

    /// Resolve a relationship or documentation target to a node.
    ///
    /// Tries the exact symbol, then the exact descriptor path, then a
    /// descriptor path ending in the target (`Model` matches `App/Model`).
    pub fn resolve_symbol(&self, target: &str) -> Option<NodeId> {
        if let Some(id) = self.node_for_symbol(target) {
            return Some(id.clone());
        }

        let path = match ParsedSymbol::parse(target) {
            Ok(parsed) => &target[parsed.descriptor_start..],
            Err(_) => target,
        };
        let path = normalize_path(path);
        if path.is_empty() {
            return None;
        }

        let candidates = self.paths.get(short_name(path))?;
        let suffix = format!("/{}", path);
        candidates
            .iter()
            .find(|(p, _)| p == path)
            .or_else(|| candidates.iter().find(|(p, _)| p.ends_with(&suffix)))
            .map(|(_, id)| id.clone())
    }

    /// Resolve a call-record symbol, tolerating a missing or extra trailing
    /// `.` and a trailing `#`.
    pub fn resolve_loose(&self, symbol: &str) -> Option<NodeId> {
        let trimmed = symbol.trim_end_matches('.');
        let with_dot = format!("{}.", symbol);
        for candidate in [
            symbol,
            trimmed,
            with_dot.as_str(),
            symbol.trim_end_matches('#'),
        ] {
            if let Some(id) = self.node_for_symbol(candidate) {
                return Some(id.clone());
            }
        }
        None
    }

    /// Whether the node exists and has one of the given kinds.
    pub fn has_kind(&self, id: &NodeId, kinds: &[NodeKind]) -> bool {
        self.nodes.get(id).is_some_and(|n| kinds.contains(&n.kind))
    }

    // ========================================================================
    // Output
    // ========================================================================

    /// Consume the builder into a graph in canonical order.
    pub fn finish(self, metadata: GraphMetadata) -> (Graph, Diagnostics) {
        let nodes = self.nodes.into_values().collect();
        (Graph::new(metadata, nodes, self.edges), self.diagnostics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use kloc_core::graph::EdgeType;

    const P: &str = "scip-php composer app 1.0 ";

    fn symbol_node(builder: &mut GraphBuilder, descriptors: &str, kind: NodeKind) -> NodeId {
        let symbol = format!("{}{}", P, descriptors);
        let id = NodeId::for_symbol(&symbol);
        builder.add_node(Node::new(id.clone(), kind, "n", "f", symbol.clone()));
        builder.register_symbol(&symbol, id.clone(), None, descriptors);
        id
    }

    #[test]
    fn edges_dedup_first_wins() {
        let mut builder = GraphBuilder::new();
        let a = NodeId::for_symbol("a");
        let b = NodeId::for_symbol("b");
        let first = Edge::new(EdgeType::Uses, a.clone(), b.clone())
            .with_location(Location::new("x.php", 3, 1));
        let second =
            Edge::new(EdgeType::Uses, a.clone(), b.clone()).with_location(Location::new("x.php", 9, 1));

        assert!(builder.add_edge(first));
        assert!(!builder.add_edge(second));
        assert_eq!(builder.edges().len(), 1);
        assert_eq!(builder.edges()[0].location.as_ref().unwrap().line, 3);
        assert_eq!(builder.diagnostics.duplicate_edges, 1);
    }

    #[test]
    fn argument_edges_differ_by_position() {
        let mut builder = GraphBuilder::new();
        let call = NodeId::for_call("c");
        let value = NodeId::for_value("v");
        assert!(builder.add_edge(Edge::new(EdgeType::Argument, call.clone(), value.clone()).with_position(0)));
        assert!(builder.add_edge(Edge::new(EdgeType::Argument, call, value).with_position(1)));
    }

    #[test]
    fn ensure_file_is_idempotent() {
        let mut builder = GraphBuilder::new();
        let a = builder.ensure_file("src/A.php");
        let b = builder.ensure_file("src/A.php");
        assert_eq!(a, b);
        assert_eq!(builder.node_count(), 1);
        assert_eq!(builder.node(&a).unwrap().kind, NodeKind::File);
    }

    #[test]
    fn resolve_exact_symbol_then_path_then_suffix() {
        let mut builder = GraphBuilder::new();
        let model = symbol_node(&mut builder, "App/Model#", NodeKind::Class);
        let other = symbol_node(&mut builder, "Vendor/Lib/Model#", NodeKind::Class);

        assert_eq!(builder.resolve_symbol(&format!("{}App/Model#", P)), Some(model.clone()));
        assert_eq!(builder.resolve_symbol("App/Model"), Some(model.clone()));
        assert_eq!(
            builder.resolve_symbol("scip-php composer other 2.0 Lib/Model#"),
            Some(other)
        );
        assert_eq!(builder.resolve_symbol("Missing"), None);
        assert_eq!(builder.resolve_symbol(""), None);
    }

    #[test]
    fn resolve_loose_trailing_punctuation() {
        let mut builder = GraphBuilder::new();
        let method = symbol_node(&mut builder, "App/User#save().", NodeKind::Method);
        assert_eq!(builder.resolve_loose(&format!("{}App/User#save()", P)), Some(method));
        assert_eq!(builder.resolve_loose(&format!("{}App/Nope#", P)), None);
    }

    #[test]
    fn container_chain_depth() {
        let mut builder = GraphBuilder::new();
        let class_symbol = format!("{}App/User#", P);
        let method_symbol = format!("{}App/User#save().", P);
        let class = NodeId::for_symbol(&class_symbol);
        let method = NodeId::for_symbol(&method_symbol);
        builder.add_node(Node::new(class.clone(), NodeKind::Class, "User", "App\\User", class_symbol.clone()));
        builder.add_node(Node::new(method.clone(), NodeKind::Method, "save", "App\\User::save()", method_symbol.clone()));
        builder.register_symbol(&class_symbol, class.clone(), None, "App/User#");
        builder.register_symbol(&method_symbol, method.clone(), Some(class_symbol), "App/User#save().");

        assert_eq!(builder.container_node(&method), Some(&class));
        assert_eq!(builder.depth(&method), 1);
        assert_eq!(builder.depth(&class), 0);
    }
}
