//! Override edges between methods.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

use tracing::debug;

use kloc_core::graph::{Edge, EdgeType, NodeKind};
use kloc_core::ids::NodeId;

use crate::builder::GraphBuilder;
use crate::metadata::MetadataTable;

/// Methods of each type, by name. The first method in ID order wins a name.
fn methods_by_type(builder: &GraphBuilder) -> HashMap<NodeId, BTreeMap<String, NodeId>> {
    let mut table: HashMap<NodeId, BTreeMap<String, NodeId>> = HashMap::new();
    for node in builder.nodes().filter(|n| n.kind == NodeKind::Method) {
        let Some(owner) = builder.container_node(&node.id) else {
            continue;
        };
        table
            .entry(owner.clone())
            .or_default()
            .entry(node.name.clone())
            .or_insert_with(|| node.id.clone());
    }
    table
}

/// Direct supertypes of each type, from `extends` and `implements` edges.
fn supertypes(builder: &GraphBuilder) -> HashMap<NodeId, Vec<NodeId>> {
    let mut parents: HashMap<NodeId, Vec<NodeId>> = HashMap::new();
    for edge in builder.edges() {
        if matches!(edge.edge_type, EdgeType::Extends | EdgeType::Implements) {
            parents
                .entry(edge.source.clone())
                .or_default()
                .push(edge.target.clone());
        }
    }
    parents
}

/// Nearest ancestor of `owner` with a method called `name`.
///
/// Breadth-first over supertypes; a type is visited at most once, so
/// inheritance cycles end the walk.
fn nearest_ancestor_method(
    owner: &NodeId,
    name: &str,
    parents: &HashMap<NodeId, Vec<NodeId>>,
    methods: &HashMap<NodeId, BTreeMap<String, NodeId>>,
) -> Option<NodeId> {
    let mut visited: HashSet<&NodeId> = HashSet::from([owner]);
    let mut queue: VecDeque<&NodeId> = parents.get(owner).into_iter().flatten().collect();

    while let Some(ancestor) = queue.pop_front() {
        if !visited.insert(ancestor) {
            continue;
        }
        if let Some(found) = methods.get(ancestor).and_then(|m| m.get(name)) {
            return Some(found.clone());
        }
        queue.extend(parents.get(ancestor).into_iter().flatten());
    }
    None
}

/// Add `overrides` edges. Must run after inheritance edges exist.
///
/// Relationship-declared targets (implementation + reference on a method)
/// win. Otherwise the nearest ancestor method of the same name is used.
pub fn add_overrides(builder: &mut GraphBuilder, metadata: &MetadataTable) {
    let methods = methods_by_type(builder);
    let parents = supertypes(builder);

    let mut edges = Vec::new();
    let mut declared_count = 0usize;
    for node in builder.nodes().filter(|n| n.kind == NodeKind::Method) {
        let declared: Vec<NodeId> = metadata
            .get(&node.symbol)
            .into_iter()
            .flat_map(|meta| meta.relationships.iter())
            .filter(|rel| rel.is_implementation && rel.is_reference && !rel.is_type_definition)
            .filter_map(|rel| builder.resolve_symbol(&rel.symbol))
            .filter(|target| *target != node.id && builder.has_kind(target, &[NodeKind::Method]))
            .collect();

        if !declared.is_empty() {
            declared_count += declared.len();
            edges.extend(
                declared
                    .into_iter()
                    .map(|target| Edge::new(EdgeType::Overrides, node.id.clone(), target)),
            );
            continue;
        }

        let Some(owner) = builder.container_node(&node.id) else {
            continue;
        };
        if let Some(target) = nearest_ancestor_method(owner, &node.name, &parents, &methods) {
            edges.push(Edge::new(EdgeType::Overrides, node.id.clone(), target));
        }
    }

    let added = edges.len();
    for edge in edges {
        builder.add_edge(edge);
    }
    debug!(added, declared = declared_count, "override edges");
}
