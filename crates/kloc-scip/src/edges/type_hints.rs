//! Type-hint edges.

use tracing::debug;

use kloc_core::graph::{Edge, EdgeType, NodeKind};
use kloc_core::ids::NodeId;

use crate::builder::GraphBuilder;
use crate::metadata::MetadataTable;

const HINTED_KINDS: [NodeKind; 4] = [
    NodeKind::Argument,
    NodeKind::Property,
    NodeKind::Method,
    NodeKind::Function,
];

/// Add a `type_hint` edge for every type-definition relationship of an
/// argument, property or callable, located at the source's definition.
pub fn add_type_hints(builder: &mut GraphBuilder, metadata: &MetadataTable) {
    let sources: Vec<(NodeId, String)> = builder
        .nodes()
        .filter(|n| HINTED_KINDS.contains(&n.kind))
        .map(|n| (n.id.clone(), n.symbol.clone()))
        .collect();

    let mut edges = Vec::new();
    let mut unresolved = 0usize;
    for (id, symbol) in sources {
        let Some(meta) = metadata.get(&symbol) else {
            continue;
        };
        for rel in meta.type_definitions() {
            let Some(target) = builder.resolve_symbol(&rel.symbol) else {
                unresolved += 1;
                continue;
            };
            if target == id {
                continue;
            }
            let mut edge = Edge::new(EdgeType::TypeHint, id.clone(), target);
            if let Some(site) = builder.definition_site(&id) {
                edge = edge.with_location(site.clone());
            }
            edges.push(edge);
        }
    }

    let added = edges.len();
    for edge in edges {
        builder.add_edge(edge);
    }
    builder.diagnostics.unresolved_targets += unresolved;
    debug!(added, unresolved, "type hint edges");
}
