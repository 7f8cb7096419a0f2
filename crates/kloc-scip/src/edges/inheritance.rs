//! Inheritance edges between types.

use tracing::{debug, trace};

use kloc_core::graph::{Edge, EdgeType};
use kloc_core::ids::NodeId;

use super::inheritance_edge;
use crate::builder::GraphBuilder;
use crate::docs::extract_supertypes;
use crate::metadata::MetadataTable;

/// Supertypes a type declares, as `(edge type, raw target)` pairs.
///
/// Relationships are authoritative. Documentation annotations are read only
/// when the type has no inheritance relationship at all.
fn declared_supertypes(symbol: &str, metadata: &MetadataTable) -> Vec<(EdgeType, String)> {
    let from_relationships: Vec<_> = metadata
        .get(symbol)
        .into_iter()
        .flat_map(|meta| meta.inheritance())
        .filter_map(|rel| inheritance_edge(rel).map(|edge| (edge, rel.symbol.clone())))
        .collect();
    if !from_relationships.is_empty() {
        return from_relationships;
    }

    let declared = extract_supertypes(metadata.documentation(symbol));
    let extends = declared.extends.into_iter().map(|t| (EdgeType::Extends, t));
    let implements = declared.implements.into_iter().map(|t| (EdgeType::Implements, t));
    let uses = declared.uses.into_iter().map(|t| (EdgeType::UsesTrait, t));
    extends.chain(implements).chain(uses).collect()
}

/// Add `extends`, `implements` and `uses_trait` edges for every type.
pub fn add_inheritance(builder: &mut GraphBuilder, metadata: &MetadataTable) {
    let types: Vec<(NodeId, String)> = builder
        .nodes()
        .filter(|n| n.kind.is_type_like())
        .map(|n| (n.id.clone(), n.symbol.clone()))
        .collect();

    let mut edges = Vec::new();
    let mut unresolved = 0usize;
    for (id, symbol) in &types {
        for (edge_type, target) in declared_supertypes(symbol, metadata) {
            match builder.resolve_symbol(&target) {
                Some(target_id) if target_id != *id => {
                    edges.push(Edge::new(edge_type, id.clone(), target_id));
                }
                Some(_) => {}
                None => {
                    trace!(%target, "unresolved supertype");
                    unresolved += 1;
                }
            }
        }
    }

    let added = edges.len();
    for edge in edges {
        builder.add_edge(edge);
    }
    builder.diagnostics.unresolved_targets += unresolved;
    debug!(types = types.len(), added, unresolved, "inheritance edges");
}
