//! Usage edges from reference occurrences.

use tracing::debug;

use kloc_core::graph::{Edge, EdgeType, Location, NodeKind, Range};
use kloc_core::index::Index;

use crate::builder::GraphBuilder;
use crate::spatial::SpatialIndex;

/// Add one `uses` edge per (enclosing scope, referenced node).
///
/// Definition and forward-definition occurrences are skipped; imports,
/// reads, writes and plain references all count. The source is the
/// innermost scope around the occurrence, else the file. References to a
/// node's own self and from a callable to its own arguments are dropped.
/// Duplicates keep the first occurrence's location.
pub fn add_usage(index: &Index, builder: &mut GraphBuilder, spatial: &SpatialIndex) {
    let mut candidates = 0usize;
    let mut added = 0usize;

    for doc in &index.documents {
        for occ in &doc.occurrences {
            if occ.roles.is_declaration() || occ.symbol.is_empty() {
                continue;
            }
            let Some(range) = Range::from_scip(&occ.range) else {
                builder.diagnostics.malformed_ranges += 1;
                continue;
            };
            let Some(target) = builder.node_for_symbol(&occ.symbol).cloned() else {
                if !occ.symbol.starts_with("local ") {
                    builder.diagnostics.external_references += 1;
                }
                continue;
            };
            let Some(source) = spatial.enclosing(&doc.relative_path, range.start_line).cloned()
            else {
                continue;
            };
            if source == target {
                continue;
            }
            if builder.has_kind(&target, &[NodeKind::Argument])
                && builder.container_node(&target) == Some(&source)
            {
                continue;
            }

            candidates += 1;
            let location = Location::new(doc.relative_path.clone(), range.start_line, range.start_col);
            if builder.add_edge(Edge::new(EdgeType::Uses, source, target).with_location(location)) {
                added += 1;
            }
        }
    }

    debug!(candidates, added, "usage edges");
}

#[cfg(test)]
mod tests {
    use super::*;

    use kloc_core::index::{Document, Occurrence, SymbolRoles};

    use crate::edges::test_support::{prepare, s};

    fn service_document() -> Document {
        Document::new("src/Service.php")
            .with_occurrence(
                Occurrence::definition(s("App/Service#"), vec![0, 6, 13])
                    .with_enclosing_range(vec![0, 0, 40, 1]),
            )
            .with_occurrence(
                Occurrence::definition(s("App/Service#run()."), vec![2, 20, 23])
                    .with_enclosing_range(vec![2, 4, 20, 5]),
            )
            .with_occurrence(Occurrence::definition(s("App/Service#run().($id)"), vec![2, 24, 27]))
            .with_occurrence(
                Occurrence::definition(s("App/Service#save()."), vec![22, 20, 24])
                    .with_enclosing_range(vec![22, 4, 30, 5]),
            )
    }

    fn edge_count(builder: &GraphBuilder) -> usize {
        builder.edges().iter().filter(|e| e.edge_type == EdgeType::Uses).count()
    }

    #[test]
    fn repeated_calls_collapse_to_first_location() {
        let index = Index::new("/app").with_document(
            service_document()
                .with_occurrence(Occurrence::reference(s("App/Service#save()."), vec![5, 15, 19]))
                .with_occurrence(Occurrence::reference(s("App/Service#save()."), vec![8, 15, 19]))
                .with_occurrence(Occurrence::reference(s("App/Service#save()."), vec![11, 15, 19])),
        );
        let (_, mut builder, spatial) = prepare(&index);
        add_usage(&index, &mut builder, &spatial);

        assert_eq!(edge_count(&builder), 1);
        let edge = &builder.edges()[0];
        assert_eq!(&edge.source, builder.node_for_symbol(&s("App/Service#run().")).unwrap());
        assert_eq!(&edge.target, builder.node_for_symbol(&s("App/Service#save().")).unwrap());
        assert_eq!(edge.location.as_ref().unwrap().line, 5);
        assert_eq!(builder.diagnostics.duplicate_edges, 2);
    }

    #[test]
    fn skips_own_parameters_and_self() {
        let index = Index::new("/app").with_document(
            service_document()
                .with_occurrence(Occurrence::reference(s("App/Service#run().($id)"), vec![4, 8, 11]))
                .with_occurrence(Occurrence::reference(s("App/Service#run()."), vec![6, 8, 11])),
        );
        let (_, mut builder, spatial) = prepare(&index);
        add_usage(&index, &mut builder, &spatial);
        assert_eq!(edge_count(&builder), 0);
    }

    #[test]
    fn import_and_write_roles_count_forward_definitions_do_not() {
        let index = Index::new("/app").with_document(
            service_document()
                .with_occurrence(Occurrence::new(
                    s("App/Service#save()."),
                    vec![3, 8, 12],
                    SymbolRoles::WRITE_ACCESS | SymbolRoles::READ_ACCESS,
                ))
                .with_occurrence(Occurrence::new(
                    s("App/Service#run()."),
                    vec![24, 8, 11],
                    SymbolRoles::FORWARD_DEFINITION,
                ))
                .with_occurrence(Occurrence::new(
                    s("App/Service#"),
                    vec![50, 4, 11],
                    SymbolRoles::IMPORT,
                )),
        );
        let (_, mut builder, spatial) = prepare(&index);
        add_usage(&index, &mut builder, &spatial);

        assert_eq!(edge_count(&builder), 2);
        // Line 50 is outside every scope: the file is the source.
        let file = builder.file_node("src/Service.php").unwrap();
        assert!(builder.edges().iter().any(|e| &e.source == file));
    }

    #[test]
    fn external_and_malformed_references_are_counted() {
        let index = Index::new("/app").with_document(
            service_document()
                .with_occurrence(Occurrence::reference("scip-php composer vendor 1.0 Lib/Log#", vec![5, 1, 4]))
                .with_occurrence(Occurrence::reference("local 4", vec![6, 1, 4]))
                .with_occurrence(Occurrence::reference(s("App/Service#save()."), vec![7])),
        );
        let (_, mut builder, spatial) = prepare(&index);
        add_usage(&index, &mut builder, &spatial);

        assert_eq!(edge_count(&builder), 0);
        assert_eq!(builder.diagnostics.external_references, 1);
        assert_eq!(builder.diagnostics.malformed_ranges, 1);
    }
}
