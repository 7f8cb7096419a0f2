//! Containment edges.

use tracing::debug;

use kloc_core::graph::{Edge, EdgeType, NodeKind};

use crate::builder::GraphBuilder;

/// Give every non-file node one `contains` parent: its structural
/// container's node when one exists, otherwise its file.
pub fn add_containment(builder: &mut GraphBuilder) {
    let mut edges = Vec::new();
    let mut orphans = 0usize;

    for node in builder.nodes() {
        if node.kind == NodeKind::File {
            continue;
        }
        let parent = builder.container_node(&node.id).or_else(|| {
            node.file
                .as_deref()
                .and_then(|file| builder.file_node(file))
        });
        match parent {
            Some(parent) if *parent != node.id => {
                edges.push(Edge::new(EdgeType::Contains, parent.clone(), node.id.clone()));
            }
            _ => orphans += 1,
        }
    }

    let added = edges.len();
    for edge in edges {
        builder.add_edge(edge);
    }
    debug!(added, orphans, "containment edges");
}

#[cfg(test)]
mod tests {
    use super::*;

    use kloc_core::index::{Document, Index, Occurrence};

    use crate::edges::test_support::{prepare, s};

    #[test]
    fn members_contained_by_type_types_by_file() {
        let index = Index::new("/app").with_document(
            Document::new("src/User.php")
                .with_occurrence(Occurrence::definition(s("App/User#"), vec![2, 6, 10]))
                .with_occurrence(Occurrence::definition(s("App/User#save()."), vec![5, 20, 24]))
                .with_occurrence(Occurrence::definition(s("App/User#save().($force)"), vec![5, 25, 31])),
        );
        let (_, mut builder, _) = prepare(&index);
        add_containment(&mut builder);

        let file = builder.file_node("src/User.php").unwrap().clone();
        let class = builder.node_for_symbol(&s("App/User#")).unwrap().clone();
        let save = builder.node_for_symbol(&s("App/User#save().")).unwrap().clone();
        let force = builder.node_for_symbol(&s("App/User#save().($force)")).unwrap().clone();

        let pairs: Vec<_> = builder
            .edges()
            .iter()
            .map(|e| (e.source.clone(), e.target.clone()))
            .collect();
        assert!(pairs.contains(&(file, class.clone())));
        assert!(pairs.contains(&(class, save.clone())));
        assert!(pairs.contains(&(save, force)));
        assert_eq!(pairs.len(), 3);
    }

    #[test]
    fn missing_container_falls_back_to_file() {
        // Method of a class the index never defines.
        let index = Index::new("/app").with_document(
            Document::new("src/x.php")
                .with_occurrence(Occurrence::definition(s("App/Ghost#run()."), vec![1, 4, 7])),
        );
        let (_, mut builder, _) = prepare(&index);
        add_containment(&mut builder);

        let file = builder.file_node("src/x.php").unwrap();
        let run = builder.node_for_symbol(&s("App/Ghost#run().")).unwrap();
        assert_eq!(builder.edges().len(), 1);
        assert_eq!(&builder.edges()[0].source, file);
        assert_eq!(&builder.edges()[0].target, run);
    }

    #[test]
    fn idempotent() {
        let index = Index::new("/app").with_document(
            Document::new("src/f.php").with_occurrence(Occurrence::definition(s("App/f()."), vec![0, 9, 10])),
        );
        let (_, mut builder, _) = prepare(&index);
        add_containment(&mut builder);
        add_containment(&mut builder);
        assert_eq!(builder.edges().len(), 1);
        assert_eq!(builder.diagnostics.duplicate_edges, 1);
    }
}
