//! Integration tests for whole-graph properties of the mapping pipeline.

use std::collections::{HashMap, HashSet};

use kloc_core::calls::{CallRecord, CallShape, CallsData, ReceiverKind, RecordLocation, ValueKind, ValueRecord};
use kloc_core::config::MapperConfig;
use kloc_core::graph::{EdgeType, Graph, NodeKind};
use kloc_core::ids::NodeId;
use kloc_core::index::{Document, Index, Occurrence, Relationship, SymbolInformation, SymbolRoles};
use kloc_scip::mapper::MapOutput;
use kloc_scip::Mapper;

const P: &str = "scip-php composer acme/app 1.0.0 ";

fn s(descriptors: &str) -> String {
    format!("{}{}", P, descriptors)
}

/// Three files: `Model` with `save()` and `handle()`, `Base extends Model`,
/// and `User extends Base` whose `handle()` calls `save()` three times.
/// `User` has no extents, so its ranges are estimated.
fn project() -> Index {
    Index::new("/srv/app")
        .with_document(
            Document::new("src/Model.php")
                .with_occurrence(
                    Occurrence::definition(s("App/Model#"), vec![0, 6, 11]).with_enclosing_range(vec![0, 0, 20, 1]),
                )
                .with_occurrence(
                    Occurrence::definition(s("App/Model#save()."), vec![2, 20, 24])
                        .with_enclosing_range(vec![2, 4, 8, 5]),
                )
                .with_occurrence(
                    Occurrence::definition(s("App/Model#handle()."), vec![10, 20, 26])
                        .with_enclosing_range(vec![10, 4, 15, 5]),
                )
                .with_symbol(SymbolInformation::new(s("App/Model#")).with_documentation("abstract class Model")),
        )
        .with_document(
            Document::new("src/Base.php")
                .with_occurrence(
                    Occurrence::definition(s("App/Base#"), vec![1, 6, 10]).with_enclosing_range(vec![1, 0, 5, 1]),
                )
                .with_symbol(
                    SymbolInformation::new(s("App/Base#"))
                        .with_relationship(Relationship::new(s("App/Model#")).reference()),
                ),
        )
        .with_document(
            Document::new("src/User.php")
                .with_occurrence(Occurrence::new(s("App/Model#"), vec![0, 4, 9], SymbolRoles::IMPORT))
                .with_occurrence(Occurrence::definition(s("App/User#"), vec![2, 6, 10]))
                .with_occurrence(Occurrence::definition(s("App/User#handle()."), vec![4, 20, 26]))
                .with_occurrence(Occurrence::definition(s("App/User#handle().($force)"), vec![4, 32, 38]))
                .with_occurrence(Occurrence::reference(s("App/Model#save()."), vec![6, 8, 12]))
                .with_occurrence(Occurrence::reference(s("App/Model#save()."), vec![7, 8, 12]))
                .with_occurrence(Occurrence::reference(s("App/Model#save()."), vec![9, 8, 12]))
                .with_occurrence(Occurrence::reference("local 0", vec![6, 1, 3]))
                .with_symbol(
                    SymbolInformation::new(s("App/User#"))
                        .with_documentation("```php\nfinal class User extends Base\n```")
                        .with_relationship(Relationship::new(s("App/Base#")).reference()),
                ),
        )
}

/// `$m->handle()->save()` inside `User::handle()`.
fn calls() -> CallsData {
    let at = |line, col| RecordLocation::new("src/User.php", line, col);
    CallsData {
        values: vec![
            ValueRecord::new("v:m", ValueKind::Local, at(5, 8))
                .with_symbol(s("App/User#handle().local$m@5"))
                .with_type(s("App/Model#")),
            ValueRecord::new("c:handle", ValueKind::Result, at(6, 12)),
            ValueRecord::new("c:save", ValueKind::Result, at(6, 22)),
        ],
        calls: vec![
            CallRecord::new("c:handle", CallShape::Method, at(6, 12))
                .with_caller(s("App/User#handle()."))
                .with_callee(s("App/Model#handle()."))
                .with_receiver("v:m"),
            CallRecord::new("c:save", CallShape::Method, at(6, 22))
                .with_caller(s("App/User#handle()."))
                .with_callee(s("App/Model#save()."))
                .with_receiver("c:handle"),
        ],
    }
}

fn map(calls: Option<&CallsData>) -> MapOutput {
    let config = MapperConfig::default().with_generated_at("2026-10-16T00:00:00Z");
    Mapper::new(config).map(&project(), calls).expect("mapping succeeds")
}

fn node_id(graph: &Graph, descriptors: &str) -> NodeId {
    graph
        .node_by_symbol(&s(descriptors))
        .unwrap_or_else(|| panic!("no node for {}", descriptors))
        .id
        .clone()
}

#[test]
fn test_mapping_is_deterministic() {
    let first = map(Some(&calls())).graph;
    let second = map(Some(&calls())).graph;

    let ids = |g: &Graph| g.nodes.iter().map(|n| n.id.clone()).collect::<Vec<_>>();
    assert_eq!(ids(&first), ids(&second));
    assert_eq!(first.edges, second.edges);
    assert_eq!(first.to_json(true).unwrap(), second.to_json(true).unwrap());
}

#[test]
fn test_containment_is_a_forest() {
    let graph = map(Some(&calls())).graph;

    let mut parents: HashMap<&NodeId, Vec<&NodeId>> = HashMap::new();
    for edge in graph.edges_of_type(EdgeType::Contains) {
        parents.entry(&edge.target).or_default().push(&edge.source);
    }

    for node in &graph.nodes {
        let count = parents.get(&node.id).map_or(0, Vec::len);
        if node.kind == NodeKind::File {
            assert_eq!(count, 0, "file {} has a parent", node.name);
        } else {
            assert_eq!(count, 1, "{} {} has {} parents", node.kind, node.fqn, count);
        }

        // Walking up always ends at a root without revisiting a node.
        let mut seen = HashSet::new();
        let mut current = &node.id;
        while let Some(&parent) = parents.get(current).and_then(|p| p.first()) {
            assert!(seen.insert(parent), "containment cycle through {}", parent);
            current = parent;
        }
    }
}

#[test]
fn test_override_skips_parent_without_method() {
    let graph = map(None).graph;
    let overrides: Vec<_> = graph
        .edges_of_type(EdgeType::Overrides)
        .map(|e| (e.source.clone(), e.target.clone()))
        .collect();
    assert_eq!(
        overrides,
        vec![(node_id(&graph, "App/User#handle()."), node_id(&graph, "App/Model#handle()."))]
    );
}

#[test]
fn test_usage_dedup_keeps_first_location() {
    let graph = map(None).graph;
    let handle = node_id(&graph, "App/User#handle().");
    let save = node_id(&graph, "App/Model#save().");

    let uses: Vec<_> = graph
        .edges_of_type(EdgeType::Uses)
        .filter(|e| e.source == handle && e.target == save)
        .collect();
    assert_eq!(uses.len(), 1);
    let location = uses[0].location.as_ref().unwrap();
    assert_eq!((location.file.as_str(), location.line, location.col), ("src/User.php", 6, 8));
}

#[test]
fn test_reference_outside_scopes_comes_from_file() {
    let graph = map(None).graph;
    let file = NodeId::for_file("src/User.php");
    let model = node_id(&graph, "App/Model#");
    assert!(graph
        .edges_of_type(EdgeType::Uses)
        .any(|e| e.source == file && e.target == model));
}

#[test]
fn test_estimated_ranges_use_fallbacks() {
    let output = map(None);
    let graph = &output.graph;

    let user = graph.node(&node_id(graph, "App/User#")).unwrap();
    let range = user.range.unwrap();
    assert!(user.range_estimated);
    assert_eq!(range.end_line, 2 + 500);

    let handle = graph.node(&node_id(graph, "App/User#handle().")).unwrap();
    assert!(handle.range_estimated);
    assert_eq!(handle.range.unwrap().end_line, 4 + 30);

    let save = graph.node(&node_id(graph, "App/Model#save().")).unwrap();
    assert!(!save.range_estimated);
    assert_eq!(save.range.unwrap().end_line, 8);

    assert_eq!(output.diagnostics.estimated_ranges, 2);
}

#[test]
fn test_inheritance_and_documentation_kind() {
    let graph = map(None).graph;
    let extends: HashSet<_> = graph
        .edges_of_type(EdgeType::Extends)
        .map(|e| (e.source.clone(), e.target.clone()))
        .collect();
    assert!(extends.contains(&(node_id(&graph, "App/User#"), node_id(&graph, "App/Base#"))));
    assert!(extends.contains(&(node_id(&graph, "App/Base#"), node_id(&graph, "App/Model#"))));
    assert_eq!(extends.len(), 2);

    let model = graph.node_by_symbol(&s("App/Model#")).unwrap();
    assert_eq!(model.kind, NodeKind::Class);
    assert_eq!(model.fqn, "App\\Model");
}

#[test]
fn test_chained_call_receiver_kind() {
    let graph = map(Some(&calls())).graph;

    let save = graph.node(&NodeId::for_call("c:save")).unwrap();
    assert_eq!(save.kind, NodeKind::Call);
    assert_eq!(save.receiver_kind, Some(ReceiverKind::Method));

    let handle = graph.node(&NodeId::for_call("c:handle")).unwrap();
    assert_eq!(handle.receiver_kind, Some(ReceiverKind::Local));

    let user_handle = node_id(&graph, "App/User#handle().");
    assert!(graph
        .edges_of_type(EdgeType::Contains)
        .any(|e| e.source == user_handle && e.target == NodeId::for_value("v:m")));
}

#[test]
fn test_graph_json_round_trip() {
    let graph = map(Some(&calls())).graph;
    let json = graph.to_json(false).unwrap();
    let parsed = Graph::from_json(&json).unwrap();

    let node_ids = |g: &Graph| g.nodes.iter().map(|n| n.id.clone()).collect::<HashSet<_>>();
    let edge_keys = |g: &Graph| g.edges.iter().map(|e| e.key()).collect::<HashSet<_>>();
    assert_eq!(node_ids(&graph), node_ids(&parsed));
    assert_eq!(edge_keys(&graph), edge_keys(&parsed));
    assert_eq!(graph, parsed);
}

#[test]
fn test_diagnostics_serialize() {
    let output = map(None);
    let value = serde_json::to_value(&output.diagnostics).unwrap();
    assert_eq!(value["estimated_ranges"], 2);
    assert_eq!(value["duplicate_edges"], 2);
}
