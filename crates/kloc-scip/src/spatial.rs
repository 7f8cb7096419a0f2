//! Spatial index for enclosing-scope lookup.
//!
//! For each file, scope nodes (types, methods, functions) are sorted by
//! `(start_line asc, end_line desc, depth asc)` so an enclosing scope always
//! precedes the scopes it encloses. One stack pass links every entry to its
//! nearest enclosing predecessor.
//!
//! A query for line `L` binary-searches the last entry starting at or
//! before `L`, then follows parent links until an entry contains `L`. The
//! first hit is the innermost scope; no hit means the file itself.

use std::collections::HashMap;

use kloc_core::graph::Range;
use kloc_core::ids::NodeId;

use crate::builder::GraphBuilder;

#[derive(Debug, Clone)]
struct ScopeEntry {
    range: Range,
    depth: u32,
    node: NodeId,
    parent: Option<usize>,
}

fn encloses(outer: &Range, inner: &Range) -> bool {
    outer.start_line <= inner.start_line && inner.end_line <= outer.end_line
}

/// Scopes of one file, in containment order.
#[derive(Debug, Clone, Default)]
struct FileScopes {
    entries: Vec<ScopeEntry>,
}

impl FileScopes {
    fn from_entries(mut entries: Vec<ScopeEntry>) -> Self {
        entries.sort_by(|a, b| {
            a.range
                .start_line
                .cmp(&b.range.start_line)
                .then_with(|| b.range.end_line.cmp(&a.range.end_line))
                .then_with(|| a.depth.cmp(&b.depth))
                .then_with(|| a.node.cmp(&b.node))
        });

        let mut stack: Vec<usize> = Vec::new();
        for i in 0..entries.len() {
            while let Some(&top) = stack.last() {
                if encloses(&entries[top].range, &entries[i].range) {
                    break;
                }
                stack.pop();
            }
            entries[i].parent = stack.last().copied();
            stack.push(i);
        }

        FileScopes { entries }
    }

    fn innermost(&self, line: u32) -> Option<&NodeId> {
        let after = self.entries.partition_point(|e| e.range.start_line <= line);
        let mut current = after.checked_sub(1);
        while let Some(i) = current {
            let entry = &self.entries[i];
            if entry.range.contains_line(line) {
                return Some(&entry.node);
            }
            current = entry.parent;
        }
        None
    }
}

/// Per-file scope index.
#[derive(Debug, Clone, Default)]
pub struct SpatialIndex {
    files: HashMap<String, FileScopes>,
    file_nodes: HashMap<String, NodeId>,
}

impl SpatialIndex {
    /// Index every ranged Class, Interface, Trait, Enum, Method and
    /// Function node. Must run after range estimation.
    pub fn build(builder: &GraphBuilder) -> Self {
        let mut per_file: HashMap<String, Vec<ScopeEntry>> = HashMap::new();
        let mut file_nodes = HashMap::new();

        for node in builder.nodes() {
            if node.kind == kloc_core::graph::NodeKind::File {
                if let Some(file) = &node.file {
                    file_nodes.insert(file.clone(), node.id.clone());
                }
                continue;
            }
            if !node.kind.is_scope() {
                continue;
            }
            let (Some(file), Some(range)) = (&node.file, node.range) else {
                continue;
            };
            per_file.entry(file.clone()).or_default().push(ScopeEntry {
                range,
                depth: builder.depth(&node.id),
                node: node.id.clone(),
                parent: None,
            });
        }

        let files = per_file
            .into_iter()
            .map(|(file, entries)| (file, FileScopes::from_entries(entries)))
            .collect();

        SpatialIndex { files, file_nodes }
    }

    /// Build from explicit `(file, range, node, depth)` entries.
    pub fn from_scopes(
        scopes: impl IntoIterator<Item = (String, Range, NodeId, u32)>,
        file_nodes: impl IntoIterator<Item = (String, NodeId)>,
    ) -> Self {
        let mut per_file: HashMap<String, Vec<ScopeEntry>> = HashMap::new();
        for (file, range, node, depth) in scopes {
            per_file.entry(file).or_default().push(ScopeEntry {
                range,
                depth,
                node,
                parent: None,
            });
        }
        SpatialIndex {
            files: per_file
                .into_iter()
                .map(|(file, entries)| (file, FileScopes::from_entries(entries)))
                .collect(),
            file_nodes: file_nodes.into_iter().collect(),
        }
    }

    /// Innermost scope containing `line`, if any.
    pub fn enclosing_scope(&self, file: &str, line: u32) -> Option<&NodeId> {
        self.files.get(file)?.innermost(line)
    }

    /// Innermost scope containing `line`, else the file node.
    pub fn enclosing(&self, file: &str, line: u32) -> Option<&NodeId> {
        self.enclosing_scope(file, line)
            .or_else(|| self.file_nodes.get(file))
    }

    pub fn scope_count(&self) -> usize {
        self.files.values().map(|f| f.entries.len()).sum()
    }
}
