//! Range estimation.
//!
//! Some indexers only report identifier positions. For queued Class-like,
//! Method and Function nodes the body end is estimated from sibling order:
//!
//! ```text
//! end_line = min(next_sibling.start_line - 1,
//!                start_line + fallback(kind),
//!                container.end_line)
//! ```
//!
//! Siblings share a file and a structural container. Containers are
//! estimated before their members so a member can be bounded by its
//! container's final extent. This is a heuristic; estimated nodes are
//! flagged with `range_estimated`.

use std::collections::HashMap;

use tracing::debug;

use kloc_core::config::MapperConfig;
use kloc_core::graph::{NodeKind, Range};
use kloc_core::ids::NodeId;

use crate::builder::GraphBuilder;

/// Fallback body length for a kind.
fn fallback_lines(kind: NodeKind, config: &MapperConfig) -> u32 {
    if kind.is_callable() {
        config.callable_fallback_lines
    } else {
        config.type_fallback_lines
    }
}

/// Sibling group key: file and structural container.
type GroupKey = (String, Option<NodeId>);

/// Estimate the end of every queued node.
pub fn estimate_ranges(builder: &mut GraphBuilder, config: &MapperConfig) {
    let pending = builder.take_pending_extents();
    if pending.is_empty() {
        return;
    }

    // Start lines of every ranged symbol node per sibling group, sorted.
    let mut groups: HashMap<GroupKey, Vec<u32>> = HashMap::new();
    for (_, id) in builder.symbol_nodes() {
        let Some(node) = builder.node(id) else {
            continue;
        };
        let (Some(file), Some(range)) = (&node.file, node.range) else {
            continue;
        };
        if node.kind == NodeKind::Argument {
            continue;
        }
        let key = (file.clone(), builder.container_node(id).cloned());
        groups.entry(key).or_default().push(range.start_line);
    }
    for starts in groups.values_mut() {
        starts.sort_unstable();
        starts.dedup();
    }

    // Containers before members.
    let mut order: Vec<(u32, NodeId)> = pending
        .into_iter()
        .map(|id| (builder.depth(&id), id))
        .collect();
    order.sort();

    let mut estimated = 0usize;
    for (_, id) in order {
        let Some(node) = builder.node(&id) else {
            continue;
        };
        let (Some(file), Some(range)) = (node.file.clone(), node.range) else {
            continue;
        };
        let kind = node.kind;
        let container = builder.container_node(&id).cloned();

        let start = range.start_line;
        let mut end = start.saturating_add(fallback_lines(kind, config));

        if let Some(starts) = groups.get(&(file, container.clone())) {
            let next = starts.partition_point(|&line| line <= start);
            if let Some(&next_start) = starts.get(next) {
                end = end.min(next_start - 1);
            }
        }

        if let Some(parent_range) = container
            .as_ref()
            .and_then(|c| builder.node(c))
            .and_then(|parent| parent.range)
            .filter(|r| !r.is_collapsed())
        {
            end = end.min(parent_range.end_line);
        }

        let end = end.max(start);
        if let Some(node) = builder.node_mut(&id) {
            let end_col = if end == start { range.end_col } else { 0 };
            node.range = Some(Range::new(start, range.start_col, end, end_col));
            node.range_estimated = true;
            estimated += 1;
        }
    }

    builder.diagnostics.estimated_ranges += estimated;
    debug!(estimated, "estimated ranges");
}
