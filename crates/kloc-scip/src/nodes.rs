//! Node synthesis.
//!
//! Produces one File node per document and one node per decodable symbol.
//! A symbol's initial range comes from its first definition occurrence:
//! the enclosing range when the indexer supplies one, otherwise the
//! identifier position, queued for estimation when the kind has a body.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, trace};

use kloc_core::graph::{Location, Node, Range};
use kloc_core::ids::NodeId;
use kloc_core::index::Index;

use crate::builder::GraphBuilder;
use crate::metadata::MetadataTable;
use crate::symbol::SymbolDecoder;

/// Where a symbol is defined.
#[derive(Debug, Clone, PartialEq, Eq)]
struct DefinitionSite {
    file: String,
    name_range: Option<Range>,
    extent: Option<Range>,
}

/// First definition occurrence of every symbol, in symbol order.
fn collect_definitions(index: &Index, builder: &mut GraphBuilder) -> BTreeMap<String, DefinitionSite> {
    let mut sites = BTreeMap::new();
    for doc in &index.documents {
        for occ in &doc.occurrences {
            if !occ.roles.is_definition() || occ.symbol.is_empty() {
                continue;
            }
            if sites.contains_key(&occ.symbol) {
                continue;
            }

            let name_range = Range::from_scip(&occ.range);
            if name_range.is_none() {
                builder.diagnostics.malformed_ranges += 1;
            }
            let extent = if occ.enclosing_range.is_empty() {
                None
            } else {
                let extent = Range::from_scip(&occ.enclosing_range);
                if extent.is_none() {
                    builder.diagnostics.malformed_ranges += 1;
                }
                extent
            };

            sites.insert(
                occ.symbol.clone(),
                DefinitionSite {
                    file: doc.relative_path.clone(),
                    name_range,
                    extent,
                },
            );
        }
    }
    sites
}

/// Create File nodes and symbol nodes.
pub fn synthesize(
    index: &Index,
    metadata: &MetadataTable,
    decoder: &SymbolDecoder,
    builder: &mut GraphBuilder,
) {
    for doc in &index.documents {
        builder.ensure_file(&doc.relative_path);
    }

    let definitions = collect_definitions(index, builder);
    let symbols: BTreeSet<&str> = definitions
        .keys()
        .map(String::as_str)
        .chain(metadata.symbols())
        .collect();

    let mut created = 0usize;
    for symbol in symbols {
        let decoded = match decoder.decode(symbol, metadata) {
            Ok(decoded) => decoded,
            Err(reason) => {
                trace!(symbol, %reason, "skipping symbol");
                builder.diagnostics.unparseable_symbols += 1;
                continue;
            }
        };

        let id = NodeId::for_symbol(symbol);
        let mut node = Node::new(id.clone(), decoded.kind, decoded.name, decoded.fqn, symbol)
            .with_documentation(metadata.documentation(symbol).to_vec());

        match definitions.get(symbol) {
            Some(site) => {
                node.file = Some(site.file.clone());
                node.name_range = site.name_range;
                match (site.extent, site.name_range) {
                    (Some(extent), _) => node.range = Some(extent),
                    (None, Some(name_range)) => {
                        node.range = Some(Range::new(
                            name_range.start_line,
                            name_range.start_col,
                            name_range.start_line,
                            name_range.end_col,
                        ));
                        if decoded.kind.is_scope() {
                            builder.mark_pending_extent(id.clone());
                        }
                    }
                    (None, None) => {}
                }
                if let Some(name_range) = site.name_range {
                    builder.set_definition_site(
                        id.clone(),
                        Location::new(site.file.clone(), name_range.start_line, name_range.start_col),
                    );
                }
            }
            None => {
                node.file = metadata.get(symbol).and_then(|m| m.file.clone());
            }
        }

        if let Some(file) = node.file.clone() {
            builder.ensure_file(&file);
        }
        builder.add_node(node);
        builder.register_symbol(symbol, id, decoded.container, &decoded.descriptor_path);
        created += 1;
    }

    debug!(
        files = index.documents.len(),
        symbols = created,
        skipped = builder.diagnostics.unparseable_symbols,
        "synthesized nodes"
    );
}
