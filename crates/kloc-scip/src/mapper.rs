//! Mapping pipeline.
//!
//! [`Mapper::map`] runs every pass in order over one [`GraphBuilder`] and
//! returns the finished graph with the run's diagnostics. A mapper holds only
//! configuration; it can be reused across runs.

use std::time::SystemTime;

use tracing::{debug, info, warn};

use kloc_core::calls::CallsData;
use kloc_core::config::MapperConfig;
use kloc_core::error::{MapError, MapResult};
use kloc_core::graph::{format_timestamp, Graph, GraphMetadata};
use kloc_core::index::Index;

use crate::builder::{Diagnostics, GraphBuilder};
use crate::calls::link_calls;
use crate::edges::{add_containment, add_inheritance, add_overrides, add_type_hints, add_usage};
use crate::metadata::MetadataTable;
use crate::nodes::synthesize;
use crate::ranges::estimate_ranges;
use crate::spatial::SpatialIndex;
use crate::symbol::SymbolDecoder;

/// Result of one mapping run.
#[derive(Debug, Clone)]
pub struct MapOutput {
    pub graph: Graph,
    pub diagnostics: Diagnostics,
}

/// Maps an index (and optional call records) into a graph.
#[derive(Debug, Clone, Default)]
pub struct Mapper {
    config: MapperConfig,
    decoder: SymbolDecoder,
}

impl Mapper {
    pub fn new(config: MapperConfig) -> Self {
        let decoder = SymbolDecoder::new(config.namespace_separator.clone());
        Mapper { config, decoder }
    }

    pub fn config(&self) -> &MapperConfig {
        &self.config
    }

    /// Run the full pipeline.
    ///
    /// Fails only when the index has no documents; everything else that is
    /// wrong with the input is skipped and counted in the diagnostics.
    pub fn map(&self, index: &Index, calls: Option<&CallsData>) -> MapResult<MapOutput> {
        if index.documents.is_empty() {
            return Err(MapError::EmptyIndex);
        }

        let metadata = MetadataTable::collect(index);
        debug!(symbols = metadata.len(), "collected symbol metadata");

        let mut builder = GraphBuilder::new();
        synthesize(index, &metadata, &self.decoder, &mut builder);
        estimate_ranges(&mut builder, &self.config);

        let spatial = SpatialIndex::build(&builder);
        debug!(scopes = spatial.scope_count(), "built spatial index");

        add_containment(&mut builder);
        add_inheritance(&mut builder, &metadata);
        add_type_hints(&mut builder, &metadata);
        add_usage(index, &mut builder, &spatial);
        add_overrides(&mut builder, &metadata);

        match calls {
            Some(data) if self.config.link_calls => {
                link_calls(data, &mut builder, &spatial, &self.decoder, &metadata);
            }
            Some(_) => debug!("call linking disabled"),
            None => {}
        }

        let generated_at = self
            .config
            .generated_at
            .clone()
            .unwrap_or_else(|| format_timestamp(SystemTime::now()));
        let graph_metadata = GraphMetadata {
            generated_at,
            project_root: index.project_root.clone(),
            source_scip: self.config.source_name.clone(),
        };

        let (graph, diagnostics) = builder.finish(graph_metadata);
        if diagnostics.unparseable_symbols > 0 || diagnostics.malformed_ranges > 0 {
            warn!(
                unparseable = diagnostics.unparseable_symbols,
                malformed_ranges = diagnostics.malformed_ranges,
                "skipped degraded input"
            );
        }
        info!(
            documents = index.documents.len(),
            nodes = graph.nodes.len(),
            edges = graph.edges.len(),
            estimated_ranges = diagnostics.estimated_ranges,
            unresolved = diagnostics.unresolved_targets,
            "mapped index"
        );

        Ok(MapOutput { graph, diagnostics })
    }
}
