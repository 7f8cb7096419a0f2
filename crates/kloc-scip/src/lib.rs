//! Mapping engine for kloc.
//!
//! Turns a decoded source index (and optional call records) into the
//! unified property graph. The pipeline runs as a sequence of passes over a
//! single [`builder::GraphBuilder`]:
//!
//! 1. [`metadata`] collects per-symbol documentation and relationships
//! 2. [`nodes`] synthesizes file and symbol nodes, decoding each symbol with [`symbol`]
//! 3. [`ranges`] estimates missing body extents
//! 4. [`spatial`] indexes scopes for enclosing-symbol lookup
//! 5. [`edges`] adds containment, inheritance, type-hint, usage and override edges
//! 6. [`calls`] links call records into value and call nodes
//!
//! [`mapper::Mapper`] drives the whole sequence.

pub mod builder;
pub mod calls;
pub mod docs;
pub mod edges;
pub mod mapper;
pub mod metadata;
pub mod nodes;
pub mod ranges;
pub mod spatial;
pub mod symbol;

pub use builder::{Diagnostics, GraphBuilder};
pub use mapper::Mapper;
pub use spatial::SpatialIndex;
pub use symbol::{DecodedSymbol, Descriptor, ParsedSymbol, SymbolDecoder, Unparseable};
