//! Core data model for kloc.
//!
//! This crate provides the language-agnostic pieces shared by the mapping
//! engine and the CLI:
//! - Input index model (documents, occurrences, symbol information)
//! - Call and value records produced by call extractors
//! - The unified property graph (nodes, edges, ranges, locations)
//! - Deterministic node IDs
//! - Engine configuration and error types

pub mod calls;
pub mod config;
pub mod error;
pub mod graph;
pub mod ids;
pub mod index;

pub use config::MapperConfig;
pub use error::MapError;
pub use graph::{Edge, EdgeType, Graph, GraphMetadata, Location, Node, NodeKind, Range};
pub use ids::NodeId;
