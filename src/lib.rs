//! kloc-mapper: SCIP indexes to a unified code property graph
//!
//! Loads a SCIP index (bare or inside a `.kloc` archive), optionally with
//! call records, runs the mapping engine and writes the graph as JSON.

// Engine crates
pub use kloc_core;
pub use kloc_scip;

// Input loading
pub mod archive;
pub mod decode;

// Front door
pub mod cli;

// Errors and JSON output
pub mod error;
pub mod output;
