//! Deterministic node identifiers.
//!
//! Every node ID is a pure function of its input: a symbol string, a file
//! path, or a call-record ID. Mapping the same index twice yields the same
//! IDs, which keeps graph diffs stable across runs.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Number of hex characters kept from the SHA-256 digest.
pub const ID_HASH_LEN: usize = 16;

/// Hash the input and keep the first [`ID_HASH_LEN`] hex characters.
fn short_hash(data: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data.as_bytes());
    let mut digest = hex::encode(hasher.finalize());
    digest.truncate(ID_HASH_LEN);
    digest
}

/// Unique identifier for a graph node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub String);

impl NodeId {
    /// ID for a symbol node: `node:<hash(symbol)>`.
    pub fn for_symbol(symbol: &str) -> Self {
        NodeId(format!("node:{}", short_hash(symbol)))
    }

    /// ID for a file node: `node:<hash("file:" + path)>`.
    pub fn for_file(path: &str) -> Self {
        NodeId(format!("node:{}", short_hash(&format!("file:{}", path))))
    }

    /// ID for a value node: `node:val:<hash("val:" + record id)>`.
    ///
    /// The `val:` prefix keeps a value apart from the call that shares its
    /// record ID (a call's result value reuses the call's ID).
    pub fn for_value(record_id: &str) -> Self {
        NodeId(format!("node:val:{}", short_hash(&format!("val:{}", record_id))))
    }

    /// ID for a call node: `node:call:<hash("call:" + record id)>`.
    pub fn for_call(record_id: &str) -> Self {
        NodeId(format!("node:call:{}", short_hash(&format!("call:{}", record_id))))
    }

    /// Borrow the ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
