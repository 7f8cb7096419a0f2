//! Edge passes over synthesized nodes.
//!
//! Each pass is independent and idempotent for the same inputs:
//! - Containment: structural parent, else the file
//! - Inheritance: `extends`, `implements`, `uses_trait` between types
//! - Type hints: declared types of arguments, properties and callables
//! - Usage: one `uses` edge per (enclosing scope, referenced symbol)
//! - Overrides: declared, else nearest ancestor method of the same name
//!
//! Overrides read the inheritance edges, so that pass must run after
//! [`add_inheritance`]. Every edge goes through [`GraphBuilder::add_edge`],
//! which deduplicates.
//!
//! [`GraphBuilder::add_edge`]: crate::builder::GraphBuilder::add_edge

mod containment;
mod inheritance;
mod overrides;
mod type_hints;
mod usage;

pub use containment::add_containment;
pub use inheritance::add_inheritance;
pub use overrides::add_overrides;
pub use type_hints::add_type_hints;
pub use usage::add_usage;

use kloc_core::graph::EdgeType;
use kloc_core::index::Relationship;

/// Edge type for an inheritance relationship, by its flags.
///
/// | implementation | reference | edge         |
/// |----------------|-----------|--------------|
/// | yes            | no        | `implements` |
/// | yes            | yes       | `uses_trait` |
/// | no             | yes       | `extends`    |
///
/// Type-definition relationships are type hints, not inheritance.
pub(crate) fn inheritance_edge(rel: &Relationship) -> Option<EdgeType> {
    if rel.is_type_definition {
        return None;
    }
    match (rel.is_implementation, rel.is_reference) {
        (true, false) => Some(EdgeType::Implements),
        (true, true) => Some(EdgeType::UsesTrait),
        (false, true) => Some(EdgeType::Extends),
        (false, false) => None,
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relationship_flags_map_to_edges() {
        assert_eq!(
            inheritance_edge(&Relationship::new("x").implementation()),
            Some(EdgeType::Implements)
        );
        assert_eq!(
            inheritance_edge(&Relationship::new("x").implementation().reference()),
            Some(EdgeType::UsesTrait)
        );
        assert_eq!(
            inheritance_edge(&Relationship::new("x").reference()),
            Some(EdgeType::Extends)
        );
        assert_eq!(
            inheritance_edge(&Relationship::new("x").reference().type_definition()),
            None
        );
        assert_eq!(inheritance_edge(&Relationship::new("x")), None);
    }
}
