//! Relationship graph: flat records, deduplication and the adjacency output.

mod aggregate;

pub use aggregate::{dedup_records, write_graph, AdjacencyGraph};

use serde::{Deserialize, Serialize};
use std::fmt;

/// A single relationship (source --relationship--> target).
///
/// Identity is the value of the triple; repeated derivations collapse to one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RelationshipRecord {
    /// Source entity type, e.g. `malware`.
    pub source: String,
    /// Relationship name, e.g. `uses`.
    pub relationship: String,
    /// Target entity type, e.g. `tool`.
    pub target: String,
}

impl RelationshipRecord {
    pub fn new(
        source: impl Into<String>,
        relationship: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            relationship: relationship.into(),
            target: target.into(),
        }
    }
}

impl fmt::Display for RelationshipRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} --{}--> {}", self.source, self.relationship, self.target)
    }
}
