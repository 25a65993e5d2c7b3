pub mod config;
pub mod document;
pub mod error;
pub mod extract;
pub mod graph;
pub mod pipeline;
pub mod source;
pub mod validate;

pub use config::Config;
pub use error::{Result, StixrelError};
pub use extract::{Extraction, Extractor, ScanMode};
pub use graph::{AdjacencyGraph, RelationshipRecord};
pub use validate::{diff_records, ValidationReport};
