//! Aggregation of flat records into the adjacency structure written to disk.

use indexmap::{IndexMap, IndexSet};
use serde::Serialize;
use std::path::Path;

use super::RelationshipRecord;
use crate::error::Result;

/// Drop repeated triples, keeping the position of the first occurrence.
pub fn dedup_records(records: Vec<RelationshipRecord>) -> Vec<RelationshipRecord> {
    let unique: IndexSet<RelationshipRecord> = records.into_iter().collect();
    unique.into_iter().collect()
}

/// source -> target -> relationship names, all in insertion order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct AdjacencyGraph(IndexMap<String, IndexMap<String, Vec<String>>>);

impl AdjacencyGraph {
    /// Deduplicate `records` and fold them into a graph.
    pub fn from_records(records: Vec<RelationshipRecord>) -> Self {
        let mut graph = Self::default();
        for record in dedup_records(records) {
            graph.insert(&record);
        }
        graph
    }

    /// Add a record. Returns false when the name is already listed for the pair.
    pub fn insert(&mut self, record: &RelationshipRecord) -> bool {
        let names = self
            .0
            .entry(record.source.clone())
            .or_default()
            .entry(record.target.clone())
            .or_default();
        if names.iter().any(|name| name == &record.relationship) {
            return false;
        }
        names.push(record.relationship.clone());
        true
    }

    pub fn relationships(&self, source: &str, target: &str) -> Option<&[String]> {
        self.0
            .get(source)
            .and_then(|targets| targets.get(target))
            .map(Vec::as_slice)
    }

    pub fn sources(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn targets(&self, source: &str) -> impl Iterator<Item = &str> {
        self.0
            .get(source)
            .into_iter()
            .flat_map(|targets| targets.keys().map(String::as_str))
    }

    /// Number of (source, target, name) entries
    pub fn edge_count(&self) -> usize {
        self.0
            .values()
            .flat_map(|targets| targets.values())
            .map(Vec::len)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Pretty JSON with `indent` spaces, non-ASCII kept verbatim, trailing newline.
    pub fn to_json(&self, indent: usize) -> Result<String> {
        let indent = " ".repeat(indent);
        let formatter = serde_json::ser::PrettyFormatter::with_indent(indent.as_bytes());
        let mut buf = Vec::new();
        let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.serialize(&mut serializer)?;
        buf.push(b'\n');
        // serde_json only ever emits UTF-8
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}

/// Write the graph to `path` via a sibling temp file, so a failed write leaves
/// no partial output behind.
pub fn write_graph(path: &Path, graph: &AdjacencyGraph, indent: usize) -> Result<()> {
    let json = graph.to_json(indent)?;
    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = Path::new(&tmp_name);

    std::fs::write(tmp_path, json)?;
    if let Err(e) = std::fs::rename(tmp_path, path) {
        let _ = std::fs::remove_file(tmp_path);
        return Err(e.into());
    }

    log::info!("Wrote {} relationships to {}", graph.edge_count(), path.display());
    Ok(())
}
