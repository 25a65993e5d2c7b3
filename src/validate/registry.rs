//! Comparison against an external relationship registry.
//!
//! The registry is a raw text blob. An entry for a source/target pair looks like
//! `<Source><Target>(relationship, ...)`, with free casing and separators, so
//! names are matched through a fuzzy case-insensitive pattern instead of being
//! parsed into a model.

use regex::{Regex, RegexBuilder};
use std::fmt;
use std::path::Path;

use crate::error::{Result, StixrelError};
use crate::extract::NameExpansionTable;
use crate::graph::RelationshipRecord;

/// Separators tolerated between the parts of a name and between two names.
const NAME_SEPARATOR: &str = "[-_ ]?";
/// Characters closing the trailing segment of a registry entry.
const SEGMENT_END: &[char] = &[')', ']'];

/// External registry contents
#[derive(Debug, Clone)]
pub struct Registry {
    text: String,
}

/// A registry argument must name an existing regular file.
pub fn check_registry_path(path: &Path) -> Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(StixrelError::InvalidInput(format!("{} is not a file", path.display())))
    }
}

impl Registry {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        if text.trim().is_empty() {
            return Err(StixrelError::InvalidInput(format!("registry {} is empty", path.display())));
        }
        log::info!("Loaded registry {} ({} bytes)", path.display(), text.len());
        Ok(Self { text })
    }

    pub fn from_text(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    /// Trailing segments of every `<source><target>` entry, from the end of the
    /// pair to the closing bracket (or end of text).
    fn segments(&self, source: &str, target: &str) -> Result<Vec<&str>> {
        let pattern = format!("{}{}{}", name_pattern(source), NAME_SEPARATOR, name_pattern(target));
        let regex = compile(&pattern)?;
        Ok(regex
            .find_iter(&self.text)
            .map(|m| {
                let rest = &self.text[m.end()..];
                let end = rest.find(SEGMENT_END).map(|i| i + 1).unwrap_or(rest.len());
                &rest[..end]
            })
            .collect())
    }
}

/// Hit and miss counters of a registry check
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegistryStats {
    pub connection_found: usize,
    pub connection_missing: usize,
    pub relationship_found: usize,
    pub relationship_missing: usize,
}

impl fmt::Display for RegistryStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Connections found: {}", self.connection_found)?;
        writeln!(f, "Connections not found: {}", self.connection_missing)?;
        writeln!(f, "Relationships found: {}", self.relationship_found)?;
        write!(f, "Relationships not found: {}", self.relationship_missing)
    }
}

/// `attack-pattern` -> `attack[-_ ]?pattern`, each part escaped
fn name_pattern(name: &str) -> String {
    name.split(['-', '_', ' '])
        .filter(|part| !part.is_empty())
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(NAME_SEPARATOR)
}

fn compile(pattern: &str) -> Result<Regex> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map_err(|e| StixrelError::Parse(format!("registry pattern {}: {}", pattern, e)))
}

/// Look every record up in the registry, once per expanded source/target pair.
///
/// The relationship counters only move for pairs whose connection was found.
pub fn check_records(
    records: &[RelationshipRecord],
    registry: &Registry,
    expansions: &NameExpansionTable,
) -> Result<RegistryStats> {
    let mut stats = RegistryStats::default();

    for record in records {
        let relationship = compile(&name_pattern(&record.relationship))?;
        for source in expansions.expand_all(&record.source) {
            for target in expansions.expand_all(&record.target) {
                let segments = registry.segments(&source, &target)?;
                if segments.is_empty() {
                    stats.connection_missing += 1;
                    log::warn!("Connection not in registry: {} -> {}", source, target);
                    continue;
                }
                stats.connection_found += 1;

                if segments.iter().any(|segment| relationship.is_match(segment)) {
                    stats.relationship_found += 1;
                } else {
                    stats.relationship_missing += 1;
                    log::warn!(
                        "Relationship not in registry: {} --{}--> {}",
                        source,
                        record.relationship,
                        target
                    );
                }
            }
        }
    }

    log::info!(
        "Registry check: {}/{} connections, {}/{} relationships",
        stats.connection_found,
        stats.connection_found + stats.connection_missing,
        stats.relationship_found,
        stats.relationship_found + stats.relationship_missing
    );
    Ok(stats)
}
