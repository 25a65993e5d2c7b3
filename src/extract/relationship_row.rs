//! Relationship row parser: one row of an explicit relationship table.

use std::collections::HashSet;

use crate::graph::RelationshipRecord;

use super::rules::NameExpansionTable;

/// Placeholder in the source column of separator rows.
pub const SEPARATOR_GLYPH: &str = "\u{2014}";
/// Source column label of header rows.
pub const HEADER_LABEL: &str = "Source";

/// Rows that separate or head a table rather than declare a relationship.
pub fn is_placeholder_row(source: &str) -> bool {
    let source = source.trim();
    source == SEPARATOR_GLYPH || source == HEADER_LABEL
}

/// Comma-separated values, trimmed, empties dropped.
pub fn split_values(cell: &str) -> impl Iterator<Item = &str> {
    cell.split(',').map(str::trim).filter(|value| !value.is_empty())
}

/// Append the records declared by `content` (source, relationship(s),
/// target(s), ...) to `records`. Returns how many were appended.
///
/// Collective targets are expanded in place while iterating, so members of an
/// expansion are paired with every relationship name as well. A source that is
/// itself a collective name marks a group heading and yields nothing.
pub fn parse_relationship_row(
    content: &[String],
    expansions: &NameExpansionTable,
    records: &mut Vec<RelationshipRecord>,
) -> usize {
    let [source, relationship_cell, target_cell, ..] = content else {
        return 0;
    };
    let source = source.trim();
    if is_placeholder_row(source) || expansions.contains(source) {
        return 0;
    }

    let before = records.len();
    for relationship in split_values(relationship_cell) {
        let mut targets: Vec<String> = split_values(target_cell).map(str::to_string).collect();
        let mut expanded = HashSet::new();
        let mut idx = 0;
        while idx < targets.len() {
            let target = targets[idx].clone();
            match expansions.get(&target) {
                Some(members) => {
                    if expanded.insert(target) {
                        targets.splice(idx + 1..idx + 1, members.iter().cloned());
                    }
                }
                None => records.push(RelationshipRecord::new(source, relationship, target)),
            }
            idx += 1;
        }
    }

    records.len() - before
}
