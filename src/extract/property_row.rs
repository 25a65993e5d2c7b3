//! Reference inference: relationships implied by identifier-typed properties
//! (e.g. `created_by_ref`) rather than declared in a relationship table.

use indexmap::IndexSet;

use crate::graph::RelationshipRecord;

use super::rules::{ExtractionRules, NameExpansionTable, OverrideTable};

/// Property names already modelled as relationships elsewhere.
const EXCLUDED_PROPERTY_TOKENS: &[&str] = &["object_ref", "resolves_to", "belongs_to"];
/// Type-cell word marking an identifier (reference) property.
const IDENTIFIER_TYPE: &str = "identifier";
/// Keyword introducing the normative clause that names the target types.
const REQUIREMENT_KEYWORD: &str = "MUST";
const REFERENCE_SUFFIX: &str = "_ref";

/// A reference property neither the heuristic nor the override table resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnresolvedReference {
    pub owner: String,
    pub relationship: String,
    pub content: Vec<String>,
}

/// What happened to one property row
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyOutcome {
    /// Not a reference property
    Skipped,
    /// Targets found in the requirement clause
    Inferred(usize),
    /// Targets taken from the override table
    Overridden(usize),
    Unresolved(UnresolvedReference),
}

/// `created_by_ref` -> `created-by`, `sample_refs` -> `sample`
pub fn derive_relationship_name(property_name: &str) -> String {
    property_name
        .trim()
        .split(REFERENCE_SUFFIX)
        .next()
        .unwrap_or_default()
        .replace('_', "-")
}

/// Text between the first requirement keyword and the next one.
fn requirement_clause(description: &str) -> Option<&str> {
    let (_, after) = description.split_once(REQUIREMENT_KEYWORD)?;
    after.split(REQUIREMENT_KEYWORD).next()
}

/// Infers relationships from property rows of a single document.
pub struct PropertyRowParser<'a> {
    catalog: &'a [String],
    expansions: &'a NameExpansionTable,
    overrides: &'a OverrideTable,
}

impl<'a> PropertyRowParser<'a> {
    pub fn new(
        catalog: &'a [String],
        expansions: &'a NameExpansionTable,
        overrides: &'a OverrideTable,
    ) -> Self {
        Self {
            catalog,
            expansions,
            overrides,
        }
    }

    pub fn from_rules(catalog: &'a [String], rules: &'a ExtractionRules) -> Self {
        Self::new(catalog, &rules.name_expansions, &rules.overrides)
    }

    fn is_reference_row(&self, content: &[String], owner: &str) -> bool {
        let [name, type_cell, _, ..] = content else {
            return false;
        };
        if self.expansions.contains(owner) {
            return false;
        }
        if EXCLUDED_PROPERTY_TOKENS.iter().any(|token| name.contains(token)) {
            return false;
        }
        type_cell.contains(IDENTIFIER_TYPE)
    }

    /// Catalog names mentioned in the requirement clause, in catalog order.
    fn candidates(&self, description: &str) -> Vec<String> {
        let Some(clause) = requirement_clause(description) else {
            return Vec::new();
        };
        let found: IndexSet<&String> = self
            .catalog
            .iter()
            .filter(|name| clause.contains(name.as_str()))
            .collect();
        found.into_iter().cloned().collect()
    }

    /// Append the relationships implied by one property row of `owner`'s table.
    pub fn parse(
        &self,
        content: &[String],
        owner: &str,
        records: &mut Vec<RelationshipRecord>,
    ) -> PropertyOutcome {
        if !self.is_reference_row(content, owner) {
            return PropertyOutcome::Skipped;
        }

        let relationship = derive_relationship_name(&content[0]);
        let candidates = self.candidates(&content[2]);

        let (targets, overridden) = if !candidates.is_empty() {
            (candidates, false)
        } else if let Some(targets) = self.overrides.lookup(owner, &relationship) {
            (targets.to_vec(), true)
        } else {
            return PropertyOutcome::Unresolved(UnresolvedReference {
                owner: owner.to_string(),
                relationship,
                content: content.to_vec(),
            });
        };

        for target in &targets {
            records.push(RelationshipRecord::new(owner, relationship.as_str(), target.as_str()));
        }
        if overridden {
            PropertyOutcome::Overridden(targets.len())
        } else {
            PropertyOutcome::Inferred(targets.len())
        }
    }
}
