//! Cross-validation of relationship record lists.

pub mod registry;

pub use registry::{check_records, check_registry_path, Registry, RegistryStats};

use indexmap::IndexSet;
use std::fmt;

use crate::graph::RelationshipRecord;

/// Records found on only one side of a comparison
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    /// In A, not in B
    pub missing_from_b: Vec<RelationshipRecord>,
    /// In B, not in A
    pub missing_from_a: Vec<RelationshipRecord>,
}

impl ValidationReport {
    pub fn is_clean(&self) -> bool {
        self.missing_from_a.is_empty() && self.missing_from_b.is_empty()
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Missing from B: {}", self.missing_from_b.len())?;
        for record in &self.missing_from_b {
            writeln!(f, "  {}", record)?;
        }
        writeln!(f, "Missing from A: {}", self.missing_from_a.len())?;
        for record in &self.missing_from_a {
            writeln!(f, "  {}", record)?;
        }
        Ok(())
    }
}

/// Compare two record lists by exact triple equality.
///
/// Each side of the report lists a record once, in the order it first appears.
pub fn diff_records(a: &[RelationshipRecord], b: &[RelationshipRecord]) -> ValidationReport {
    let set_a: IndexSet<&RelationshipRecord> = a.iter().collect();
    let set_b: IndexSet<&RelationshipRecord> = b.iter().collect();

    let report = ValidationReport {
        missing_from_b: set_a.difference(&set_b).map(|r| (*r).clone()).collect(),
        missing_from_a: set_b.difference(&set_a).map(|r| (*r).clone()).collect(),
    };

    for record in &report.missing_from_b {
        log::warn!("Missing from B: {}", record);
    }
    for record in &report.missing_from_a {
        log::warn!("Missing from A: {}", record);
    }
    log::info!(
        "Compared {} and {} records: {} missing from B, {} missing from A",
        set_a.len(),
        set_b.len(),
        report.missing_from_b.len(),
        report.missing_from_a.len()
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(source: &str, relationship: &str, target: &str) -> RelationshipRecord {
        RelationshipRecord::new(source, relationship, target)
    }

    #[test]
    fn test_diff_one_sided() {
        let a = vec![rec("x", "rel", "y")];
        let report = diff_records(&a, &[]);
        assert_eq!(report.missing_from_b, vec![rec("x", "rel", "y")]);
        assert!(report.missing_from_a.is_empty());
        assert!(!report.is_clean());
    }

    #[test]
    fn test_diff_both_sides_and_repeats() {
        let a = vec![rec("x", "rel", "y"), rec("x", "rel", "y"), rec("p", "q", "r")];
        let b = vec![rec("p", "q", "r"), rec("x", "other", "y")];
        let report = diff_records(&a, &b);
        assert_eq!(report.missing_from_b, vec![rec("x", "rel", "y")]);
        assert_eq!(report.missing_from_a, vec![rec("x", "other", "y")]);
    }

    #[test]
    fn test_diff_identical_is_clean() {
        let a = vec![rec("x", "rel", "y")];
        let report = diff_records(&a, &a.clone());
        assert!(report.is_clean());
        assert_eq!(a, vec![rec("x", "rel", "y")]);
    }

    #[test]
    fn test_report_display() {
        let report = diff_records(&[rec("x", "rel", "y")], &[]);
        let text = report.to_string();
        assert!(text.contains("Missing from B: 1"));
        assert!(text.contains("x --rel--> y"));
        assert!(text.contains("Missing from A: 0"));
    }
}
