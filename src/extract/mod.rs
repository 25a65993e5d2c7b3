//! Document-to-graph extraction.
//!
//! Builds the entity catalog, classifies every table, and feeds its data rows to
//! the relationship or property row parser. The result is a flat record list;
//! deduplication happens in [`crate::graph`].

pub mod catalog;
pub mod classifier;
pub mod property_row;
pub mod relationship_row;
pub mod rules;

pub use catalog::build_catalog;
pub use classifier::{classify_table, ClassifiedTable, DataRow, ScanMode, TableKind};
pub use property_row::{PropertyOutcome, PropertyRowParser, UnresolvedReference};
pub use relationship_row::parse_relationship_row;
pub use rules::{ExtractionRules, NameExpansionTable, OverrideTable};

use scraper::Selector;

use crate::document::Document;
use crate::error::{Result, StixrelError};
use crate::graph::RelationshipRecord;

/// Outcome of one pass over a document
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    /// Flat records in derivation order; may contain repeats
    pub records: Vec<RelationshipRecord>,
    /// Reference properties left for manual handling
    pub unresolved: Vec<UnresolvedReference>,
    pub catalog: Vec<String>,
    pub tables_seen: usize,
    pub tables_classified: usize,
    pub overrides_applied: usize,
}

/// Parse HTML with the structural options from `rules`.
pub fn parse_document(html: &str, rules: &ExtractionRules) -> Result<Document> {
    let summary = rules
        .summary_table_selector
        .as_deref()
        .map(|selector| {
            Selector::parse(selector).map_err(|e| {
                StixrelError::Parse(format!("summary table selector {}: {}", selector, e))
            })
        })
        .transpose()?;

    Ok(Document::parse(html, &rules.type_label_style, summary.as_ref()))
}

pub struct Extractor<'a> {
    rules: &'a ExtractionRules,
}

impl<'a> Extractor<'a> {
    pub fn new(rules: &'a ExtractionRules) -> Self {
        Self { rules }
    }

    /// Run the catalog, classifier and row parsers over `document`.
    ///
    /// Tables without an owner or marker are skipped silently; unresolved
    /// references are logged and collected, never fatal.
    pub fn extract(&self, document: &Document, mode: ScanMode) -> Extraction {
        let catalog = build_catalog(document, self.rules);
        log::info!("Entity catalog: {} types", catalog.len());

        let property_parser = PropertyRowParser::from_rules(&catalog, self.rules);
        let nodes = document.nodes();
        let mut extraction = Extraction::default();

        for (pos, table) in document.tables() {
            extraction.tables_seen += 1;
            let Some(classified) = classify_table(nodes, pos, table, mode) else {
                continue;
            };
            extraction.tables_classified += 1;

            for row in &classified.rows {
                match row {
                    DataRow::Relationship(content) => {
                        parse_relationship_row(
                            content,
                            &self.rules.name_expansions,
                            &mut extraction.records,
                        );
                    }
                    DataRow::Property(content) => {
                        let outcome = property_parser.parse(
                            content,
                            &classified.owner,
                            &mut extraction.records,
                        );
                        match outcome {
                            PropertyOutcome::Overridden(n) => {
                                extraction.overrides_applied += 1;
                                log::debug!(
                                    "Using override for {} -> {} ({} targets)",
                                    classified.owner,
                                    content[0],
                                    n
                                );
                            }
                            PropertyOutcome::Unresolved(unresolved) => {
                                log::warn!(
                                    "Unresolved reference {} -> {}: {:?}",
                                    unresolved.owner,
                                    unresolved.relationship,
                                    unresolved.content
                                );
                                extraction.unresolved.push(unresolved);
                            }
                            PropertyOutcome::Inferred(_) | PropertyOutcome::Skipped => {}
                        }
                    }
                }
            }
        }

        extraction.catalog = catalog;
        log::info!(
            "Extracted {} records from {}/{} tables ({} unresolved references)",
            extraction.records.len(),
            extraction.tables_classified,
            extraction.tables_seen,
            extraction.unresolved.len()
        );
        extraction
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::AdjacencyGraph;
    use super::rules::STIX_TYPE_LABEL_STYLE;

    fn label(name: &str) -> String {
        format!(r#"<p><span style="{}">Type Name: {}</span></p>"#, STIX_TYPE_LABEL_STYLE, name)
    }

    fn tr(cells: &[&str]) -> String {
        let tds: String = cells.iter().map(|c| format!("<td><p>{}</p></td>", c)).collect();
        format!("<tr>{}</tr>", tds)
    }

    fn run(html: &str, rules: &ExtractionRules, mode: ScanMode) -> Extraction {
        let doc = parse_document(html, rules).unwrap();
        Extractor::new(rules).extract(&doc, mode)
    }

    #[test]
    fn test_end_to_end_malware_relationships() {
        let html = format!(
            "<html><body><div><h2>Malware</h2>{}<table>{}{}</table></div></body></html>",
            label("malware"),
            tr(&["Source", "Relationship Type", "Target", "Description"]),
            tr(&["malware", "uses, targets", "tool, identity", "desc"]),
        );
        let rules = ExtractionRules::default();
        let extraction = run(&html, &rules, ScanMode::Full);
        let graph = AdjacencyGraph::from_records(extraction.records);
        let json: serde_json::Value = serde_json::from_str(&graph.to_json(4).unwrap()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "malware": {"tool": ["uses", "targets"], "identity": ["uses", "targets"]}
            })
        );
        assert_eq!(graph.targets("malware").collect::<Vec<_>>(), vec!["tool", "identity"]);
    }

    #[test]
    fn test_explicit_and_inferred_duplicates_collapse() {
        let html = format!(
            "<body>{}{}<table>{}{}</table><table>{}{}{}</table></body>",
            label("identity"),
            label("indicator"),
            tr(&["Source", "Relationship Type", "Target", "Description"]),
            tr(&["indicator", "created-by", "identity", "explicit"]),
            tr(&["Required Common Properties"]),
            tr(&["Property Name", "Type", "Description"]),
            tr(&["created_by_ref", "identifier (of type identity)", "MUST be an identity"]),
        );
        let rules = ExtractionRules::default();
        let extraction = run(&html, &rules, ScanMode::Full);
        assert_eq!(extraction.records.len(), 2);
        let graph = AdjacencyGraph::from_records(extraction.records);
        assert_eq!(
            graph.relationships("indicator", "identity").unwrap(),
            &["created-by".to_string()]
        );
    }

    #[test]
    fn test_unresolved_and_override_counted() {
        let html = format!(
            "<body>{}<table>{}{}{}{}</table></body>",
            label("malware"),
            tr(&["Required Common Properties"]),
            tr(&["Property Name", "Type", "Description"]),
            tr(&["sample_refs", "list of type identifier", "MUST be a SCO"]),
            tr(&["operating_system_refs", "list of type identifier", "MUST be a SCO"]),
        );
        let rules = ExtractionRules::default();
        let extraction = run(&html, &rules, ScanMode::Full);
        assert_eq!(extraction.overrides_applied, 1);
        assert_eq!(extraction.unresolved.len(), 1);
        assert_eq!(extraction.unresolved[0].relationship, "operating-system");
        assert_eq!(extraction.records.len(), 2);
    }

    #[test]
    fn test_tables_without_owner_or_marker_skipped() {
        let html = format!(
            "<body><h1>Intro</h1><h2>Scope</h2><table>{}{}</table>{}<table>{}</table></body>",
            tr(&["Source", "Relationship Type", "Target", "Description"]),
            tr(&["malware", "uses", "tool", "desc"]),
            label("tool"),
            tr(&["tool", "uses", "malware", "desc"]),
        );
        let rules = ExtractionRules::default();
        let extraction = run(&html, &rules, ScanMode::Full);
        assert_eq!(extraction.tables_seen, 2);
        assert_eq!(extraction.tables_classified, 0);
        assert!(extraction.records.is_empty());
    }

    #[test]
    fn test_summary_mode_reads_only_summary_tables() {
        let html = format!(
            r#"<body>{}<table class="summary">{}{}</table><table>{}{}</table></body>"#,
            label("malware"),
            tr(&["Source", "Relationship Type", "Target"]),
            tr(&["malware", "uses", "tool"]),
            tr(&["Source", "Relationship Type", "Target", "Description"]),
            tr(&["malware", "targets", "identity", "desc"]),
        );
        let rules = ExtractionRules {
            summary_table_selector: Some("table.summary".to_string()),
            ..ExtractionRules::default()
        };
        let summary = run(&html, &rules, ScanMode::Summary);
        assert_eq!(summary.records, vec![RelationshipRecord::new("malware", "uses", "tool")]);

        let full = run(&html, &rules, ScanMode::Full);
        assert_eq!(full.records.len(), 1);
        assert_eq!(full.records[0].target, "identity");
    }

    #[test]
    fn test_extraction_is_deterministic() {
        let html = format!(
            "<body>{}<table>{}{}{}</table></body>",
            label("malware"),
            tr(&["Source", "Relationship Type", "Target", "Description"]),
            tr(&["malware", "uses", "&lt;All STIX Cyber-observable Objects&gt;", "desc"]),
            tr(&["malware", "variant-of", "malware", "desc"]),
        );
        let rules = ExtractionRules::default();
        let first = AdjacencyGraph::from_records(run(&html, &rules, ScanMode::Full).records);
        let second = AdjacencyGraph::from_records(run(&html, &rules, ScanMode::Full).records);
        assert_eq!(first.to_json(4).unwrap(), second.to_json(4).unwrap());
        assert!(first.relationships("malware", "stixfile").is_some());
        assert!(first.relationships("malware", "<all_SCOs>").is_none());
    }

    #[test]
    fn test_bad_summary_selector_is_parse_error() {
        let rules = ExtractionRules {
            summary_table_selector: Some("table[".to_string()),
            ..ExtractionRules::default()
        };
        assert!(matches!(parse_document("<body></body>", &rules), Err(StixrelError::Parse(_))));
    }
}
