//! Entity catalog: every object type the document declares with a "Type Name" label.

use crate::document::Document;

use super::rules::ExtractionRules;

const TYPE_NAME_LABEL: &str = "Type Name";

/// Name declared by a "Type Name: <name>" label, if `text` is one.
///
/// The name is the segment after the first `": "` separator.
pub fn declared_type_name(text: &str) -> Option<&str> {
    if !text.contains(TYPE_NAME_LABEL) {
        return None;
    }
    text.split(": ")
        .nth(1)
        .map(str::trim)
        .filter(|name| !name.is_empty())
}

/// Declared entity-type names in declaration order, primitives excluded.
///
/// Only paragraphs carrying the label span count; the list is used as a
/// substring-match corpus, so duplicates are harmless and kept.
pub fn build_catalog(document: &Document, rules: &ExtractionRules) -> Vec<String> {
    let mut catalog = Vec::new();
    for (text, has_type_label) in document.paragraphs() {
        if !has_type_label {
            continue;
        }
        let Some(name) = declared_type_name(text) else {
            continue;
        };
        if rules.is_simple_type(name) {
            continue;
        }
        log::debug!("Entity type found: {}", name);
        catalog.push(name.to_string());
    }
    catalog
}
