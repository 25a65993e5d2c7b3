//! Static lookup tables that steer extraction: collective-name expansion,
//! manual reference overrides, and the primitive type names the catalog ignores.
//!
//! Defaults reproduce the STIX 2.1 layout; every table can be replaced through
//! the `[extraction]` section of the config file.

use indexmap::{IndexMap, IndexSet};
use serde::Deserialize;

/// Collective name for every STIX Cyber-observable Object.
pub const ALL_SCOS: &str = "<all_SCOs>";

/// Inline style of the span that marks a "Type Name" label in the STIX document.
pub const STIX_TYPE_LABEL_STYLE: &str = "font-family:Consolas;color:#C7254E;background:#F9F2F4";

const SIMPLE_TYPES: &[&str] = &["binary", "dictionary", "enum", "hex"];

// Extension types (windows-pebinary-ext, http-request-ext, ...) are left out on purpose.
const SCO_TYPES: &[&str] = &[
    "autonomous-system",
    "directory",
    "domain-name",
    "email-addr",
    "email-message",
    "email-mime-part-type",
    "stixfile",
    "ipv4-addr",
    "ipv6-addr",
    "mac-addr",
    "mutex",
    "network-traffic",
    "process",
    "url",
    "user-account",
    "windows-registry-key",
    "windows-registry-value-type",
    "x509-certificate",
    "x509-v3-extensions-type",
];

/// Maps a collective or alias name to the concrete names it stands for.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct NameExpansionTable(IndexMap<String, Vec<String>>);

impl NameExpansionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<I, S>(&mut self, name: impl Into<String>, members: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.0
            .insert(name.into(), members.into_iter().map(Into::into).collect());
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Direct members of `name`, one level deep.
    pub fn get(&self, name: &str) -> Option<&[String]> {
        self.0.get(name).map(Vec::as_slice)
    }

    /// Fully expand `name` into concrete names, in declaration order.
    ///
    /// A name that is not a key expands to itself. Nested keys are expanded in
    /// place; a key reached twice is expanded only once.
    pub fn expand_all(&self, name: &str) -> Vec<String> {
        let mut expanded = IndexSet::new();
        let mut seen_keys = IndexSet::new();
        self.expand_into(name, &mut expanded, &mut seen_keys);
        expanded.into_iter().collect()
    }

    fn expand_into(
        &self,
        name: &str,
        out: &mut IndexSet<String>,
        seen_keys: &mut IndexSet<String>,
    ) {
        match self.0.get(name) {
            Some(members) => {
                if !seen_keys.insert(name.to_string()) {
                    return;
                }
                for member in members {
                    self.expand_into(member, out, seen_keys);
                }
            }
            None => {
                out.insert(name.to_string());
            }
        }
    }
}

/// Manually curated targets keyed by `(owning type, relationship name)`.
///
/// Consulted only when reference inference finds no candidate target.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct OverrideTable(IndexMap<String, IndexMap<String, Vec<String>>>);

impl OverrideTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<I, S>(&mut self, owner: &str, relationship: &str, targets: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.0.entry(owner.to_string()).or_default().insert(
            relationship.to_string(),
            targets.into_iter().map(Into::into).collect(),
        );
    }

    pub fn lookup(&self, owner: &str, relationship: &str) -> Option<&[String]> {
        self.0
            .get(owner)
            .and_then(|by_relationship| by_relationship.get(relationship))
            .map(Vec::as_slice)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Everything the extractor needs besides the document itself.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExtractionRules {
    /// Inline style of the span marking a "Type Name" paragraph.
    pub type_label_style: String,
    /// Primitive type names never treated as relationship-bearing entities.
    pub simple_types: Vec<String>,
    /// CSS selector for the summary tables (`compare` command).
    pub summary_table_selector: Option<String>,
    pub name_expansions: NameExpansionTable,
    pub overrides: OverrideTable,
}

impl ExtractionRules {
    pub fn is_simple_type(&self, name: &str) -> bool {
        self.simple_types.iter().any(|s| s == name)
    }
}

impl Default for ExtractionRules {
    fn default() -> Self {
        Self {
            type_label_style: STIX_TYPE_LABEL_STYLE.to_string(),
            simple_types: SIMPLE_TYPES.iter().map(|s| s.to_string()).collect(),
            summary_table_selector: None,
            name_expansions: default_name_expansions(),
            overrides: default_overrides(),
        }
    }
}

/// Expansion table for the names used inside the STIX relationship tables.
pub fn default_name_expansions() -> NameExpansionTable {
    let mut table = NameExpansionTable::new();
    table.insert("<All STIX Cyber-observable Objects>", [ALL_SCOS]);
    table.insert(ALL_SCOS, SCO_TYPES.iter().copied());
    table
}

/// Expansion table for the external relationship registry, which names the
/// file observable `StixFile`.
pub fn default_registry_expansions() -> NameExpansionTable {
    let mut table = default_name_expansions();
    table.insert("file", ["stixfile"]);
    table
}

/// Nested references the property heuristic cannot resolve on its own.
pub fn default_overrides() -> OverrideTable {
    let mut table = OverrideTable::new();
    table.insert("file", "contains", [ALL_SCOS]);
    table.insert("malware-analysis", "sample", ["file", "network-traffic", "artifact"]);
    table.insert("malware-analysis", "analysis-sco", [ALL_SCOS]);
    table.insert("malware", "sample", ["file", "artifact"]);
    table
}
