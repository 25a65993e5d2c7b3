//! Table classification: which entity type owns a table, and which of its rows
//! are relationship or property data.

use std::collections::HashSet;

use crate::document::{Node, Table};

use super::catalog::declared_type_name;

/// Starts a property table.
pub const PROPERTY_MARKER: &str = "Required Common Properties";
/// Header of the property rows; opens the data region once the table is a property table.
pub const PROPERTY_HEADER_MARKER: &str = "Property Name";
/// Header of a relationship table; opens the data region.
pub const RELATIONSHIP_MARKER: &str = "Relationship Type";
/// Closes the data region of a relationship table for the rest of the table.
pub const REVERSE_MARKER: &str = "Reverse Relationships";

/// Distinct heading levels crossed before the owner search gives up.
const MAX_HEADING_LEVELS: usize = 2;

/// Cells in a data row of a full relationship table.
const RELATIONSHIP_ROW_CELLS: usize = 4;
/// Minimum cells of a relationship-shaped row: source, relationship, target.
const MIN_RELATIONSHIP_CELLS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableKind {
    Relationship,
    Property,
    Unclassified,
}

/// Which tables are scanned, and how
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanMode {
    /// Every table; rows are data only inside marker-delimited regions.
    Full,
    /// Only summary tables; every relationship-shaped row is data.
    Summary,
}

/// A row handed to one of the row parsers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataRow {
    Relationship(Vec<String>),
    Property(Vec<String>),
}

/// A table with a known owner and at least one marker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedTable {
    pub owner: String,
    pub kind: TableKind,
    pub rows: Vec<DataRow>,
}

/// State of the backward walk from a table to its owning type.
#[derive(Debug, Default)]
struct OwnerWalk {
    seen_heading_levels: HashSet<u8>,
    owner: Option<String>,
}

enum WalkStep {
    Continue,
    Stop,
}

impl OwnerWalk {
    fn visit(&mut self, node: &Node) -> WalkStep {
        if let Node::Heading { level, .. } = node {
            self.seen_heading_levels.insert(*level);
        }
        let Some(text) = node.text() else {
            return WalkStep::Continue;
        };

        // A label paragraph ends the walk even if no name can be read from it
        if text.contains("Type Name") {
            self.owner = declared_type_name(text).map(str::to_string);
            return WalkStep::Stop;
        }

        if self.seen_heading_levels.len() >= MAX_HEADING_LEVELS {
            return WalkStep::Stop;
        }

        WalkStep::Continue
    }
}

/// Owning entity type of the table at `table_pos`.
///
/// Walks backwards over headings and paragraphs. The nearest "Type Name" label
/// wins; crossing two distinct heading levels first means the table sits in a
/// section with no type of its own.
pub fn find_owner(nodes: &[Node], table_pos: usize) -> Option<String> {
    let mut walk = OwnerWalk::default();
    for node in nodes[..table_pos.min(nodes.len())].iter().rev() {
        if let WalkStep::Stop = walk.visit(node) {
            break;
        }
    }
    walk.owner
}

/// Split a table's rows into relationship and property data rows.
pub fn scan_rows(table: &Table, mode: ScanMode) -> (TableKind, Vec<DataRow>) {
    match mode {
        ScanMode::Full => scan_marked_rows(table),
        ScanMode::Summary => {
            let rows = table
                .rows
                .iter()
                .filter(|cells| cells.len() >= MIN_RELATIONSHIP_CELLS)
                .map(|cells| DataRow::Relationship(cells.clone()))
                .collect();
            (TableKind::Relationship, rows)
        }
    }
}

fn scan_marked_rows(table: &Table) -> (TableKind, Vec<DataRow>) {
    let mut kind = TableKind::Unclassified;
    let mut in_data_region = false;
    // Set by the reverse marker; nothing later in the table is data
    let mut region_closed = false;
    let mut rows = Vec::new();

    for cells in &table.rows {
        let mut content = Vec::new();
        for cell in cells {
            if in_data_region {
                content.push(cell.clone());
            }
            if cell.contains(PROPERTY_MARKER) {
                kind = TableKind::Property;
                break;
            }
            if cell.contains(PROPERTY_HEADER_MARKER) && kind == TableKind::Property {
                in_data_region = !region_closed;
                break;
            }
            if cell.contains(RELATIONSHIP_MARKER) {
                kind = TableKind::Relationship;
                in_data_region = !region_closed;
                break;
            }
            if cell.contains(REVERSE_MARKER) {
                in_data_region = false;
                region_closed = true;
            }
        }

        match kind {
            TableKind::Relationship if content.len() == RELATIONSHIP_ROW_CELLS => {
                rows.push(DataRow::Relationship(content));
            }
            TableKind::Property if !content.is_empty() => {
                rows.push(DataRow::Property(content));
            }
            _ => {}
        }
    }

    (kind, rows)
}

/// Owner and data rows of the table at `table_pos`, or `None` when the table is
/// outside the scan, has no owner, or never shows a marker.
pub fn classify_table(
    nodes: &[Node],
    table_pos: usize,
    table: &Table,
    mode: ScanMode,
) -> Option<ClassifiedTable> {
    if mode == ScanMode::Summary && !table.is_summary {
        return None;
    }

    let owner = find_owner(nodes, table_pos)?;
    let (kind, rows) = scan_rows(table, mode);
    if kind == TableKind::Unclassified {
        return None;
    }

    log::debug!("Table owned by {}: {:?} ({} data rows)", owner, kind, rows.len());
    Some(ClassifiedTable { owner, kind, rows })
}
