//! Flattened view of the specification HTML.
//!
//! The body is reduced to an ordered list of headings, paragraphs and tables so
//! the classifier can walk backwards from any table without touching the DOM.

use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;

/// One structural element, in document order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// `h1`..`h4`
    Heading { level: u8, text: String },
    Paragraph {
        text: String,
        /// Carries the inline-styled span used for "Type Name" labels
        has_type_label: bool,
    },
    Table(Table),
}

impl Node {
    /// Text used for "Type Name" detection; tables have none.
    pub fn text(&self) -> Option<&str> {
        match self {
            Node::Heading { text, .. } | Node::Paragraph { text, .. } => Some(text),
            Node::Table(_) => None,
        }
    }
}

/// A table reduced to its rows of cell text
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    pub rows: Vec<Vec<String>>,
    /// Matched the summary-table selector
    pub is_summary: bool,
}

/// Ordered structural nodes of a parsed document
#[derive(Debug, Clone, Default)]
pub struct Document {
    nodes: Vec<Node>,
}

impl Document {
    /// Parse HTML and flatten `body` into headings, paragraphs and tables.
    ///
    /// Paragraphs inside tables are kept as well: they precede later tables in
    /// document order and can carry type labels of their own.
    pub fn parse(html: &str, type_label_style: &str, summary: Option<&Selector>) -> Self {
        let html = Html::parse_document(html);
        let summary_ids: HashSet<_> = summary
            .map(|selector| html.select(selector).map(|table| table.id()).collect())
            .unwrap_or_default();
        let label_style = normalize_style(type_label_style);

        let root = html.root_element();
        let body = match Selector::parse("body") {
            Ok(selector) => root.select(&selector).next().unwrap_or(root),
            Err(_) => root,
        };

        let mut nodes = Vec::new();
        for descendant in body.descendants() {
            let Some(element) = ElementRef::wrap(descendant) else {
                continue;
            };
            let node = match element.value().name() {
                "h1" | "h2" | "h3" | "h4" => Node::Heading {
                    level: heading_level(element.value().name()),
                    text: normalize_text(&element.text().collect::<String>()),
                },
                "p" => Node::Paragraph {
                    text: normalize_text(&element.text().collect::<String>()),
                    has_type_label: has_label_span(element, &label_style),
                },
                "table" => Node::Table(Table {
                    rows: table_rows(element),
                    is_summary: summary_ids.contains(&element.id()),
                }),
                _ => continue,
            };
            nodes.push(node);
        }

        Self { nodes }
    }

    pub fn from_nodes(nodes: Vec<Node>) -> Self {
        Self { nodes }
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Positions and contents of every table, in document order
    pub fn tables(&self) -> impl Iterator<Item = (usize, &Table)> {
        self.nodes.iter().enumerate().filter_map(|(idx, node)| match node {
            Node::Table(table) => Some((idx, table)),
            _ => None,
        })
    }

    pub fn paragraphs(&self) -> impl Iterator<Item = (&str, bool)> {
        self.nodes.iter().filter_map(|node| match node {
            Node::Paragraph { text, has_type_label } => Some((text.as_str(), *has_type_label)),
            _ => None,
        })
    }
}

fn heading_level(name: &str) -> u8 {
    name[1..].parse().unwrap_or(0)
}

/// Direct child `span` whose inline style equals the label style.
fn has_label_span(paragraph: ElementRef<'_>, label_style: &str) -> bool {
    paragraph
        .children()
        .filter_map(ElementRef::wrap)
        .filter(|child| child.value().name() == "span")
        .any(|span| {
            span.value()
                .attr("style")
                .map(|style| normalize_style(style) == label_style)
                .unwrap_or(false)
        })
}

fn normalize_style(style: &str) -> String {
    style
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .trim_end_matches(';')
        .to_ascii_lowercase()
}

fn table_rows(table: ElementRef<'_>) -> Vec<Vec<String>> {
    let (Ok(tr), Ok(td), Ok(p)) = (
        Selector::parse("tr"),
        Selector::parse("td"),
        Selector::parse("p"),
    ) else {
        return Vec::new();
    };

    table
        .select(&tr)
        .map(|row| row.select(&td).map(|cell| cell_text(cell, &p)).collect())
        .collect()
}

/// Concatenated paragraph text of a cell; cells without paragraphs use their own text.
fn cell_text(cell: ElementRef<'_>, p: &Selector) -> String {
    let mut paragraphs = cell.select(p).peekable();
    let raw: String = if paragraphs.peek().is_some() {
        paragraphs.flat_map(|para| para.text()).collect()
    } else {
        cell.text().collect()
    };
    normalize_text(&raw)
}

/// Drop carriage returns, turn newlines and non-breaking spaces into spaces,
/// collapse doubled spaces, trim.
pub fn normalize_text(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        let c = match c {
            '\r' => continue,
            '\n' | '\t' | '\u{a0}' => ' ',
            other => other,
        };
        if c == ' ' && out.ends_with(' ') {
            continue;
        }
        out.push(c);
    }
    out.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const STYLE: &str = "font-family:Consolas;color:#C7254E;background:#F9F2F4";

    #[test]
    fn test_node_text() {
        let heading = Node::Heading {
            level: 2,
            text: "4.1 Malware".to_string(),
        };
        assert_eq!(heading.text(), Some("4.1 Malware"));
        assert_eq!(Node::Table(Table::default()).text(), None);
    }

    #[test]
    fn test_normalize_text() {
        assert_eq!(normalize_text("  uses,\r\n  targets "), "uses, targets");
        assert_eq!(normalize_text("a\u{a0}\u{a0}b"), "a b");
        assert_eq!(normalize_text(""), "");
    }

    #[test]
    fn test_parse_flattens_in_order() {
        let html = format!(
            r#"<html><body><div>
                <h2>4.1 Malware</h2>
                <p><span style="{STYLE}">Type Name: malware</span></p>
                <p>Some prose.</p>
                <table><tr><td><p>Source</p></td><td><p>Relationship Type</p></td></tr></table>
            </div></body></html>"#
        );
        let doc = Document::parse(&html, STYLE, None);
        let nodes = doc.nodes();
        assert!(matches!(&nodes[0], Node::Heading { level: 2, text } if text == "4.1 Malware"));
        assert!(matches!(
            &nodes[1],
            Node::Paragraph { has_type_label: true, text } if text == "Type Name: malware"
        ));
        assert!(matches!(&nodes[2], Node::Paragraph { has_type_label: false, .. }));
        let tables: Vec<_> = doc.tables().collect();
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].0, 3);
        assert_eq!(
            tables[0].1.rows,
            vec![vec!["Source".to_string(), "Relationship Type".to_string()]]
        );
    }

    #[test]
    fn test_label_span_must_be_direct_child() {
        let html = format!(
            concat!(
                r#"<body><p><b><span style="{}">Type Name: x</span></b></p>"#,
                r#"<p><span style="{}">Type Name: y</span></p></body>"#,
            ),
            STYLE,
            "font-family: Consolas; color:#C7254E; background:#F9F2F4;"
        );
        let doc = Document::parse(&html, STYLE, None);
        let labels: Vec<bool> = doc.paragraphs().map(|(_, label)| label).collect();
        assert_eq!(labels, vec![false, true]);
    }

    #[test]
    fn test_cell_text_joins_paragraphs() {
        let html = r#"<body><table>
            <tr><td><p>tool,</p><p> identity</p></td><td>plain   cell</td><th>header</th></tr>
        </table></body>"#;
        let doc = Document::parse(html, STYLE, None);
        let (_, table) = doc.tables().next().unwrap();
        assert_eq!(table.rows[0], vec!["tool, identity".to_string(), "plain cell".to_string()]);
    }

    #[test]
    fn test_summary_selector_marks_tables() {
        let html = r#"<body>
            <table class="summary"><tr><td>a</td></tr></table>
            <table><tr><td>b</td></tr></table>
        </body>"#;
        let selector = Selector::parse("table.summary").unwrap();
        let doc = Document::parse(html, STYLE, Some(&selector));
        let flags: Vec<bool> = doc.tables().map(|(_, t)| t.is_summary).collect();
        assert_eq!(flags, vec![true, false]);
    }
}
