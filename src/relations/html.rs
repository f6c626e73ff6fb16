//! Related-section editing for published documents
//!
//! Published HTML is a flat run of blocks (`<p>`, `<ul>`, `<hr>`, ...).
//! A related section is a heading paragraph, a list and a spacer:
//!
//! ```text
//! <p><strong>Related Charts:</strong></p><ul><li>..</li></ul><p>&nbsp;</p>
//! ```
//!
//! The document is parsed with tree-sitter-html into top-level blocks by byte
//! range. Sections are replaced or inserted by splicing those ranges, so
//! everything outside the section is kept byte for byte.

use std::collections::HashMap;

use serde_json::Value;
use tree_sitter::{Node, Parser};

use super::edge::RelationshipEdge;
use crate::ledger::BatchLookup;

pub const SPACER: &str = "<p>&nbsp;</p>";
pub const DIVIDER: &str = "<hr>";

const SPACER_FORMS: &[&str] = &["<p>&nbsp;</p>", "<p>&#160;</p>", "<p>\u{a0}</p>", "<p></p>"];

/// Escape text for use in element content or a double-quoted attribute.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

/// Heading paragraph for a section label.
pub fn section_heading(label: &str) -> String {
    format!("<p><strong>{}:</strong></p>", escape_html(label))
}

fn render_item(edge: &RelationshipEdge) -> Option<String> {
    let title = escape_html(edge.subject_title.trim());
    let url = escape_html(edge.subject_url.trim());
    match (title.is_empty(), url.is_empty()) {
        (true, true) => None,
        (false, true) => Some(format!("<li>{}</li>", title)),
        (true, false) => Some(format!("<li><a href=\"{0}\" target=\"_blank\">{0}</a></li>", url)),
        (false, false) => Some(format!(
            "<li><a href=\"{}\" target=\"_blank\">{}</a></li>",
            url, title
        )),
    }
}

/// Render a related section, or `None` when no edge is renderable.
pub fn render_section(label: &str, edges: &[RelationshipEdge]) -> Option<String> {
    let items: Vec<String> = edges.iter().filter_map(render_item).collect();
    if items.is_empty() {
        return None;
    }
    Some(format!(
        "{}<ul>{}</ul>{}",
        section_heading(label),
        items.concat(),
        SPACER
    ))
}

// ============================================
// Block scan
// ============================================

#[derive(Debug, Clone, PartialEq, Eq)]
enum BlockKind {
    Paragraph(String),
    Spacer,
    Divider,
    List,
    Other,
}

#[derive(Debug, Clone)]
struct Block {
    start: usize,
    end: usize,
    kind: BlockKind,
}

fn squash(text: &str) -> String {
    text.chars().filter(|c| !c.is_whitespace() || *c == '\u{a0}').collect()
}

fn tag_name(node: Node, bytes: &[u8]) -> Option<String> {
    let mut cursor = node.walk();
    let tag = node
        .named_children(&mut cursor)
        .find(|c| c.kind() == "start_tag" || c.kind() == "self_closing_tag")?;
    let mut tag_cursor = tag.walk();
    let name = tag
        .named_children(&mut tag_cursor)
        .find(|c| c.kind() == "tag_name")?;
    Some(name.utf8_text(bytes).ok()?.to_ascii_lowercase())
}

fn scan_blocks(html: &str) -> Vec<Block> {
    let mut parser = Parser::new();
    let language: tree_sitter::Language = tree_sitter_html::LANGUAGE.into();
    if let Err(e) = parser.set_language(&language) {
        tracing::warn!(error = %e, "HTML grammar unavailable");
        return Vec::new();
    }
    let Some(tree) = parser.parse(html, None) else {
        return Vec::new();
    };
    let root = tree.root_node();
    if root.has_error() {
        tracing::debug!("published HTML has syntax errors, editing top-level blocks only");
    }

    let bytes = html.as_bytes();
    let mut cursor = root.walk();
    root.named_children(&mut cursor)
        .map(|node| {
            let source = &html[node.start_byte()..node.end_byte()];
            let kind = if node.kind() != "element" {
                BlockKind::Other
            } else {
                match tag_name(node, bytes).as_deref() {
                    Some("hr") => BlockKind::Divider,
                    Some("ul") | Some("ol") => BlockKind::List,
                    Some("p") => {
                        let squashed = squash(source);
                        if SPACER_FORMS.iter().any(|s| squashed.eq_ignore_ascii_case(s)) {
                            BlockKind::Spacer
                        } else {
                            BlockKind::Paragraph(squashed)
                        }
                    }
                    _ => BlockKind::Other,
                }
            };
            Block {
                start: node.start_byte(),
                end: node.end_byte(),
                kind,
            }
        })
        .collect()
}

/// Byte range of an existing section: heading, optional list, optional spacer.
fn find_section(blocks: &[Block], label: &str) -> Option<(usize, usize)> {
    let heading = squash(&section_heading(label));
    let index = blocks.iter().position(|b| match &b.kind {
        BlockKind::Paragraph(text) => text.eq_ignore_ascii_case(&heading),
        _ => false,
    })?;

    let start = blocks[index].start;
    let mut end = blocks[index].end;
    let mut next = index + 1;
    if blocks.get(next).map(|b| &b.kind) == Some(&BlockKind::List) {
        end = blocks[next].end;
        next += 1;
    }
    if blocks.get(next).map(|b| &b.kind) == Some(&BlockKind::Spacer) {
        end = blocks[next].end;
    }
    Some((start, end))
}

/// Replace the section labelled `label`, or insert it before the last
/// top-level divider, or append it.
///
/// With no renderable edges the document is returned unchanged.
pub fn inject_or_replace_section(existing_html: &str, label: &str, edges: &[RelationshipEdge]) -> String {
    let Some(section) = render_section(label, edges) else {
        return existing_html.to_string();
    };
    let blocks = scan_blocks(existing_html);

    if let Some((start, end)) = find_section(&blocks, label) {
        return splice(existing_html, start, end, &section);
    }
    if let Some(divider) = blocks.iter().rev().find(|b| b.kind == BlockKind::Divider) {
        return splice(existing_html, divider.start, divider.start, &section);
    }
    let mut out = existing_html.to_string();
    out.push_str(&section);
    out
}

fn splice(html: &str, start: usize, end: usize, replacement: &str) -> String {
    let mut out = String::with_capacity(html.len() + replacement.len());
    out.push_str(&html[..start]);
    out.push_str(replacement);
    out.push_str(&html[end..]);
    out
}

// ============================================
// Field links
// ============================================

/// Documentation link for one field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldLink {
    pub human: String,
    pub url: String,
}

pub type FieldLinks = HashMap<String, FieldLink>;

/// Link table from a ledger batch lookup over `names`.
pub fn field_links(names: &[String], lookup: &BatchLookup) -> FieldLinks {
    lookup
        .found(names)
        .map(|(name, human, url)| {
            (
                name.trim().to_string(),
                FieldLink {
                    human: if human.is_empty() { name.trim() } else { human }.to_string(),
                    url: url.to_string(),
                },
            )
        })
        .collect()
}

/// Items of an axis value: a JSON list or comma-separated text.
pub fn axis_items(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .iter()
            .filter_map(|v| match v {
                Value::String(s) => Some(s.clone()),
                Value::Object(obj) => obj.get("field").and_then(Value::as_str).map(str::to_string),
                Value::Null => None,
                other => Some(other.to_string()),
            })
            .collect(),
        Value::String(text) => text.split(',').map(str::to_string).collect(),
        _ => Vec::new(),
    }
}

/// Render axis items joined by `", "`, linking the ones `links` knows.
pub fn link_fields(items: &[String], links: &FieldLinks) -> String {
    items
        .iter()
        .map(|item| item.trim())
        .filter(|item| !item.is_empty())
        .map(|item| match links.get(item) {
            Some(link) if !link.url.is_empty() => format!(
                "<a href=\"{}\">{}</a>",
                escape_html(&link.url),
                escape_html(&link.human)
            ),
            Some(link) => escape_html(&link.human),
            None => escape_html(item),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn edge(title: &str, url: &str) -> RelationshipEdge {
        RelationshipEdge {
            subject_title: title.to_string(),
            subject_url: url.to_string(),
            object_title: "Capacity".to_string(),
            object_url: String::new(),
        }
    }

    const FIELD_DOC: &str = "<p><strong>Capacity</strong></p><p>&nbsp;</p><p>Installed capacity.</p><p>&nbsp;</p><hr><p>Footer</p>";

    #[test]
    fn test_titles_and_urls_are_escaped() {
        let edges = [edge("A & <B>", "https://help/x?a=1&b=\"2\"")];
        let section = render_section("Related Charts", &edges).unwrap();
        assert!(section.contains(
            "<li><a href=\"https://help/x?a=1&amp;b=&quot;2&quot;\" target=\"_blank\">A &amp; &lt;B&gt;</a></li>"
        ));

        let once = inject_or_replace_section(FIELD_DOC, "Related Charts", &edges);
        assert_eq!(inject_or_replace_section(&once, "Related Charts", &edges), once);
        assert!(once.ends_with("<hr><p>Footer</p>"));

        let mut links = FieldLinks::new();
        links.insert(
            "Cost".into(),
            FieldLink {
                human: "Cost <USD>".into(),
                url: String::new(),
            },
        );
        assert_eq!(
            link_fields(&["Cost".to_string(), "P&L".to_string()], &links),
            "Cost &lt;USD&gt;, P&amp;L"
        );
    }
    #[test]
    fn test_render_section_items() {
        let html = render_section(
            "Related Charts",
            &[edge("Chart A", "https://help/a"), edge("Chart B", ""), edge("", "")],
        )
        .unwrap();
        assert_eq!(
            html,
            "<p><strong>Related Charts:</strong></p><ul>\
             <li><a href=\"https://help/a\" target=\"_blank\">Chart A</a></li>\
             <li>Chart B</li></ul><p>&nbsp;</p>"
        );
        assert!(render_section("Related Charts", &[edge(" ", "")]).is_none());
    }

    #[test]
    fn test_insert_before_last_divider() {
        let updated = inject_or_replace_section(FIELD_DOC, "Related Charts", &[edge("Chart A", "u")]);
        assert_eq!(
            updated,
            "<p><strong>Capacity</strong></p><p>&nbsp;</p><p>Installed capacity.</p><p>&nbsp;</p>\
             <p><strong>Related Charts:</strong></p><ul><li><a href=\"u\" target=\"_blank\">Chart A</a></li></ul><p>&nbsp;</p>\
             <hr><p>Footer</p>"
        );
    }

    #[test]
    fn test_replace_is_idempotent() {
        let edges = vec![edge("Chart A", "u"), edge("Chart B", "v")];
        let once = inject_or_replace_section(FIELD_DOC, "Related Charts", &edges[..1]);
        let twice = inject_or_replace_section(&once, "Related Charts", &edges);
        let thrice = inject_or_replace_section(&twice, "Related Charts", &edges);
        assert_eq!(twice, thrice);
        assert_eq!(twice.matches("Related Charts:").count(), 1);
        assert!(twice.contains("Chart B"));
        assert!(twice.ends_with("<hr><p>Footer</p>"));
    }

    #[test]
    fn test_replace_keeps_other_sections() {
        let doc = "<p>Intro</p>\n<p><strong>Related Articles:</strong></p>\n<ul><li>Old</li></ul>\n<p>&nbsp;</p>\n<p><strong>Related Charts:</strong></p><ul><li>Old chart</li></ul><p>&nbsp;</p>\n<hr>";
        let updated = inject_or_replace_section(doc, "Related Articles", &[edge("New", "")]);
        assert_eq!(
            updated,
            "<p>Intro</p>\n<p><strong>Related Articles:</strong></p><ul><li>New</li></ul><p>&nbsp;</p>\n<p><strong>Related Charts:</strong></p><ul><li>Old chart</li></ul><p>&nbsp;</p>\n<hr>"
        );
    }

    #[test]
    fn test_append_without_divider() {
        let updated = inject_or_replace_section("<p>Body</p>", "Related Articles", &[edge("X", "")]);
        assert_eq!(
            updated,
            "<p>Body</p><p><strong>Related Articles:</strong></p><ul><li>X</li></ul><p>&nbsp;</p>"
        );
        assert_eq!(inject_or_replace_section("<p>Body</p>", "Related Articles", &[]), "<p>Body</p>");
    }

    #[test]
    fn test_link_fields() {
        let mut links = FieldLinks::new();
        links.insert(
            "Capacity".into(),
            FieldLink {
                human: "System Capacity".into(),
                url: "https://help/1".into(),
            },
        );
        links.insert(
            "Region".into(),
            FieldLink {
                human: "Sales Region".into(),
                url: String::new(),
            },
        );
        let items = axis_items(&json!("Capacity, Region, State, "));
        assert_eq!(
            link_fields(&items, &links),
            "<a href=\"https://help/1\">System Capacity</a>, Sales Region, State"
        );
        assert_eq!(axis_items(&json!(["A", {"field": "B"}, null])), vec!["A", "B"]);
    }

    #[test]
    fn test_field_links_from_lookup() {
        let names = vec!["Capacity".to_string(), "State".to_string()];
        let lookup = BatchLookup {
            human_names: vec!["System Capacity".into(), String::new()],
            urls: vec!["https://help/1".into(), String::new()],
            missing: vec!["State".into()],
        };
        let links = field_links(&names, &lookup);
        assert_eq!(links.len(), 1);
        assert_eq!(links["Capacity"].url, "https://help/1");
    }
}
