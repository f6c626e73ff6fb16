//! Parsed workbook definition
//!
//! The vendor workbook is an XML document. It is parsed once with
//! tree-sitter into a small owned element tree that the knowledge base,
//! context generator and worksheet summary walk. The raw text is kept
//! alongside because filter member values are scraped from it directly.

use tree_sitter::{Node, Parser};

use crate::error::{FieldGraphError, Result};

/// One XML element with its attributes and mixed content.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct XmlElement {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlNode>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum XmlNode {
    Element(XmlElement),
    Text(String),
}

impl XmlElement {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Attribute value, treating an empty string as absent.
    pub fn attr_non_empty(&self, name: &str) -> Option<&str> {
        self.attr(name).filter(|v| !v.is_empty())
    }

    pub fn elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(|c| match c {
            XmlNode::Element(e) => Some(e),
            XmlNode::Text(_) => None,
        })
    }

    /// First direct child element named `name`.
    pub fn child(&self, name: &str) -> Option<&XmlElement> {
        self.elements().find(|e| e.name == name)
    }

    /// All descendant elements named `name`, in document order (self excluded).
    pub fn descendants(&self, name: &str) -> Vec<&XmlElement> {
        let mut found = Vec::new();
        self.collect_descendants(name, &mut found);
        found
    }

    fn collect_descendants<'a>(&'a self, name: &str, found: &mut Vec<&'a XmlElement>) {
        for child in self.elements() {
            if child.name == name {
                found.push(child);
            }
            child.collect_descendants(name, found);
        }
    }

    /// First descendant named `name` in document order.
    pub fn find_descendant(&self, name: &str) -> Option<&XmlElement> {
        for child in self.elements() {
            if child.name == name {
                return Some(child);
            }
            if let Some(found) = child.find_descendant(name) {
                return Some(found);
            }
        }
        None
    }

    /// Concatenated text of this element and all descendants.
    pub fn text(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        for child in &self.children {
            match child {
                XmlNode::Text(t) => out.push_str(t),
                XmlNode::Element(e) => e.collect_text(out),
            }
        }
    }

    /// Text directly inside this element (not descendants).
    pub fn own_text(&self) -> String {
        self.children
            .iter()
            .filter_map(|c| match c {
                XmlNode::Text(t) => Some(t.as_str()),
                XmlNode::Element(_) => None,
            })
            .collect()
    }
}

/// A parsed workbook plus the raw document text it came from.
#[derive(Debug, Clone)]
pub struct WorkbookDocument {
    pub root: XmlElement,
    pub raw: String,
}

impl WorkbookDocument {
    /// Parse workbook XML.
    ///
    /// Any syntax error fails the whole parse; callers decide whether to
    /// degrade to an empty document.
    pub fn parse(raw: impl Into<String>) -> Result<Self> {
        let raw = raw.into();
        let root = parse_xml(&raw)?;
        Ok(Self { root, raw })
    }

    /// Document with no content, used when a workbook could not be parsed.
    pub fn empty() -> Self {
        Self {
            root: XmlElement {
                name: "workbook".to_string(),
                ..XmlElement::default()
            },
            raw: String::new(),
        }
    }
}

fn parse_xml(source: &str) -> Result<XmlElement> {
    let mut parser = Parser::new();
    let language: tree_sitter::Language = tree_sitter_xml::LANGUAGE_XML.into();
    parser
        .set_language(&language)
        .map_err(|e| FieldGraphError::ParseFailure {
            message: format!("XML grammar unavailable: {}", e),
        })?;

    let tree = parser
        .parse(source, None)
        .ok_or_else(|| FieldGraphError::ParseFailure {
            message: "XML parser returned no tree".to_string(),
        })?;
    let root = tree.root_node();
    if root.has_error() {
        return Err(FieldGraphError::ParseFailure {
            message: format!(
                "malformed workbook XML near byte {}",
                first_error_offset(root).unwrap_or(0)
            ),
        });
    }

    let bytes = source.as_bytes();
    let mut cursor = root.walk();
    let top = root
        .named_children(&mut cursor)
        .find(|n| n.kind() == "element")
        .ok_or_else(|| FieldGraphError::ParseFailure {
            message: "workbook XML has no root element".to_string(),
        })?;

    Ok(convert_element(top, bytes))
}

fn first_error_offset(node: Node) -> Option<usize> {
    if node.is_error() || node.is_missing() {
        return Some(node.start_byte());
    }
    let mut cursor = node.walk();
    let children: Vec<Node> = node.children(&mut cursor).collect();
    children.into_iter().find_map(first_error_offset)
}

fn node_text<'a>(node: Node, bytes: &'a [u8]) -> &'a str {
    node.utf8_text(bytes).unwrap_or("")
}

fn convert_element(node: Node, bytes: &[u8]) -> XmlElement {
    let mut element = XmlElement::default();
    let mut cursor = node.walk();
    let children: Vec<Node> = node.named_children(&mut cursor).collect();

    for child in children {
        match child.kind() {
            "STag" | "EmptyElemTag" => read_tag(child, bytes, &mut element),
            "content" => {
                let mut inner_cursor = child.walk();
                let inner: Vec<Node> = child.named_children(&mut inner_cursor).collect();
                for item in inner {
                    push_content(item, bytes, &mut element);
                }
            }
            _ => push_content(child, bytes, &mut element),
        }
    }

    element
}

fn read_tag(tag: Node, bytes: &[u8], element: &mut XmlElement) {
    let mut cursor = tag.walk();
    let parts: Vec<Node> = tag.named_children(&mut cursor).collect();
    for part in parts {
        match part.kind() {
            "Name" if element.name.is_empty() => {
                element.name = node_text(part, bytes).to_string();
            }
            "Attribute" => {
                let mut attr_cursor = part.walk();
                let attr_parts: Vec<Node> = part.named_children(&mut attr_cursor).collect();
                let name = attr_parts
                    .iter()
                    .find(|n| n.kind() == "Name")
                    .map(|n| node_text(*n, bytes))
                    .unwrap_or("");
                let value = attr_parts
                    .iter()
                    .find(|n| n.kind() == "AttValue")
                    .map(|n| unquote(node_text(*n, bytes)))
                    .unwrap_or("");
                if !name.is_empty() {
                    element
                        .attributes
                        .push((name.to_string(), decode_entities(value)));
                }
            }
            _ => {}
        }
    }
}

fn push_content(node: Node, bytes: &[u8], element: &mut XmlElement) {
    match node.kind() {
        "element" => element
            .children
            .push(XmlNode::Element(convert_element(node, bytes))),
        "CharData" => push_text(element, node_text(node, bytes).to_string()),
        "EntityRef" | "CharRef" => push_text(element, decode_entities(node_text(node, bytes))),
        "CDSect" => {
            let raw = node_text(node, bytes);
            let inner = raw
                .strip_prefix("<![CDATA[")
                .and_then(|s| s.strip_suffix("]]>"))
                .unwrap_or(raw);
            push_text(element, inner.to_string());
        }
        _ => {}
    }
}

fn push_text(element: &mut XmlElement, text: String) {
    if let Some(XmlNode::Text(last)) = element.children.last_mut() {
        last.push_str(&text);
    } else {
        element.children.push(XmlNode::Text(text));
    }
}

fn unquote(value: &str) -> &str {
    let value = value.trim();
    if value.len() >= 2
        && ((value.starts_with('"') && value.ends_with('"'))
            || (value.starts_with('\'') && value.ends_with('\'')))
    {
        &value[1..value.len() - 1]
    } else {
        value
    }
}

/// Decode XML/HTML character references (`&amp;`, `&quot;`, `&#13;`, `&#x27;`).
///
/// Unknown named entities are left untouched.
pub fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        let decoded = tail.find(';').and_then(|semi| {
            let entity = &tail[1..semi];
            let ch = match entity {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                "nbsp" => Some('\u{a0}'),
                _ => entity.strip_prefix('#').and_then(|num| {
                    let code = match num.strip_prefix(['x', 'X']) {
                        Some(hex) => u32::from_str_radix(hex, 16).ok(),
                        None => num.parse::<u32>().ok(),
                    };
                    code.and_then(char::from_u32)
                }),
            };
            ch.map(|c| (c, semi))
        });
        match decoded {
            Some((c, semi)) => {
                out.push(c);
                rest = &tail[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}
