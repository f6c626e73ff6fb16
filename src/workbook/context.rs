//! Field context trees
//!
//! For a requested field, walks the knowledge base through calculated-field
//! dependencies and renders an indented text block describing each field:
//! its formula when calculated, otherwise the value constraints the workbook
//! declares for it (numeric filter range or categorical member values).
//! The rendered text is fed verbatim to the documentation writer, so the
//! exact line wording below is part of the contract.

use std::collections::{BTreeSet, HashSet};

use once_cell::sync::Lazy;
use percent_encoding::percent_decode_str;
use regex::Regex;

use super::document::{decode_entities, WorkbookDocument, XmlElement};
use super::knowledge::{FieldRecord, FieldRole, KnowledgeBase};
use crate::normalize::normalize_key;

/// Recursion stops once depth exceeds this.
pub const MAX_DEPTH: usize = 5;

/// Categorical samples shown before truncating with `...`.
pub const MAX_CATEGORY_SAMPLES: usize = 15;

const NULL_MEMBER: &str = "%null%";

static BRACKETED_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[([^\]]+)\]").unwrap());

/// Rendered context for one field: ordered, indented lines.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContextBlock {
    lines: Vec<String>,
}

impl ContextBlock {
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn render(&self) -> String {
        self.lines.join("\n")
    }
}

impl std::fmt::Display for ContextBlock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.render())
    }
}

/// Generate the context block for `field_key` (a normalized key).
pub fn generate(field_key: &str, kb: &KnowledgeBase, document: &WorkbookDocument) -> ContextBlock {
    ContextGenerator::new(kb, document).generate(field_key)
}

/// Walks one workbook's knowledge base. Holds no state between calls.
pub struct ContextGenerator<'a> {
    kb: &'a KnowledgeBase,
    document: &'a WorkbookDocument,
}

impl<'a> ContextGenerator<'a> {
    pub fn new(kb: &'a KnowledgeBase, document: &'a WorkbookDocument) -> Self {
        Self { kb, document }
    }

    pub fn generate(&self, field_key: &str) -> ContextBlock {
        let mut lines = Vec::new();
        self.walk(field_key, 0, &HashSet::new(), &mut lines);
        ContextBlock { lines }
    }

    /// `visited` holds the keys of ancestors only; each dependency branch
    /// gets its own copy so siblings never see each other.
    fn walk(&self, key: &str, depth: usize, visited: &HashSet<String>, lines: &mut Vec<String>) {
        let indent = "  ".repeat(depth);
        let prefix = if depth > 0 { "└─ " } else { "" };

        if depth > MAX_DEPTH {
            lines.push(format!("{indent}{prefix}(Max depth reached)"));
            return;
        }
        if visited.contains(key) {
            lines.push(format!("{indent}{prefix}(Recursive reference loop)"));
            return;
        }

        let mut branch_visited = visited.clone();
        branch_visited.insert(key.to_string());

        let Some(info) = self.kb.registry.get(key) else {
            lines.push(format!("{indent}{prefix}Field not found in metadata"));
            return;
        };

        match info.formula.as_deref() {
            Some(formula) if info.is_calculated => {
                let human_formula = self.kb.translations.translate(formula);
                lines.push(format!(
                    "{indent}{prefix}FIELD: [{}] (Calculation)",
                    info.raw_name
                ));
                lines.push(format!("{indent}   Formula: {human_formula}"));

                for dependency in dependency_names(&human_formula) {
                    let dep_key = normalize_key(&dependency);
                    if dep_key != key {
                        self.walk(&dep_key, depth + 1, &branch_visited, lines);
                    }
                }
            }
            _ => {
                lines.push(format!(
                    "{indent}{prefix}FIELD: [{}] (Native {})",
                    info.raw_name, info.datatype
                ));
                lines.push(format!("{indent}   {}", self.native_values_line(info)));
            }
        }
    }

    fn native_values_line(&self, info: &FieldRecord) -> String {
        if info.role == FieldRole::Measure && info.is_numeric() {
            match scrape_range_limits(&info.bare_name(), &self.document.root) {
                Some(range) => format!("Filter Range Found: {range}"),
                None => "Values: (Numeric Measure - No hardcoded filter range found)".to_string(),
            }
        } else {
            let values = scrape_filter_values(&info.bare_name(), &self.document.raw);
            if values.is_empty() {
                "Values: (No explicit filter values)".to_string()
            } else {
                let shown: Vec<&str> = values
                    .iter()
                    .take(MAX_CATEGORY_SAMPLES)
                    .map(String::as_str)
                    .collect();
                let ellipsis = if values.len() > MAX_CATEGORY_SAMPLES {
                    "..."
                } else {
                    ""
                };
                format!("Categories: {}{}", shown.join(", "), ellipsis)
            }
        }
    }
}

/// Unique bracketed names in a translated formula, sorted.
pub fn dependency_names(translated_formula: &str) -> BTreeSet<String> {
    BRACKETED_NAME
        .captures_iter(translated_formula)
        .map(|c| c[1].to_string())
        .collect()
}

/// First quantitative filter bound to `field_name`, as `Min: x, Max: y`.
///
/// Bounds come from `min`/`max` attributes or child elements; a missing
/// bound renders as `-Inf` / `Inf`. Filters with neither bound are ignored.
pub fn scrape_range_limits(field_name: &str, root: &XmlElement) -> Option<String> {
    root.descendants("filter").into_iter().find_map(|filter| {
        let column = filter.attr("column")?;
        if !column.contains(field_name) {
            return None;
        }
        let bound = |name: &str| -> Option<String> {
            filter
                .attr(name)
                .map(str::to_string)
                .or_else(|| filter.child(name).map(XmlElement::text))
                .filter(|v| !v.is_empty())
        };
        let min = bound("min");
        let max = bound("max");
        if min.is_none() && max.is_none() {
            return None;
        }
        Some(format!(
            "Min: {}, Max: {}",
            min.as_deref().unwrap_or("-Inf"),
            max.as_deref().unwrap_or("Inf")
        ))
    })
}

/// Categorical filter member values bound to `field_name`, scraped from
/// the raw workbook text: decoded, de-duplicated and sorted.
pub fn scrape_filter_values(field_name: &str, raw_document: &str) -> Vec<String> {
    if field_name.is_empty() || raw_document.is_empty() {
        return Vec::new();
    }

    let pattern = format!(
        r"(?is)level='[^']*{}[^']*'.*?member='([^']*)'",
        regex::escape(field_name)
    );
    let Ok(re) = Regex::new(&pattern) else {
        tracing::warn!(field = field_name, "could not build member-value pattern");
        return Vec::new();
    };

    let mut values: BTreeSet<String> = BTreeSet::new();
    for caps in re.captures_iter(raw_document) {
        let value = decode_entities(&caps[1]).replace('"', "");
        let value = percent_decode_str(&value).decode_utf8_lossy().into_owned();
        if !value.is_empty() && !value.eq_ignore_ascii_case(NULL_MEMBER) {
            values.insert(value);
        }
    }
    values.into_iter().collect()
}
