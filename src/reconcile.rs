//! Field/chart extraction reconciler
//!
//! The classification oracle answers with a JSON object of axis lists, a
//! flat JSON list, or free text. [`RawClassification::parse`] sorts the
//! answer into one of those shapes, [`RawClassification::extracted_fields`]
//! flattens it into [`ExtractedField`]s and [`reconcile`] deduplicates them
//! by strict normalized key, keeping first-seen order and display names.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::normalize::{clean_field_parts, is_no_field, normalize_key_strict};

/// Axis keys read from a structured answer, in output order.
pub const AXIS_KEYS: &[&str] = &["Vertical", "Horizontal", "Dimensions", "Measures"];

/// One raw field mention from the classifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedField {
    pub field: String,
    /// `None` means the caller derives a human name itself.
    pub display_name: Option<String>,
}

impl ExtractedField {
    pub fn new(field: impl Into<String>, display_name: Option<&str>) -> Self {
        Self {
            field: field.into(),
            display_name: display_name.and_then(normalize_display_name),
        }
    }
}

/// Classifier output sorted by shape.
#[derive(Debug, Clone, PartialEq)]
pub enum RawClassification {
    StructuredObject(Map<String, Value>),
    FlatList(Vec<Value>),
    OpaqueText(String),
}

impl RawClassification {
    /// Never fails: anything that is not a JSON object or list is text.
    pub fn parse(raw: &str) -> Self {
        let body = strip_code_fence(raw);
        match serde_json::from_str::<Value>(body) {
            Ok(Value::Object(map)) => RawClassification::StructuredObject(map),
            Ok(Value::Array(items)) => RawClassification::FlatList(items),
            Ok(Value::String(text)) => RawClassification::OpaqueText(text),
            Ok(other) => RawClassification::OpaqueText(other.to_string()),
            Err(e) => {
                let trimmed = body.trim_start();
                if trimmed.starts_with('{') || trimmed.starts_with('[') {
                    tracing::warn!(error = %e, "classification output is malformed JSON, reading it as text");
                }
                RawClassification::OpaqueText(body.to_string())
            }
        }
    }

    /// Canonical field list, in answer order, before deduplication.
    pub fn extracted_fields(&self) -> Vec<ExtractedField> {
        let mut out = Vec::new();
        match self {
            RawClassification::StructuredObject(map) => {
                let has_axes = AXIS_KEYS.iter().any(|k| map.contains_key(*k));
                if has_axes {
                    for key in AXIS_KEYS {
                        if let Some(value) = map.get(*key) {
                            collect_axis(value, &mut out);
                        }
                    }
                } else {
                    for value in map.values() {
                        if let Value::Array(items) = value {
                            items.iter().for_each(|item| collect_item(item, &mut out));
                        }
                    }
                }
            }
            RawClassification::FlatList(items) => {
                items.iter().for_each(|item| collect_item(item, &mut out));
            }
            RawClassification::OpaqueText(text) => collect_comma_text(text, &mut out),
        }
        out
    }
}

/// Result of reconciliation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Reconciliation {
    pub field_names: Vec<String>,
    pub display_name_map: BTreeMap<String, String>,
}

impl Reconciliation {
    pub fn total_count(&self) -> usize {
        self.field_names.len()
    }

    pub fn display_name(&self, field: &str) -> Option<&str> {
        self.display_name_map.get(field).map(String::as_str)
    }
}

/// Parse and reconcile raw classifier output.
pub fn reconcile(raw: &str) -> Reconciliation {
    let fields = RawClassification::parse(raw).extracted_fields();
    let result = reconcile_fields(&fields);
    tracing::debug!(
        mentions = fields.len(),
        fields = result.field_names.len(),
        "reconciled classification output"
    );
    result
}

/// Deduplicate extracted fields by strict key; first occurrence wins.
///
/// Compound mentions (`[A] * [B]`) are split into their parts. A display
/// name only survives when the mention names a single field.
pub fn reconcile_fields(fields: &[ExtractedField]) -> Reconciliation {
    let mut seen: HashSet<String> = HashSet::new();
    let mut result = Reconciliation::default();

    for extracted in fields {
        if is_no_field(&extracted.field) {
            continue;
        }
        let parts = clean_field_parts(extracted.field.trim());
        let display = if parts.len() == 1 {
            extracted.display_name.as_deref()
        } else {
            None
        };

        for part in parts {
            if !seen.insert(normalize_key_strict(&part)) {
                continue;
            }
            if let Some(display) = display {
                result
                    .display_name_map
                    .insert(part.clone(), display.to_string());
            }
            result.field_names.push(part);
        }
    }
    result
}

/// `"null"`, `"none"` and blank mean "no display name".
pub fn normalize_display_name(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty()
        || trimmed.eq_ignore_ascii_case("null")
        || trimmed.eq_ignore_ascii_case("none")
    {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // drop the info string (```json)
    let rest = rest.split_once('\n').map(|(_, body)| body).unwrap_or("");
    rest.trim_end().trim_end_matches("```").trim()
}

fn collect_axis(value: &Value, out: &mut Vec<ExtractedField>) {
    match value {
        Value::Array(items) => items.iter().for_each(|item| collect_item(item, out)),
        Value::String(text) => collect_comma_text(text, out),
        _ => {}
    }
}

fn collect_item(item: &Value, out: &mut Vec<ExtractedField>) {
    match item {
        Value::String(field) => out.push(ExtractedField::new(field.clone(), None)),
        Value::Object(obj) => {
            let Some(field) = obj.get("field").and_then(Value::as_str) else {
                return;
            };
            let display = obj.get("display_name").and_then(Value::as_str);
            out.push(ExtractedField::new(field, display));
        }
        Value::Number(n) => out.push(ExtractedField::new(n.to_string(), None)),
        _ => {}
    }
}

fn collect_comma_text(text: &str, out: &mut Vec<ExtractedField>) {
    out.extend(
        text.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| ExtractedField::new(s, None)),
    );
}
