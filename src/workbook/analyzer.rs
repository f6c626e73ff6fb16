//! Batch field-context extraction
//!
//! Turns a list of raw field references for one chart into one context
//! block per distinct field, ready for the documentation writer.

use serde::Serialize;
use serde_json::Value;

use super::context::ContextGenerator;
use super::document::WorkbookDocument;
use super::knowledge;
use crate::normalize::{clean_field_parts, is_no_field, normalize_key};

/// Parallel lists: `field_contexts[i]` describes `field_names[i]`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FieldContexts {
    pub field_names: Vec<String>,
    pub field_contexts: Vec<String>,
    pub total_count: usize,
}

/// Accept a JSON list, a JSON object of lists, or comma-separated text.
pub fn parse_targets(raw: &str) -> Vec<String> {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Array(items)) => items.iter().filter_map(value_text).collect(),
        Ok(Value::Object(map)) => map
            .values()
            .filter_map(Value::as_array)
            .flatten()
            .filter_map(value_text)
            .collect(),
        _ => raw.split(',').map(str::to_string).collect(),
    }
}

fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Object(obj) => obj.get("field").and_then(value_text),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

/// Clean, decompose and de-duplicate targets.
///
/// Returns `(registry key, field name)` pairs in first-seen order.
pub fn clean_target_list(targets: &[String]) -> Vec<(String, String)> {
    let mut out: Vec<(String, String)> = Vec::new();
    for target in targets {
        if is_no_field(target) {
            continue;
        }
        for part in clean_field_parts(target.trim()) {
            let key = normalize_key(&part);
            if !out.iter().any(|(k, _)| *k == key) {
                out.push((key, part));
            }
        }
    }
    out
}

/// Context block for every distinct target field of one workbook.
pub fn extract_field_contexts(document: &WorkbookDocument, targets: &[String]) -> FieldContexts {
    let kb = knowledge::build(&document.root);
    let generator = ContextGenerator::new(&kb, document);

    let mut result = FieldContexts::default();
    for (key, name) in clean_target_list(targets) {
        let block = generator.generate(&key);
        result.field_names.push(name);
        result.field_contexts.push(block.render());
    }
    result.total_count = result.field_names.len();

    tracing::info!(
        fields = result.total_count,
        registry = kb.registry.len(),
        "extracted field contexts"
    );
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_targets_shapes() {
        assert_eq!(parse_targets(r#"["A", "B"]"#), vec!["A", "B"]);
        assert_eq!(
            parse_targets(r#"{"Dimensions": ["A"], "note": "x", "Measures": [{"field": "B"}]}"#),
            vec!["A", "B"]
        );
        assert_eq!(parse_targets("A, B"), vec!["A", " B"]);
    }

    #[test]
    fn test_clean_target_list_dedupes_in_order() {
        let targets: Vec<String> = ["[INDEX] * [Capacity]", "none", "capacity", "sum:Date-Seen", "Date Seen"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let cleaned = clean_target_list(&targets);
        let names: Vec<&str> = cleaned.iter().map(|(_, n)| n.as_str()).collect();
        assert_eq!(names, vec!["INDEX", "Capacity", "Date-Seen"]);
        assert_eq!(cleaned[2].0, "dateseen");
    }

    #[test]
    fn test_extract_field_contexts() {
        let xml = r#"<workbook><datasource>
            <column caption='Capacity' datatype='real' name='[Capacity]' role='measure' />
        </datasource></workbook>"#;
        let doc = WorkbookDocument::parse(xml).unwrap();
        let targets = vec!["sum:Capacity:qk".to_string(), "Unknown".to_string()];
        let result = extract_field_contexts(&doc, &targets);
        assert_eq!(result.total_count, 2);
        assert_eq!(result.field_names, vec!["Capacity", "Unknown"]);
        assert!(result.field_contexts[0].starts_with("FIELD: [Capacity] (Native real)"));
        assert_eq!(result.field_contexts[1], "Field not found in metadata");
    }
}
