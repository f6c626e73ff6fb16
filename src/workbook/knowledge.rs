//! Workbook knowledge base
//!
//! Builds the field registry (normalized key → [`FieldRecord`]) and the
//! identifier translation table used to turn raw formulas into readable
//! text. Both are rebuilt for every request and never persisted.

use std::collections::HashMap;

use serde::Serialize;

use super::document::XmlElement;
use crate::normalize::normalize_key;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldRole {
    Dimension,
    Measure,
}

impl FieldRole {
    /// Absent or unrecognised roles default to dimension.
    pub fn parse(role: Option<&str>) -> Self {
        match role {
            Some(r) if r.eq_ignore_ascii_case("measure") => Self::Measure,
            _ => Self::Dimension,
        }
    }
}

/// One column of the workbook, keyed in the registry by `normalized_key`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldRecord {
    /// Caption, or the raw column name when uncaptioned.
    pub raw_name: String,
    pub normalized_key: String,
    pub role: FieldRole,
    pub datatype: String,
    pub is_calculated: bool,
    /// Untranslated formula text, only for calculated fields.
    pub formula: Option<String>,
}

impl FieldRecord {
    pub fn is_numeric(&self) -> bool {
        matches!(self.datatype.as_str(), "integer" | "real")
    }

    /// `raw_name` without brackets, as used for filter lookups.
    pub fn bare_name(&self) -> String {
        self.raw_name.replace(['[', ']'], "")
    }
}

/// Fields of one workbook keyed by normalized key.
#[derive(Debug, Clone, Default)]
pub struct FieldRegistry {
    fields: HashMap<String, FieldRecord>,
}

impl FieldRegistry {
    pub fn get(&self, key: &str) -> Option<&FieldRecord> {
        self.fields.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Later inserts with the same key replace earlier ones.
    pub fn insert(&mut self, record: FieldRecord) {
        self.fields.insert(record.normalized_key.clone(), record);
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldRecord> {
        self.fields.values()
    }
}

/// Internal identifier → caption, applied longest identifier first.
#[derive(Debug, Clone, Default)]
pub struct IdTranslationTable {
    /// Sorted by identifier length, longest first.
    entries: Vec<(String, String)>,
}

impl IdTranslationTable {
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut map: HashMap<String, String> = HashMap::new();
        for (k, v) in pairs {
            map.insert(k.into(), v.into());
        }
        let mut entries: Vec<(String, String)> = map.into_iter().collect();
        // Longest first; ties broken by identifier so the order is deterministic.
        entries.sort_by(|(a, _), (b, _)| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        Self { entries }
    }

    pub fn get(&self, id: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == id)
            .map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Rewrite a raw formula into readable text.
    ///
    /// Whitespace runs collapse to single spaces first, then every
    /// identifier is substituted, longest identifier first so that `ID10`
    /// is never corrupted by an earlier `ID1` replacement.
    pub fn translate(&self, raw_formula: &str) -> String {
        if raw_formula.is_empty() {
            return String::new();
        }
        let mut text = raw_formula.split_whitespace().collect::<Vec<_>>().join(" ");
        for (id, human) in &self.entries {
            if !id.is_empty() && text.contains(id.as_str()) {
                text = text.replace(id.as_str(), human);
            }
        }
        text
    }
}

/// Everything derived from one workbook's column metadata.
#[derive(Debug, Clone, Default)]
pub struct KnowledgeBase {
    pub registry: FieldRegistry,
    pub translations: IdTranslationTable,
}

/// Build the registry and translation table from a parsed workbook.
///
/// Walks every `column` under every `datasource`. Missing attributes fall
/// back to defaults; columns with neither caption nor name are skipped.
/// The value type comes from `datatype`, or the older `type` attribute.
pub fn build(root: &XmlElement) -> KnowledgeBase {
    let mut registry = FieldRegistry::default();
    let mut aliases: Vec<(String, String)> = Vec::new();

    for datasource in root.descendants("datasource") {
        for column in datasource.descendants("column") {
            let name = column.attr("name").unwrap_or("");
            let caption = column.attr("caption").unwrap_or("");

            if !name.is_empty() && !caption.is_empty() {
                aliases.push((name.to_string(), format!("[{}]", caption)));
                aliases.push((name.replace(['[', ']'], ""), caption.to_string()));
            }

            let display_name = if caption.is_empty() { name } else { caption };
            if display_name.is_empty() {
                continue;
            }

            let formula = column
                .child("calculation")
                .and_then(|calc| calc.attr_non_empty("formula"))
                .map(str::to_string);

            registry.insert(FieldRecord {
                raw_name: display_name.to_string(),
                normalized_key: normalize_key(display_name),
                role: FieldRole::parse(column.attr_non_empty("role")),
                datatype: column
                    .attr_non_empty("datatype")
                    .or_else(|| column.attr_non_empty("type"))
                    .unwrap_or("string")
                    .to_string(),
                is_calculated: formula.is_some(),
                formula,
            });
        }
    }

    tracing::debug!(
        fields = registry.len(),
        aliases = aliases.len(),
        "built workbook knowledge base"
    );

    KnowledgeBase {
        registry,
        translations: IdTranslationTable::from_pairs(aliases),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workbook::document::WorkbookDocument;

    const WORKBOOK: &str = r#"<?xml version='1.0' encoding='utf-8' ?>
<workbook>
  <datasources>
    <datasource name='federated.1' caption='Installs'>
      <column caption='Capacity' datatype='real' name='[Capacity]' role='measure' type='real' />
      <column caption='Margin' name='[Calculation_10]' role='measure' type='real'>
        <calculation class='tableau' formula='([Revenue]-[Cost])/[Revenue]' />
      </column>
      <column caption='Flag' name='[Calculation_1]' type='boolean'>
        <calculation class='tableau' formula='[Calculation_10] &gt; 0' />
      </column>
      <column name='[Region]' />
      <column caption='Empty Calc' name='[Calculation_2]'>
        <calculation class='tableau' formula='' />
      </column>
    </datasource>
  </datasources>
</workbook>
"#;

    fn kb() -> KnowledgeBase {
        build(&WorkbookDocument::parse(WORKBOOK).unwrap().root)
    }

    #[test]
    fn test_registry_records() {
        let kb = kb();
        assert_eq!(kb.registry.len(), 5);

        let capacity = kb.registry.get("capacity").unwrap();
        assert_eq!(capacity.role, FieldRole::Measure);
        assert_eq!(capacity.datatype, "real");
        assert!(!capacity.is_calculated);

        let margin = kb.registry.get("margin").unwrap();
        assert!(margin.is_calculated);
        assert_eq!(margin.formula.as_deref(), Some("([Revenue]-[Cost])/[Revenue]"));

        let region = kb.registry.get("region").unwrap();
        assert_eq!(region.raw_name, "[Region]");
        assert_eq!(region.role, FieldRole::Dimension);
        assert_eq!(region.datatype, "string");

        let empty = kb.registry.get("emptycalc").unwrap();
        assert!(!empty.is_calculated);
        assert_eq!(empty.formula, None);
    }

    #[test]
    fn test_translation_aliases() {
        let kb = kb();
        assert_eq!(kb.translations.get("[Calculation_10]"), Some("[Margin]"));
        assert_eq!(kb.translations.get("Calculation_10"), Some("Margin"));
        assert_eq!(kb.translations.get("[Region]"), None);
        assert_eq!(
            kb.translations.translate("[Calculation_10] > 0"),
            "[Margin] > 0"
        );
    }

    #[test]
    fn test_translate_longest_identifier_first() {
        let table = IdTranslationTable::from_pairs([("ID1", "Alpha"), ("ID10", "Beta")]);
        assert_eq!(table.translate("ID10 + ID1"), "Beta + Alpha");
    }

    #[test]
    fn test_translate_collapses_whitespace() {
        let table = IdTranslationTable::default();
        assert_eq!(table.translate("IF  [A]\r\n  THEN 1\tEND"), "IF [A] THEN 1 END");
        assert_eq!(table.translate(""), "");
    }

    #[test]
    fn test_later_duplicate_key_wins() {
        let xml = r#"<workbook><datasource>
            <column caption='Sales' name='[a]' type='integer' />
            <column caption='sales' name='[b]' type='real' />
        </datasource></workbook>"#;
        let kb = build(&WorkbookDocument::parse(xml).unwrap().root);
        assert_eq!(kb.registry.len(), 1);
        assert_eq!(kb.registry.get("sales").unwrap().datatype, "real");
    }
}
