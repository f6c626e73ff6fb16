//! Spreadsheet-backed ledger
//!
//! The ledger is the system of record for what has been published. Each
//! table is a list of fixed-position rows:
//!
//! ```text
//! [original_name, human_name, url, remote_id, html, ...]
//! ```
//!
//! Edge tables reuse the same store with their own column layout (see
//! [`crate::relations::edge`]). Missing columns read as empty strings.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::config::LedgerConfig;
use crate::error::{FieldGraphError, Result};

const SERVICE: &str = "ledger";

pub type Row = Vec<String>;

pub const COL_ORIGINAL_NAME: usize = 0;
pub const COL_HUMAN_NAME: usize = 1;
pub const COL_URL: usize = 2;
pub const COL_REMOTE_ID: usize = 3;
pub const COL_HTML: usize = 4;

/// Table store used by the relationship service and duplicate checks.
///
/// Rows are matched on their first column by `upsert_row`.
pub trait Ledger {
    fn get_rows(&self, table: &str) -> Result<Vec<Row>>;

    fn upsert_row(&self, table: &str, fields: &[String]) -> Result<()>;

    /// Delete rows whose `match_column` equals `value`; returns how many went.
    fn delete_row(&self, table: &str, match_column: usize, value: &str) -> Result<usize>;
}

/// Cell at `index`, trimmed, or `""` when the row is short.
pub fn cell(row: &[String], index: usize) -> &str {
    row.get(index).map(|s| s.trim()).unwrap_or("")
}

/// One published item as recorded in a document table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerRecord {
    pub original_name: String,
    pub human_name: String,
    pub url: String,
    pub remote_id: String,
    pub html: String,
}

impl LedgerRecord {
    pub fn from_row(row: &[String]) -> Self {
        Self {
            original_name: cell(row, COL_ORIGINAL_NAME).to_string(),
            human_name: cell(row, COL_HUMAN_NAME).to_string(),
            url: cell(row, COL_URL).to_string(),
            remote_id: cell(row, COL_REMOTE_ID).to_string(),
            // html is stored as-is
            html: row.get(COL_HTML).cloned().unwrap_or_default(),
        }
    }

    pub fn to_fields(&self) -> Row {
        vec![
            self.original_name.trim().to_string(),
            self.human_name.trim().to_string(),
            self.url.trim().to_string(),
            self.remote_id.trim().to_string(),
            self.html.clone(),
        ]
    }
}

// ============================================
// Lookups
// ============================================

/// First row whose original name matches `original_name` after trimming.
pub fn find_row(ledger: &dyn Ledger, table: &str, original_name: &str) -> Result<Option<LedgerRecord>> {
    let wanted = original_name.trim();
    Ok(ledger
        .get_rows(table)?
        .iter()
        .find(|row| cell(row, COL_ORIGINAL_NAME) == wanted)
        .map(|row| LedgerRecord::from_row(row)))
}

/// Result of a duplicate check against one table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateCheck {
    pub exists: bool,
    pub lookup_value: String,
    pub checked_table: String,
    pub human_name: String,
    pub url: String,
}

/// Whether `lookup_name` has already been published into `table`.
pub fn check_duplicate(ledger: &dyn Ledger, table: &str, lookup_name: &str) -> Result<DuplicateCheck> {
    let lookup_value = lookup_name.trim();
    if lookup_value.is_empty() {
        return Err(FieldGraphError::InvalidInput {
            message: "duplicate check needs a non-empty name".to_string(),
        });
    }
    let found = find_row(ledger, table, lookup_value)?;
    Ok(DuplicateCheck {
        exists: found.is_some(),
        lookup_value: lookup_value.to_string(),
        checked_table: table.trim().to_string(),
        human_name: found.as_ref().map(|r| r.human_name.clone()).unwrap_or_default(),
        url: found.map(|r| r.url).unwrap_or_default(),
    })
}

/// Parallel lookup results aligned with the requested names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchLookup {
    pub human_names: Vec<String>,
    pub urls: Vec<String>,
    pub missing: Vec<String>,
}

impl BatchLookup {
    pub fn found_count(&self) -> usize {
        self.human_names.len() - self.missing.len()
    }

    /// `(name, human_name, url)` for every requested name that was found.
    pub fn found<'a>(&'a self, names: &'a [String]) -> impl Iterator<Item = (&'a str, &'a str, &'a str)> {
        names
            .iter()
            .zip(self.human_names.iter().zip(self.urls.iter()))
            .filter(|(name, _)| !self.missing.iter().any(|m| m == name.trim()))
            .map(|(name, (human, url))| (name.as_str(), human.as_str(), url.as_str()))
    }
}

/// Look up many names with a single table read.
///
/// Missing names get empty strings so the output stays aligned.
pub fn batch_lookup(ledger: &dyn Ledger, table: &str, names: &[String]) -> Result<BatchLookup> {
    let rows = ledger.get_rows(table)?;
    let index: HashMap<&str, &Row> = rows
        .iter()
        .filter(|row| !cell(row, COL_ORIGINAL_NAME).is_empty())
        .map(|row| (cell(row, COL_ORIGINAL_NAME), row))
        .collect();

    let mut result = BatchLookup::default();
    for name in names {
        let key = name.trim();
        match index.get(key) {
            Some(row) => {
                result.human_names.push(cell(row, COL_HUMAN_NAME).to_string());
                result.urls.push(cell(row, COL_URL).to_string());
            }
            None => {
                result.human_names.push(String::new());
                result.urls.push(String::new());
                result.missing.push(key.to_string());
            }
        }
    }
    tracing::debug!(
        table,
        requested = names.len(),
        missing = result.missing.len(),
        "ledger batch lookup"
    );
    Ok(result)
}

/// Write a published item's row.
pub fn record(ledger: &dyn Ledger, table: &str, record: &LedgerRecord) -> Result<()> {
    ledger.upsert_row(table, &record.to_fields())
}

// ============================================
// HTTP ledger (Apps Script web app)
// ============================================

/// Ledger backed by a spreadsheet web app.
///
/// `GET ?sheet_name=T` returns the table as a JSON array of arrays; `POST`
/// with a JSON body writes or deletes a row.
pub struct HttpLedger {
    client: reqwest::blocking::Client,
    url: String,
}

impl HttpLedger {
    pub fn new(config: &LedgerConfig) -> Result<Self> {
        if config.url.trim().is_empty() {
            return Err(FieldGraphError::ConfigError {
                message: "ledger.url is not set".to_string(),
            });
        }
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| FieldGraphError::transport(SERVICE, e))?;
        Ok(Self {
            client,
            url: config.url.trim().to_string(),
        })
    }

    fn post(&self, payload: &Value) -> Result<Value> {
        let response = self
            .client
            .post(&self.url)
            .json(payload)
            .send()
            .map_err(|e| FieldGraphError::transport(SERVICE, e))?;
        read_json(response)
    }
}

fn read_json(response: reqwest::blocking::Response) -> Result<Value> {
    let status = response.status();
    let body = response
        .text()
        .map_err(|e| FieldGraphError::transport(SERVICE, e))?;
    if !status.is_success() {
        return Err(FieldGraphError::Status {
            service: SERVICE.to_string(),
            status: status.as_u16(),
            body,
        });
    }
    if body.trim().is_empty() {
        return Ok(Value::Null);
    }
    let value: Value = serde_json::from_str(&body)?;
    if let Some(err) = value.get("error") {
        return Err(FieldGraphError::Status {
            service: SERVICE.to_string(),
            status: status.as_u16(),
            body: value_text(err),
        });
    }
    Ok(value)
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Decode a table body: a JSON array of row arrays, cells stringified.
pub fn parse_rows(value: &Value) -> Result<Vec<Row>> {
    let Value::Array(rows) = value else {
        return Err(FieldGraphError::ParseFailure {
            message: format!("ledger table is not a list: {}", value),
        });
    };
    Ok(rows
        .iter()
        .filter_map(Value::as_array)
        .map(|cells| cells.iter().map(value_text).collect())
        .collect())
}

/// Upsert body. The first five columns are also sent under their names.
pub fn upsert_payload(table: &str, fields: &[String]) -> Value {
    json!({
        "sheet_name": table,
        "original_name": cell(fields, COL_ORIGINAL_NAME),
        "human_name": cell(fields, COL_HUMAN_NAME),
        "intercom_url": cell(fields, COL_URL),
        "intercom_id": cell(fields, COL_REMOTE_ID),
        "HTML": fields.get(COL_HTML).cloned().unwrap_or_default(),
        "row": fields,
    })
}

impl Ledger for HttpLedger {
    fn get_rows(&self, table: &str) -> Result<Vec<Row>> {
        let response = self
            .client
            .get(&self.url)
            .query(&[("sheet_name", table)])
            .send()
            .map_err(|e| FieldGraphError::transport(SERVICE, e))?;
        parse_rows(&read_json(response)?)
    }

    fn upsert_row(&self, table: &str, fields: &[String]) -> Result<()> {
        self.post(&upsert_payload(table, fields))?;
        tracing::debug!(table, key = cell(fields, 0), "ledger row written");
        Ok(())
    }

    fn delete_row(&self, table: &str, match_column: usize, value: &str) -> Result<usize> {
        let reply = self.post(&json!({
            "action": "delete",
            "sheet_name": table,
            "column": match_column,
            "value": value,
        }))?;
        Ok(reply.get("deleted").and_then(Value::as_u64).unwrap_or(0) as usize)
    }
}

// ============================================
// In-process ledger
// ============================================

/// Ledger held in memory. Used by dry runs and tests.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    tables: Mutex<HashMap<String, Vec<Row>>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rows(table: &str, rows: Vec<Row>) -> Self {
        let ledger = Self::new();
        ledger.insert_rows(table, rows);
        ledger
    }

    pub fn insert_rows(&self, table: &str, rows: Vec<Row>) {
        if let Ok(mut tables) = self.tables.lock() {
            tables.entry(table.to_string()).or_default().extend(rows);
        }
    }

    fn with_tables<T>(&self, f: impl FnOnce(&mut HashMap<String, Vec<Row>>) -> T) -> Result<T> {
        let mut tables = self.tables.lock().map_err(|_| FieldGraphError::InvalidInput {
            message: "memory ledger lock poisoned".to_string(),
        })?;
        Ok(f(&mut tables))
    }
}

impl Ledger for MemoryLedger {
    fn get_rows(&self, table: &str) -> Result<Vec<Row>> {
        self.with_tables(|tables| tables.get(table).cloned().unwrap_or_default())
    }

    fn upsert_row(&self, table: &str, fields: &[String]) -> Result<()> {
        self.with_tables(|tables| {
            let rows = tables.entry(table.to_string()).or_default();
            let key = cell(fields, 0);
            match rows.iter_mut().find(|row| cell(row, 0) == key) {
                Some(row) => *row = fields.to_vec(),
                None => rows.push(fields.to_vec()),
            }
        })
    }

    fn delete_row(&self, table: &str, match_column: usize, value: &str) -> Result<usize> {
        self.with_tables(|tables| {
            let Some(rows) = tables.get_mut(table) else {
                return 0;
            };
            let before = rows.len();
            rows.retain(|row| cell(row, match_column) != value.trim());
            before - rows.len()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[&str]) -> Row {
        cells.iter().map(|s| s.to_string()).collect()
    }

    fn sample() -> MemoryLedger {
        MemoryLedger::with_rows(
            "data_dictionary",
            vec![
                row(&["Capacity ", "System Capacity", "https://help/1", "1", "<p>cap</p>"]),
                row(&["Region", "Region"]),
            ],
        )
    }

    #[test]
    fn test_short_rows_default_to_empty() {
        let rec = LedgerRecord::from_row(&row(&["Region"]));
        assert_eq!(rec.original_name, "Region");
        assert_eq!(rec.url, "");
        assert_eq!(rec.html, "");
    }

    #[test]
    fn test_find_and_check_duplicate() {
        let ledger = sample();
        let found = find_row(&ledger, "data_dictionary", " Capacity").unwrap().unwrap();
        assert_eq!(found.remote_id, "1");

        let check = check_duplicate(&ledger, "data_dictionary", "Region").unwrap();
        assert!(check.exists);
        assert_eq!(check.url, "");
        assert!(!check_duplicate(&ledger, "data_dictionary", "State").unwrap().exists);
        assert!(check_duplicate(&ledger, "data_dictionary", "  ").is_err());
    }

    #[test]
    fn test_batch_lookup_keeps_alignment() {
        let ledger = sample();
        let names = vec!["State".to_string(), "Capacity".to_string()];
        let result = batch_lookup(&ledger, "data_dictionary", &names).unwrap();
        assert_eq!(result.human_names, vec!["", "System Capacity"]);
        assert_eq!(result.urls, vec!["", "https://help/1"]);
        assert_eq!(result.missing, vec!["State"]);
        assert_eq!(result.found_count(), 1);
        assert_eq!(
            result.found(&names).collect::<Vec<_>>(),
            vec![("Capacity", "System Capacity", "https://help/1")]
        );
    }

    #[test]
    fn test_memory_upsert_and_delete() {
        let ledger = sample();
        ledger
            .upsert_row("data_dictionary", &row(&["Region", "Sales Region", "u", "2", "<p/>"]))
            .unwrap();
        let rows = ledger.get_rows("data_dictionary").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1][1], "Sales Region");

        assert_eq!(ledger.delete_row("data_dictionary", COL_REMOTE_ID, "2").unwrap(), 1);
        assert_eq!(ledger.delete_row("missing", 0, "x").unwrap(), 0);
        assert_eq!(ledger.get_rows("data_dictionary").unwrap().len(), 1);
    }

    #[test]
    fn test_parse_rows_stringifies_cells() {
        let value = json!([["Capacity", "Cap", "u", 42, null], "junk", []]);
        let rows = parse_rows(&value).unwrap();
        assert_eq!(rows[0], row(&["Capacity", "Cap", "u", "42", ""]));
        assert_eq!(rows.len(), 2);
        assert!(parse_rows(&json!({"rows": []})).is_err());
    }

    #[test]
    fn test_upsert_payload() {
        let payload = upsert_payload("chart_library", &row(&["Chart A", "Chart A", "u", "9"]));
        assert_eq!(payload["intercom_id"], "9");
        assert_eq!(payload["HTML"], "");
        assert_eq!(payload["row"][0], "Chart A");
    }
}
