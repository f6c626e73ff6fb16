//! Rewriting related documents
//!
//! For every object in an edge map that already has a published document,
//! render the family's related section into its HTML, push it to the
//! publisher and, once the publisher accepted it, write the new HTML back to
//! the ledger row. Each object is handled on its own.

use std::collections::HashMap;

use serde::Serialize;

use super::edge::{EdgeFamily, EdgeMap};
use super::html::inject_or_replace_section;
use crate::error::Result;
use crate::ledger::{self, Ledger, LedgerRecord};
use crate::publisher::{ArticleUpdate, Publisher};
use crate::status::{BatchReport, UnitStatus};

/// Result of one propagation pass.
///
/// `updated` and `failed` count publisher updates. Objects that had nothing
/// to relate or nothing to amend are only listed in `units`. `ledger_drift`
/// counts objects whose remote copy was updated but whose ledger write then
/// failed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PropagationReport {
    pub updated: usize,
    pub failed: usize,
    pub ledger_drift: usize,
    pub units: BatchReport,
}

/// Where the object documents live.
pub struct PropagationTarget<'a> {
    pub family: EdgeFamily,
    /// Ledger table with the object documents.
    pub table: &'a str,
    /// Fresh records from this run; they take precedence over ledger rows.
    pub known: &'a [LedgerRecord],
}

/// Rewrite every related document reachable from `edge_map`.
///
/// Reading the object table is the only fatal step. The edge map must be
/// complete (current run included) before this is called.
pub fn propagate(
    edge_map: &EdgeMap,
    target: &PropagationTarget<'_>,
    ledger: &dyn Ledger,
    publisher: &dyn Publisher,
) -> Result<PropagationReport> {
    let rows = ledger.get_rows(target.table)?;
    let mut records: HashMap<String, LedgerRecord> = HashMap::new();
    for row in &rows {
        let record = LedgerRecord::from_row(row);
        if !record.original_name.is_empty() {
            records.entry(record.original_name.clone()).or_insert(record);
        }
    }
    for record in target.known {
        records.insert(record.original_name.trim().to_string(), record.clone());
    }

    let label = target.family.section_label();
    let mut report = PropagationReport::default();

    for (object, edges) in edge_map {
        if edges.is_empty() {
            report.units.push(object.as_str(), UnitStatus::skipped("no related items"));
            continue;
        }
        let Some(record) = records.get(object.trim()) else {
            report.units.push(object.as_str(), UnitStatus::skipped("not in ledger"));
            continue;
        };
        if record.remote_id.is_empty() {
            report.units.push(object.as_str(), UnitStatus::skipped("no remote id"));
            continue;
        }
        if record.html.trim().is_empty() {
            report.units.push(object.as_str(), UnitStatus::skipped("no published html"));
            continue;
        }

        let updated_html = inject_or_replace_section(&record.html, label, edges);
        if let Err(e) = publisher.update(&record.remote_id, &ArticleUpdate::html(updated_html.clone())) {
            tracing::error!(object = %object, id = %record.remote_id, error = %e, "related section update failed");
            report.failed += 1;
            report.units.push(object.as_str(), UnitStatus::error(e));
            continue;
        }
        report.updated += 1;

        let rewritten = LedgerRecord {
            html: updated_html,
            ..record.clone()
        };
        match ledger::record(ledger, target.table, &rewritten) {
            Ok(()) => {
                tracing::debug!(object = %object, related = edges.len(), "related section updated");
                report.units.push(object.as_str(), UnitStatus::Success);
            }
            Err(e) => {
                tracing::error!(object = %object, error = %e, "published, but ledger write failed");
                report.ledger_drift += 1;
                report
                    .units
                    .push(object.as_str(), UnitStatus::error(format!("ledger write failed: {}", e)));
            }
        }
    }

    tracing::info!(
        family = label,
        updated = report.updated,
        failed = report.failed,
        skipped = report.units.skipped,
        "propagated related sections"
    );
    Ok(report)
}
