//! Relationship graph service
//!
//! - `edge` - edges, edge maps and their ledger persistence
//! - `html` - related-section rendering and in-place editing
//! - `propagate` - rewriting related documents after a run

pub mod edge;
pub mod html;
pub mod propagate;

pub use edge::{
    build_edge_map, fetch_existing_edges, record_edges, EdgeFamily, EdgeMap, ObjectRef, ProcessedUnit,
    RelationshipEdge,
};
pub use html::{inject_or_replace_section, link_fields, render_section, FieldLink, FieldLinks};
pub use propagate::{propagate, PropagationReport, PropagationTarget};

use serde::Serialize;

use crate::config::LedgerConfig;
use crate::error::Result;
use crate::ledger::{Ledger, LedgerRecord};
use crate::publisher::Publisher;
use crate::status::UnitStatus;

/// Edge maps, persistence and propagation over one ledger and publisher.
pub struct RelationshipService<'a> {
    ledger: &'a dyn Ledger,
    publisher: &'a dyn Publisher,
    tables: &'a LedgerConfig,
}

/// One family's share of a run.
#[derive(Debug, Clone, Copy)]
pub struct FamilyRun<'a> {
    pub family: EdgeFamily,
    pub units: &'a [ProcessedUnit],
    /// Records published in this run, fresher than the ledger.
    pub known: &'a [LedgerRecord],
}

/// Everything one family pass did.
#[derive(Debug, Clone, Serialize)]
pub struct FamilyReport {
    pub family: EdgeFamily,
    pub objects: usize,
    pub edges_recorded: usize,
    pub propagation: PropagationReport,
}

impl<'a> RelationshipService<'a> {
    pub fn new(ledger: &'a dyn Ledger, publisher: &'a dyn Publisher, tables: &'a LedgerConfig) -> Self {
        Self {
            ledger,
            publisher,
            tables,
        }
    }

    /// Current-run edges merged with the family's recorded edges.
    pub fn build_edge_map(&self, family: EdgeFamily, units: &[ProcessedUnit]) -> EdgeMap {
        let table = family.edge_table(self.tables);
        build_edge_map(units, |object| fetch_existing_edges(self.ledger, table, object))
    }

    pub fn record_edges(&self, family: EdgeFamily, map: &EdgeMap) -> Result<usize> {
        record_edges(self.ledger, family.edge_table(self.tables), map)
    }

    pub fn propagate(&self, family: EdgeFamily, map: &EdgeMap, known: &[LedgerRecord]) -> Result<PropagationReport> {
        let target = PropagationTarget {
            family,
            table: family.object_table(self.tables),
            known,
        };
        propagate(map, &target, self.ledger, self.publisher)
    }

    /// Build every family's map, then record and propagate each.
    ///
    /// All maps are complete before anything is rewritten, so documents
    /// published earlier in the run can reference later ones. A family whose
    /// object table cannot be read reports one `Error` unit for that table;
    /// the other families still run.
    pub fn relate_all(&self, runs: &[FamilyRun<'_>]) -> Result<Vec<FamilyReport>> {
        let maps: Vec<EdgeMap> = runs
            .iter()
            .map(|run| self.build_edge_map(run.family, run.units))
            .collect();

        let mut reports = Vec::with_capacity(runs.len());
        for (run, map) in runs.iter().zip(&maps) {
            let edges_recorded = match self.record_edges(run.family, map) {
                Ok(n) => n,
                Err(e) => {
                    tracing::warn!(family = run.family.section_label(), error = %e, "edges not recorded");
                    0
                }
            };
            let propagation = match self.propagate(run.family, map, run.known) {
                Ok(report) => report,
                Err(e) => {
                    let table = run.family.object_table(self.tables);
                    tracing::error!(family = run.family.section_label(), table, error = %e, "propagation aborted");
                    let mut report = PropagationReport::default();
                    report.units.push(table, UnitStatus::error(e));
                    report
                }
            };
            reports.push(FamilyReport {
                family: run.family,
                objects: map.len(),
                edges_recorded,
                propagation,
            });
        }
        Ok(reports)
    }
}
