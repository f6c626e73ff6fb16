//! Relationship edges and edge maps
//!
//! An edge says "subject mentions object": a chart uses a field, an article
//! embeds a chart. Edge maps are keyed by the object's original name and
//! merge the current run's edges with the ones earlier runs recorded.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::config::LedgerConfig;
use crate::error::Result;
use crate::ledger::{cell, Ledger, Row};
use crate::normalize::normalize_key_strict;
use crate::status::UnitStatus;

/// Subject mentions object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipEdge {
    pub subject_title: String,
    #[serde(default)]
    pub subject_url: String,
    pub object_title: String,
    #[serde(default)]
    pub object_url: String,
}

impl RelationshipEdge {
    /// Edges with neither a title nor a URL cannot be rendered.
    pub fn is_renderable(&self) -> bool {
        !self.subject_title.trim().is_empty() || !self.subject_url.trim().is_empty()
    }

    fn identity(&self) -> String {
        normalize_key_strict(&self.subject_title)
    }
}

/// Object name → edges, subjects unique by title.
pub type EdgeMap = BTreeMap<String, Vec<RelationshipEdge>>;

/// The two edge families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeFamily {
    /// Charts using a data field; rendered into field documents.
    FieldChart,
    /// Articles embedding a chart; rendered into chart documents.
    ChartArticle,
}

impl EdgeFamily {
    /// Heading of the section rendered into object documents.
    pub fn section_label(&self) -> &'static str {
        match self {
            EdgeFamily::FieldChart => "Related Charts",
            EdgeFamily::ChartArticle => "Related Articles",
        }
    }

    /// Ledger table holding this family's edges.
    pub fn edge_table<'a>(&self, tables: &'a LedgerConfig) -> &'a str {
        match self {
            EdgeFamily::FieldChart => &tables.field_chart_links,
            EdgeFamily::ChartArticle => &tables.chart_article_links,
        }
    }

    /// Ledger table holding the object documents that get rewritten.
    pub fn object_table<'a>(&self, tables: &'a LedgerConfig) -> &'a str {
        match self {
            EdgeFamily::FieldChart => &tables.data_dictionary,
            EdgeFamily::ChartArticle => &tables.chart_library,
        }
    }
}

/// Reference from a subject to an object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectRef {
    pub name: String,
    #[serde(default)]
    pub url: String,
}

/// One unit of the current run: a subject and the objects it mentions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessedUnit {
    pub subject_title: String,
    #[serde(default)]
    pub subject_url: String,
    #[serde(flatten)]
    pub status: UnitStatus,
    #[serde(default)]
    pub objects: Vec<ObjectRef>,
}

/// Add `edge` under `object` unless a subject with the same title is there.
fn add_edge(map: &mut EdgeMap, object: &str, edge: RelationshipEdge) -> bool {
    let edges = map.entry(object.to_string()).or_default();
    let identity = edge.identity();
    if edges.iter().any(|e| e.identity() == identity) {
        return false;
    }
    edges.push(edge);
    true
}

/// Build the edge map for this run, then merge in recorded edges.
///
/// Current-run edges come first in each list. `lookup` returns previously
/// recorded edges for an object; a failed lookup leaves that object with
/// the current run's edges only.
pub fn build_edge_map<F>(units: &[ProcessedUnit], mut lookup: F) -> EdgeMap
where
    F: FnMut(&str) -> Result<Vec<RelationshipEdge>>,
{
    let mut map = EdgeMap::new();

    for unit in units {
        if !unit.status.is_success() {
            continue;
        }
        if unit.subject_title.trim().is_empty() {
            tracing::debug!(url = %unit.subject_url, "unit without a title, no edges");
            continue;
        }
        for object in &unit.objects {
            let name = object.name.trim();
            if name.is_empty() {
                continue;
            }
            add_edge(
                &mut map,
                name,
                RelationshipEdge {
                    subject_title: unit.subject_title.trim().to_string(),
                    subject_url: unit.subject_url.trim().to_string(),
                    object_title: name.to_string(),
                    object_url: object.url.trim().to_string(),
                },
            );
        }
    }

    let objects: Vec<String> = map.keys().cloned().collect();
    let mut merged = 0usize;
    for object in objects {
        match lookup(&object) {
            Ok(existing) => {
                for edge in existing {
                    if add_edge(&mut map, &object, edge) {
                        merged += 1;
                    }
                }
            }
            Err(e) => {
                tracing::warn!(object = %object, error = %e, "could not read recorded edges");
            }
        }
    }

    tracing::info!(objects = map.len(), merged, "built edge map");
    map
}

// ============================================
// Persistence
// ============================================

pub const EDGE_KEY_SEPARATOR: &str = "|";

/// Ledger row for an edge: `[edge_key, object, subject_title, subject_url]`.
pub fn edge_row(edge: &RelationshipEdge) -> Row {
    vec![
        format!(
            "{}{}{}",
            edge.object_title.trim(),
            EDGE_KEY_SEPARATOR,
            edge.subject_title.trim()
        ),
        edge.object_title.trim().to_string(),
        edge.subject_title.trim().to_string(),
        edge.subject_url.trim().to_string(),
    ]
}

/// Edges recorded for `object` in `table`, in row order, unique by subject.
pub fn fetch_existing_edges(ledger: &dyn Ledger, table: &str, object: &str) -> Result<Vec<RelationshipEdge>> {
    let wanted = object.trim();
    let mut seen = HashSet::new();
    Ok(ledger
        .get_rows(table)?
        .iter()
        .filter(|row| cell(row, 1) == wanted && !cell(row, 2).is_empty())
        .map(|row| RelationshipEdge {
            subject_title: cell(row, 2).to_string(),
            subject_url: cell(row, 3).to_string(),
            object_title: wanted.to_string(),
            object_url: String::new(),
        })
        .filter(|edge| seen.insert(edge.identity()))
        .collect())
}

/// Upsert every edge in `map`; returns how many rows were written.
pub fn record_edges(ledger: &dyn Ledger, table: &str, map: &EdgeMap) -> Result<usize> {
    let mut written = 0;
    for edges in map.values() {
        for edge in edges.iter().filter(|e| !e.subject_title.trim().is_empty()) {
            ledger.upsert_row(table, &edge_row(edge))?;
            written += 1;
        }
    }
    tracing::debug!(table, written, "recorded edges");
    Ok(written)
}
