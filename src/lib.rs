//! fieldgraph-engine: workbook field resolution and documentation relationships
//!
//! The pipeline stage between a BI workbook and a help center:
//!
//! - [`normalize`] cleans vendor-qualified field references into names and keys
//! - [`workbook`] parses workbook XML into a field registry and renders
//!   per-field context trees over calculated-field dependencies
//! - [`reconcile`] merges classifier output into a deduplicated field list
//! - [`relations`] maintains field→chart and chart→article edges and rewrites
//!   the "Related ..." sections of published documents
//! - [`ledger`] and [`publisher`] are the external record store and help
//!   center, each behind a trait with an HTTP implementation
//!
//! # Example
//!
//! ```ignore
//! use fieldgraph_engine::workbook::{extract_field_contexts, WorkbookDocument};
//!
//! let doc = WorkbookDocument::parse(std::fs::read_to_string("sales.twb")?)?;
//! let contexts = extract_field_contexts(&doc, &["sum:Margin:qk".to_string()]);
//! println!("{}", contexts.field_contexts[0]);
//! ```

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod ledger;
pub mod normalize;
pub mod publisher;
pub mod reconcile;
pub mod relations;
pub mod status;
pub mod workbook;

// Re-export commonly used types
pub use cli::{Cli, Commands, OutputFormat};
pub use config::FieldGraphConfig;
pub use error::{FieldGraphError, Result};
pub use ledger::{HttpLedger, Ledger, LedgerRecord, MemoryLedger};
pub use normalize::{clean_field_name, normalize_key, normalize_key_strict, NO_FIELD};
pub use publisher::{
    publish_document, ArticleState, ArticleUpdate, DocumentKind, HttpPublisher, NewDocument,
    PublishedRef, Publisher,
};
pub use reconcile::{reconcile, ExtractedField, RawClassification, Reconciliation};
pub use relations::{
    build_edge_map, inject_or_replace_section, propagate, EdgeFamily, EdgeMap, ProcessedUnit,
    PropagationReport, RelationshipEdge, RelationshipService,
};
pub use status::{BatchReport, UnitStatus};
pub use workbook::{KnowledgeBase, WorkbookDocument};
