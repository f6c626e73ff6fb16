//! Workbook field resolution
//!
//! - `document` - parse workbook XML into an owned element tree
//! - `knowledge` - field registry and identifier translation table
//! - `context` - per-field context trees over calculated-field dependencies
//! - `worksheet` - chart summaries for the classification step
//! - `analyzer` - batch context extraction for a chart's fields
//! - `source` - where workbook XML comes from

pub mod analyzer;
pub mod context;
pub mod document;
pub mod knowledge;
pub mod source;
pub mod worksheet;

pub use analyzer::{extract_field_contexts, FieldContexts};
pub use context::{generate, ContextBlock, ContextGenerator};
pub use document::{WorkbookDocument, XmlElement, XmlNode};
pub use knowledge::{build, FieldRecord, FieldRegistry, FieldRole, IdTranslationTable, KnowledgeBase};
pub use source::{load_document, FileWorkbookSource, ServerWorkbookSource, WorkbookSource};
pub use worksheet::{summarize, ChartSummary, WorksheetSummary};
