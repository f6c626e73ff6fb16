//! Command modules for the fieldgraph CLI
//!
//! - `workbook` - clean, context, summary
//! - `reconcile` - classifier output reconciliation
//! - `publish` - publishing and recording new documents
//! - `relate` - section injection and relationship propagation
//!
//! Handlers take their `Args` struct from `cli.rs` plus a shared
//! `CommandContext` and return the text to print.

pub mod publish;
pub mod reconcile;
pub mod relate;
pub mod workbook;

pub use publish::run_publish;
pub use reconcile::run_reconcile;
pub use relate::{run_inject, run_relate};
pub use workbook::{run_clean, run_context, run_summary};

use serde::Serialize;

use crate::cli::OutputFormat;
use crate::config::FieldGraphConfig;
use crate::error::Result;

/// Shared context passed to all command handlers
#[derive(Debug, Clone, Default)]
pub struct CommandContext {
    pub format: OutputFormat,
    pub verbose: bool,
    pub config: FieldGraphConfig,
}

impl CommandContext {
    pub fn new(format: OutputFormat, verbose: bool, config: FieldGraphConfig) -> Self {
        Self {
            format,
            verbose,
            config,
        }
    }

    /// Render `value` as pretty JSON, or with `text` for text output.
    pub fn render<T: Serialize>(&self, value: &T, text: impl FnOnce(&T) -> String) -> Result<String> {
        match self.format {
            OutputFormat::Json => Ok(format!("{}\n", serde_json::to_string_pretty(value)?)),
            OutputFormat::Text => {
                let mut out = text(value);
                if !out.ends_with('\n') {
                    out.push('\n');
                }
                Ok(out)
            }
        }
    }
}
