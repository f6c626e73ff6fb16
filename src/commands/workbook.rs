//! Workbook inspection commands

use serde::Serialize;

use super::CommandContext;
use crate::cli::{CleanArgs, ContextArgs, SummaryArgs, WorkbookArgs};
use crate::error::{FieldGraphError, Result};
use crate::normalize::{clean_field_name, normalize_key, normalize_key_strict};
use crate::workbook::analyzer::parse_targets;
use crate::workbook::{
    extract_field_contexts, load_document, summarize, FileWorkbookSource, ServerWorkbookSource,
    WorkbookDocument,
};

#[derive(Debug, Serialize)]
struct CleanedName {
    raw: String,
    cleaned: String,
    key: String,
    strict_key: String,
}

/// Run the clean command
pub fn run_clean(args: &CleanArgs, ctx: &CommandContext) -> Result<String> {
    let rows: Vec<CleanedName> = args
        .text
        .iter()
        .map(|raw| {
            let cleaned = clean_field_name(raw);
            CleanedName {
                raw: raw.clone(),
                key: normalize_key(&cleaned),
                strict_key: normalize_key_strict(&cleaned),
                cleaned,
            }
        })
        .collect();

    ctx.render(&rows, |rows| {
        rows.iter()
            .map(|r| format!("{}\t{}\t{}", r.raw, r.cleaned, r.key))
            .collect::<Vec<_>>()
            .join("\n")
    })
}

fn open_workbook(args: &WorkbookArgs, ctx: &CommandContext) -> Result<WorkbookDocument> {
    match (&args.site, &args.token) {
        (Some(site), Some(token)) if !token.trim().is_empty() => {
            let source = ServerWorkbookSource::new(&ctx.config.workbook, site, token)?;
            load_document(&source, &args.workbook)
        }
        (Some(site), _) => Err(FieldGraphError::ConfigError {
            message: format!(
                "--site {} needs a server token (--token or FIELDGRAPH_WORKBOOK_TOKEN)",
                site
            ),
        }),
        (None, _) => load_document(&FileWorkbookSource::default(), &args.workbook),
    }
}

/// Run the context command
pub fn run_context(args: &ContextArgs, ctx: &CommandContext) -> Result<String> {
    let document = open_workbook(&args.source, ctx)?;
    let targets: Vec<String> = match args.fields.as_slice() {
        [single] => parse_targets(single),
        many => many.to_vec(),
    };
    let contexts = extract_field_contexts(&document, &targets);

    ctx.render(&contexts, |c| {
        c.field_names
            .iter()
            .zip(&c.field_contexts)
            .map(|(name, block)| format!("## {}\n{}\n", name, block))
            .collect::<Vec<_>>()
            .join("\n")
    })
}

/// Run the summary command
pub fn run_summary(args: &SummaryArgs, ctx: &CommandContext) -> Result<String> {
    let document = open_workbook(&args.source, ctx)?;
    let summary = summarize(&document.root, &args.view);
    ctx.render(&summary, |s| s.render())
}
