//! Document publishing command

use std::fs;

use super::CommandContext;
use crate::cli::{KindArg, PublishArgs};
use crate::error::{FieldGraphError, Result};
use crate::ledger::HttpLedger;
use crate::publisher::{publish_document, ArticleState, DocumentKind, HttpPublisher, NewDocument};
use crate::status::UnitStatus;

impl From<KindArg> for DocumentKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Field => DocumentKind::Field,
            KindArg::Chart => DocumentKind::Chart,
            KindArg::Article => DocumentKind::Article,
        }
    }
}

/// Read the arguments into a document.
pub fn new_document(args: &PublishArgs) -> Result<NewDocument> {
    if !args.html.exists() {
        return Err(FieldGraphError::NotFound {
            what: args.html.display().to_string(),
        });
    }
    if args.name.trim().is_empty() {
        return Err(FieldGraphError::InvalidInput {
            message: "--name must not be empty".to_string(),
        });
    }
    Ok(NewDocument {
        original_name: args.name.clone(),
        title: args.title.clone().unwrap_or_else(|| args.name.clone()),
        html: fs::read_to_string(&args.html)?,
        state: if args.draft {
            ArticleState::Draft
        } else {
            ArticleState::Published
        },
    })
}

/// Run the publish command
pub fn run_publish(args: &PublishArgs, ctx: &CommandContext) -> Result<String> {
    let document = new_document(args)?;
    ctx.config.validate()?;
    let ledger = HttpLedger::new(&ctx.config.ledger)?;
    let publisher = HttpPublisher::new(&ctx.config.publisher)?;

    let outcome = publish_document(
        &ledger,
        &publisher,
        &ctx.config.ledger,
        &ctx.config.publisher,
        args.kind.into(),
        &document,
    )?;

    ctx.render(&outcome, |o| match &o.status {
        UnitStatus::Success => format!("published: {} -> {}", o.human_name, o.url),
        UnitStatus::Skipped { reason } => format!("skipped: {} ({}) {}", o.name, reason, o.url),
        UnitStatus::Error { message } => format!("error: {}: {}", o.name, message),
    })
}
