//! Reconcile command

use std::fs;
use std::io::Read;

use super::CommandContext;
use crate::cli::ReconcileArgs;
use crate::error::Result;
use crate::reconcile::{reconcile, Reconciliation};

/// Run the reconcile command
pub fn run_reconcile(args: &ReconcileArgs, ctx: &CommandContext) -> Result<String> {
    let raw = match &args.input {
        Some(path) => fs::read_to_string(path)?,
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };
    let result = reconcile(&raw);
    ctx.render(&result, render_text)
}

fn render_text(result: &Reconciliation) -> String {
    let mut out = format!("fields: {}\n", result.total_count());
    for name in &result.field_names {
        match result.display_name(name) {
            Some(display) => out.push_str(&format!("  {} -> {}\n", name, display)),
            None => out.push_str(&format!("  {}\n", name)),
        }
    }
    out
}
