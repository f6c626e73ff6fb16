//! Relationship commands

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::CommandContext;
use crate::cli::{FamilyArg, InjectArgs, RelateArgs};
use crate::error::{FieldGraphError, Result};
use crate::ledger::{HttpLedger, Ledger, LedgerRecord};
use crate::publisher::HttpPublisher;
use crate::relations::{
    build_edge_map, fetch_existing_edges, inject_or_replace_section, EdgeFamily, EdgeMap, FamilyReport,
    FamilyRun, ProcessedUnit, RelationshipEdge, RelationshipService,
};

/// Run the inject command
pub fn run_inject(args: &InjectArgs, _ctx: &CommandContext) -> Result<String> {
    let html = fs::read_to_string(&args.html)?;
    let edges: Vec<RelationshipEdge> = read_json(&args.edges)?;
    Ok(inject_or_replace_section(&html, &args.section, &edges))
}

/// Units and fresh records for one run, as JSON.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RunManifest {
    pub field_chart: Vec<ProcessedUnit>,
    pub chart_article: Vec<ProcessedUnit>,
    pub known: KnownRecords,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct KnownRecords {
    pub field_chart: Vec<LedgerRecord>,
    pub chart_article: Vec<LedgerRecord>,
}

impl RunManifest {
    fn runs(&self, family: FamilyArg) -> Vec<FamilyRun<'_>> {
        let field_chart = FamilyRun {
            family: EdgeFamily::FieldChart,
            units: &self.field_chart,
            known: &self.known.field_chart,
        };
        let chart_article = FamilyRun {
            family: EdgeFamily::ChartArticle,
            units: &self.chart_article,
            known: &self.known.chart_article,
        };
        match family {
            FamilyArg::FieldChart => vec![field_chart],
            FamilyArg::ChartArticle => vec![chart_article],
            FamilyArg::Both => vec![field_chart, chart_article],
        }
    }
}

#[derive(Debug, Serialize)]
struct DryRunMap {
    family: EdgeFamily,
    edges: EdgeMap,
}

/// Run the relate command
pub fn run_relate(args: &RelateArgs, ctx: &CommandContext) -> Result<String> {
    let manifest: RunManifest = read_json(&args.run)?;
    let runs = manifest.runs(args.family);

    if args.dry_run {
        let ledger = if ctx.config.ledger.url.trim().is_empty() {
            None
        } else {
            Some(HttpLedger::new(&ctx.config.ledger)?)
        };
        let maps: Vec<DryRunMap> = runs
            .iter()
            .map(|run| {
                let table = run.family.edge_table(&ctx.config.ledger);
                let edges = build_edge_map(run.units, |object| match &ledger {
                    Some(l) => fetch_existing_edges(l as &dyn Ledger, table, object),
                    None => Ok(Vec::new()),
                });
                DryRunMap {
                    family: run.family,
                    edges,
                }
            })
            .collect();
        return ctx.render(&maps, |m| render_maps(m));
    }

    ctx.config.validate()?;
    let ledger = HttpLedger::new(&ctx.config.ledger)?;
    let publisher = HttpPublisher::new(&ctx.config.publisher)?;
    let service = RelationshipService::new(&ledger, &publisher, &ctx.config.ledger);
    let reports = service.relate_all(&runs)?;
    ctx.render(&reports, |r| render_reports(r))
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T> {
    if !path.exists() {
        return Err(FieldGraphError::NotFound {
            what: path.display().to_string(),
        });
    }
    Ok(serde_json::from_str(&fs::read_to_string(path)?)?)
}

fn render_maps(maps: &[DryRunMap]) -> String {
    let mut out = String::new();
    for map in maps {
        out.push_str(&format!("{}\n", map.family.section_label()));
        for (object, edges) in &map.edges {
            let subjects: Vec<&str> = edges.iter().map(|e| e.subject_title.as_str()).collect();
            out.push_str(&format!("  {}: {}\n", object, subjects.join(", ")));
        }
    }
    out
}

fn render_reports(reports: &[FamilyReport]) -> String {
    reports
        .iter()
        .map(|r| {
            format!(
                "{}: {} object(s), {} edge(s) recorded, {} updated, {} failed, {} skipped",
                r.family.section_label(),
                r.objects,
                r.edges_recorded,
                r.propagation.updated,
                r.propagation.failed,
                r.propagation.units.skipped
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inject_from_files() {
        let dir = tempfile::tempdir().unwrap();
        let html = dir.path().join("doc.html");
        let edges = dir.path().join("edges.json");
        fs::write(&html, "<p>Body</p><hr>").unwrap();
        fs::write(
            &edges,
            r#"[{"subject_title": "Chart A", "subject_url": "https://help/a", "object_title": "Capacity"}]"#,
        )
        .unwrap();
        let args = InjectArgs {
            html,
            section: "Related Charts".to_string(),
            edges,
        };
        let out = run_inject(&args, &CommandContext::default()).unwrap();
        assert_eq!(
            out,
            "<p>Body</p><p><strong>Related Charts:</strong></p><ul><li><a href=\"https://help/a\" target=\"_blank\">Chart A</a></li></ul><p>&nbsp;</p><hr>"
        );
    }

    #[test]
    fn test_dry_run_without_ledger() {
        let dir = tempfile::tempdir().unwrap();
        let run = dir.path().join("run.json");
        fs::write(
            &run,
            r#"{"field_chart": [
                {"subject_title": "Chart A", "status": "success", "objects": [{"name": "Capacity"}, {"name": "Region"}]},
                {"subject_title": "Chart B", "status": "success", "objects": [{"name": "Capacity"}]}
            ]}"#,
        )
        .unwrap();
        let args = RelateArgs {
            run,
            family: FamilyArg::FieldChart,
            dry_run: true,
        };
        let out = run_relate(&args, &CommandContext::default()).unwrap();
        assert_eq!(out, "Related Charts\n  Capacity: Chart A, Chart B\n  Region: Chart A\n");
    }

    #[test]
    fn test_relate_requires_remote_config() {
        let dir = tempfile::tempdir().unwrap();
        let run = dir.path().join("run.json");
        fs::write(&run, "{}").unwrap();
        let args = RelateArgs {
            run,
            family: FamilyArg::Both,
            dry_run: false,
        };
        assert!(matches!(
            run_relate(&args, &CommandContext::default()),
            Err(FieldGraphError::ConfigError { .. })
        ));
    }
}
