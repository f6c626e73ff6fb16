//! CLI argument definitions using clap with subcommand architecture

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Workbook field resolution and documentation relationship graph
#[derive(Parser, Debug)]
#[command(name = "fieldgraph")]
#[command(about = "Resolve BI workbook fields and maintain related-document sections")]
#[command(version)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (defaults to <config dir>/fieldgraph/config.toml)
    #[arg(long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Output format (applies to all commands)
    #[arg(short, long, default_value = "text", value_enum, global = true)]
    pub format: OutputFormat,

    /// Show verbose output (debug logging)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

// ============================================
// Main Commands Enum
// ============================================

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Clean raw field references and show their identity keys
    Clean(CleanArgs),

    /// Print context blocks for workbook fields
    #[command(visible_alias = "ctx")]
    Context(ContextArgs),

    /// Summarize the worksheets behind a published view
    Summary(SummaryArgs),

    /// Reconcile classifier output into a deduplicated field list
    Reconcile(ReconcileArgs),

    /// Insert or replace a related section in an HTML document
    Inject(InjectArgs),

    /// Publish a rendered document and record it in the ledger
    Publish(PublishArgs),

    /// Build edge maps for a run and rewrite related documents
    Relate(RelateArgs),

    /// Show the effective configuration
    Config,
}

// ============================================
// Workbook Commands
// ============================================

#[derive(Args, Debug)]
pub struct CleanArgs {
    /// Raw field references (e.g. "sum:[federated.x].[Capacity]:qk")
    #[arg(value_name = "TEXT", required = true)]
    pub text: Vec<String>,
}

/// Where to read a workbook from
#[derive(Args, Debug, Clone)]
pub struct WorkbookArgs {
    /// Workbook file, or workbook id when --site is given
    #[arg(short, long, value_name = "WORKBOOK")]
    pub workbook: String,

    /// Site id on the BI server; fetches the workbook remotely
    #[arg(long, value_name = "SITE_ID", requires = "token")]
    pub site: Option<String>,

    /// BI server session token
    #[arg(long, value_name = "TOKEN", env = "FIELDGRAPH_WORKBOOK_TOKEN", hide_env_values = true)]
    pub token: Option<String>,
}

#[derive(Args, Debug)]
pub struct ContextArgs {
    #[command(flatten)]
    pub source: WorkbookArgs,

    /// Field names, or one JSON list/object of raw references
    #[arg(value_name = "FIELD", required = true)]
    pub fields: Vec<String>,
}

#[derive(Args, Debug)]
pub struct SummaryArgs {
    #[command(flatten)]
    pub source: WorkbookArgs,

    /// View (worksheet or dashboard) name
    #[arg(long, value_name = "NAME")]
    pub view: String,
}

// ============================================
// Relationship Commands
// ============================================

#[derive(Args, Debug)]
pub struct ReconcileArgs {
    /// Classifier output file (stdin when omitted)
    #[arg(short, long, value_name = "FILE")]
    pub input: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct InjectArgs {
    /// Published HTML document
    #[arg(long, value_name = "FILE")]
    pub html: PathBuf,

    /// Section label (e.g. "Related Charts")
    #[arg(long, value_name = "LABEL")]
    pub section: String,

    /// JSON list of edges ({subject_title, subject_url, object_title})
    #[arg(long, value_name = "FILE")]
    pub edges: PathBuf,
}

/// Document kind selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum KindArg {
    Field,
    Chart,
    Article,
}

#[derive(Args, Debug)]
pub struct PublishArgs {
    /// Kind of document; picks the ledger table and collection
    #[arg(long, value_enum)]
    pub kind: KindArg,

    /// Original name the ledger records (field name, sheet name, article id)
    #[arg(long, value_name = "NAME")]
    pub name: String,

    /// Article title (defaults to NAME)
    #[arg(long, value_name = "TITLE")]
    pub title: Option<String>,

    /// Rendered HTML body
    #[arg(long, value_name = "FILE")]
    pub html: PathBuf,

    /// Create as a draft instead of publishing
    #[arg(long)]
    pub draft: bool,
}

/// Edge family selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum FamilyArg {
    FieldChart,
    ChartArticle,
    #[default]
    Both,
}

#[derive(Args, Debug)]
pub struct RelateArgs {
    /// Run manifest: {"field_chart": [units], "chart_article": [units], "known": {...}}
    #[arg(long, value_name = "FILE")]
    pub run: PathBuf,

    /// Which edge families to process
    #[arg(long, value_enum, default_value = "both")]
    pub family: FamilyArg,

    /// Build and print edge maps without recording or publishing
    #[arg(long)]
    pub dry_run: bool,
}
