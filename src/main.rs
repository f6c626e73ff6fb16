//! fieldgraph CLI entry point

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use fieldgraph_engine::commands::{
    run_clean, run_context, run_inject, run_publish, run_reconcile, run_relate, run_summary,
    CommandContext,
};
use fieldgraph_engine::{Cli, Commands, FieldGraphConfig};

fn main() -> ExitCode {
    match run() {
        Ok(output) => {
            print!("{}", output);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            e.exit_code()
        }
    }
}

fn init_tracing(level: &str, verbose: bool) {
    let level = if verbose { "debug" } else { level };
    let mut filter = EnvFilter::from_default_env();
    if let Ok(directive) = format!("fieldgraph_engine={}", level).parse() {
        filter = filter.add_directive(directive);
    }
    // May fail if a subscriber is already installed, which is fine
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn run() -> fieldgraph_engine::Result<String> {
    let cli = Cli::parse();
    let config = FieldGraphConfig::load(cli.config.as_deref())?;
    init_tracing(&config.logging.level, cli.verbose);

    let ctx = CommandContext::new(cli.format, cli.verbose, config);
    match &cli.command {
        Commands::Clean(args) => run_clean(args, &ctx),
        Commands::Context(args) => run_context(args, &ctx),
        Commands::Summary(args) => run_summary(args, &ctx),
        Commands::Reconcile(args) => run_reconcile(args, &ctx),
        Commands::Inject(args) => run_inject(args, &ctx),
        Commands::Publish(args) => run_publish(args, &ctx),
        Commands::Relate(args) => run_relate(args, &ctx),
        Commands::Config => Ok(ctx.config.display()),
    }
}
