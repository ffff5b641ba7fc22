//! ---
//! insight_section: "06-cli"
//! insight_subsection: "binary"
//! insight_type: "source"
//! insight_scope: "code"
//! insight_description: "Operator CLI for report generation, credential checks, and audit verification."
//! insight_version: "v0.1.0"
//! insight_owner: "tbd"
//! ---
use std::path::PathBuf;

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};

mod audit;
mod auth;
mod context;
mod report;

use context::CliContext;

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Insight Engine report and access-control utility",
    long_about = None
)]
struct Cli {
    /// Configuration file (overrides the default search; INSIGHT_CONFIG wins over both).
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Print Prometheus counters to stderr after the command finishes.
    #[arg(long = "print-metrics", global = true, action = ArgAction::SetTrue)]
    print_metrics: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    #[command(subcommand, about = "Generate reports from a feedback corpus")]
    Report(report::ReportCommand),
    #[command(subcommand, about = "Credential and permission checks")]
    Auth(auth::AuthCommand),
    #[command(subcommand, about = "Audit trail inspection")]
    Audit(audit::AuditCommand),
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut ctx = CliContext::load(cli.config.as_deref())?;
    let outcome = match cli.command {
        Commands::Report(cmd) => report::run(&mut ctx, cmd),
        Commands::Auth(cmd) => auth::run(&mut ctx, cmd),
        Commands::Audit(cmd) => audit::run(&ctx, cmd),
    };
    if cli.print_metrics {
        if let Some(text) = ctx.render_metrics()? {
            eprint!("{text}");
        }
    }
    outcome
}
