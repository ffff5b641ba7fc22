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

use anyhow::{bail, Result};
use clap::{Args, Subcommand};
use insight_security::AuditLog;

use crate::context::CliContext;

#[derive(Debug, Subcommand)]
pub enum AuditCommand {
    /// Recompute the hash chain and report the first tampered entry.
    Verify(AuditArgs),
    /// Print audit entries as JSON lines.
    Show(ShowArgs),
}

#[derive(Debug, Args)]
pub struct AuditArgs {
    /// Audit log to inspect (defaults to audit.path).
    #[arg(long, value_name = "FILE")]
    path: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct ShowArgs {
    #[command(flatten)]
    target: AuditArgs,
    /// Only the last N entries.
    #[arg(long, value_name = "N")]
    tail: Option<usize>,
}

pub fn run(ctx: &CliContext, command: AuditCommand) -> Result<()> {
    match command {
        AuditCommand::Verify(args) => {
            let log = open(ctx, &args)?;
            let verification = log.verify()?;
            match verification.first_invalid {
                None => {
                    println!(
                        "Audit log {} intact ({} entries)",
                        log.path().display(),
                        verification.entries
                    );
                    Ok(())
                }
                Some(index) => bail!(
                    "audit log {} tampered at entry {} of {}",
                    log.path().display(),
                    index + 1,
                    verification.entries
                ),
            }
        }
        AuditCommand::Show(args) => {
            let entries = open(ctx, &args.target)?.entries()?;
            let skip = args
                .tail
                .map_or(0, |tail| entries.len().saturating_sub(tail));
            for entry in entries.iter().skip(skip) {
                println!("{}", serde_json::to_string(entry)?);
            }
            Ok(())
        }
    }
}

fn open(ctx: &CliContext, args: &AuditArgs) -> Result<AuditLog> {
    let path = args
        .path
        .clone()
        .unwrap_or_else(|| ctx.config.audit.path.clone());
    AuditLog::open(path)
}
