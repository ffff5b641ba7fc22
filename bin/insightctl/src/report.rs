//! ---
//! insight_section: "06-cli"
//! insight_subsection: "binary"
//! insight_type: "source"
//! insight_scope: "code"
//! insight_description: "Operator CLI for report generation, credential checks, and audit verification."
//! insight_version: "v0.1.0"
//! insight_owner: "tbd"
//! ---
use std::fs;
use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::{Args, Subcommand};
use insight_reporting::corpus;
use insight_reporting::{FeedbackRecord, ReportError, ReportExporter};
use insight_security::{AuditEventKind, Permission};
use serde_json::json;

use crate::context::CliContext;

#[derive(Debug, Subcommand)]
pub enum ReportCommand {
    /// Render a PDF report for a principal and write it to the output directory.
    Generate(GenerateArgs),
    /// Emit the aggregated report content as JSON without rendering.
    Content(ContentArgs),
}

/// Principal and corpus shared by every report command.
#[derive(Debug, Args)]
pub struct RequestArgs {
    /// Principal the report is produced for.
    #[arg(long, value_name = "ID")]
    principal: String,

    /// Verify this secret before generating (optional).
    #[arg(long, env = "INSIGHT_SECRET", hide_env_values = true)]
    secret: Option<String>,

    /// Enriched feedback corpus (.json or .csv).
    #[arg(long, value_name = "FILE")]
    corpus: PathBuf,

    /// Replace characters the PDF fonts cannot encode instead of failing.
    #[arg(long)]
    sanitize: bool,

    /// Fixed generation timestamp (RFC 3339) for reproducible output.
    #[arg(long = "generated-at", value_name = "TIMESTAMP")]
    generated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Args)]
pub struct GenerateArgs {
    #[command(flatten)]
    request: RequestArgs,

    /// Output directory (defaults to reporting.output_dir).
    #[arg(long = "output-dir", value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// File stem for the written artifacts.
    #[arg(long, default_value = "feedback-report")]
    name: String,

    /// Also write the JSON content envelope next to the PDF.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Args)]
pub struct ContentArgs {
    #[command(flatten)]
    request: RequestArgs,

    /// Write JSON to this file instead of stdout.
    #[arg(long, value_name = "FILE")]
    output: Option<PathBuf>,
}

pub fn run(ctx: &mut CliContext, command: ReportCommand) -> Result<()> {
    match command {
        ReportCommand::Generate(args) => generate(ctx, args),
        ReportCommand::Content(args) => content(ctx, args),
    }
}

fn generate(ctx: &mut CliContext, args: GenerateArgs) -> Result<()> {
    let request = &args.request;
    let records = prepare(ctx, request)?;
    if args.json {
        require_export(ctx, &request.principal)?;
    }
    let pipeline = ctx.pipeline(request.sanitize, request.generated_at)?;

    let generated = match pipeline.generate(&request.principal, &records) {
        Ok(generated) => generated,
        Err(err) => return Err(record_failure(ctx, &request.principal, err)),
    };

    let output_dir = args
        .output_dir
        .clone()
        .unwrap_or_else(|| ctx.config.reporting.output_dir.clone());
    let exporter = ReportExporter::new(&generated.report);
    let pdf_path = exporter
        .export_pdf(&generated.artifact, &output_dir, &args.name)
        .context("unable to write report document")?;
    let json_path = if args.json {
        Some(
            exporter
                .export_json(Some(&generated.artifact.metadata), &output_dir, &args.name)
                .context("unable to write report content")?,
        )
    } else {
        None
    };

    let metadata = &generated.artifact.metadata;
    ctx.audit(
        &request.principal,
        AuditEventKind::ReportGenerate,
        json!({
            "role": generated.report.metadata.requested_by,
            "records": records.len(),
            "sections": metadata.section_count,
            "pages": metadata.page_count,
            "bytes": generated.artifact.len(),
            "truncations": metadata.truncations.len(),
            "path": pdf_path.display().to_string(),
        }),
    )?;

    println!(
        "Report written to {} ({} pages, {} bytes, {})",
        pdf_path.display(),
        metadata.page_count,
        generated.artifact.len(),
        generated.artifact.content_type
    );
    if let Some(path) = json_path {
        println!("Content written to {}", path.display());
    }
    for note in &metadata.truncations {
        println!("Truncated [{}]: {}", note.section, note.detail);
    }
    Ok(())
}

fn content(ctx: &mut CliContext, args: ContentArgs) -> Result<()> {
    let request = &args.request;
    let records = prepare(ctx, request)?;
    require_export(ctx, &request.principal)?;
    let pipeline = ctx.pipeline(request.sanitize, request.generated_at)?;

    let report = match pipeline.generate_report_content(&request.principal, &records) {
        Ok(report) => report,
        Err(err) => return Err(record_failure(ctx, &request.principal, err)),
    };
    let serialized = report.to_json_pretty()?;
    match &args.output {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            fs::write(path, &serialized)
                .with_context(|| format!("unable to write {}", path.display()))?;
            println!("Content written to {}", path.display());
        }
        None => println!("{serialized}"),
    }

    ctx.audit(
        &request.principal,
        AuditEventKind::DataExport,
        json!({
            "role": report.metadata.requested_by,
            "records": records.len(),
            "sections": report.sections.len(),
            "format": "json",
        }),
    )
}

/// Optional credential check, then corpus load.
fn prepare(ctx: &mut CliContext, request: &RequestArgs) -> Result<Vec<FeedbackRecord>> {
    if let Some(secret) = &request.secret {
        let verified = ctx.authz.verify_credential(&request.principal, secret);
        let kind = if verified {
            AuditEventKind::LoginSuccess
        } else {
            AuditEventKind::LoginFailure
        };
        ctx.audit(&request.principal, kind, json!({ "via": "report" }))?;
        if !verified {
            bail!("credential verification failed for {}", request.principal);
        }
    }
    corpus::load_path(&request.corpus)
        .with_context(|| format!("unable to load corpus {}", request.corpus.display()))
}

/// JSON content output also requires `export_data`.
fn require_export(ctx: &mut CliContext, principal: &str) -> Result<()> {
    if ctx.authz.authorize(principal, Permission::ExportData) {
        return Ok(());
    }
    let role = ctx.authz.role_of(principal);
    ctx.audit(
        principal,
        AuditEventKind::PermissionDenied,
        json!({ "role": role, "permission": Permission::ExportData.as_str() }),
    )?;
    bail!("{principal} ({role}) lacks {}", Permission::ExportData)
}

fn record_failure(ctx: &mut CliContext, principal: &str, err: ReportError) -> anyhow::Error {
    let audited = match &err {
        ReportError::AuthorizationDenied {
            role, permission, ..
        } => ctx.audit(
            principal,
            AuditEventKind::PermissionDenied,
            json!({ "role": role, "permission": permission.as_str() }),
        ),
        other => ctx.audit(
            principal,
            AuditEventKind::SystemError,
            json!({ "error": other.to_string() }),
        ),
    };
    match audited {
        Ok(()) => anyhow!(err),
        Err(audit_err) => audit_err.context(err.to_string()),
    }
}
