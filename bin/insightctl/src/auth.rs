//! ---
//! insight_section: "06-cli"
//! insight_subsection: "binary"
//! insight_type: "source"
//! insight_scope: "code"
//! insight_description: "Operator CLI for report generation, credential checks, and audit verification."
//! insight_version: "v0.1.0"
//! insight_owner: "tbd"
//! ---
use anyhow::{bail, Result};
use clap::{Args, Subcommand};
use insight_logging::{log_system_event, LogContext, SystemEventOutcome};
use insight_security::{AuditEventKind, Permission, RoleSource};
use serde_json::json;

use crate::context::CliContext;

#[derive(Debug, Subcommand)]
pub enum AuthCommand {
    /// Verify a principal's secret and show the resolved role.
    Whoami(WhoamiArgs),
    /// Check whether a principal holds a permission.
    Check(CheckArgs),
    /// Hash a secret with the configured key, for use as `secret_hash`.
    HashSecret(HashSecretArgs),
    /// List every role with its granted permissions.
    Roles,
}

#[derive(Debug, Args)]
pub struct WhoamiArgs {
    #[arg(long, value_name = "ID")]
    principal: String,
    #[arg(long, env = "INSIGHT_SECRET", hide_env_values = true)]
    secret: String,
}

#[derive(Debug, Args)]
pub struct CheckArgs {
    #[arg(long, value_name = "ID")]
    principal: String,
    /// Permission name, e.g. `generate_reports`.
    #[arg(long, value_name = "PERMISSION")]
    permission: Permission,
}

#[derive(Debug, Args)]
pub struct HashSecretArgs {
    #[arg(long, env = "INSIGHT_SECRET", hide_env_values = true)]
    secret: String,
}

pub fn run(ctx: &mut CliContext, command: AuthCommand) -> Result<()> {
    match command {
        AuthCommand::Whoami(args) => whoami(ctx, args),
        AuthCommand::Check(args) => check(ctx, args),
        AuthCommand::HashSecret(args) => hash_secret(ctx, args),
        AuthCommand::Roles => {
            for (role, permissions) in ctx.authz.catalog().roles() {
                let names: Vec<&str> = permissions.iter().map(Permission::as_str).collect();
                println!("{role}: {}", names.join(", "));
            }
            Ok(())
        }
    }
}

fn whoami(ctx: &mut CliContext, args: WhoamiArgs) -> Result<()> {
    let verified = ctx.authz.verify_credential(&args.principal, &args.secret);
    let resolved = ctx.authz.resolve(&args.principal);
    let role = resolved.role.to_string();
    let log_ctx = LogContext::new()
        .with_principal(&args.principal)
        .with_role(&role);
    if !verified {
        log_system_event(
            Some(&log_ctx),
            "login.failure",
            "credential rejected",
            SystemEventOutcome::Denied,
        );
        ctx.audit(&args.principal, AuditEventKind::LoginFailure, json!({}))?;
        bail!("credential verification failed for {}", args.principal);
    }
    log_system_event(
        Some(&log_ctx),
        "login.success",
        "credential verified",
        SystemEventOutcome::Success,
    );
    ctx.audit(
        &args.principal,
        AuditEventKind::LoginSuccess,
        json!({ "role": resolved.role }),
    )?;

    let entry = ctx.authz.store().get(&args.principal);
    println!("Principal: {}", args.principal);
    if let Some(name) = entry.map(|e| e.display_name.as_str()).filter(|n| !n.is_empty()) {
        println!("Name: {name}");
    }
    if let Some(email) = entry.and_then(|e| e.email.as_deref()) {
        println!("Email: {email}");
    }
    let source = match resolved.source {
        RoleSource::Configured => "configured",
        RoleSource::DefaultFallback => "default",
    };
    println!("Role: {role} ({source})");
    let permissions: Vec<&str> = ctx
        .authz
        .permissions_of(resolved.role)
        .iter()
        .map(Permission::as_str)
        .collect();
    println!("Permissions: {}", permissions.join(", "));
    Ok(())
}

fn check(ctx: &mut CliContext, args: CheckArgs) -> Result<()> {
    let role = ctx.authz.role_of(&args.principal);
    if ctx.authz.authorize(&args.principal, args.permission) {
        println!("{} ({role}) holds {}", args.principal, args.permission);
        return Ok(());
    }
    ctx.audit(
        &args.principal,
        AuditEventKind::PermissionDenied,
        json!({ "role": role, "permission": args.permission.as_str() }),
    )?;
    bail!("{} ({role}) lacks {}", args.principal, args.permission)
}

fn hash_secret(ctx: &CliContext, args: HashSecretArgs) -> Result<()> {
    if ctx.config.authorization.hash_key.is_none() {
        bail!("authorization.hash_key must be set; hashes under an ephemeral key cannot be verified later");
    }
    println!("{}", ctx.authz.hash_credential(&args.secret));
    Ok(())
}
