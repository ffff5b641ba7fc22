//! ---
//! insight_section: "06-cli"
//! insight_subsection: "binary"
//! insight_type: "source"
//! insight_scope: "code"
//! insight_description: "Operator CLI for report generation, credential checks, and audit verification."
//! insight_version: "v0.1.0"
//! insight_owner: "tbd"
//! ---
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use insight_common::{init_tracing, AppConfig};
use insight_reporting::{FixedClock, ReportMetrics, ReportPipeline};
use insight_security::{AuditEventKind, AuditLog, AuthorizationModel, SecurityMetrics};
use prometheus::{Encoder, Registry, TextEncoder};
use tracing::debug;

const DEFAULT_CONFIG_CANDIDATES: [&str; 2] = ["configs/insight.toml", "configs/insight.example.toml"];

/// Everything a subcommand needs, built once from the configuration file.
pub struct CliContext {
    pub config: AppConfig,
    pub source: PathBuf,
    pub authz: Arc<AuthorizationModel>,
    registry: Option<Arc<Registry>>,
    report_metrics: Option<ReportMetrics>,
    audit: Option<AuditLog>,
}

impl CliContext {
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut candidates: Vec<PathBuf> = Vec::new();
        if let Some(path) = explicit {
            candidates.push(path.to_path_buf());
        }
        candidates.extend(DEFAULT_CONFIG_CANDIDATES.iter().map(PathBuf::from));
        let loaded = AppConfig::load_with_source(&candidates)?;
        let config = loaded.config;
        init_tracing("insightctl", &config.logging)?;
        debug!(source = %loaded.source.display(), "configuration loaded");

        let mut authz = AuthorizationModel::from_config(&config.authorization)
            .context("invalid [authorization] configuration")?;
        let (registry, report_metrics) = if config.metrics.enabled {
            let registry = Arc::new(Registry::new());
            authz = authz.with_metrics(SecurityMetrics::new(registry.clone())?);
            let report_metrics = ReportMetrics::new(registry.clone())?;
            (Some(registry), Some(report_metrics))
        } else {
            (None, None)
        };

        let audit = if config.audit.enabled {
            Some(AuditLog::open(&config.audit.path)?)
        } else {
            None
        };

        Ok(Self {
            config,
            source: loaded.source,
            authz: Arc::new(authz),
            registry,
            report_metrics,
            audit,
        })
    }

    /// Pipeline over the shared authorization model, with optional overrides.
    pub fn pipeline(
        &self,
        sanitize: bool,
        generated_at: Option<DateTime<Utc>>,
    ) -> Result<ReportPipeline> {
        let mut reporting = self.config.reporting.clone();
        reporting.sanitize_text |= sanitize;
        let mut pipeline = ReportPipeline::new(self.authz.clone(), &reporting)
            .context("invalid [reporting] configuration")?;
        if let Some(at) = generated_at {
            pipeline = pipeline.with_clock(Arc::new(FixedClock(at)));
        }
        if let Some(metrics) = &self.report_metrics {
            pipeline = pipeline.with_metrics(metrics.clone());
        }
        Ok(pipeline)
    }

    /// Append to the audit log when auditing is enabled.
    pub fn audit(
        &mut self,
        actor: &str,
        kind: AuditEventKind,
        details: serde_json::Value,
    ) -> Result<()> {
        if let Some(log) = self.audit.as_mut() {
            log.append(actor, kind, details)
                .with_context(|| format!("unable to record {kind} audit event"))?;
        }
        Ok(())
    }

    /// Prometheus text exposition of every registered counter.
    pub fn render_metrics(&self) -> Result<Option<String>> {
        let Some(registry) = &self.registry else {
            return Ok(None);
        };
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&registry.gather(), &mut buffer)?;
        Ok(Some(String::from_utf8(buffer)?))
    }
}
