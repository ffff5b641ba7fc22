//! ---
//! insight_section: "05-reporting"
//! insight_subsection: "module"
//! insight_type: "source"
//! insight_scope: "code"
//! insight_description: "Feedback aggregation, PDF rendering, and the report pipeline."
//! insight_version: "v0.1.0"
//! insight_owner: "tbd"
//! ---
//! Access-controlled report generation.
//!
//! The pipeline checks `generate_reports` before touching the corpus, then
//! aggregates, wraps and renders. It keeps no state between calls and
//! performs no persistent writes; auditing outcomes is left to the caller.
use std::sync::Arc;

use chrono::{DateTime, Utc};
use insight_common::ReportingConfig;
use insight_logging::{insight_debug, log_system_event, LogContext, SystemEventOutcome};
use insight_security::{AuthorizationModel, Permission, Role};

use crate::aggregate::{AggregationOptions, ContentAggregator};
use crate::corpus::FeedbackRecord;
use crate::errors::{ReportError, Result};
use crate::metrics::ReportMetrics;
use crate::render::{RenderOptions, ReportArtifact, ReportRenderer};
use crate::report::{Report, ReportMetadata};

/// Permission a principal must hold to obtain a report.
pub const REQUIRED_PERMISSION: Permission = Permission::GenerateReports;

/// Source of the generation timestamp stamped on every report.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Always returns the same instant; makes rendered output reproducible.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Report content together with its rendered document.
#[derive(Debug, Clone)]
pub struct GeneratedReport {
    pub report: Report,
    pub artifact: ReportArtifact,
}

#[derive(Clone)]
pub struct ReportPipeline {
    authz: Arc<AuthorizationModel>,
    aggregator: ContentAggregator,
    renderer: ReportRenderer,
    title: String,
    subtitle: Option<String>,
    sanitize_text: bool,
    clock: Arc<dyn Clock>,
    metrics: Option<ReportMetrics>,
}

impl std::fmt::Debug for ReportPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReportPipeline")
            .field("aggregator", &self.aggregator)
            .field("renderer", &self.renderer)
            .field("title", &self.title)
            .field("sanitize_text", &self.sanitize_text)
            .finish_non_exhaustive()
    }
}

impl ReportPipeline {
    pub fn new(authz: Arc<AuthorizationModel>, config: &ReportingConfig) -> Result<Self> {
        Ok(Self {
            authz,
            aggregator: ContentAggregator::new(AggregationOptions::from(config))?,
            renderer: ReportRenderer::new(RenderOptions::from(config))?,
            title: config.title.clone(),
            subtitle: config.subtitle.clone(),
            sanitize_text: config.sanitize_text,
            clock: Arc::new(SystemClock),
            metrics: None,
        })
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_metrics(mut self, metrics: ReportMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn authorization(&self) -> &AuthorizationModel {
        &self.authz
    }

    /// Render a report for `principal`, or refuse with
    /// [`ReportError::AuthorizationDenied`] before any aggregation happens.
    pub fn generate_report(
        &self,
        principal: &str,
        corpus: &[FeedbackRecord],
    ) -> Result<ReportArtifact> {
        self.generate(principal, corpus)
            .map(|generated| generated.artifact)
    }

    /// Authorization and aggregation only; nothing is rendered.
    pub fn generate_report_content(
        &self,
        principal: &str,
        corpus: &[FeedbackRecord],
    ) -> Result<Report> {
        let role = self.authorize(principal)?;
        let sections = self.aggregator.aggregate(corpus)?;
        let report = Report::new(
            ReportMetadata {
                title: self.title.clone(),
                subtitle: self.subtitle.clone(),
                generated_at: self.clock.now(),
                corpus_size: corpus.len(),
                requested_by: role,
            },
            sections,
        );
        Ok(if self.sanitize_text {
            report.sanitized()
        } else {
            report
        })
    }

    /// Content plus rendered document, for callers that export both.
    pub fn generate(&self, principal: &str, corpus: &[FeedbackRecord]) -> Result<GeneratedReport> {
        let report = self.generate_report_content(principal, corpus)?;
        let role = report.metadata.requested_by.to_string();
        let context = LogContext::new()
            .with_principal(principal)
            .with_role(&role)
            .with_report(&self.title);

        let artifact = match self.renderer.render(&report) {
            Ok(artifact) => artifact,
            Err(err) => {
                if let Some(metrics) = &self.metrics {
                    metrics.inc_render_failure();
                }
                log_system_event(
                    Some(&context),
                    "report.generate",
                    &err.to_string(),
                    SystemEventOutcome::Fault,
                );
                return Err(err.into());
            }
        };

        if let Some(metrics) = &self.metrics {
            metrics.record_generated(report.sections.len());
        }
        insight_debug!(
            context = context,
            "rendered {} sections into {} pages ({} bytes)",
            report.sections.len(),
            artifact.metadata.page_count,
            artifact.len()
        );
        log_system_event(
            Some(&context),
            "report.generate",
            "report generated",
            SystemEventOutcome::Success,
        );
        Ok(GeneratedReport { report, artifact })
    }

    fn authorize(&self, principal: &str) -> Result<Role> {
        let resolved = self.authz.resolve(principal);
        if self.authz.has_permission(resolved.role, REQUIRED_PERMISSION) {
            return Ok(resolved.role);
        }
        if let Some(metrics) = &self.metrics {
            metrics.inc_denial();
        }
        let role = resolved.role.to_string();
        log_system_event(
            Some(
                &LogContext::new()
                    .with_principal(principal)
                    .with_role(&role)
                    .with_report(&self.title),
            ),
            "report.generate",
            "generate_reports permission missing",
            SystemEventOutcome::Denied,
        );
        Err(ReportError::AuthorizationDenied {
            principal: principal.to_owned(),
            role: resolved.role,
            permission: REQUIRED_PERMISSION,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use chrono::TimeZone;
    use insight_common::AppConfig;

    use super::*;
    use crate::corpus::Sentiment;

    const CONFIG: &str = r#"
[authorization.principals.admin]
role = "admin"
secret = "admin123"

[authorization.principals.analyst_amy]
role = "analyst"
secret = "analyst123"

[authorization.principals.viewer_bob]
role = "viewer"
secret = "viewer123"
"#;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 7, 8, 0, 0).unwrap()
    }

    fn pipeline_with(config: &str) -> ReportPipeline {
        let config = AppConfig::from_str(config).unwrap();
        let authz = AuthorizationModel::from_config(&config.authorization).unwrap();
        ReportPipeline::new(Arc::new(authz), &config.reporting)
            .unwrap()
            .with_clock(Arc::new(FixedClock(now())))
    }

    fn pipeline() -> ReportPipeline {
        pipeline_with(CONFIG)
    }

    fn corpus() -> Vec<FeedbackRecord> {
        let at = |day| Utc.with_ymd_and_hms(2024, 5, day, 10, 0, 0).unwrap();
        vec![
            FeedbackRecord::new("f-1", "Charged twice", at(1))
                .with_topic("billing")
                .with_sentiment(Sentiment::Negative),
            FeedbackRecord::new("f-2", "Refund was quick", at(2))
                .with_topic("billing")
                .with_sentiment(Sentiment::Positive),
            FeedbackRecord::new("f-3", "Late parcel", at(3))
                .with_topic("shipping")
                .with_sentiment(Sentiment::Negative),
        ]
    }

    #[test]
    fn viewer_is_denied_without_rendering() {
        let registry = Arc::new(prometheus::Registry::new());
        let metrics = ReportMetrics::new(registry).unwrap();
        let pipeline = pipeline().with_metrics(metrics.clone());
        let err = pipeline.generate_report("viewer_bob", &corpus()).unwrap_err();
        match err {
            ReportError::AuthorizationDenied {
                principal,
                role,
                permission,
            } => {
                assert_eq!(principal, "viewer_bob");
                assert_eq!(role, Role::Viewer);
                assert_eq!(permission, Permission::GenerateReports);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(metrics.snapshot().report_denials, 1);
        assert_eq!(metrics.snapshot().reports_generated, 0);
    }

    #[test]
    fn unknown_principal_is_denied_as_viewer() {
        let err = pipeline().generate_report("mallory", &corpus()).unwrap_err();
        assert!(err.is_denied());
        assert!(matches!(
            err,
            ReportError::AuthorizationDenied { role: Role::Viewer, .. }
        ));
    }

    #[test]
    fn denial_precedes_corpus_validation() {
        let mut corpus = corpus();
        corpus.push(corpus[0].clone());
        let err = pipeline().generate_report("viewer_bob", &corpus).unwrap_err();
        assert!(err.is_denied());
    }

    #[test]
    fn analyst_receives_pdf_with_expected_sections() {
        let pipeline = pipeline();
        let report = pipeline
            .generate_report_content("analyst_amy", &corpus())
            .unwrap();
        assert_eq!(
            report.section_titles(),
            vec!["billing", "shipping", "overall summary"]
        );
        assert_eq!(report.metadata.requested_by, Role::Analyst);
        assert_eq!(report.metadata.generated_at, now());
        assert_eq!(report.metadata.corpus_size, 3);

        let artifact = pipeline.generate_report("analyst_amy", &corpus()).unwrap();
        assert_eq!(artifact.content_type, "application/pdf");
        assert!(!artifact.is_empty());
    }

    #[test]
    fn fixed_clock_makes_output_reproducible() {
        let pipeline = pipeline();
        let first = pipeline.generate_report("admin", &corpus()).unwrap();
        let second = pipeline.generate_report("admin", &corpus()).unwrap();
        assert_eq!(first.bytes, second.bytes);
    }

    #[test]
    fn render_failure_is_reported_and_counted() {
        let registry = Arc::new(prometheus::Registry::new());
        let metrics = ReportMetrics::new(registry).unwrap();
        let pipeline = pipeline().with_metrics(metrics.clone());
        let mut corpus = corpus();
        corpus[2].topic = Some("配送".into());
        let err = pipeline.generate_report("analyst_amy", &corpus).unwrap_err();
        assert!(matches!(err, ReportError::Render(_)));
        assert_eq!(metrics.snapshot().render_failures, 1);
    }

    #[test]
    fn sanitize_option_replaces_unsupported_text() {
        let config = format!("{CONFIG}\n[reporting]\nsanitize_text = true\n");
        let pipeline = pipeline_with(&config);
        let mut corpus = corpus();
        corpus[2].topic = Some("配送".into());
        let generated = pipeline.generate("analyst_amy", &corpus).unwrap();
        assert!(generated.report.section_titles().contains(&"??"));
        assert!(!generated.artifact.is_empty());
    }

    #[test]
    fn empty_corpus_yields_no_data_report() {
        let report = pipeline()
            .generate_report_content("analyst_amy", &[])
            .unwrap();
        assert_eq!(report.section_titles(), vec!["no data"]);
    }

    #[test]
    fn pipeline_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ReportPipeline>();
    }
}
