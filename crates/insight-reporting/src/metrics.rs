//! ---
//! insight_section: "05-reporting"
//! insight_subsection: "module"
//! insight_type: "source"
//! insight_scope: "code"
//! insight_description: "Feedback aggregation, PDF rendering, and the report pipeline."
//! insight_version: "v0.1.0"
//! insight_owner: "tbd"
//! ---
use std::sync::Arc;

use insight_security::register_counter;
use prometheus::{IntCounter, Registry};

/// Report pipeline counters exported via Prometheus.
#[derive(Clone)]
pub struct ReportMetrics {
    registry: Arc<Registry>,
    reports_generated_total: IntCounter,
    report_denials_total: IntCounter,
    report_render_failures_total: IntCounter,
    report_sections_total: IntCounter,
}

impl std::fmt::Debug for ReportMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReportMetrics")
            .field("snapshot", &self.snapshot())
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReportMetricsSnapshot {
    pub reports_generated: u64,
    pub report_denials: u64,
    pub render_failures: u64,
    pub sections: u64,
}

impl ReportMetrics {
    pub fn new(registry: Arc<Registry>) -> anyhow::Result<Self> {
        Ok(Self {
            reports_generated_total: register_counter(
                &registry,
                "insight_reports_generated_total",
                "Reports rendered and returned to the caller",
            )?,
            report_denials_total: register_counter(
                &registry,
                "insight_report_denials_total",
                "Report requests refused for lack of permission",
            )?,
            report_render_failures_total: register_counter(
                &registry,
                "insight_report_render_failures_total",
                "Reports that failed during rendering",
            )?,
            report_sections_total: register_counter(
                &registry,
                "insight_report_sections_total",
                "Sections emitted across all generated reports",
            )?,
            registry,
        })
    }

    pub fn registry(&self) -> Arc<Registry> {
        self.registry.clone()
    }

    pub fn record_generated(&self, sections: usize) {
        self.reports_generated_total.inc();
        self.report_sections_total.inc_by(sections as u64);
    }

    pub fn inc_denial(&self) {
        self.report_denials_total.inc();
    }

    pub fn inc_render_failure(&self) {
        self.report_render_failures_total.inc();
    }

    pub fn snapshot(&self) -> ReportMetricsSnapshot {
        ReportMetricsSnapshot {
            reports_generated: self.reports_generated_total.get(),
            report_denials: self.report_denials_total.get(),
            render_failures: self.report_render_failures_total.get(),
            sections: self.report_sections_total.get(),
        }
    }
}
