//! ---
//! insight_section: "07-testing"
//! insight_subsection: "integration-tests"
//! insight_type: "source"
//! insight_scope: "code"
//! insight_description: "Integration tests for corpus loading, report generation, and export."
//! insight_version: "v0.1.0"
//! insight_owner: "tbd"
//! ---
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use std::thread;

use chrono::{TimeZone, Utc};
use insight_common::AppConfig;
use insight_reporting::corpus;
use insight_reporting::{
    FeedbackRecord, FixedClock, ReportError, ReportExporter, ReportMetrics, ReportPipeline,
    SectionKind, OVERALL_SUMMARY_TITLE, UNCLASSIFIED,
};
use insight_security::{AuthorizationModel, Role, SecurityMetrics};
use tempfile::tempdir;

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

[reporting]
title = "Weekly Customer Feedback Insight Report"
max_table_rows = 10
"#;

fn sample_corpus() -> Vec<FeedbackRecord> {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../demos/feedback_sample.csv");
    corpus::load_path(path).unwrap()
}

fn pipeline() -> (ReportPipeline, ReportMetrics) {
    let config = AppConfig::from_str(CONFIG).unwrap();
    let registry = Arc::new(prometheus::Registry::new());
    let authz = AuthorizationModel::from_config(&config.authorization)
        .unwrap()
        .with_metrics(SecurityMetrics::new(registry.clone()).unwrap());
    let metrics = ReportMetrics::new(registry).unwrap();
    let at = Utc.with_ymd_and_hms(2024, 5, 6, 12, 0, 0).unwrap();
    let pipeline = ReportPipeline::new(Arc::new(authz), &config.reporting)
        .unwrap()
        .with_clock(Arc::new(FixedClock(at)))
        .with_metrics(metrics.clone());
    (pipeline, metrics)
}

#[test]
fn sample_corpus_produces_ordered_sections() {
    let records = sample_corpus();
    assert_eq!(records.len(), 6);
    assert_eq!(records[0].topic_label(), Some("billing"));
    assert_eq!(records[0].impact_score(), Some(0.92));
    assert_eq!(records[5].topic_label(), None);

    let (pipeline, _) = pipeline();
    let report = pipeline
        .generate_report_content("analyst_amy", &records)
        .unwrap();
    assert_eq!(
        report.section_titles(),
        vec!["billing", "shipping", "mobile app", UNCLASSIFIED, OVERALL_SUMMARY_TITLE]
    );
    assert_eq!(report.metadata.requested_by, Role::Analyst);

    let summary = report.sections.last().unwrap();
    assert_eq!(summary.kind, SectionKind::OverallSummary);
    assert!(!summary.table.is_empty());
    assert!(summary
        .statements
        .iter()
        .any(|statement| statement.contains("Period covered")));
}

#[test]
fn viewer_request_is_refused_and_counted() {
    let (pipeline, metrics) = pipeline();
    let err = pipeline
        .generate_report("viewer_bob", &sample_corpus())
        .unwrap_err();
    assert!(matches!(
        err,
        ReportError::AuthorizationDenied { role: Role::Viewer, .. }
    ));
    let snapshot = metrics.snapshot();
    assert_eq!(snapshot.report_denials, 1);
    assert_eq!(snapshot.reports_generated, 0);
}

#[test]
fn concurrent_requests_share_one_pipeline() {
    let (pipeline, metrics) = pipeline();
    let records = sample_corpus();
    let baseline = pipeline.generate_report("admin", &records).unwrap();

    let outputs: Vec<_> = thread::scope(|scope| {
        let handles: Vec<_> = ["admin", "analyst_amy", "viewer_bob", "analyst_amy"]
            .into_iter()
            .map(|principal| {
                let pipeline = &pipeline;
                let records = &records;
                scope.spawn(move || (principal, pipeline.generate_report(principal, records)))
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .collect::<Vec<_>>()
    });

    for (principal, outcome) in outputs {
        match principal {
            "viewer_bob" => assert!(outcome.unwrap_err().is_denied()),
            "admin" => assert_eq!(outcome.unwrap().bytes, baseline.bytes),
            _ => assert!(!outcome.unwrap().is_empty()),
        }
    }
    let snapshot = metrics.snapshot();
    assert_eq!(snapshot.reports_generated, 4);
    assert_eq!(snapshot.report_denials, 1);
}

#[test]
fn generated_report_exports_pdf_and_envelope() {
    let (pipeline, _) = pipeline();
    let generated = pipeline.generate("admin", &sample_corpus()).unwrap();
    let dir = tempdir().unwrap();

    let files = ReportExporter::new(&generated.report)
        .export_all(&generated.artifact, dir.path(), "weekly")
        .unwrap();
    let pdf = fs::read(files.pdf.unwrap()).unwrap();
    assert!(pdf.starts_with(b"%PDF-1.4"));
    assert!(pdf.ends_with(b"%%EOF\n"));

    let envelope: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(files.json.unwrap()).unwrap()).unwrap();
    assert_eq!(envelope["requested_by"], "admin");
    assert_eq!(
        envelope["artifact"]["section_count"],
        generated.report.sections.len()
    );
    assert_eq!(envelope["data"]["sections"][0]["title"], "billing");
}
