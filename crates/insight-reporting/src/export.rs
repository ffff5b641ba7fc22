//! ---
//! insight_section: "05-reporting"
//! insight_subsection: "module"
//! insight_type: "source"
//! insight_scope: "code"
//! insight_description: "Feedback aggregation, PDF rendering, and the report pipeline."
//! insight_version: "v0.1.0"
//! insight_owner: "tbd"
//! ---
use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::Serialize;
use serde_json::json;
use tracing::info;

use crate::errors::ExportError;
use crate::render::{ArtifactMetadata, ReportArtifact};
use crate::report::Report;

/// Files written by [`ReportExporter`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportedFiles {
    pub pdf: Option<PathBuf>,
    pub json: Option<PathBuf>,
}

#[derive(Debug)]
pub struct ReportExporter<'a> {
    report: &'a Report,
}

impl<'a> ReportExporter<'a> {
    pub fn new(report: &'a Report) -> Self {
        Self { report }
    }

    /// Write `<stem>.pdf` and the JSON content envelope `<stem>.json`.
    pub fn export_all(
        &self,
        artifact: &ReportArtifact,
        output_dir: &Path,
        stem: &str,
    ) -> Result<ExportedFiles, ExportError> {
        let pdf = self.export_pdf(artifact, output_dir, stem)?;
        let json = self.export_json(Some(&artifact.metadata), output_dir, stem)?;
        Ok(ExportedFiles {
            pdf: Some(pdf),
            json: Some(json),
        })
    }

    pub fn export_pdf(
        &self,
        artifact: &ReportArtifact,
        output_dir: &Path,
        stem: &str,
    ) -> Result<PathBuf, ExportError> {
        ensure_dir(output_dir)?;
        let path = output_dir.join(format!("{stem}.pdf"));
        fs::write(&path, &artifact.bytes)?;
        info!(path = %path.display(), bytes = artifact.len(), "report document written");
        Ok(path)
    }

    pub fn export_json(
        &self,
        artifact: Option<&ArtifactMetadata>,
        output_dir: &Path,
        stem: &str,
    ) -> Result<PathBuf, ExportError> {
        ensure_dir(output_dir)?;
        let timestamp = self.report.metadata.generated_at.to_rfc3339();
        let envelope = ReportEnvelope {
            timestamp: &timestamp,
            requested_by: self.report.metadata.requested_by.as_str(),
            schema: report_schema(),
            artifact,
            data: self.report,
        };
        let path = output_dir.join(format!("{stem}.json"));
        write_json(&path, &envelope)?;
        info!(path = %path.display(), "report content written");
        Ok(path)
    }
}

#[derive(Debug, Serialize)]
struct ReportEnvelope<'a, T: Serialize> {
    timestamp: &'a str,
    requested_by: &'a str,
    schema: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    artifact: Option<&'a ArtifactMetadata>,
    data: &'a T,
}

fn ensure_dir(output_dir: &Path) -> Result<(), ExportError> {
    if !output_dir.exists() {
        fs::create_dir_all(output_dir)?;
    }
    Ok(())
}

fn write_json<T: Serialize>(path: impl AsRef<Path>, value: &T) -> Result<(), ExportError> {
    let serialized = serde_json::to_string_pretty(value)?;
    fs::write(path, serialized)?;
    Ok(())
}

fn report_schema() -> serde_json::Value {
    json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "title": "FeedbackInsightReport",
        "type": "object",
        "properties": {
            "metadata": {
                "type": "object",
                "properties": {
                    "title": {"type": "string"},
                    "subtitle": {"type": ["string", "null"]},
                    "generated_at": {"type": "string", "format": "date-time"},
                    "corpus_size": {"type": "integer", "minimum": 0},
                    "requested_by": {"enum": ["admin", "analyst", "viewer"]}
                },
                "required": ["title", "generated_at", "corpus_size", "requested_by"]
            },
            "sections": {
                "type": "array",
                "minItems": 1,
                "items": {
                    "type": "object",
                    "properties": {
                        "title": {"type": "string"},
                        "kind": {"enum": ["topic", "overall_summary", "no_data"]},
                        "statements": {"type": "array", "items": {"type": "string"}},
                        "table": {
                            "type": "object",
                            "properties": {
                                "columns": {"type": "array", "items": {"type": "string"}},
                                "rows": {
                                    "type": "array",
                                    "items": {"type": "array", "items": {"type": "string"}}
                                }
                            },
                            "required": ["columns", "rows"]
                        },
                        "excerpts": {"type": "array"}
                    },
                    "required": ["title", "kind", "statements", "table", "excerpts"]
                }
            }
        },
        "required": ["metadata", "sections"]
    })
}
