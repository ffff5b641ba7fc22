//! ---
//! insight_section: "05-reporting"
//! insight_subsection: "module"
//! insight_type: "source"
//! insight_scope: "code"
//! insight_description: "Feedback aggregation, PDF rendering, and the report pipeline."
//! insight_version: "v0.1.0"
//! insight_owner: "tbd"
//! ---
use chrono::{DateTime, Utc};
use insight_security::Role;
use serde::Serialize;

use crate::aggregate::ReportSection;
use crate::render::encoding;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportMetadata {
    pub title: String,
    pub subtitle: Option<String>,
    pub generated_at: DateTime<Utc>,
    pub corpus_size: usize,
    /// Role of the principal the report was produced for.
    pub requested_by: Role,
}

/// Aggregated report content ready for rendering or JSON export.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub metadata: ReportMetadata,
    pub sections: Vec<ReportSection>,
}

impl Report {
    pub fn new(metadata: ReportMetadata, sections: Vec<ReportSection>) -> Self {
        Self { metadata, sections }
    }

    pub fn section_titles(&self) -> Vec<&str> {
        self.sections
            .iter()
            .map(|section| section.title.as_str())
            .collect()
    }

    /// Copy of the report with every character the document fonts cannot
    /// encode replaced by `?`.
    pub fn sanitized(&self) -> Report {
        let clean = |text: &String| encoding::sanitize(text);
        let mut report = self.clone();
        report.metadata.title = clean(&report.metadata.title);
        report.metadata.subtitle = report.metadata.subtitle.as_ref().map(clean);
        for section in &mut report.sections {
            section.title = clean(&section.title);
            for statement in &mut section.statements {
                *statement = clean(statement);
            }
            for column in &mut section.table.columns {
                *column = clean(column);
            }
            for cell in section.table.rows.iter_mut().flatten() {
                *cell = clean(cell);
            }
            for excerpt in &mut section.excerpts {
                excerpt.record_id = clean(&excerpt.record_id);
                excerpt.topic = clean(&excerpt.topic);
                excerpt.text = clean(&excerpt.text);
            }
        }
        report
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
