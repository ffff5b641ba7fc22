//! ---
//! insight_section: "05-reporting"
//! insight_subsection: "module"
//! insight_type: "source"
//! insight_scope: "code"
//! insight_description: "Feedback aggregation, PDF rendering, and the report pipeline."
//! insight_version: "v0.1.0"
//! insight_owner: "tbd"
//! ---
//! Paginated PDF rendering of a [`Report`].
//!
//! Output uses the standard base fonts with WinAnsi encoding and no stream
//! compression. The only time value embedded is the report's own generation
//! timestamp, so rendering the same report always yields the same bytes.
pub(crate) mod encoding;
mod layout;
mod pdf;

use insight_common::ReportingConfig;
use serde::Serialize;
use tracing::debug;

use crate::aggregate::{Excerpt, ReportSection};
use crate::errors::RenderError;
use crate::report::Report;
use layout::{Font, Layout};

pub const PDF_CONTENT_TYPE: &str = "application/pdf";

const TITLE_PAGE: &str = "title page";
const BODY_SIZE: f32 = 10.0;
const INDENT: f32 = 12.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    pub max_table_rows: usize,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self { max_table_rows: 10 }
    }
}

impl From<&ReportingConfig> for RenderOptions {
    fn from(config: &ReportingConfig) -> Self {
        Self {
            max_table_rows: config.max_table_rows,
        }
    }
}

/// Content that did not fit and was cut explicitly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TruncationNote {
    pub section: String,
    pub detail: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactMetadata {
    pub page_count: usize,
    pub section_count: usize,
    pub truncations: Vec<TruncationNote>,
}

/// Rendered document handed to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportArtifact {
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
    pub metadata: ArtifactMetadata,
}

impl ReportArtifact {
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReportRenderer {
    options: RenderOptions,
}

impl ReportRenderer {
    pub fn new(options: RenderOptions) -> Result<Self, RenderError> {
        if options.max_table_rows == 0 {
            return Err(RenderError::InvalidOptions(
                "max_table_rows must be at least 1".into(),
            ));
        }
        Ok(Self { options })
    }

    /// Lay out and serialize `report`. Characters outside WinAnsi fail with
    /// [`RenderError::UnsupportedCharacter`]; retry with [`Report::sanitized`].
    pub fn render(&self, report: &Report) -> Result<ReportArtifact, RenderError> {
        let mut layout = Layout::new(self.options.max_table_rows, TITLE_PAGE);
        title_page(&mut layout, report)?;
        for section in &report.sections {
            section_block(&mut layout, section)?;
        }
        let (mut pages, truncations) = layout.finish();

        let title = encoding::encode(&report.metadata.title).map_err(|character| {
            RenderError::UnsupportedCharacter {
                section: TITLE_PAGE.to_owned(),
                character,
                code: character as u32,
            }
        })?;
        layout::stamp_pages(&mut pages, &title);
        let bytes = pdf::write_document(
            &pages,
            &pdf::DocumentInfo {
                title: &title,
                created: report.metadata.generated_at,
            },
        );

        debug!(
            pages = pages.len(),
            bytes = bytes.len(),
            truncations = truncations.len(),
            "rendered report"
        );
        Ok(ReportArtifact {
            content_type: PDF_CONTENT_TYPE,
            bytes,
            metadata: ArtifactMetadata {
                page_count: pages.len(),
                section_count: report.sections.len(),
                truncations,
            },
        })
    }
}

fn title_page(layout: &mut Layout, report: &Report) -> Result<(), RenderError> {
    let meta = &report.metadata;
    layout.space(96.0);
    layout.paragraph(Font::Bold, 22.0, 0.0, &meta.title)?;
    if let Some(subtitle) = &meta.subtitle {
        layout.space(4.0);
        layout.paragraph(Font::Regular, 14.0, 0.0, subtitle)?;
    }
    layout.space(28.0);
    for line in [
        format!(
            "Generated: {}",
            meta.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
        ),
        format!("Prepared for role: {}", meta.requested_by),
        format!("Feedback records analysed: {}", meta.corpus_size),
        format!("Sections: {}", report.sections.len()),
    ] {
        layout.line(Font::Regular, 11.0, 0.0, &line)?;
    }
    layout.space(20.0);
    layout.line(Font::Bold, 12.0, 0.0, "Contents")?;
    for (index, section) in report.sections.iter().enumerate() {
        layout.set_section(&section.title);
        layout.paragraph(
            Font::Regular,
            11.0,
            INDENT,
            &format!("{}. {}", index + 1, section.title),
        )?;
    }
    Ok(())
}

fn section_block(layout: &mut Layout, section: &ReportSection) -> Result<(), RenderError> {
    layout.begin_section(&section.title);
    layout.paragraph(Font::Bold, 16.0, 0.0, &section.title)?;
    layout.space(6.0);

    if !section.statements.is_empty() {
        layout.line(Font::Bold, 11.0, 0.0, "Summary")?;
        for statement in &section.statements {
            layout.paragraph(Font::Regular, BODY_SIZE, INDENT, &format!("- {statement}"))?;
        }
        layout.space(8.0);
    }

    if !section.table.is_empty() {
        layout.line(Font::Bold, 11.0, 0.0, "Breakdown")?;
        layout.table(&section.table, INDENT)?;
        layout.space(8.0);
    }

    if !section.excerpts.is_empty() {
        layout.line(Font::Bold, 11.0, 0.0, "Representative feedback")?;
        for excerpt in &section.excerpts {
            layout.paragraph(Font::Italic, 9.0, INDENT, &excerpt_caption(excerpt))?;
            layout.paragraph(
                Font::Regular,
                BODY_SIZE,
                2.0 * INDENT,
                &format!("\"{}\"", excerpt.text),
            )?;
            if excerpt.truncated {
                layout.truncate(format!(
                    "excerpt {} cut to {} characters",
                    excerpt.record_id,
                    excerpt.text.chars().count()
                ));
            }
            layout.space(4.0);
        }
    }
    Ok(())
}

fn excerpt_caption(excerpt: &Excerpt) -> String {
    let mut parts = vec![
        excerpt.record_id.clone(),
        excerpt.timestamp.format("%Y-%m-%d %H:%M").to_string(),
        excerpt
            .sentiment
            .map_or("unclassified", |sentiment| sentiment.as_str())
            .to_owned(),
        excerpt.topic.clone(),
    ];
    if let Some(highlight) = excerpt.highlight {
        parts.push(highlight.as_str().to_owned());
    }
    if let Some(score) = excerpt.impact_score {
        parts.push(format!("impact {score:.2}"));
    }
    parts.join(" | ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::{AggregationOptions, ContentAggregator};
    use crate::corpus::{FeedbackRecord, Sentiment};
    use crate::report::ReportMetadata;
    use chrono::{DateTime, TimeZone, Utc};
    use insight_security::Role;

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, day, 9, 0, 0).unwrap()
    }

    fn report(records: &[FeedbackRecord]) -> Report {
        let sections = ContentAggregator::new(AggregationOptions::default())
            .unwrap()
            .aggregate(records)
            .unwrap();
        Report::new(
            ReportMetadata {
                title: "Weekly Customer Feedback Insight Report".into(),
                subtitle: None,
                generated_at: at(7),
                corpus_size: records.len(),
                requested_by: Role::Analyst,
            },
            sections,
        )
    }

    fn records() -> Vec<FeedbackRecord> {
        vec![
            FeedbackRecord::new("f-1", "Charged twice", at(1))
                .with_topic("billing")
                .with_sentiment(Sentiment::Negative),
            FeedbackRecord::new("f-2", "Clear invoice", at(2))
                .with_topic("billing")
                .with_sentiment(Sentiment::Positive),
            FeedbackRecord::new("f-3", "Parcel arrived early", at(3))
                .with_topic("shipping")
                .with_sentiment(Sentiment::Positive),
        ]
    }

    #[test]
    fn renders_title_page_plus_one_page_per_section() {
        let artifact = ReportRenderer::default().render(&report(&records())).unwrap();
        assert_eq!(artifact.content_type, PDF_CONTENT_TYPE);
        assert!(artifact.bytes.starts_with(b"%PDF-1.4"));
        assert_eq!(artifact.len(), artifact.bytes.len());
        assert_eq!(artifact.metadata.section_count, 3);
        assert_eq!(artifact.metadata.page_count, 4);
        assert!(artifact.metadata.truncations.is_empty());
    }

    #[test]
    fn rendering_is_byte_identical() {
        let report = report(&records());
        let renderer = ReportRenderer::default();
        assert_eq!(renderer.render(&report).unwrap(), renderer.render(&report).unwrap());
    }

    #[test]
    fn unsupported_character_fails_then_sanitized_succeeds() {
        let mut corpus = records();
        corpus.push(
            FeedbackRecord::new("f-4", "配送が速い", at(4))
                .with_topic("shipping")
                .with_sentiment(Sentiment::Positive),
        );
        let report = report(&corpus);
        let err = ReportRenderer::default().render(&report).unwrap_err();
        assert!(matches!(
            err,
            RenderError::UnsupportedCharacter { ref section, character: '配', .. } if section == "shipping"
        ));
        let artifact = ReportRenderer::default()
            .render(&report.sanitized())
            .unwrap();
        assert!(!artifact.is_empty());
    }

    #[test]
    fn table_truncation_is_recorded_in_metadata() {
        let corpus: Vec<FeedbackRecord> = (0..7)
            .map(|index| {
                FeedbackRecord::new(format!("r-{index}"), "text", at(1))
                    .with_topic(format!("topic-{index}"))
            })
            .collect();
        let renderer = ReportRenderer::new(RenderOptions { max_table_rows: 5 }).unwrap();
        let artifact = renderer.render(&report(&corpus)).unwrap();
        assert_eq!(
            artifact.metadata.truncations,
            vec![TruncationNote {
                section: "overall summary".into(),
                detail: "table limited to 5 of 7 rows".into(),
            }]
        );
    }

    #[test]
    fn cut_excerpts_are_recorded_in_metadata() {
        let long = "The refund took far too long to arrive. ".repeat(12);
        let corpus = vec![FeedbackRecord::new("f-9", long, at(1))
            .with_topic("billing")
            .with_sentiment(Sentiment::Negative)];
        let report = report(&corpus);
        let excerpt = &report.sections[0].excerpts[0];
        assert!(excerpt.truncated);
        let expected = format!("excerpt f-9 cut to {} characters", excerpt.text.chars().count());

        let artifact = ReportRenderer::default().render(&report).unwrap();
        assert!(artifact.metadata.truncations.contains(&TruncationNote {
            section: "billing".into(),
            detail: expected,
        }));
    }

    #[test]
    fn empty_report_still_renders() {
        let artifact = ReportRenderer::default().render(&report(&[])).unwrap();
        assert_eq!(artifact.metadata.page_count, 2);
    }

    #[test]
    fn zero_table_rows_is_invalid() {
        assert!(ReportRenderer::new(RenderOptions { max_table_rows: 0 }).is_err());
    }
}
