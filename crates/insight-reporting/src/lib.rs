//! ---
//! insight_section: "05-reporting"
//! insight_subsection: "module"
//! insight_type: "source"
//! insight_scope: "code"
//! insight_description: "Feedback aggregation, PDF rendering, and the report pipeline."
//! insight_version: "v0.1.0"
//! insight_owner: "tbd"
//! ---
//! Turns an analysed feedback corpus into an access-controlled PDF report.
pub mod aggregate;
pub mod corpus;
pub mod errors;
pub mod export;
pub mod metrics;
pub mod pipeline;
pub mod render;
pub mod report;

pub use aggregate::{
    AggregationOptions, ContentAggregator, DataTable, Excerpt, Highlight, ReportSection,
    SectionKind, NO_DATA_TITLE, OVERALL_SUMMARY_TITLE, UNCLASSIFIED,
};
pub use corpus::{FeedbackRecord, Sentiment};
pub use errors::{AggregationError, CorpusError, ExportError, RenderError, ReportError, Result};
pub use export::{ExportedFiles, ReportExporter};
pub use metrics::{ReportMetrics, ReportMetricsSnapshot};
pub use pipeline::{
    Clock, FixedClock, GeneratedReport, ReportPipeline, SystemClock, REQUIRED_PERMISSION,
};
pub use render::{
    ArtifactMetadata, RenderOptions, ReportArtifact, ReportRenderer, TruncationNote,
    PDF_CONTENT_TYPE,
};
pub use report::{Report, ReportMetadata};
