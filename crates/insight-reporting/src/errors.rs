//! ---
//! insight_section: "05-reporting"
//! insight_subsection: "module"
//! insight_type: "source"
//! insight_scope: "code"
//! insight_description: "Feedback aggregation, PDF rendering, and the report pipeline."
//! insight_version: "v0.1.0"
//! insight_owner: "tbd"
//! ---
use std::path::PathBuf;

use insight_security::{Permission, Role};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ReportError>;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("principal '{principal}' with role {role} lacks permission {permission}")]
    AuthorizationDenied {
        principal: String,
        role: Role,
        permission: Permission,
    },
    #[error(transparent)]
    Aggregation(#[from] AggregationError),
    #[error(transparent)]
    Render(#[from] RenderError),
}

impl ReportError {
    pub fn is_denied(&self) -> bool {
        matches!(self, ReportError::AuthorizationDenied { .. })
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AggregationError {
    #[error("feedback record identifier '{0}' appears more than once")]
    DuplicateRecord(String),
    #[error("invalid aggregation options: {0}")]
    InvalidOptions(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RenderError {
    #[error("section '{section}' contains character {character:?} (U+{code:04X}) that the document fonts cannot encode")]
    UnsupportedCharacter {
        section: String,
        character: char,
        code: u32,
    },
    #[error("invalid render options: {0}")]
    InvalidOptions(String),
}

#[derive(Debug, Error)]
pub enum CorpusError {
    #[error("unable to read corpus file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed JSON corpus: {0}")]
    Json(#[from] serde_json::Error),
    #[error("malformed CSV corpus: {0}")]
    Csv(#[from] csv::Error),
    #[error("corpus is missing required column '{0}'")]
    MissingColumn(&'static str),
    #[error("record {row}: missing required field '{field}'")]
    MissingField { row: usize, field: &'static str },
    #[error("record {row}: unrecognised timestamp '{value}'")]
    InvalidTimestamp { row: usize, value: String },
    #[error("record {row}: identifier must be a string or integer")]
    InvalidIdentifier { row: usize },
    #[error("unsupported corpus format for {0} (expected .json or .csv)")]
    UnsupportedFormat(PathBuf),
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}
