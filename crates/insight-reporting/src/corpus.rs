//! ---
//! insight_section: "05-reporting"
//! insight_subsection: "module"
//! insight_type: "source"
//! insight_scope: "code"
//! insight_description: "Feedback aggregation, PDF rendering, and the report pipeline."
//! insight_version: "v0.1.0"
//! insight_owner: "tbd"
//! ---
//! Enriched feedback records and loaders for the JSON and CSV exports.
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::CorpusError;

/// Metadata key carrying the business impact of a record.
pub const IMPACT_SCORE_KEY: &str = "impact_score";
/// Metadata key naming the channel the feedback arrived through.
pub const SOURCE_CHANNEL_KEY: &str = "source_channel";
/// Metadata key identifying the customer.
pub const CUSTOMER_ID_KEY: &str = "customer_id";

/// Sentiment label assigned by the upstream analysis stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

impl Sentiment {
    pub const ALL: [Sentiment; 3] = [Sentiment::Positive, Sentiment::Neutral, Sentiment::Negative];

    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Positive => "positive",
            Sentiment::Neutral => "neutral",
            Sentiment::Negative => "negative",
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Sentiment {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "positive" => Ok(Sentiment::Positive),
            "neutral" => Ok(Sentiment::Neutral),
            "negative" => Ok(Sentiment::Negative),
            other => Err(other.to_owned()),
        }
    }
}

/// One analysed piece of customer feedback. Read-only input to the aggregator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackRecord {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub sentiment: Option<Sentiment>,
    #[serde(default)]
    pub topic: Option<String>,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub metadata: BTreeMap<String, Value>,
}

impl FeedbackRecord {
    pub fn new(id: impl Into<String>, text: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            sentiment: None,
            topic: None,
            timestamp,
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_sentiment(mut self, sentiment: Sentiment) -> Self {
        self.sentiment = Some(sentiment);
        self
    }

    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = Some(topic.into());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Trimmed topic label, `None` when absent or blank.
    pub fn topic_label(&self) -> Option<&str> {
        self.topic
            .as_deref()
            .map(str::trim)
            .filter(|topic| !topic.is_empty())
    }

    /// Finite `impact_score` metadata, if present.
    pub fn impact_score(&self) -> Option<f64> {
        self.metadata
            .get(IMPACT_SCORE_KEY)
            .and_then(Value::as_f64)
            .filter(|score| score.is_finite())
    }

    pub fn source_channel(&self) -> Option<&str> {
        self.metadata.get(SOURCE_CHANNEL_KEY).and_then(Value::as_str)
    }

    pub fn customer_id(&self) -> Option<&str> {
        self.metadata.get(CUSTOMER_ID_KEY).and_then(Value::as_str)
    }
}

#[derive(Debug, Deserialize)]
struct RawRecord {
    id: Option<Value>,
    #[serde(alias = "feedback_text")]
    text: Option<String>,
    #[serde(default)]
    sentiment: Option<String>,
    #[serde(default, alias = "theme")]
    topic: Option<String>,
    timestamp: Option<String>,
    #[serde(default)]
    metadata: BTreeMap<String, Value>,
    #[serde(flatten)]
    extra: BTreeMap<String, Value>,
}

/// Parse a JSON array of feedback objects.
pub fn from_json_str(raw: &str) -> Result<Vec<FeedbackRecord>, CorpusError> {
    let rows: Vec<RawRecord> = serde_json::from_str(raw)?;
    let mut records = Vec::with_capacity(rows.len());
    for (index, row) in rows.into_iter().enumerate() {
        let row_no = index + 1;
        let id = match row.id {
            Some(Value::String(id)) => id,
            Some(Value::Number(id)) if id.is_u64() || id.is_i64() => id.to_string(),
            Some(_) => return Err(CorpusError::InvalidIdentifier { row: row_no }),
            None => return Err(CorpusError::MissingField { row: row_no, field: "id" }),
        };
        let text = row.text.ok_or(CorpusError::MissingField {
            row: row_no,
            field: "text",
        })?;
        let timestamp = row.timestamp.ok_or(CorpusError::MissingField {
            row: row_no,
            field: "timestamp",
        })?;
        let mut metadata = row.metadata;
        metadata.extend(row.extra);
        records.push(FeedbackRecord {
            id,
            text,
            sentiment: parse_sentiment(row_no, row.sentiment.as_deref()),
            topic: row.topic,
            timestamp: parse_timestamp(row_no, &timestamp)?,
            metadata,
        });
    }
    debug!(records = records.len(), "parsed JSON corpus");
    Ok(records)
}

const ID_COLUMNS: &[&str] = &["id"];
const TEXT_COLUMNS: &[&str] = &["text", "feedback_text"];
const SENTIMENT_COLUMNS: &[&str] = &["sentiment"];
const TOPIC_COLUMNS: &[&str] = &["topic", "theme"];
const TIMESTAMP_COLUMNS: &[&str] = &["timestamp"];

/// Parse CSV with a header row. Unrecognised columns become metadata.
pub fn from_csv_reader<R: std::io::Read>(reader: R) -> Result<Vec<FeedbackRecord>, CorpusError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);
    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|header| header.to_ascii_lowercase())
        .collect();
    let positions: HashMap<&str, usize> = headers
        .iter()
        .enumerate()
        .map(|(index, header)| (header.as_str(), index))
        .collect();
    let find = |names: &[&str]| names.iter().find_map(|name| positions.get(name).copied());

    let id_col = find(ID_COLUMNS).ok_or(CorpusError::MissingColumn("id"))?;
    let text_col = find(TEXT_COLUMNS).ok_or(CorpusError::MissingColumn("text"))?;
    let timestamp_col = find(TIMESTAMP_COLUMNS).ok_or(CorpusError::MissingColumn("timestamp"))?;
    let sentiment_col = find(SENTIMENT_COLUMNS);
    let topic_col = find(TOPIC_COLUMNS);
    let reserved = [Some(id_col), Some(text_col), Some(timestamp_col), sentiment_col, topic_col];

    let mut records = Vec::new();
    for (index, row) in reader.records().enumerate() {
        let row = row?;
        let row_no = index + 1;
        let cell = |col: usize| row.get(col).filter(|value| !value.is_empty());

        let id = cell(id_col).ok_or(CorpusError::MissingField { row: row_no, field: "id" })?;
        let text = cell(text_col).ok_or(CorpusError::MissingField {
            row: row_no,
            field: "text",
        })?;
        let timestamp = cell(timestamp_col).ok_or(CorpusError::MissingField {
            row: row_no,
            field: "timestamp",
        })?;

        let mut metadata = BTreeMap::new();
        for (col, header) in headers.iter().enumerate() {
            if reserved.contains(&Some(col)) {
                continue;
            }
            if let Some(value) = cell(col) {
                metadata.insert(header.clone(), csv_value(value));
            }
        }

        records.push(FeedbackRecord {
            id: id.to_owned(),
            text: text.to_owned(),
            sentiment: parse_sentiment(row_no, sentiment_col.and_then(cell)),
            topic: topic_col.and_then(cell).map(str::to_owned),
            timestamp: parse_timestamp(row_no, timestamp)?,
            metadata,
        });
    }
    debug!(records = records.len(), "parsed CSV corpus");
    Ok(records)
}

/// Load a corpus file, choosing the parser from the file extension.
pub fn load_path(path: impl AsRef<Path>) -> Result<Vec<FeedbackRecord>, CorpusError> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    let read = || {
        fs::read_to_string(path).map_err(|source| CorpusError::Io {
            path: path.to_path_buf(),
            source,
        })
    };
    match extension.as_deref() {
        Some("json") => from_json_str(&read()?),
        Some("csv") => from_csv_reader(read()?.as_bytes()),
        _ => Err(CorpusError::UnsupportedFormat(path.to_path_buf())),
    }
}

fn csv_value(raw: &str) -> Value {
    if let Ok(integer) = raw.parse::<i64>() {
        return Value::from(integer);
    }
    match raw.parse::<f64>() {
        Ok(number) if number.is_finite() => Value::from(number),
        _ => Value::String(raw.to_owned()),
    }
}

fn parse_sentiment(row: usize, raw: Option<&str>) -> Option<Sentiment> {
    let raw = raw.map(str::trim).filter(|value| !value.is_empty())?;
    match raw.parse() {
        Ok(sentiment) => Some(sentiment),
        Err(label) => {
            warn!(row, label = %label, "unknown sentiment label treated as absent");
            None
        }
    }
}

fn parse_timestamp(row: usize, raw: &str) -> Result<DateTime<Utc>, CorpusError> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Ok(parsed.with_timezone(&Utc));
    }
    if let Ok(parsed) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Ok(parsed.and_utc());
    }
    if let Some(midnight) = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
    {
        return Ok(midnight.and_utc());
    }
    Err(CorpusError::InvalidTimestamp {
        row,
        value: raw.to_owned(),
    })
}
