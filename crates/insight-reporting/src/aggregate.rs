//! ---
//! insight_section: "05-reporting"
//! insight_subsection: "module"
//! insight_type: "source"
//! insight_scope: "code"
//! insight_description: "Feedback aggregation, PDF rendering, and the report pipeline."
//! insight_version: "v0.1.0"
//! insight_owner: "tbd"
//! ---
//! Grouping and summarisation of feedback records into report sections.
//!
//! Records are put into canonical `(timestamp, id)` order before anything is
//! computed, so sums, excerpt choice and section order do not depend on the
//! order the caller supplied.
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashSet};

use chrono::{DateTime, Utc};
use insight_common::ReportingConfig;
use serde::Serialize;
use tracing::debug;

use crate::corpus::{FeedbackRecord, Sentiment};
use crate::errors::AggregationError;

/// Group holding records without a usable topic label.
pub const UNCLASSIFIED: &str = "unclassified";
/// Title of the closing cross-topic section.
pub const OVERALL_SUMMARY_TITLE: &str = "overall summary";
/// Title of the only section emitted for an empty corpus.
pub const NO_DATA_TITLE: &str = "no data";

const ELLIPSIS: &str = "...";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregationOptions {
    /// Excerpts kept per topic section.
    pub max_excerpts: usize,
    /// Maximum excerpt length in characters, ellipsis included.
    pub excerpt_chars: usize,
    /// Pain points and praised features listed in the overall summary.
    pub top_n: usize,
}

impl Default for AggregationOptions {
    fn default() -> Self {
        Self {
            max_excerpts: 3,
            excerpt_chars: 200,
            top_n: 3,
        }
    }
}

impl From<&ReportingConfig> for AggregationOptions {
    fn from(config: &ReportingConfig) -> Self {
        Self {
            max_excerpts: config.max_excerpts,
            excerpt_chars: config.excerpt_chars,
            top_n: config.top_n,
        }
    }
}

impl AggregationOptions {
    pub fn validate(&self) -> Result<(), AggregationError> {
        if self.max_excerpts == 0 {
            return Err(AggregationError::InvalidOptions(
                "max_excerpts must be at least 1".into(),
            ));
        }
        if self.excerpt_chars <= ELLIPSIS.len() {
            return Err(AggregationError::InvalidOptions(format!(
                "excerpt_chars must exceed {}",
                ELLIPSIS.len()
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKind {
    Topic,
    OverallSummary,
    NoData,
}

/// Column headers plus rows of preformatted cells.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DataTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl DataTable {
    fn with_columns(columns: &[&str]) -> Self {
        Self {
            columns: columns.iter().map(|column| (*column).to_owned()).collect(),
            rows: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Why an excerpt was picked for the overall summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Highlight {
    PainPoint,
    PraisedFeature,
}

impl Highlight {
    pub fn as_str(&self) -> &'static str {
        match self {
            Highlight::PainPoint => "pain point",
            Highlight::PraisedFeature => "praised feature",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Excerpt {
    pub record_id: String,
    pub timestamp: DateTime<Utc>,
    pub sentiment: Option<Sentiment>,
    pub topic: String,
    pub impact_score: Option<f64>,
    pub highlight: Option<Highlight>,
    pub text: String,
    pub truncated: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportSection {
    pub title: String,
    pub kind: SectionKind,
    pub statements: Vec<String>,
    pub table: DataTable,
    pub excerpts: Vec<Excerpt>,
}

/// Counts over the fixed label order positive, neutral, negative, unclassified.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct SentimentCounts([usize; 4]);

impl SentimentCounts {
    const LABELS: [&'static str; 4] = ["positive", "neutral", "negative", UNCLASSIFIED];

    fn of<'a>(records: impl IntoIterator<Item = &'a FeedbackRecord>) -> Self {
        let mut counts = [0usize; 4];
        for record in records {
            let slot = match record.sentiment {
                Some(Sentiment::Positive) => 0,
                Some(Sentiment::Neutral) => 1,
                Some(Sentiment::Negative) => 2,
                None => 3,
            };
            counts[slot] += 1;
        }
        Self(counts)
    }

    fn total(&self) -> usize {
        self.0.iter().sum()
    }

    fn labelled(&self) -> impl Iterator<Item = (&'static str, usize)> + '_ {
        Self::LABELS.into_iter().zip(self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct ImpactSummary {
    scored: usize,
    total: f64,
}

impl ImpactSummary {
    fn of<'a>(records: impl IntoIterator<Item = &'a FeedbackRecord>) -> Option<Self> {
        let mut scored = 0;
        let mut total = 0.0;
        for score in records.into_iter().filter_map(FeedbackRecord::impact_score) {
            scored += 1;
            total += score;
        }
        (scored > 0).then_some(Self { scored, total })
    }

    fn average(&self) -> f64 {
        self.total / self.scored as f64
    }
}

struct TopicGroup<'a> {
    name: String,
    records: Vec<&'a FeedbackRecord>,
}

impl TopicGroup<'_> {
    fn is_unclassified(&self) -> bool {
        self.name == UNCLASSIFIED
    }
}

/// Turns a feedback corpus into an ordered list of report sections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentAggregator {
    options: AggregationOptions,
}

impl ContentAggregator {
    pub fn new(options: AggregationOptions) -> Result<Self, AggregationError> {
        options.validate()?;
        Ok(Self { options })
    }

    pub fn options(&self) -> &AggregationOptions {
        &self.options
    }

    /// One section per topic group, followed by the overall summary.
    ///
    /// An empty corpus yields a single `no data` section. Records lacking a
    /// topic or sentiment are kept and counted as unclassified.
    pub fn aggregate(
        &self,
        records: &[FeedbackRecord],
    ) -> Result<Vec<ReportSection>, AggregationError> {
        if records.is_empty() {
            return Ok(vec![no_data_section()]);
        }

        let ordered = canonical_order(records)?;
        let groups = group_by_topic(&ordered);
        let mut sections = Vec::with_capacity(groups.len() + 1);
        for group in &groups {
            sections.push(self.topic_section(group, ordered.len()));
        }
        sections.push(self.overall_summary(&ordered, &groups));
        debug!(
            records = ordered.len(),
            sections = sections.len(),
            "aggregated feedback corpus"
        );
        Ok(sections)
    }

    fn topic_section(&self, group: &TopicGroup<'_>, corpus_size: usize) -> ReportSection {
        let records = &group.records;
        let counts = SentimentCounts::of(records.iter().copied());
        let mut statements = vec![
            format!(
                "{} ({} of the corpus).",
                counted(records.len(), "feedback record", "feedback records"),
                percent(records.len(), corpus_size)
            ),
            format!(
                "Sentiment: {}.",
                counts
                    .labelled()
                    .map(|(label, count)| format!("{count} {label}"))
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            format!("Net sentiment score: {}.", net_sentiment(&counts)),
        ];
        if let Some(impact) = ImpactSummary::of(records.iter().copied()) {
            statements.push(format!(
                "Total impact {:.2}, average impact {:.2} across {}.",
                impact.total,
                impact.average(),
                counted(impact.scored, "scored record", "scored records")
            ));
        }
        statements.push(period_statement("Period", records));

        let mut table = DataTable::with_columns(&["sentiment", "records", "share"]);
        for (label, count) in counts.labelled() {
            table.rows.push(vec![
                label.to_owned(),
                count.to_string(),
                percent(count, counts.total()),
            ]);
        }

        let mut recent = records.clone();
        recent.sort_by(|a, b| most_recent_first(a, b));
        let excerpts = recent
            .into_iter()
            .take(self.options.max_excerpts)
            .map(|record| self.excerpt(record, None))
            .collect();

        ReportSection {
            title: group.name.clone(),
            kind: SectionKind::Topic,
            statements,
            table,
            excerpts,
        }
    }

    fn overall_summary(
        &self,
        ordered: &[&FeedbackRecord],
        groups: &[TopicGroup<'_>],
    ) -> ReportSection {
        let counts = SentimentCounts::of(ordered.iter().copied());
        let named_topics = groups.iter().filter(|group| !group.is_unclassified()).count();
        let mut statements = vec![
            format!(
                "{} across {}.",
                counted(ordered.len(), "feedback record", "feedback records"),
                counted(named_topics, "topic", "topics")
            ),
            format!(
                "Sentiment distribution: {}.",
                counts
                    .labelled()
                    .map(|(label, count)| format!("{} {label}", percent(count, counts.total())))
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        ];
        if let Some(top) = groups.iter().find(|group| !group.is_unclassified()) {
            statements.push(format!(
                "Top topic by volume: {} ({}).",
                top.name,
                counted(top.records.len(), "record", "records")
            ));
        }
        if let Some(impact) = ImpactSummary::of(ordered.iter().copied()) {
            statements.push(format!(
                "Total impact {:.2}, average impact {:.2} across {}.",
                impact.total,
                impact.average(),
                counted(impact.scored, "scored record", "scored records")
            ));
            let heaviest = groups
                .iter()
                .filter_map(|group| {
                    ImpactSummary::of(group.records.iter().copied())
                        .map(|summary| (group, summary.total))
                })
                .max_by(|(a, a_total), (b, b_total)| {
                    a_total
                        .total_cmp(b_total)
                        .then_with(|| b.name.cmp(&a.name))
                });
            if let Some((group, total)) = heaviest {
                statements.push(format!(
                    "Top topic by impact: {} (impact {:.2}).",
                    group.name, total
                ));
            }
            let peak = ordered
                .iter()
                .filter_map(|record| record.impact_score().map(|score| (record, score)))
                .max_by(|(a, a_score), (b, b_score)| {
                    a_score.total_cmp(b_score).then_with(|| b.id.cmp(&a.id))
                });
            if let Some((record, score)) = peak {
                statements.push(format!(
                    "Maximum impact: {score:.2} (record {}).",
                    record.id
                ));
            }
        }
        if let Some(channels) = channel_statement(ordered) {
            statements.push(channels);
        }
        let customers: BTreeSet<&str> = ordered
            .iter()
            .filter_map(|record| record.customer_id())
            .collect();
        if !customers.is_empty() {
            statements.push(format!("Distinct customers: {}.", customers.len()));
        }
        let unlabelled = groups
            .iter()
            .find(|group| group.is_unclassified())
            .map_or(0, |group| group.records.len());
        match unlabelled {
            0 => {}
            1 => statements.push("1 record carries no topic label.".to_owned()),
            _ => statements.push(format!("{unlabelled} records carry no topic label.")),
        }
        statements.push(period_statement("Period covered", ordered));

        let mut table = DataTable::with_columns(&[
            "topic",
            "records",
            "positive",
            "neutral",
            "negative",
            UNCLASSIFIED,
            "impact",
        ]);
        for group in groups {
            let counts = SentimentCounts::of(group.records.iter().copied());
            let mut row = vec![group.name.clone(), group.records.len().to_string()];
            row.extend(counts.0.iter().map(usize::to_string));
            row.push(
                ImpactSummary::of(group.records.iter().copied())
                    .map_or_else(|| "-".to_owned(), |impact| format!("{:.2}", impact.total)),
            );
            table.rows.push(row);
        }

        let mut excerpts = self.highlights(ordered, Sentiment::Negative, Highlight::PainPoint);
        excerpts.extend(self.highlights(ordered, Sentiment::Positive, Highlight::PraisedFeature));

        ReportSection {
            title: OVERALL_SUMMARY_TITLE.to_owned(),
            kind: SectionKind::OverallSummary,
            statements,
            table,
            excerpts,
        }
    }

    /// Highest-impact records with the given sentiment; unscored records rank last.
    fn highlights(
        &self,
        ordered: &[&FeedbackRecord],
        sentiment: Sentiment,
        highlight: Highlight,
    ) -> Vec<Excerpt> {
        let mut candidates: Vec<&FeedbackRecord> = ordered
            .iter()
            .copied()
            .filter(|record| record.sentiment == Some(sentiment))
            .collect();
        candidates.sort_by(|a, b| {
            match (a.impact_score(), b.impact_score()) {
                (Some(a_score), Some(b_score)) => b_score.total_cmp(&a_score),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            }
            .then_with(|| most_recent_first(a, b))
        });
        candidates
            .into_iter()
            .take(self.options.top_n)
            .map(|record| self.excerpt(record, Some(highlight)))
            .collect()
    }

    fn excerpt(&self, record: &FeedbackRecord, highlight: Option<Highlight>) -> Excerpt {
        let (text, truncated) = truncate_excerpt(&record.text, self.options.excerpt_chars);
        Excerpt {
            record_id: record.id.clone(),
            timestamp: record.timestamp,
            sentiment: record.sentiment,
            topic: record.topic_label().unwrap_or(UNCLASSIFIED).to_owned(),
            impact_score: record.impact_score(),
            highlight,
            text,
            truncated,
        }
    }
}

fn no_data_section() -> ReportSection {
    ReportSection {
        title: NO_DATA_TITLE.to_owned(),
        kind: SectionKind::NoData,
        statements: vec!["The feedback corpus contained no records for this period.".to_owned()],
        table: DataTable::default(),
        excerpts: Vec::new(),
    }
}

fn canonical_order(records: &[FeedbackRecord]) -> Result<Vec<&FeedbackRecord>, AggregationError> {
    let mut seen = HashSet::with_capacity(records.len());
    for record in records {
        if !seen.insert(record.id.as_str()) {
            return Err(AggregationError::DuplicateRecord(record.id.clone()));
        }
    }
    let mut ordered: Vec<&FeedbackRecord> = records.iter().collect();
    ordered.sort_by(|a, b| {
        a.timestamp
            .cmp(&b.timestamp)
            .then_with(|| a.id.cmp(&b.id))
    });
    Ok(ordered)
}

fn group_by_topic<'a>(ordered: &[&'a FeedbackRecord]) -> Vec<TopicGroup<'a>> {
    let mut buckets: BTreeMap<&str, Vec<&'a FeedbackRecord>> = BTreeMap::new();
    for &record in ordered {
        let name = record.topic_label().unwrap_or(UNCLASSIFIED);
        buckets.entry(name).or_default().push(record);
    }
    let mut groups: Vec<TopicGroup<'a>> = buckets
        .into_iter()
        .map(|(name, records)| TopicGroup {
            name: name.to_owned(),
            records,
        })
        .collect();
    groups.sort_by(|a, b| {
        a.is_unclassified()
            .cmp(&b.is_unclassified())
            .then_with(|| b.records.len().cmp(&a.records.len()))
            .then_with(|| a.name.cmp(&b.name))
    });
    groups
}

fn most_recent_first(a: &FeedbackRecord, b: &FeedbackRecord) -> Ordering {
    b.timestamp
        .cmp(&a.timestamp)
        .then_with(|| a.id.cmp(&b.id))
}

fn truncate_excerpt(text: &str, limit: usize) -> (String, bool) {
    let normalised = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if normalised.chars().count() <= limit {
        return (normalised, false);
    }
    let mut cut: String = normalised
        .chars()
        .take(limit - ELLIPSIS.len())
        .collect();
    cut.truncate(cut.trim_end().len());
    cut.push_str(ELLIPSIS);
    (cut, true)
}

fn percent(part: usize, whole: usize) -> String {
    if whole == 0 {
        return "0.0%".to_owned();
    }
    format!("{:.1}%", part as f64 * 100.0 / whole as f64)
}

fn net_sentiment(counts: &SentimentCounts) -> String {
    let [positive, _, negative, _] = counts.0;
    let score = (positive as f64 - negative as f64) * 100.0 / counts.total().max(1) as f64;
    format!("{score:+.1}")
}

/// Record counts per `source_channel`, name order, unset channels last.
fn channel_statement(ordered: &[&FeedbackRecord]) -> Option<String> {
    let mut channels: BTreeMap<&str, usize> = BTreeMap::new();
    let mut unspecified = 0;
    for record in ordered {
        match record.source_channel().map(str::trim).filter(|c| !c.is_empty()) {
            Some(channel) => *channels.entry(channel).or_default() += 1,
            None => unspecified += 1,
        }
    }
    if channels.is_empty() {
        return None;
    }
    let mut parts: Vec<String> = channels
        .into_iter()
        .map(|(channel, count)| format!("{channel} {count}"))
        .collect();
    if unspecified > 0 {
        parts.push(format!("unspecified {unspecified}"));
    }
    Some(format!("Source channels: {}.", parts.join(", ")))
}

fn counted(count: usize, one: &str, many: &str) -> String {
    if count == 1 {
        format!("1 {one}")
    } else {
        format!("{count} {many}")
    }
}

fn period_statement(label: &str, ordered: &[&FeedbackRecord]) -> String {
    match (ordered.first(), ordered.last()) {
        (Some(first), Some(last)) => {
            let days = (last.timestamp.date_naive() - first.timestamp.date_naive()).num_days() + 1;
            format!(
                "{label}: {} to {} ({}).",
                first.timestamp.format("%Y-%m-%d"),
                last.timestamp.format("%Y-%m-%d"),
                counted(days.unsigned_abs() as usize, "day", "days"),
            )
        }
        _ => format!("{label}: none."),
    }
}
