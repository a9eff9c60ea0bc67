//! Data models flowing through one pipeline run.
//!
//! - [`Query`]: a generated search string
//! - [`WorkItem`]: one (source, query-or-page) unit of fetch + extract + score work
//! - [`FetchAttempt`]: the outcome of fetching one work item
//! - [`Candidate`] / [`ScoredCandidate`]: extracted items before and after scoring
//! - [`Record`]: the fixed shape handed to sinks
//! - [`RunReport`]: everything a run returns
//!
//! Nothing here outlives a run.

use crate::config::{Mode, StrategyKind};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A search string built from a topic template and a qualifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Query(String);

impl Query {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One unit of work: which source, and what to ask it for.
#[derive(Debug, Clone)]
pub struct WorkItem {
    /// Position in the submission order; seeds arrival sequence numbers.
    pub index: usize,
    /// Index into the config's source list.
    pub source: usize,
    pub query: Option<Query>,
    /// Absolute URL to fetch.
    pub url: String,
}

/// Which fetch method produced the markup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchMethod {
    Fast,
    Rendered,
}

impl fmt::Display for FetchMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchMethod::Fast => f.write_str("fast"),
            FetchMethod::Rendered => f.write_str("rendered"),
        }
    }
}

/// The outcome of fetching one work item. `content` is empty on failure.
#[derive(Debug)]
pub struct FetchAttempt {
    pub source_id: String,
    pub url: String,
    pub method: FetchMethod,
    pub content: String,
    /// The last error seen, when no method produced usable markup.
    pub error: Option<String>,
}

impl FetchAttempt {
    pub fn is_empty(&self) -> bool {
        self.content.trim().is_empty()
    }
}

/// Whether a candidate's URL identifies the item itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UrlKind {
    /// A link to the item's own page.
    Permalink,
    /// The page the item was found on, shared by its siblings.
    Sentinel,
}

/// Arrival order of a candidate: work-item index, then position within the item.
///
/// Assigned from the submission plan, never from completion order, so it is the
/// same across runs over the same inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Seq {
    pub item: usize,
    pub position: usize,
}

/// An extracted item, before scoring.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    /// Never empty.
    pub title: String,
    pub description: String,
    /// Always absolute.
    pub url: String,
    pub url_kind: UrlKind,
    /// `None` when no date could be parsed; resolves to the fetch date.
    pub published: Option<NaiveDate>,
    pub source: String,
    pub location: String,
    pub provenance: StrategyKind,
    pub seq: Seq,
}

impl Candidate {
    /// The candidate's date, falling back to the date it was fetched.
    pub fn resolved_date(&self, fetched_on: NaiveDate) -> NaiveDate {
        self.published.unwrap_or(fetched_on)
    }

    /// Title and description joined, as matched by scoring and windowing.
    pub fn text(&self) -> String {
        format!("{} {}", self.title, self.description)
    }
}

/// A candidate with its relevance score.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredCandidate {
    pub candidate: Candidate,
    /// Never negative.
    pub score: f64,
}

/// The final ordered, deduplicated, windowed sequence.
#[derive(Debug, Clone, Default)]
pub struct ResultSet {
    pub items: Vec<ScoredCandidate>,
}

impl ResultSet {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Convert to sink records, resolving unknown dates to `fetched_on`.
    pub fn to_records(&self, fetched_on: NaiveDate, scraped_at: DateTime<Utc>) -> Vec<Record> {
        self.items
            .iter()
            .map(|sc| Record::from_scored(sc, fetched_on, scraped_at))
            .collect()
    }
}

/// The stable record shape every sink consumes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub title: String,
    pub description: String,
    /// ISO-8601 date.
    pub date: String,
    pub location: String,
    pub url: String,
    pub source: String,
    /// RFC 3339, UTC.
    pub scraped_at: String,
    pub relevance_score: f64,
}

impl Record {
    pub fn from_scored(sc: &ScoredCandidate, fetched_on: NaiveDate, scraped_at: DateTime<Utc>) -> Self {
        let c = &sc.candidate;
        Self {
            title: c.title.clone(),
            description: c.description.clone(),
            date: c.resolved_date(fetched_on).format("%Y-%m-%d").to_string(),
            location: c.location.clone(),
            url: c.url.clone(),
            source: c.source.clone(),
            scraped_at: scraped_at.to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
            relevance_score: sc.score,
        }
    }
}

/// A work item that produced nothing because it failed.
#[derive(Debug, Clone, Serialize)]
pub struct WorkFailure {
    pub source: String,
    pub target: String,
    pub reason: String,
}

/// Counters gathered over a run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunStats {
    pub work_items: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub candidates: usize,
    pub unique: usize,
    pub windowed_out: usize,
}

/// Everything a run hands back to its caller.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub mode: Mode,
    pub run_date: NaiveDate,
    pub started_at: DateTime<Utc>,
    pub results: ResultSet,
    pub failures: Vec<WorkFailure>,
    pub stats: RunStats,
}

impl RunReport {
    pub fn records(&self) -> Vec<Record> {
        self.results.to_records(self.run_date, self.started_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn candidate(title: &str) -> Candidate {
        Candidate {
            title: title.to_string(),
            description: String::new(),
            url: "https://example.com/".to_string(),
            url_kind: UrlKind::Sentinel,
            published: None,
            source: "Example".to_string(),
            location: "Bangalore".to_string(),
            provenance: StrategyKind::Generic,
            seq: Seq::default(),
        }
    }

    #[test]
    fn test_resolved_date_falls_back_to_fetch_date() {
        let fetched = NaiveDate::from_ymd_opt(2025, 7, 26).unwrap();
        let mut c = candidate("Road closed near Silk Board");
        assert_eq!(c.resolved_date(fetched), fetched);

        c.published = NaiveDate::from_ymd_opt(2025, 7, 28);
        assert_eq!(c.resolved_date(fetched), NaiveDate::from_ymd_opt(2025, 7, 28).unwrap());
    }

    #[test]
    fn test_record_serialization_shape() {
        let fetched = NaiveDate::from_ymd_opt(2025, 7, 26).unwrap();
        let scraped_at = Utc.with_ymd_and_hms(2025, 7, 26, 4, 30, 0).unwrap();
        let sc = ScoredCandidate {
            candidate: candidate("Power cut in Jayanagar today"),
            score: 4.5,
        };

        let record = Record::from_scored(&sc, fetched, scraped_at);
        assert_eq!(record.date, "2025-07-26");
        assert_eq!(record.scraped_at, "2025-07-26T04:30:00Z");

        let json = serde_json::to_value(&record).unwrap();
        for field in ["title", "description", "date", "location", "url", "source", "scraped_at"] {
            assert!(json.get(field).is_some(), "missing field {field}");
        }
    }

    #[test]
    fn test_seq_orders_by_item_then_position() {
        let a = Seq { item: 0, position: 5 };
        let b = Seq { item: 1, position: 0 };
        let c = Seq { item: 1, position: 1 };
        assert!(a < b && b < c);
    }
}
