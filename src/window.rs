//! Recency window and final ranking.

use crate::config::{Lookback, WindowSettings};
use crate::models::{ResultSet, ScoredCandidate};
use chrono::NaiveDate;
use regex::Regex;
use tracing::debug;

/// Decides whether a candidate is recent enough to publish.
#[derive(Debug, Clone)]
pub struct Window {
    earliest: Option<NaiveDate>,
    fetched_on: NaiveDate,
    markers: Vec<Regex>,
}

impl Window {
    pub fn new(lookback: Lookback, settings: &WindowSettings, today: NaiveDate) -> Self {
        let markers = if settings.marker_rescue {
            settings
                .recency_markers
                .iter()
                .map(|m| m.trim())
                .filter(|m| !m.is_empty())
                .filter_map(|m| Regex::new(&format!(r"(?i)\b{}\b", regex::escape(m))).ok())
                .collect()
        } else {
            Vec::new()
        };
        Self {
            earliest: lookback.earliest(today),
            fetched_on: today,
            markers,
        }
    }

    /// Inside the lookback by date (future dates included), or carrying a
    /// recency marker in its text.
    pub fn admits(&self, sc: &ScoredCandidate) -> bool {
        let Some(earliest) = self.earliest else {
            return true;
        };
        let date = sc.candidate.resolved_date(self.fetched_on);
        if date >= earliest {
            return true;
        }
        let text = sc.candidate.text();
        self.markers.iter().any(|m| m.is_match(&text))
    }
}

/// Filter to the window, rank by score (ties by arrival), keep the top `max_results`.
///
/// # Arguments
///
/// * `survivors` - Output of [`crate::dedup::merge`]
/// * `window` - The run's recency window
/// * `max_results` - Cap applied after ranking
///
/// # Returns
///
/// The ranked result set and how many candidates fell outside the window.
pub fn finalize(
    survivors: Vec<ScoredCandidate>,
    window: &Window,
    max_results: usize,
) -> (ResultSet, usize) {
    let before = survivors.len();
    let mut items: Vec<ScoredCandidate> =
        survivors.into_iter().filter(|sc| window.admits(sc)).collect();
    let windowed_out = before - items.len();

    items.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.candidate.seq.cmp(&b.candidate.seq))
    });
    items.truncate(max_results);

    debug!(kept = items.len(), windowed_out, max_results, "Windowed results");
    (ResultSet { items }, windowed_out)
}
