//! The run orchestrator.
//!
//! A run walks through [`Phase`]s:
//!
//! ```text
//! Idle -> FanningOut -> Collecting -> Merging -> Windowing -> Done
//! ```
//!
//! Work items are submitted one at a time with a pause (plus jitter) between
//! submissions, at most `concurrency` run at once, and each is bounded by its
//! own timeout. Completion order is irrelevant: candidates carry a sequence
//! number from the submission plan, which is all merging and ranking look at.
//!
//! A failing or timed-out item contributes zero candidates and a
//! [`WorkFailure`] entry; nothing short of bad configuration aborts a run.

use crate::config::{Config, Lookback, Mode, Settings, Source, Target};
use crate::dedup;
use crate::extract::{
    self, PageContext,
    article::{lead_paragraphs, published_date},
};
use crate::fetch::{PageClient, Renderer, SourceFetcher};
use crate::models::{
    Candidate, ResultSet, RunReport, RunStats, ScoredCandidate, UrlKind, WorkFailure, WorkItem,
};
use crate::queries;
use crate::score::{AdmissionGate, Scorer};
use crate::window::{self, Window};
use chrono::{NaiveDate, Utc};
use futures::stream::{self, StreamExt};
use rand::{Rng, rng};
use std::fmt;
use std::time::{Duration, Instant};
use tokio::time::{sleep, timeout};
use tracing::{debug, info, instrument, warn};

const LEAD_PARAGRAPHS: usize = 4;
const LEAD_MAX_CHARS: usize = 500;

/// Where a run currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    FanningOut,
    Collecting,
    Merging,
    Windowing,
    Done,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Idle => "idle",
            Phase::FanningOut => "fanning-out",
            Phase::Collecting => "collecting",
            Phase::Merging => "merging",
            Phase::Windowing => "windowing",
            Phase::Done => "done",
        };
        f.write_str(name)
    }
}

/// Per-run knobs, resolved from settings and the mode's profile.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub mode: Mode,
    pub run_date: NaiveDate,
    pub lookback: Lookback,
    pub max_results: usize,
    pub concurrency: usize,
    pub submit_delay: Duration,
    pub submit_jitter: Duration,
    pub item_timeout: Duration,
}

impl RunOptions {
    pub fn from_settings(settings: &Settings, mode: Mode, run_date: NaiveDate) -> Self {
        let profile = settings.profiles.for_mode(mode);
        Self {
            mode,
            run_date,
            lookback: profile.lookback,
            max_results: profile.max_results,
            concurrency: settings.pipeline.concurrency.max(1),
            submit_delay: settings.pipeline.submit_delay(),
            submit_jitter: Duration::from_millis(settings.pipeline.submit_jitter_ms),
            item_timeout: settings.pipeline.item_timeout(),
        }
    }

    fn pause(&self) -> Duration {
        let jitter_ms = self.submit_jitter.as_millis() as u64;
        if jitter_ms == 0 {
            return self.submit_delay;
        }
        self.submit_delay + Duration::from_millis(rng().random_range(0..=jitter_ms))
    }
}

/// What one work item produced.
#[derive(Debug, Default)]
struct ItemOutcome {
    candidates: Vec<ScoredCandidate>,
    failure: Option<WorkFailure>,
}

/// Runs the fetch, extract, score, merge, window pipeline. Holds no state
/// between runs.
pub struct Pipeline<'a, C, R> {
    config: &'a Config,
    fetcher: SourceFetcher<C, R>,
}

impl<'a, C, R> Pipeline<'a, C, R>
where
    C: PageClient,
    R: Renderer,
{
    pub fn new(config: &'a Config, fetcher: SourceFetcher<C, R>) -> Self {
        Self { config, fetcher }
    }

    fn enter(&self, phase: Phase) {
        info!(phase = %phase, "Pipeline phase");
    }

    /// Every work item `mode` submits, in submission order.
    pub fn plan(&self, mode: Mode, run_date: NaiveDate) -> Vec<WorkItem> {
        let queries = queries::generate(&self.config.settings.queries, run_date);
        let mut items = Vec::new();

        for (source_idx, source) in self.config.sources_for(mode) {
            match &source.config.target {
                Target::Page { url } => items.push(WorkItem {
                    index: items.len(),
                    source: source_idx,
                    query: None,
                    url: url.clone(),
                }),
                Target::Search {
                    url_template,
                    max_queries,
                } => {
                    let take = max_queries.unwrap_or(queries.len());
                    for query in queries.iter().take(take) {
                        let url =
                            url_template.replace("{query}", &urlencoding::encode(query.as_str()));
                        items.push(WorkItem {
                            index: items.len(),
                            source: source_idx,
                            query: Some(query.clone()),
                            url,
                        });
                    }
                }
            }
        }
        items
    }

    #[instrument(level = "info", skip_all, fields(mode = %opts.mode, run_date = %opts.run_date))]
    pub async fn run(&self, opts: &RunOptions) -> RunReport {
        let started_at = Utc::now();
        let t0 = Instant::now();
        self.enter(Phase::Idle);

        let scorer = Scorer::new(&self.config.settings.keywords, opts.run_date);
        let gate = AdmissionGate::new(&self.config.settings.admission);
        let items = self.plan(opts.mode, opts.run_date);
        let total = items.len();

        self.enter(Phase::FanningOut);
        info!(
            work_items = total,
            concurrency = opts.concurrency,
            submit_delay_ms = opts.submit_delay.as_millis() as u64,
            "Submitting work"
        );

        let outcomes: Vec<ItemOutcome> = stream::iter(items.into_iter().enumerate())
            .then(|(n, item)| async move {
                if n > 0 {
                    sleep(opts.pause()).await;
                }
                item
            })
            .map(|item| self.process(item, opts, &scorer, &gate))
            .buffer_unordered(opts.concurrency.max(1))
            .collect()
            .await;

        self.enter(Phase::Collecting);
        let mut stats = RunStats {
            work_items: total,
            ..RunStats::default()
        };
        let mut failures = Vec::new();
        let mut collected = Vec::new();
        for outcome in outcomes {
            match outcome.failure {
                Some(f) => {
                    stats.failed += 1;
                    failures.push(f);
                }
                None => stats.succeeded += 1,
            }
            collected.extend(outcome.candidates);
        }
        stats.candidates = collected.len();

        self.enter(Phase::Merging);
        let survivors = dedup::merge(collected);
        stats.unique = survivors.len();

        self.enter(Phase::Windowing);
        let window = Window::new(opts.lookback, &self.config.settings.window, opts.run_date);
        let (results, windowed_out): (ResultSet, usize) =
            window::finalize(survivors, &window, opts.max_results);
        stats.windowed_out = windowed_out;

        self.enter(Phase::Done);
        info!(
            succeeded = stats.succeeded,
            failed = stats.failed,
            candidates = stats.candidates,
            unique = stats.unique,
            windowed_out = stats.windowed_out,
            results = results.len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Run complete"
        );

        RunReport {
            mode: opts.mode,
            run_date: opts.run_date,
            started_at,
            results,
            failures,
            stats,
        }
    }

    /// One work item under its timeout. Never fails.
    async fn process(
        &self,
        item: WorkItem,
        opts: &RunOptions,
        scorer: &Scorer,
        gate: &AdmissionGate,
    ) -> ItemOutcome {
        let source = &self.config.sources[item.source];
        let target = item.url.clone();
        match timeout(opts.item_timeout, self.work(source, &item, opts, scorer, gate)).await {
            Ok(outcome) => outcome,
            Err(_) => {
                warn!(
                    index = item.index,
                    source = %source.id(),
                    url = %target,
                    timeout_ms = opts.item_timeout.as_millis() as u64,
                    "Work item timed out; skipping"
                );
                ItemOutcome {
                    candidates: Vec::new(),
                    failure: Some(WorkFailure {
                        source: source.id().to_string(),
                        target,
                        reason: format!("timed out after {:?}", opts.item_timeout),
                    }),
                }
            }
        }
    }

    async fn work(
        &self,
        source: &Source,
        item: &WorkItem,
        opts: &RunOptions,
        scorer: &Scorer,
        gate: &AdmissionGate,
    ) -> ItemOutcome {
        debug!(index = item.index, source = %source.id(), query = ?item.query.as_ref().map(|q| q.as_str()), "Work item started");

        let attempt = self.fetcher.fetch(source, &item.url).await;
        if attempt.is_empty() {
            let reason = attempt
                .error
                .unwrap_or_else(|| "no content returned".to_string());
            warn!(index = item.index, source = %source.id(), url = %item.url, reason = %reason, "Work item failed");
            return ItemOutcome {
                candidates: Vec::new(),
                failure: Some(WorkFailure {
                    source: source.id().to_string(),
                    target: item.url.clone(),
                    reason,
                }),
            };
        }

        let ctx = PageContext {
            source,
            page_url: &item.url,
            item_index: item.index,
            default_location: &self.config.settings.city,
        };
        let mut candidates = extract::extract(&ctx, &attempt.content);
        if candidates.is_empty() {
            debug!(index = item.index, source = %source.id(), method = %attempt.method, "No candidates extracted");
        }

        if source.config.admission {
            let before = candidates.len();
            candidates.retain(|c| gate.admits(&c.title));
            debug!(source = %source.id(), kept = candidates.len(), dropped = before - candidates.len(), "Admission gate applied");
        }

        if source.config.follow_links {
            for candidate in candidates.iter_mut() {
                self.enrich(candidate, opts).await;
            }
        }

        ItemOutcome {
            candidates: candidates.into_iter().map(|c| scorer.scored(c)).collect(),
            failure: None,
        }
    }

    /// Replace a result's snippet with the lead of the page it links to.
    /// Keeps the snippet when the page cannot be fetched or has no body text.
    async fn enrich(&self, candidate: &mut Candidate, opts: &RunOptions) {
        if candidate.url_kind != UrlKind::Permalink {
            return;
        }
        match self.fetcher.client().get(&candidate.url, None).await {
            Ok(html) => {
                let lead = lead_paragraphs(&html, LEAD_PARAGRAPHS, LEAD_MAX_CHARS);
                if !lead.is_empty() {
                    if candidate.published.is_none() {
                        candidate.published = published_date(&html)
                            .or_else(|| extract::dates::parse_date(&lead))
                            .filter(|d| *d <= opts.run_date);
                    }
                    candidate.description = lead;
                }
            }
            Err(e) => debug!(url = %candidate.url, error = %e, "Link enrichment failed; keeping snippet"),
        }
    }
}
