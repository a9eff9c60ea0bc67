//! Settings loading and validation.
//!
//! Everything the pipeline treats as data lives here: the source catalog with
//! its per-source fetch plans and extraction rules, the query templates, the
//! keyword tables, and the per-mode run profiles. Settings are parsed from YAML
//! once at startup, validated (every selector and pattern compiled, every
//! required environment variable checked) and then shared read-only with the
//! workers. A default catalog is embedded in the binary.

use crate::error::ConfigError;
use chrono::NaiveDate;
use regex::Regex;
use scraper::Selector;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// The catalog shipped with the binary.
pub const DEFAULT_SETTINGS: &str = include_str!("../config/default.yaml");

/// Which subset of sources a run covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Fast-moving sources (traffic alerts).
    Hourly,
    /// Slow-moving sources (tenders, utility news, events).
    Daily,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Hourly => f.write_str("hourly"),
            Mode::Daily => f.write_str("daily"),
        }
    }
}

/// How far back the windowing step looks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Lookback {
    /// Only items dated on the run date (or later).
    Today,
    /// The last `n` days including the run date.
    Days(u32),
    /// No date filtering.
    All,
}

impl Lookback {
    /// Earliest date kept, or `None` when nothing is filtered. A span that
    /// reaches past the calendar's start filters nothing.
    pub fn earliest(&self, today: NaiveDate) -> Option<NaiveDate> {
        match self {
            Lookback::Today => Some(today),
            Lookback::Days(n) => {
                today.checked_sub_days(chrono::Days::new(u64::from(n.saturating_sub(1))))
            }
            Lookback::All => None,
        }
    }
}

impl FromStr for Lookback {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();
        match s.as_str() {
            "today" => return Ok(Lookback::Today),
            "all" => return Ok(Lookback::All),
            _ => {}
        }
        let digits = s
            .strip_suffix("days")
            .or_else(|| s.strip_suffix("day"))
            .or_else(|| s.strip_suffix('d'))
            .map(str::trim)
            .ok_or_else(|| format!("unrecognized lookback `{s}` (use today, all, or e.g. 3d)"))?;
        match digits.parse::<u32>() {
            Ok(0) => Err("lookback must be at least one day".to_string()),
            Ok(1) => Ok(Lookback::Today),
            Ok(n) => Ok(Lookback::Days(n)),
            Err(_) => Err(format!("unrecognized lookback `{s}`")),
        }
    }
}

impl TryFrom<String> for Lookback {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Lookback> for String {
    fn from(value: Lookback) -> Self {
        match value {
            Lookback::Today => "today".to_string(),
            Lookback::Days(n) => format!("{n}d"),
            Lookback::All => "all".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    /// Ceiling on concurrently running work items.
    pub concurrency: usize,
    /// Pause between successive work-item submissions.
    pub submit_delay_ms: u64,
    /// Upper bound of random jitter added to each pause.
    pub submit_jitter_ms: u64,
    /// Hard ceiling on one work item, fetch and extraction included.
    pub item_timeout_secs: u64,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            concurrency: 3,
            submit_delay_ms: 1000,
            submit_jitter_ms: 250,
            item_timeout_secs: 45,
        }
    }
}

impl PipelineSettings {
    pub fn submit_delay(&self) -> Duration {
        Duration::from_millis(self.submit_delay_ms)
    }

    pub fn item_timeout(&self) -> Duration {
        Duration::from_secs(self.item_timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpSettings {
    pub timeout_secs: u64,
    pub user_agent: String,
    pub accept_language: String,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 12,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.36".to_string(),
            accept_language: "en-US,en;q=0.9".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RendererKind {
    /// Rendered fallback disabled.
    #[default]
    None,
    /// Local headless Chromium, one process per render.
    Chrome,
    /// Remote Browserless `/content` endpoint.
    Browserless,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererSettings {
    pub kind: RendererKind,
    /// Chromium binary; falls back to `$CHROME_BIN`, then `chromium`.
    pub binary: Option<String>,
    /// Browserless base URL; falls back to `$BROWSERLESS_URL`.
    pub url: Option<String>,
    /// Browserless token; falls back to `$BROWSERLESS_TOKEN`.
    pub token: Option<String>,
    pub timeout_secs: u64,
}

impl Default for RendererSettings {
    fn default() -> Self {
        Self {
            kind: RendererKind::None,
            binary: None,
            url: None,
            token: None,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QuerySettings {
    pub templates: Vec<String>,
    /// `{date}` is replaced by the run date in `date_format`.
    pub qualifiers: Vec<String>,
    pub date_format: String,
}

impl Default for QuerySettings {
    fn default() -> Self {
        Self {
            templates: Vec::new(),
            qualifiers: vec!["{date}".into(), "today".into(), "latest".into()],
            date_format: "%B %d, %Y".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct Weights {
    pub high: f64,
    pub medium: f64,
    pub recency: f64,
}

impl Default for Weights {
    fn default() -> Self {
        Self {
            high: 3.0,
            medium: 2.0,
            recency: 1.5,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct KeywordSettings {
    pub weights: Weights,
    pub high: Vec<String>,
    pub medium: Vec<String>,
    pub recency: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowSettings {
    /// Keep out-of-window items whose text carries a recency marker.
    pub marker_rescue: bool,
    pub recency_markers: Vec<String>,
}

impl Default for WindowSettings {
    fn default() -> Self {
        Self {
            marker_rescue: true,
            recency_markers: vec!["today".into(), "breaking".into(), "latest".into()],
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct RunProfile {
    pub lookback: Lookback,
    pub max_results: usize,
}

impl Default for RunProfile {
    fn default() -> Self {
        Self {
            lookback: Lookback::Today,
            max_results: 15,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Profiles {
    pub hourly: RunProfile,
    pub daily: RunProfile,
}

impl Profiles {
    pub fn for_mode(&self, mode: Mode) -> RunProfile {
        match mode {
            Mode::Hourly => self.hourly,
            Mode::Daily => self.daily,
        }
    }
}

/// What a source is asked for: one fixed page, or one page per query.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Target {
    Page {
        url: String,
    },
    Search {
        /// Must contain `{query}`, which is replaced by the URL-encoded query.
        url_template: String,
        #[serde(default)]
        max_queries: Option<usize>,
    },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchPlan {
    pub referer: Option<String>,
    /// Markup is usable only if one of these matches (empty: any body is usable).
    pub ready: Vec<String>,
    /// Allow the rendered fallback for this source.
    pub render: bool,
    /// Settle period given to the renderer.
    pub wait_ms: u64,
    /// Triggers clicked once after load, first match wins.
    pub click: Vec<String>,
}

/// The extraction strategies, always tried in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    Structured,
    Delimiter,
    Generic,
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StrategyKind::Structured => f.write_str("structured"),
            StrategyKind::Delimiter => f.write_str("delimiter"),
            StrategyKind::Generic => f.write_str("generic"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractRules {
    pub strategies: Vec<StrategyKind>,
    /// Region the delimiter and generic strategies work on (default `body`).
    pub scope: Vec<String>,
    pub rows: Vec<String>,
    pub title: Vec<String>,
    pub description: Vec<String>,
    pub date: Vec<String>,
    pub link: Vec<String>,
    pub location: Vec<String>,
    pub delimiter: String,
    pub min_len: usize,
    pub title_max_chars: usize,
    pub title_max_words: Option<usize>,
    pub title_prefix: Option<String>,
    pub max_items: Option<usize>,
}

impl Default for ExtractRules {
    fn default() -> Self {
        Self {
            strategies: vec![
                StrategyKind::Structured,
                StrategyKind::Delimiter,
                StrategyKind::Generic,
            ],
            scope: Vec::new(),
            rows: Vec::new(),
            title: Vec::new(),
            description: Vec::new(),
            date: Vec::new(),
            link: Vec::new(),
            location: Vec::new(),
            delimiter: r"(?i)<br\s*/?>".to_string(),
            min_len: 10,
            title_max_chars: 100,
            title_max_words: None,
            title_prefix: None,
            max_items: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    pub id: String,
    pub label: String,
    #[serde(default = "all_modes")]
    pub modes: Vec<Mode>,
    pub target: Target,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub fetch: FetchPlan,
    #[serde(default)]
    pub extract: ExtractRules,
    /// Drop candidates whose title has none of the admission keywords.
    #[serde(default)]
    pub admission: bool,
    /// Replace each result's snippet with the linked page's lead paragraphs.
    #[serde(default)]
    pub follow_links: bool,
    #[serde(default)]
    pub required_env: Vec<String>,
}

fn all_modes() -> Vec<Mode> {
    vec![Mode::Hourly, Mode::Daily]
}

/// The raw, deserialized settings file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub city: String,
    pub pipeline: PipelineSettings,
    pub http: HttpSettings,
    pub renderer: RendererSettings,
    pub queries: QuerySettings,
    pub keywords: KeywordSettings,
    pub admission: Vec<String>,
    pub window: WindowSettings,
    pub profiles: Profiles,
    pub sources: Vec<SourceConfig>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            city: "Bangalore".to_string(),
            pipeline: PipelineSettings::default(),
            http: HttpSettings::default(),
            renderer: RendererSettings::default(),
            queries: QuerySettings::default(),
            keywords: KeywordSettings::default(),
            admission: Vec::new(),
            window: WindowSettings::default(),
            profiles: Profiles::default(),
            sources: Vec::new(),
        }
    }
}

/// Extraction rules with every selector and pattern compiled.
#[derive(Debug, Clone)]
pub struct CompiledRules {
    pub strategies: Vec<StrategyKind>,
    pub scope: Vec<Selector>,
    pub rows: Vec<Selector>,
    pub title: Vec<Selector>,
    pub description: Vec<Selector>,
    pub date: Vec<Selector>,
    pub link: Vec<Selector>,
    pub location: Vec<Selector>,
    pub delimiter: Regex,
    pub min_len: usize,
    pub title_max_chars: usize,
    pub title_max_words: Option<usize>,
    pub title_prefix: Option<String>,
    pub max_items: Option<usize>,
}

impl CompiledRules {
    pub fn compile(source_id: &str, rules: &ExtractRules) -> Result<Self, ConfigError> {
        let mut strategies = rules.strategies.clone();
        strategies.sort();
        strategies.dedup();
        if strategies.is_empty() {
            return Err(ConfigError::Empty(format!(
                "source `{source_id}` enables no extraction strategy"
            )));
        }
        if strategies.contains(&StrategyKind::Structured) && rules.rows.is_empty() {
            return Err(ConfigError::InvalidSelector {
                source_id: source_id.to_string(),
                selector: String::new(),
                reason: "the structured strategy needs at least one row selector".to_string(),
            });
        }
        let delimiter = Regex::new(&rules.delimiter).map_err(|e| ConfigError::InvalidPattern {
            source_id: source_id.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            strategies,
            scope: compile_selectors(source_id, &rules.scope)?,
            rows: compile_selectors(source_id, &rules.rows)?,
            title: compile_selectors(source_id, &rules.title)?,
            description: compile_selectors(source_id, &rules.description)?,
            date: compile_selectors(source_id, &rules.date)?,
            link: compile_selectors(source_id, &rules.link)?,
            location: compile_selectors(source_id, &rules.location)?,
            delimiter,
            min_len: rules.min_len,
            title_max_chars: rules.title_max_chars.max(1),
            title_max_words: rules.title_max_words,
            title_prefix: rules.title_prefix.clone(),
            max_items: rules.max_items,
        })
    }
}

/// Compile CSS selectors, failing on the first invalid one.
pub fn compile_selectors(source_id: &str, raw: &[String]) -> Result<Vec<Selector>, ConfigError> {
    raw.iter()
        .map(|s| {
            Selector::parse(s).map_err(|e| ConfigError::InvalidSelector {
                source_id: source_id.to_string(),
                selector: s.clone(),
                reason: format!("{e:?}"),
            })
        })
        .collect()
}

/// A validated source: its configuration plus compiled selectors.
#[derive(Debug, Clone)]
pub struct Source {
    pub config: SourceConfig,
    pub rules: CompiledRules,
    pub ready: Vec<Selector>,
}

impl Source {
    pub fn id(&self) -> &str {
        &self.config.id
    }

    pub fn label(&self) -> &str {
        &self.config.label
    }

    pub fn runs_in(&self, mode: Mode) -> bool {
        self.config.modes.contains(&mode)
    }
}

/// Renderer backend after environment fallbacks were applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RendererBackend {
    None,
    Chrome { binary: String },
    Browserless { url: String, token: Option<String> },
}

/// Validated settings, ready to be shared with the workers.
#[derive(Debug, Clone)]
pub struct Config {
    pub settings: Settings,
    pub sources: Vec<Source>,
    pub renderer: RendererBackend,
}

impl Config {
    /// Load from `path`, or from the embedded catalog when `path` is `None`.
    #[instrument(level = "info")]
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let raw = match path {
            Some(p) => std::fs::read_to_string(p).map_err(|source| ConfigError::Read {
                path: p.display().to_string(),
                source,
            })?,
            None => DEFAULT_SETTINGS.to_string(),
        };
        let config = Self::from_yaml(&raw)?;
        info!(
            sources = config.sources.len(),
            templates = config.settings.queries.templates.len(),
            renderer = ?config.renderer,
            "Loaded settings"
        );
        Ok(config)
    }

    pub fn from_yaml(raw: &str) -> Result<Self, ConfigError> {
        let settings: Settings = serde_yaml::from_str(raw)?;
        Self::validate(settings)
    }

    /// Compile selectors and check everything a run depends on.
    pub fn validate(settings: Settings) -> Result<Self, ConfigError> {
        if settings.sources.is_empty() {
            return Err(ConfigError::Empty("no sources configured".to_string()));
        }
        if settings.pipeline.concurrency == 0 {
            return Err(ConfigError::Empty(
                "pipeline.concurrency must be at least 1".to_string(),
            ));
        }

        let mut seen = std::collections::HashSet::new();
        let mut sources = Vec::with_capacity(settings.sources.len());
        for cfg in &settings.sources {
            if !seen.insert(cfg.id.clone()) {
                return Err(ConfigError::Empty(format!("duplicate source id `{}`", cfg.id)));
            }
            for var in &cfg.required_env {
                if env_value(var).is_none() {
                    return Err(ConfigError::MissingEnv {
                        var: var.clone(),
                        needed_by: cfg.id.clone(),
                    });
                }
            }
            match &cfg.target {
                Target::Page { url } => check_absolute(&cfg.id, url)?,
                Target::Search { url_template, .. } => {
                    if !url_template.contains("{query}") {
                        return Err(ConfigError::InvalidTemplate {
                            source_id: cfg.id.clone(),
                            reason: "url_template must contain `{query}`".to_string(),
                        });
                    }
                    if settings.queries.templates.is_empty() {
                        return Err(ConfigError::InvalidTemplate {
                            source_id: cfg.id.clone(),
                            reason: "search source configured but queries.templates is empty"
                                .to_string(),
                        });
                    }
                    check_absolute(&cfg.id, &url_template.replace("{query}", "q"))?;
                }
            }
            if cfg.admission && settings.admission.is_empty() {
                warn!(source = %cfg.id, "Admission gate enabled but the admission list is empty; every candidate will be dropped");
            }
            let rules = CompiledRules::compile(&cfg.id, &cfg.extract)?;
            let ready = compile_selectors(&cfg.id, &cfg.fetch.ready)?;
            compile_selectors(&cfg.id, &cfg.fetch.click)?;
            debug!(source = %cfg.id, strategies = ?rules.strategies, "Compiled source rules");
            sources.push(Source {
                config: cfg.clone(),
                rules,
                ready,
            });
        }

        let renderer = resolve_renderer(&settings.renderer)?;
        Ok(Self {
            settings,
            sources,
            renderer,
        })
    }

    /// Sources that run in `mode`, with their catalog index.
    pub fn sources_for(&self, mode: Mode) -> impl Iterator<Item = (usize, &Source)> {
        self.sources
            .iter()
            .enumerate()
            .filter(move |(_, s)| s.runs_in(mode))
    }
}

fn check_absolute(source_id: &str, raw: &str) -> Result<(), ConfigError> {
    match url::Url::parse(raw) {
        Ok(u) if u.scheme() == "http" || u.scheme() == "https" => Ok(()),
        Ok(u) => Err(ConfigError::InvalidTemplate {
            source_id: source_id.to_string(),
            reason: format!("unsupported scheme `{}`", u.scheme()),
        }),
        Err(e) => Err(ConfigError::InvalidTemplate {
            source_id: source_id.to_string(),
            reason: format!("`{raw}` is not an absolute URL: {e}"),
        }),
    }
}

fn env_value(var: &str) -> Option<String> {
    std::env::var(var)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn resolve_renderer(settings: &RendererSettings) -> Result<RendererBackend, ConfigError> {
    match settings.kind {
        RendererKind::None => Ok(RendererBackend::None),
        RendererKind::Chrome => Ok(RendererBackend::Chrome {
            binary: settings
                .binary
                .clone()
                .or_else(|| env_value("CHROME_BIN"))
                .unwrap_or_else(|| "chromium".to_string()),
        }),
        RendererKind::Browserless => {
            let url = settings
                .url
                .clone()
                .or_else(|| env_value("BROWSERLESS_URL"))
                .ok_or_else(|| ConfigError::MissingEnv {
                    var: "BROWSERLESS_URL".to_string(),
                    needed_by: "renderer".to_string(),
                })?;
            if url::Url::parse(&url).is_err() {
                return Err(ConfigError::InvalidRenderer(format!(
                    "browserless url `{url}` is not a valid URL"
                )));
            }
            Ok(RendererBackend::Browserless {
                url,
                token: settings.token.clone().or_else(|| env_value("BROWSERLESS_TOKEN")),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal(extra_source: &str) -> String {
        format!(
            r#"
queries:
  templates: ["bangalore bandh"]
sources:
{extra_source}
"#
        )
    }

    #[test]
    fn test_embedded_settings_validate() {
        let config = Config::load(None).unwrap();
        assert!(config.sources.len() >= 4);
        assert!(config.sources_for(Mode::Hourly).any(|(_, s)| s.id() == "btp"));
        assert!(config.sources_for(Mode::Daily).all(|(_, s)| s.id() != "btp"));
        assert_eq!(config.settings.profiles.hourly.max_results, 15);
        assert_eq!(config.settings.profiles.daily.lookback, Lookback::Days(7));
    }

    #[test]
    fn test_invalid_selector_is_config_error() {
        let yaml = minimal(
            r#"  - id: broken
    label: Broken
    target: { kind: page, url: "https://example.com" }
    extract:
      rows: ["div[[["]
"#,
        );
        let err = Config::from_yaml(&yaml).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidSelector { .. }), "{err}");
    }

    #[test]
    fn test_missing_required_env_is_config_error() {
        let yaml = minimal(
            r#"  - id: needs-key
    label: Needs Key
    required_env: [CIVIC_PULSE_TEST_SURELY_UNSET_7F3A]
    target: { kind: page, url: "https://example.com" }
    extract:
      strategies: [generic]
"#,
        );
        match Config::from_yaml(&yaml).unwrap_err() {
            ConfigError::MissingEnv { var, needed_by } => {
                assert_eq!(var, "CIVIC_PULSE_TEST_SURELY_UNSET_7F3A");
                assert_eq!(needed_by, "needs-key");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_search_template_needs_query_placeholder() {
        let yaml = minimal(
            r#"  - id: search
    label: Search
    target: { kind: search, url_template: "https://duckduckgo.com/html/?q=fixed" }
    extract:
      strategies: [generic]
"#,
        );
        assert!(matches!(
            Config::from_yaml(&yaml).unwrap_err(),
            ConfigError::InvalidTemplate { .. }
        ));
    }

    #[test]
    fn test_structured_without_rows_rejected() {
        let yaml = minimal(
            r#"  - id: norows
    label: No Rows
    target: { kind: page, url: "https://example.com" }
"#,
        );
        assert!(Config::from_yaml(&yaml).is_err());
    }

    #[test]
    fn test_strategies_are_put_in_fixed_order() {
        let rules = ExtractRules {
            strategies: vec![StrategyKind::Generic, StrategyKind::Delimiter],
            ..ExtractRules::default()
        };
        let compiled = CompiledRules::compile("x", &rules).unwrap();
        assert_eq!(
            compiled.strategies,
            vec![StrategyKind::Delimiter, StrategyKind::Generic]
        );
    }

    #[test]
    fn test_lookback_parsing() {
        assert_eq!("today".parse::<Lookback>().unwrap(), Lookback::Today);
        assert_eq!("ALL".parse::<Lookback>().unwrap(), Lookback::All);
        assert_eq!("3d".parse::<Lookback>().unwrap(), Lookback::Days(3));
        assert_eq!("7 days".parse::<Lookback>().unwrap(), Lookback::Days(7));
        assert_eq!("1d".parse::<Lookback>().unwrap(), Lookback::Today);
        assert!("0d".parse::<Lookback>().is_err());
        assert!("soon".parse::<Lookback>().is_err());
    }

    #[test]
    fn test_lookback_earliest() {
        let today = NaiveDate::from_ymd_opt(2025, 7, 28).unwrap();
        assert_eq!(Lookback::Today.earliest(today), Some(today));
        assert_eq!(
            Lookback::Days(3).earliest(today),
            NaiveDate::from_ymd_opt(2025, 7, 26)
        );
        assert_eq!(Lookback::All.earliest(today), None);

        let huge: Lookback = "99999999d".parse().unwrap();
        assert_eq!(huge, Lookback::Days(99_999_999));
        assert_eq!(huge.earliest(today), None);
    }

    #[test]
    fn test_browserless_without_url_is_config_error() {
        let settings = RendererSettings {
            kind: RendererKind::Browserless,
            url: None,
            ..RendererSettings::default()
        };
        // Only meaningful when the environment does not provide a URL.
        if env_value("BROWSERLESS_URL").is_none() {
            assert!(matches!(
                resolve_renderer(&settings),
                Err(ConfigError::MissingEnv { .. })
            ));
        }
    }
}
