//! Markup to candidates.
//!
//! One data-driven extractor serves every source. A source's
//! [`CompiledRules`](crate::config::CompiledRules) enable a subset of three
//! strategies, which always run in the same priority order; the first one to
//! produce at least one candidate wins:
//!
//! | Strategy | Works on | Yields |
//! |----------|----------|--------|
//! | [`StrategyKind::Structured`] | row elements inside the scope | title/description/date/link/location per row via prioritized selectors |
//! | [`StrategyKind::Delimiter`] | the scope's markup split on a delimiter (default `<br>`) | one candidate per substantial fragment |
//! | [`StrategyKind::Generic`] | the scope's flattened text split on sentence breaks | one candidate per substantial fragment |
//!
//! Extraction never fails: malformed markup degrades to fewer or zero candidates.

pub mod article;
pub mod dates;
pub mod links;

use crate::config::{CompiledRules, Source, StrategyKind};
use crate::models::{Candidate, Seq, UrlKind};
use crate::utils::{collapse_whitespace, truncate_chars};
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Node, Selector};
use tracing::{debug, trace};
use url::Url;

const INVISIBLE_TAGS: [&str; 4] = ["script", "style", "noscript", "template"];

static BODY: Lazy<Selector> = Lazy::new(|| Selector::parse("body").expect("valid selector"));

static SENTENCE_BREAK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n\s*\n|[.!?]+\s+|\s*\|\s*").expect("valid regex"));

/// Where the markup came from and how its candidates should be labelled.
#[derive(Debug, Clone, Copy)]
pub struct PageContext<'a> {
    pub source: &'a Source,
    /// Absolute URL of the fetched page; also the sentinel URL.
    pub page_url: &'a str,
    /// Work-item index, used to number candidates.
    pub item_index: usize,
    /// Location used when the markup names none.
    pub default_location: &'a str,
}

/// An item found by a strategy, before labelling.
#[derive(Debug, Default)]
struct Draft {
    title: String,
    description: String,
    url: Option<String>,
    date: Option<NaiveDate>,
    location: Option<String>,
}

/// Text of an element with script and style contents skipped, text nodes
/// joined by `sep`.
pub fn visible_text(el: ElementRef<'_>, sep: &str) -> String {
    let mut parts = Vec::new();
    collect_text(el, &mut parts);
    parts.join(sep)
}

fn collect_text<'a>(el: ElementRef<'a>, out: &mut Vec<&'a str>) {
    for child in el.children() {
        match child.value() {
            Node::Text(text) => out.push(text),
            Node::Element(e) if !INVISIBLE_TAGS.contains(&e.name()) => {
                if let Some(child) = ElementRef::wrap(child) {
                    collect_text(child, out);
                }
            }
            _ => {}
        }
    }
}

fn flat_text(el: ElementRef<'_>) -> String {
    collapse_whitespace(&visible_text(el, " "))
}

/// Text of the first selector whose first match is non-empty.
fn first_text(root: ElementRef<'_>, selectors: &[Selector]) -> Option<String> {
    selectors.iter().find_map(|sel| {
        root.select(sel)
            .map(flat_text)
            .find(|t| !t.is_empty())
    })
}

fn first_date(root: ElementRef<'_>, selectors: &[Selector]) -> Option<NaiveDate> {
    selectors.iter().find_map(|sel| {
        root.select(sel).find_map(|el| {
            el.value()
                .attr("datetime")
                .and_then(dates::parse_date)
                .or_else(|| dates::parse_date(&flat_text(el)))
        })
    })
}

fn first_link(root: ElementRef<'_>, selectors: &[Selector], base: Option<&Url>) -> Option<String> {
    let base = base?;
    selectors
        .iter()
        .find_map(|sel| {
            root.select(sel)
                .filter_map(|el| el.value().attr("href"))
                .find_map(|href| links::resolve_link(base, href))
        })
        .or_else(|| {
            root.value()
                .attr("href")
                .and_then(|href| links::resolve_link(base, href))
        })
}

/// The element the delimiter and generic strategies work on.
fn scope<'a>(document: &'a Html, rules: &CompiledRules) -> ElementRef<'a> {
    rules
        .scope
        .iter()
        .find_map(|sel| document.select(sel).next())
        .or_else(|| document.select(&BODY).next())
        .unwrap_or_else(|| document.root_element())
}

fn structured(root: ElementRef<'_>, rules: &CompiledRules, base: Option<&Url>) -> Vec<Draft> {
    let Some(rows) = rules.rows.iter().find_map(|sel| {
        let rows: Vec<ElementRef<'_>> = root.select(sel).collect();
        (!rows.is_empty()).then_some(rows)
    }) else {
        return Vec::new();
    };

    let limit = rules.max_items.unwrap_or(usize::MAX);
    let mut drafts = Vec::new();
    for row in rows {
        if drafts.len() >= limit {
            break;
        }
        let row_text = flat_text(row);
        let title = first_text(row, &rules.title).unwrap_or_else(|| row_text.clone());
        let description = first_text(row, &rules.description).unwrap_or_default();
        let substance = if description.is_empty() { &title } else { &description };
        if title.is_empty() || substance.chars().count() <= rules.min_len {
            trace!(row = %crate::utils::truncate_for_log(&row_text, 80), "Skipping thin row");
            continue;
        }
        drafts.push(Draft {
            date: first_date(row, &rules.date).or_else(|| dates::parse_date(&row_text)),
            url: first_link(row, &rules.link, base),
            location: first_text(row, &rules.location),
            title,
            description,
        });
    }
    drafts
}

fn fragment_draft(fragment: String) -> Draft {
    Draft {
        date: dates::parse_date(&fragment),
        title: fragment.clone(),
        description: fragment,
        ..Draft::default()
    }
}

fn delimited(root: ElementRef<'_>, rules: &CompiledRules) -> Vec<Draft> {
    let markup = root.inner_html();
    let parts: Vec<&str> = rules.delimiter.split(&markup).collect();
    // No delimiter present means no structure to split on.
    if parts.len() < 2 {
        return Vec::new();
    }
    parts
        .into_iter()
        .map(|part| {
            let fragment = Html::parse_fragment(part);
            flat_text(fragment.root_element())
        })
        .filter(|text| text.chars().count() > rules.min_len)
        .map(fragment_draft)
        .collect()
}

fn generic(root: ElementRef<'_>, rules: &CompiledRules) -> Vec<Draft> {
    let text = visible_text(root, "\n");
    SENTENCE_BREAK
        .split(&text)
        .map(collapse_whitespace)
        .filter(|s| s.chars().count() > rules.min_len)
        .map(fragment_draft)
        .collect()
}

/// Shape a raw title per the source's rules. Never returns an empty string
/// for non-empty input.
fn shape_title(raw: &str, rules: &CompiledRules) -> String {
    let raw = collapse_whitespace(raw);
    let mut title = match rules.title_max_words {
        Some(max_words) if max_words > 0 => {
            let clause = raw.split(',').next().unwrap_or(&raw);
            let words: Vec<&str> = clause.split_whitespace().take(max_words).collect();
            let shown = words.join(" ");
            if raw.split_whitespace().count() > words.len() {
                format!("{shown}...")
            } else {
                shown
            }
        }
        _ => raw.clone(),
    };
    title = truncate_chars(&title, rules.title_max_chars);
    match &rules.title_prefix {
        Some(prefix) if !title.is_empty() => format!("{prefix}{title}"),
        _ => title,
    }
}

/// Run the source's strategies over `html` and return labelled candidates.
///
/// Strategies run in the fixed order Structured, Delimiter, Generic, limited
/// to those the source enables. The first strategy that yields anything wins.
///
/// # Arguments
///
/// * `ctx` - The source, the page URL (used to resolve relative links and
///   as the sentinel URL) and the work item's index
/// * `html` - Markup returned by the fetcher
///
/// # Returns
///
/// Candidates with non-empty titles, each stamped with a [`Seq`] of
/// `(ctx.item_index, position)`. Empty when no strategy finds anything.
pub fn extract(ctx: &PageContext<'_>, html: &str) -> Vec<Candidate> {
    if html.trim().is_empty() {
        return Vec::new();
    }
    let rules = &ctx.source.rules;
    let document = Html::parse_document(html);
    let base = Url::parse(ctx.page_url).ok();
    let root = scope(&document, rules);

    for &kind in &rules.strategies {
        let drafts = match kind {
            StrategyKind::Structured => structured(root, rules, base.as_ref()),
            StrategyKind::Delimiter => delimited(root, rules),
            StrategyKind::Generic => generic(root, rules),
        };
        let candidates = label(ctx, kind, drafts);
        if !candidates.is_empty() {
            debug!(
                source = %ctx.source.id(),
                strategy = %kind,
                count = candidates.len(),
                "Extracted candidates"
            );
            return candidates;
        }
        trace!(source = %ctx.source.id(), strategy = %kind, "Strategy yielded nothing");
    }

    debug!(source = %ctx.source.id(), url = %ctx.page_url, "No strategy produced content");
    Vec::new()
}

fn label(ctx: &PageContext<'_>, kind: StrategyKind, drafts: Vec<Draft>) -> Vec<Candidate> {
    let rules = &ctx.source.rules;
    let default_location = ctx
        .source
        .config
        .location
        .as_deref()
        .unwrap_or(ctx.default_location);

    drafts
        .into_iter()
        .filter_map(|d| {
            let title = shape_title(&d.title, rules);
            if title.is_empty() {
                return None;
            }
            let (url, url_kind) = match d.url {
                Some(u) => (u, UrlKind::Permalink),
                None => (ctx.page_url.to_string(), UrlKind::Sentinel),
            };
            Some((title, d.description, url, url_kind, d.date, d.location))
        })
        .enumerate()
        .map(|(position, (title, description, url, url_kind, published, location))| Candidate {
            title,
            description,
            url,
            url_kind,
            published,
            source: ctx.source.label().to_string(),
            location: location.unwrap_or_else(|| default_location.to_string()),
            provenance: kind,
            seq: Seq {
                item: ctx.item_index,
                position,
            },
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ExtractRules, FetchPlan, SourceConfig, Target};

    fn source(rules: ExtractRules) -> Source {
        let config = SourceConfig {
            id: "test".to_string(),
            label: "Test Source".to_string(),
            modes: vec![crate::config::Mode::Daily],
            target: Target::Page {
                url: "https://example.com/alerts".to_string(),
            },
            location: None,
            fetch: FetchPlan::default(),
            extract: rules.clone(),
            admission: false,
            follow_links: false,
            required_env: Vec::new(),
        };
        Source {
            rules: CompiledRules::compile("test", &rules).unwrap(),
            ready: Vec::new(),
            config,
        }
    }

    fn run(source: &Source, html: &str) -> Vec<Candidate> {
        let ctx = PageContext {
            source,
            page_url: "https://example.com/alerts",
            item_index: 4,
            default_location: "Bangalore",
        };
        extract(&ctx, html)
    }

    fn strings(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_structured_rows_with_prioritized_selectors() {
        let src = source(ExtractRules {
            rows: strings(&[".missing", ".tenderbox"]),
            title: strings(&[".nope", "a[href]"]),
            date: strings(&[".tdy"]),
            link: strings(&["a[href]"]),
            min_len: 20,
            title_prefix: Some("BBMP Tender: ".to_string()),
            title_max_words: Some(8),
            ..ExtractRules::default()
        });
        let html = r#"<html><body>
          <div class="tenderbox">
            <span class="btender">12345678</span>
            <a href="/tender/12345678">Construction of storm water drain at Bellandur ward, phase two works</a>
            <span class="tdy">Due Date: 28-07-2025</span>
          </div>
          <div class="tenderbox"><a href="/t/1">Too short</a></div>
        </body></html>"#;

        let out = run(&src, html);
        assert_eq!(out.len(), 1);
        let c = &out[0];
        assert_eq!(c.title, "BBMP Tender: Construction of storm water drain at Bellandur ward...");
        assert_eq!(c.url, "https://example.com/tender/12345678");
        assert_eq!(c.url_kind, UrlKind::Permalink);
        assert_eq!(c.published, NaiveDate::from_ymd_opt(2025, 7, 28));
        assert_eq!(c.provenance, StrategyKind::Structured);
        assert_eq!(c.seq, Seq { item: 4, position: 0 });
        assert_eq!(c.location, "Bangalore");
        assert_eq!(c.source, "Test Source");
    }

    #[test]
    fn test_structured_row_without_link_uses_sentinel() {
        let src = source(ExtractRules {
            strategies: vec![StrategyKind::Structured],
            rows: strings(&["li"]),
            ..ExtractRules::default()
        });
        let out = run(&src, "<ul><li>Metro services suspended on Purple Line</li></ul>");
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].url, "https://example.com/alerts");
        assert_eq!(out[0].url_kind, UrlKind::Sentinel);
        assert_eq!(out[0].published, None);
    }

    #[test]
    fn test_min_len_is_exclusive_for_every_strategy() {
        // Exactly ten characters: "Road works" is too thin everywhere.
        let structured = source(ExtractRules {
            strategies: vec![StrategyKind::Structured],
            rows: strings(&["li"]),
            min_len: 10,
            ..ExtractRules::default()
        });
        let out = run(&structured, "<ul><li>Road works</li><li>Road works ahead</li></ul>");
        let titles: Vec<&str> = out.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, vec!["Road works ahead"]);

        let delimited = source(ExtractRules {
            strategies: vec![StrategyKind::Delimiter],
            min_len: 10,
            ..ExtractRules::default()
        });
        let out = run(&delimited, "<div>Road works<br>Road works ahead</div>");
        let titles: Vec<&str> = out.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, vec!["Road works ahead"]);
    }

    #[test]
    fn test_row_href_used_when_row_is_the_link() {
        let src = source(ExtractRules {
            strategies: vec![StrategyKind::Structured],
            rows: strings(&["a.event-card-link"]),
            title: strings(&["h3"]),
            link: strings(&["a.other"]),
            ..ExtractRules::default()
        });
        let html = r#"<a class="event-card-link" href="https://www.eventbrite.com/e/run-123"><h3>Cubbon Park Morning Run</h3></a>"#;
        let out = run(&src, html);
        assert_eq!(out[0].url, "https://www.eventbrite.com/e/run-123");
    }

    #[test]
    fn test_delimiter_strategy_splits_on_breaks() {
        let src = source(ExtractRules {
            strategies: vec![StrategyKind::Delimiter, StrategyKind::Generic],
            scope: strings(&[".modal-body"]),
            ..ExtractRules::default()
        });
        let long = "x".repeat(150);
        let html = format!(
            r#"<div class="modal-body news-modal">
              Traffic diversion at Hebbal flyover due to metro work<br>
              ok<br/>
              Slow moving traffic on Outer Ring Road near <a href="/m">Marathahalli</a><br>
              {long}
            </div>"#
        );
        let out = run(&src, &html);
        assert_eq!(out.len(), 3);
        assert_eq!(out[0].title, "Traffic diversion at Hebbal flyover due to metro work");
        assert_eq!(out[1].title, "Slow moving traffic on Outer Ring Road near Marathahalli");
        assert_eq!(out[2].title, format!("{}...", "x".repeat(100)));
        assert_eq!(out[2].description, long);
        assert!(out.iter().all(|c| c.provenance == StrategyKind::Delimiter));
        assert!(out.iter().all(|c| c.url_kind == UrlKind::Sentinel));
    }

    #[test]
    fn test_generic_fallback_when_no_delimiter() {
        let src = source(ExtractRules {
            strategies: vec![StrategyKind::Delimiter, StrategyKind::Generic],
            scope: strings(&[".modal-body"]),
            ..ExtractRules::default()
        });
        let html = r#"<div class="modal-body"><p>Water supply will be suspended in Koramangala today. Tankers arranged for residents!</p><script>var tracking = "ignore this long script text";</script></div>"#;
        let out = run(&src, html);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].title, "Water supply will be suspended in Koramangala today");
        assert_eq!(out[1].title, "Tankers arranged for residents!");
        assert!(out.iter().all(|c| c.provenance == StrategyKind::Generic));
    }

    #[test]
    fn test_first_successful_strategy_wins() {
        let src = source(ExtractRules {
            rows: strings(&["li"]),
            ..ExtractRules::default()
        });
        let html = "<ul><li>Power cut in Whitefield till 6 pm</li></ul><p>Some unrelated paragraph text here.</p>";
        let out = run(&src, html);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].provenance, StrategyKind::Structured);
    }

    #[test]
    fn test_malformed_or_empty_markup_is_total() {
        let src = source(ExtractRules {
            rows: strings(&["li"]),
            ..ExtractRules::default()
        });
        assert!(run(&src, "").is_empty());
        assert!(run(&src, "<<<>>><div><li").is_empty());
        assert!(run(&src, "<p>tiny</p>").is_empty());
    }

    #[test]
    fn test_titles_are_never_empty() {
        let src = source(ExtractRules {
            strategies: vec![StrategyKind::Generic],
            min_len: 0,
            ..ExtractRules::default()
        });
        let out = run(&src, "<p>a. b. c.</p>");
        assert!(out.iter().all(|c| !c.title.is_empty()));
    }

    #[test]
    fn test_location_selector_overrides_default() {
        let src = source(ExtractRules {
            strategies: vec![StrategyKind::Structured],
            rows: strings(&["article"]),
            title: strings(&["h3"]),
            location: strings(&[".location"]),
            ..ExtractRules::default()
        });
        let html = r#"<article><h3>Bengaluru 10K Challenge</h3><span class="location">Kanteerava Stadium</span></article>"#;
        let out = run(&src, html);
        assert_eq!(out[0].location, "Kanteerava Stadium");
    }
}
