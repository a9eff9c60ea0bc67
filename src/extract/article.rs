//! Lead-paragraph extraction for followed result links.
//!
//! Search snippets are short; when a source asks for it, the linked page is
//! fetched and its first few body paragraphs replace the snippet.

use super::dates::parse_date;
use super::visible_text;
use chrono::NaiveDate;
use crate::utils::{collapse_whitespace, truncate_chars};
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};

const CONTENT_SELECTORS: [&str; 8] = [
    "article",
    ".article-content",
    ".story-content",
    ".post-content",
    ".content",
    ".entry-content",
    "[data-module=\"ArticleBody\"]",
    ".article-body",
];

const NOISE_TAGS: [&str; 6] = ["script", "style", "nav", "header", "footer", "aside"];

static CONTENT: Lazy<Vec<Selector>> = Lazy::new(|| {
    CONTENT_SELECTORS
        .iter()
        .map(|s| Selector::parse(s).expect("valid selector"))
        .collect()
});

static PARAGRAPH: Lazy<Selector> = Lazy::new(|| Selector::parse("p").expect("valid selector"));

static PUBLISHED_META: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(
        r#"meta[property="article:published_time"], meta[property="article:modified_time"], meta[itemprop="datePublished"]"#,
    )
    .expect("valid selector")
});

static TIME_DATETIME: Lazy<Selector> =
    Lazy::new(|| Selector::parse("time[datetime]").expect("valid selector"));

static BYLINE: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(".byline, .timestamp, .published, .updated, .date, .post-date")
        .expect("valid selector")
});

/// Paragraphs must sit outside navigation chrome to count.
fn in_noise(el: &ElementRef<'_>) -> bool {
    el.ancestors()
        .filter_map(ElementRef::wrap)
        .any(|a| NOISE_TAGS.contains(&a.value().name()))
}

fn first_paragraphs(root: ElementRef<'_>, limit: usize) -> String {
    root.select(&PARAGRAPH)
        .filter(|p| !in_noise(p))
        .map(|p| visible_text(p, " "))
        .filter(|t| !t.trim().is_empty())
        .take(limit)
        .collect::<Vec<_>>()
        .join(" ")
}

/// The first `max_paragraphs` paragraphs of the page's main content, with
/// whitespace collapsed and capped at `max_chars` (plus `...`).
pub fn lead_paragraphs(html: &str, max_paragraphs: usize, max_chars: usize) -> String {
    let document = Html::parse_document(html);

    let mut content = CONTENT
        .iter()
        .find_map(|sel| document.select(sel).next())
        .map(|el| first_paragraphs(el, max_paragraphs))
        .unwrap_or_default();

    if content.trim().is_empty() {
        content = first_paragraphs(document.root_element(), max_paragraphs);
    }

    truncate_chars(&collapse_whitespace(&content), max_chars)
}

/// Publication date of an article page.
///
/// Only publication metadata is consulted: `article:published_time` style
/// meta tags, `<time datetime>`, then byline elements. Scripts and the rest
/// of the markup are never scanned.
pub fn published_date(html: &str) -> Option<NaiveDate> {
    let document = Html::parse_document(html);

    document
        .select(&PUBLISHED_META)
        .filter_map(|el| el.value().attr("content"))
        .chain(
            document
                .select(&TIME_DATETIME)
                .filter_map(|el| el.value().attr("datetime")),
        )
        .find_map(parse_date)
        .or_else(|| {
            document
                .select(&BYLINE)
                .find_map(|el| parse_date(&visible_text(el, " ")))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefers_article_body() {
        let html = r#"<html><body>
            <nav><p>Home | City | Sports</p></nav>
            <p>Subscribe to our newsletter</p>
            <article>
              <p>BESCOM has announced a power cut in Jayanagar.</p>
              <p>Supply will be restored by 5 pm.</p>
            </article>
        </body></html>"#;
        assert_eq!(
            lead_paragraphs(html, 4, 500),
            "BESCOM has announced a power cut in Jayanagar. Supply will be restored by 5 pm."
        );
    }

    #[test]
    fn test_falls_back_to_any_paragraph_outside_chrome() {
        let html = r#"<html><body>
            <header><p>Masthead</p></header>
            <div><p>Water supply suspended in Koramangala.</p></div>
        </body></html>"#;
        assert_eq!(lead_paragraphs(html, 4, 500), "Water supply suspended in Koramangala.");
    }

    #[test]
    fn test_paragraph_and_length_caps() {
        let body: String = (0..10).map(|i| format!("<p>Paragraph number {i}.</p>")).collect();
        let html = format!("<article>{body}</article>");
        let lead = lead_paragraphs(&html, 4, 500);
        assert!(lead.contains("number 3"));
        assert!(!lead.contains("number 4"));

        let capped = lead_paragraphs(&html, 10, 20);
        assert!(capped.ends_with("..."));
        assert!(capped.chars().count() <= 23);
    }

    #[test]
    fn test_published_date_from_metadata() {
        let html = r#"<html><head>
            <meta property="article:published_time" content="2025-07-24T08:00:00+05:30">
            </head><body><article><p>Power cut today.</p></article></body></html>"#;
        assert_eq!(published_date(html), NaiveDate::from_ymd_opt(2025, 7, 24));

        let html = r#"<article><time datetime="2025-07-23">Wednesday</time><p>x</p></article>"#;
        assert_eq!(published_date(html), NaiveDate::from_ymd_opt(2025, 7, 23));

        let html = r#"<div class="byline">Updated: July 22, 2025 10:15 IST</div>"#;
        assert_eq!(published_date(html), NaiveDate::from_ymd_opt(2025, 7, 22));
    }

    #[test]
    fn test_published_date_ignores_scripts_and_body_links() {
        let html = r#"<html><head><script>var build="2019-03-01";</script>
            <style>.x{}/* 2018-01-01 */</style></head><body>
            <article><p>BESCOM power cut in Jayanagar today.</p>
            <p><a href="/archive/2017-05-05">Archive</a></p></article>
            </body></html>"#;
        assert_eq!(published_date(html), None);
    }

    #[test]
    fn test_empty_page_yields_empty_string() {
        assert_eq!(lead_paragraphs("", 4, 500), "");
    }
}
