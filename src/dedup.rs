//! Collapse duplicate candidates into one survivor per identity.
//!
//! Identity is the normalized URL when the candidate links to its own page,
//! otherwise a normalized title prefix. Within a group the highest score wins
//! and ties go to the lowest [`Seq`](crate::models::Seq). Because `Seq` comes
//! from the submission plan, the survivor set does not depend on the order
//! candidates arrive in.

use crate::models::{ScoredCandidate, UrlKind};
use crate::utils::{collapse_whitespace, prefix_chars};
use std::cmp::Ordering;
use std::collections::HashMap;
use url::Url;

/// Characters of normalized title kept in a title key.
pub const TITLE_KEY_CHARS: usize = 80;

const TRACKING_PARAMS: [&str; 5] = ["fbclid", "gclid", "mc_cid", "mc_eid", "ref_src"];

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DedupKey {
    Url(String),
    Title(String),
}

impl DedupKey {
    pub fn of(candidate: &crate::models::Candidate) -> Self {
        if candidate.url_kind == UrlKind::Permalink {
            if let Some(url) = normalize_url(&candidate.url) {
                return DedupKey::Url(url);
            }
        }
        DedupKey::Title(title_key(&candidate.title))
    }
}

/// Lower-cased, whitespace-collapsed title prefix.
pub fn title_key(title: &str) -> String {
    let normalized = collapse_whitespace(&title.to_lowercase());
    prefix_chars(&normalized, TITLE_KEY_CHARS).trim_end().to_string()
}

/// Canonical form of a URL for identity comparison: no fragment, no tracking
/// parameters, no `www.`, no trailing slash, lower-cased host.
pub fn normalize_url(raw: &str) -> Option<String> {
    let mut url = Url::parse(raw.trim()).ok()?;
    url.set_fragment(None);

    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| {
            let k = k.to_lowercase();
            !k.starts_with("utm_") && !TRACKING_PARAMS.contains(&k.as_str())
        })
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    if kept.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(kept);
    }

    let host = url.host_str()?.to_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host);
    let path = url.path().trim_end_matches('/');
    let query = url.query().map(|q| format!("?{q}")).unwrap_or_default();
    Some(format!("{host}{path}{query}"))
}

/// Survivor preference: higher score, then earlier arrival.
fn better(a: &ScoredCandidate, b: &ScoredCandidate) -> bool {
    match a.score.total_cmp(&b.score) {
        Ordering::Greater => true,
        Ordering::Less => false,
        Ordering::Equal => a.candidate.seq < b.candidate.seq,
    }
}

/// One survivor per [`DedupKey`], returned in arrival order.
///
/// # Arguments
///
/// * `candidates` - Scored candidates from every work item, in any order
///
/// # Returns
///
/// For each key, the highest-scored candidate; equal scores keep the lowest
/// [`Seq`](crate::models::Seq). Survivors are sorted by `Seq`, so the result
/// does not depend on the order in which work items finished.
pub fn merge(candidates: Vec<ScoredCandidate>) -> Vec<ScoredCandidate> {
    let mut groups: HashMap<DedupKey, ScoredCandidate> = HashMap::with_capacity(candidates.len());
    for sc in candidates {
        let key = DedupKey::of(&sc.candidate);
        match groups.get_mut(&key) {
            Some(current) if better(&sc, current) => *current = sc,
            Some(_) => {}
            None => {
                groups.insert(key, sc);
            }
        }
    }
    let mut survivors: Vec<ScoredCandidate> = groups.into_values().collect();
    survivors.sort_by_key(|sc| sc.candidate.seq);
    survivors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StrategyKind;
    use crate::models::{Candidate, Seq};

    fn sc(title: &str, url: Option<&str>, source: &str, score: f64, item: usize) -> ScoredCandidate {
        ScoredCandidate {
            candidate: Candidate {
                title: title.to_string(),
                description: String::new(),
                url: url.unwrap_or("https://btp.karnataka.gov.in/en").to_string(),
                url_kind: if url.is_some() {
                    UrlKind::Permalink
                } else {
                    UrlKind::Sentinel
                },
                published: None,
                source: source.to_string(),
                location: "Bangalore".to_string(),
                provenance: StrategyKind::Structured,
                seq: Seq { item, position: 0 },
            },
            score,
        }
    }

    #[test]
    fn test_same_title_keeps_higher_score() {
        let input = vec![
            sc("Bandh called   across city", None, "Bangalore Traffic Police", 3.5, 0),
            sc("BANDH called across city", None, "Utility News Search", 5.0, 1),
            sc("Metro timings extended", None, "Bangalore Traffic Police", 2.0, 2),
        ];
        let out = merge(input);
        assert_eq!(out.len(), 2);
        let bandh = out.iter().find(|s| s.candidate.title.contains("across")).unwrap();
        assert_eq!(bandh.score, 5.0);
        assert_eq!(bandh.candidate.source, "Utility News Search");
    }

    #[test]
    fn test_ties_keep_earliest_arrival() {
        let out = merge(vec![
            sc("Water cut in HSR", None, "Late", 3.0, 9),
            sc("Water cut in HSR", None, "Early", 3.0, 1),
        ]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].candidate.source, "Early");
    }

    #[test]
    fn test_url_identity_ignores_tracking_and_www() {
        let out = merge(vec![
            sc("One headline", Some("https://www.thehindu.com/news/x/?utm_source=tw#top"), "A", 1.0, 0),
            sc("Different headline", Some("https://thehindu.com/news/x"), "B", 2.0, 1),
        ]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].candidate.source, "B");
    }

    #[test]
    fn test_sentinel_urls_do_not_collapse_distinct_items() {
        let out = merge(vec![
            sc("Diversion at Hebbal", None, "BTP", 1.0, 0),
            sc("Slow traffic on ORR", None, "BTP", 1.0, 1),
        ]);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn test_long_titles_share_prefix_key() {
        let stem = "a".repeat(TITLE_KEY_CHARS);
        let out = merge(vec![
            sc(&format!("{stem} first ending"), None, "A", 1.0, 0),
            sc(&format!("{stem} second ending"), None, "B", 1.0, 1),
        ]);
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn test_merge_is_order_independent() {
        let input = vec![
            sc("Bandh today", None, "A", 3.0, 0),
            sc("bandh today", None, "B", 3.0, 1),
            sc("Bandh  today", None, "C", 4.0, 2),
            sc("Power cut", Some("https://example.com/p"), "D", 1.0, 3),
            sc("Power cut again", Some("https://example.com/p/"), "E", 1.0, 4),
            sc("Event", None, "F", 0.0, 5),
        ];
        let expected: Vec<(String, usize)> = merge(input.clone())
            .into_iter()
            .map(|s| (s.candidate.source, s.candidate.seq.item))
            .collect();

        let mut rotated = input.clone();
        for _ in 0..input.len() {
            rotated.rotate_left(1);
            let got: Vec<(String, usize)> = merge(rotated.clone())
                .into_iter()
                .map(|s| (s.candidate.source, s.candidate.seq.item))
                .collect();
            assert_eq!(got, expected);
        }
        let mut reversed = input;
        reversed.reverse();
        let got: Vec<(String, usize)> = merge(reversed)
            .into_iter()
            .map(|s| (s.candidate.source, s.candidate.seq.item))
            .collect();
        assert_eq!(got, expected);
        assert_eq!(expected, vec![("C".to_string(), 2), ("D".to_string(), 3), ("F".to_string(), 5)]);
    }

    #[test]
    fn test_normalize_url() {
        assert_eq!(
            normalize_url("https://WWW.Example.com/a/b/?fbclid=1&id=7").as_deref(),
            Some("example.com/a/b?id=7")
        );
        assert_eq!(normalize_url("not a url"), None);
    }
}
