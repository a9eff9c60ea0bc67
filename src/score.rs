//! Keyword-class relevance scoring and the admission gate.
//!
//! A candidate's score is the sum of its matched keywords' class weights,
//! counted against its title and description. Each keyword contributes once
//! per class no matter how often it occurs. Matching is case-insensitive and
//! on whole words, so `alert` does not fire inside `alerted`. Keywords that
//! begin or end with punctuation (`#bandh`, `Rs.`) are bounded by the
//! punctuation itself on that side.

use crate::config::KeywordSettings;
use crate::models::{Candidate, ScoredCandidate};
use chrono::NaiveDate;
use regex::Regex;
use tracing::warn;

/// One keyword compiled to a whole-word, case-insensitive pattern.
#[derive(Debug, Clone)]
struct Keyword {
    pattern: Regex,
}

impl Keyword {
    fn compile(term: &str) -> Option<Self> {
        let term = term.trim();
        if term.is_empty() {
            return None;
        }
        let escaped = regex::escape(term).replace(' ', r"\s+");
        // A word boundary only makes sense next to a word character.
        let edge = |c: Option<char>| match c {
            Some(c) if c.is_alphanumeric() || c == '_' => r"\b",
            _ => "",
        };
        let (start, end) = (edge(term.chars().next()), edge(term.chars().last()));
        match Regex::new(&format!(r"(?i){start}{escaped}{end}")) {
            Ok(pattern) => Some(Self { pattern }),
            Err(e) => {
                warn!(term = %term, error = %e, "Skipping keyword that does not compile");
                None
            }
        }
    }

    fn matches(&self, text: &str) -> bool {
        self.pattern.is_match(text)
    }
}

#[derive(Debug, Clone)]
struct KeywordClass {
    weight: f64,
    keywords: Vec<Keyword>,
}

impl KeywordClass {
    fn new<'a>(weight: f64, terms: impl IntoIterator<Item = &'a str>) -> Self {
        let mut seen = Vec::new();
        let mut keywords = Vec::new();
        for term in terms {
            let lower = term.trim().to_lowercase();
            if seen.contains(&lower) {
                continue;
            }
            if let Some(kw) = Keyword::compile(term) {
                seen.push(lower);
                keywords.push(kw);
            }
        }
        Self {
            weight: weight.max(0.0),
            keywords,
        }
    }

    fn score(&self, text: &str) -> f64 {
        let hits = self.keywords.iter().filter(|k| k.matches(text)).count();
        hits as f64 * self.weight
    }
}

/// Scores candidates against the configured keyword classes for one run date.
#[derive(Debug, Clone)]
pub struct Scorer {
    classes: Vec<KeywordClass>,
}

impl Scorer {
    /// The run date is added to the recency class in ISO (`2025-07-26`) and
    /// long (`July 26, 2025`) form.
    pub fn new(settings: &KeywordSettings, run_date: NaiveDate) -> Self {
        let iso = run_date.format("%Y-%m-%d").to_string();
        let long = run_date.format("%B %d, %Y").to_string();
        let recency = settings
            .recency
            .iter()
            .map(String::as_str)
            .chain([iso.as_str(), long.as_str()]);

        Self {
            classes: vec![
                KeywordClass::new(settings.weights.high, settings.high.iter().map(String::as_str)),
                KeywordClass::new(
                    settings.weights.medium,
                    settings.medium.iter().map(String::as_str),
                ),
                KeywordClass::new(settings.weights.recency, recency),
            ],
        }
    }

    /// Non-negative relevance of `candidate`. Pure: same candidate, same score.
    pub fn score(&self, candidate: &Candidate) -> f64 {
        let text = candidate.text();
        self.classes.iter().map(|c| c.score(&text)).sum()
    }

    pub fn scored(&self, candidate: Candidate) -> ScoredCandidate {
        let score = self.score(&candidate);
        ScoredCandidate { candidate, score }
    }
}

/// Hard keyword filter applied to titles before scoring.
#[derive(Debug, Clone)]
pub struct AdmissionGate {
    keywords: Vec<Keyword>,
}

impl AdmissionGate {
    pub fn new(terms: &[String]) -> Self {
        Self {
            keywords: terms.iter().filter_map(|t| Keyword::compile(t)).collect(),
        }
    }

    pub fn admits(&self, title: &str) -> bool {
        self.keywords.iter().any(|k| k.matches(title))
    }
}
