//! Best-effort date recognition in free text.
//!
//! Patterns are tried in a fixed order and the first match that forms a real
//! calendar date wins:
//!
//! 1. `DD-MM-YYYY` (also `/` and `.` separators)
//! 2. `YYYY-MM-DD` (also `/`, and ISO datetimes)
//! 3. `DD Month YYYY` (full or abbreviated month names, optional ordinal)
//! 4. `Month DD, YYYY`
//!
//! Anything else is unknown; `Candidate::resolved_date` then uses the fetch
//! date.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

const MONTHS: &str = r"(jan(?:uary)?|feb(?:ruary)?|mar(?:ch)?|apr(?:il)?|may|june?|july?|aug(?:ust)?|sep(?:t(?:ember)?)?|oct(?:ober)?|nov(?:ember)?|dec(?:ember)?)\.?";

static DAY_MONTH_YEAR_NUMERIC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d{1,2})[-/.](\d{1,2})[-/.](\d{4})\b").expect("valid regex"));

static YEAR_MONTH_DAY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d{4})[-/](\d{1,2})[-/](\d{1,2})(?:\b|T)").expect("valid regex"));

static DAY_MONTHNAME_YEAR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?i)\b(\d{{1,2}})(?:st|nd|rd|th)?\s+{MONTHS}\s*,?\s+(\d{{4}})\b"
    ))
    .expect("valid regex")
});

static MONTHNAME_DAY_YEAR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?i)\b{MONTHS}\s+(\d{{1,2}})(?:st|nd|rd|th)?,?\s+(\d{{4}})\b"
    ))
    .expect("valid regex")
});

fn month_number(name: &str) -> Option<u32> {
    let lower = name.to_lowercase();
    let month = match lower.get(..3)? {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    };
    Some(month)
}

fn num(caps: &Captures<'_>, i: usize) -> Option<u32> {
    caps.get(i)?.as_str().parse().ok()
}

fn ymd(year: Option<u32>, month: Option<u32>, day: Option<u32>) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(i32::try_from(year?).ok()?, month?, day?)
}

/// Find the first recognizable date in `text`.
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    for caps in DAY_MONTH_YEAR_NUMERIC.captures_iter(text) {
        if let Some(d) = ymd(num(&caps, 3), num(&caps, 2), num(&caps, 1)) {
            return Some(d);
        }
    }
    for caps in YEAR_MONTH_DAY.captures_iter(text) {
        if let Some(d) = ymd(num(&caps, 1), num(&caps, 2), num(&caps, 3)) {
            return Some(d);
        }
    }
    for caps in DAY_MONTHNAME_YEAR.captures_iter(text) {
        let month = caps.get(2).and_then(|m| month_number(m.as_str()));
        if let Some(d) = ymd(num(&caps, 3), month, num(&caps, 1)) {
            return Some(d);
        }
    }
    for caps in MONTHNAME_DAY_YEAR.captures_iter(text) {
        let month = caps.get(1).and_then(|m| month_number(m.as_str()));
        if let Some(d) = ymd(num(&caps, 3), month, num(&caps, 2)) {
            return Some(d);
        }
    }
    None
}
