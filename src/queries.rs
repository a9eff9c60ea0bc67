//! Query generation from topic templates.

use crate::config::QuerySettings;
use crate::models::Query;
use chrono::NaiveDate;
use itertools::Itertools;
use tracing::{debug, instrument};

/// Collapse runs of whitespace and trim.
fn normalize(s: &str) -> String {
    s.split_whitespace().join(" ")
}

/// Expand every template with every qualifier, template-major.
///
/// `{date}` inside a qualifier becomes `date` rendered with
/// `settings.date_format`. An empty qualifier list emits each template on
/// its own.
///
/// # Arguments
/// * `settings` - Topic templates, qualifiers and the date format.
/// * `date` - The run date substituted for `{date}`.
///
/// # Returns
/// Queries in template-major order with no two equal (case-insensitively,
/// after whitespace normalization). A combined string that repeats an
/// earlier one is dropped, so the result may be shorter than
/// `templates × qualifiers`.
///
/// # Examples
/// ```
/// use chrono::NaiveDate;
/// use civic_pulse::config::QuerySettings;
/// use civic_pulse::queries::generate;
///
/// let settings = QuerySettings {
///     templates: vec!["bangalore bandh".into()],
///     qualifiers: vec!["today".into(), "latest".into()],
///     date_format: "%Y-%m-%d".into(),
/// };
/// let date = NaiveDate::from_ymd_opt(2025, 7, 26).unwrap();
/// assert_eq!(generate(&settings, date).len(), 2);
/// ```
#[instrument(level = "debug", skip_all, fields(%date))]
pub fn generate(settings: &QuerySettings, date: NaiveDate) -> Vec<Query> {
    let date_str = date.format(&settings.date_format).to_string();

    let templates: Vec<String> = settings
        .templates
        .iter()
        .map(|t| normalize(t))
        .filter(|t| !t.is_empty())
        .unique_by(|t| t.to_lowercase())
        .collect();

    let mut qualifiers: Vec<String> = settings
        .qualifiers
        .iter()
        .map(|q| normalize(&q.replace("{date}", &date_str)))
        .unique_by(|q| q.to_lowercase())
        .collect();
    if qualifiers.is_empty() {
        qualifiers.push(String::new());
    }

    let queries: Vec<Query> = templates
        .iter()
        .cartesian_product(qualifiers.iter())
        .map(|(t, q)| {
            if q.is_empty() {
                Query::new(t.clone())
            } else {
                Query::new(format!("{t} {q}"))
            }
        })
        .unique_by(|q| q.as_str().to_lowercase())
        .collect();

    debug!(
        templates = templates.len(),
        qualifiers = qualifiers.len(),
        queries = queries.len(),
        "Generated queries"
    );
    queries
}
