//! Error taxonomy for the aggregation pipeline.
//!
//! Only [`ConfigError`] is ever fatal: it is raised while settings are loaded
//! and validated, before any network work starts. [`FetchError`] values are
//! contained at the work-item boundary, logged, and recorded in the run report.

use std::time::Duration;
use thiserror::Error;

/// Problems with the settings file or the environment it depends on.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read settings from {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse settings: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("source `{source_id}` has an invalid selector `{selector}`: {reason}")]
    InvalidSelector {
        source_id: String,
        selector: String,
        reason: String,
    },

    #[error("source `{source_id}` has an invalid delimiter pattern: {reason}")]
    InvalidPattern { source_id: String, reason: String },

    #[error("required environment variable `{var}` is not set (needed by `{needed_by}`)")]
    MissingEnv { var: String, needed_by: String },

    #[error("source `{source_id}`: {reason}")]
    InvalidTemplate { source_id: String, reason: String },

    #[error("renderer misconfigured: {0}")]
    InvalidRenderer(String),

    #[error("{0}")]
    Empty(String),
}

/// Why a single fetch attempt produced no usable markup.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("transport error for {url}: {message}")]
    Transport { url: String, message: String },

    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("timed out after {elapsed:?} fetching {url}")]
    Timeout { url: String, elapsed: Duration },

    #[error("renderer failed for {url}: {message}")]
    Render { url: String, message: String },

    #[error("no renderer configured")]
    NoRenderer,

    #[error("no usable content at {url} (none of the readiness selectors matched)")]
    Unusable { url: String },
}

impl FetchError {
    /// Map a reqwest error onto the taxonomy, keeping timeouts distinct.
    pub fn from_reqwest(url: &str, err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            FetchError::Timeout {
                url: url.to_string(),
                elapsed: timeout,
            }
        } else if let Some(status) = err.status() {
            FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            }
        } else {
            FetchError::Transport {
                url: url.to_string(),
                message: err.to_string(),
            }
        }
    }
}
