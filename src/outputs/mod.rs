//! Sinks for a run's records.
//!
//! The pipeline never writes anywhere itself: it returns a
//! [`RunReport`](crate::models::RunReport) and a sink turns its [`Record`]s
//! into something durable.
//!
//! # Output Structure
//!
//! ```text
//! output_dir/
//! └── 2025-07-26/
//!     ├── hourly.json
//!     └── daily.json
//! ```

pub mod json;

use crate::config::Mode;
use crate::models::Record;
use chrono::NaiveDate;
use std::error::Error;

pub use json::JsonFileSink;

/// Somewhere a run's records can be handed off to.
pub trait Sink {
    /// Persist one run's records, returning where they went.
    async fn accept(
        &self,
        mode: Mode,
        run_date: NaiveDate,
        records: &[Record],
    ) -> Result<String, Box<dyn Error>>;
}
