//! JSON file output.
//!
//! Files are organized by run date with one file per mode:
//! `{output_dir}/{date}/{mode}.json`. A later run of the same mode on the
//! same day replaces the earlier file.

use super::Sink;
use crate::config::Mode;
use crate::models::Record;
use chrono::NaiveDate;
use std::error::Error;
use tokio::fs;
use tracing::{error, info, instrument};

/// Writes each run to a dated JSON file under `output_dir`.
#[derive(Debug, Clone)]
pub struct JsonFileSink {
    output_dir: String,
}

impl JsonFileSink {
    pub fn new(output_dir: impl Into<String>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    fn dir_for(&self, run_date: NaiveDate) -> String {
        format!("{}/{}", self.output_dir.trim_end_matches('/'), run_date)
    }

    /// Target path for a run.
    pub fn path_for(&self, mode: Mode, run_date: NaiveDate) -> String {
        format!("{}/{}.json", self.dir_for(run_date), mode)
    }
}

impl Sink for JsonFileSink {
    /// Write `records` as a pretty JSON array.
    ///
    /// # Output Path
    ///
    /// `{output_dir}/{run_date}/{mode}.json`, e.g. `output/2025-07-26/hourly.json`.
    ///
    /// # Returns
    ///
    /// The written path, or an error if directory creation or the write fails.
    #[instrument(level = "info", skip_all, fields(output_dir = %self.output_dir, %mode))]
    async fn accept(
        &self,
        mode: Mode,
        run_date: NaiveDate,
        records: &[Record],
    ) -> Result<String, Box<dyn Error>> {
        let json = serde_json::to_string_pretty(records)?;

        let full_dir = self.dir_for(run_date);
        info!(%full_dir, "Ensuring JSON directory exists");
        if let Err(e) = fs::create_dir_all(&full_dir).await {
            error!(%full_dir, error = %e, "Failed to create JSON dir");
            return Err(e.into());
        }

        let path = self.path_for(mode, run_date);
        fs::write(&path, json).await?;
        info!(path = %path, records = records.len(), "Wrote JSON file");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StrategyKind;
    use crate::models::{Candidate, ResultSet, ScoredCandidate, Seq, UrlKind};
    use chrono::{TimeZone, Utc};

    fn run_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 7, 26).unwrap()
    }

    fn records() -> Vec<Record> {
        let candidate = Candidate {
            title: "Power cut in Jayanagar".to_string(),
            description: "Supply off 10 am to 4 pm".to_string(),
            url: "https://news.test/power-cut".to_string(),
            url_kind: UrlKind::Permalink,
            published: None,
            source: "Utility News".to_string(),
            location: "Bangalore".to_string(),
            provenance: StrategyKind::Structured,
            seq: Seq::default(),
        };
        ResultSet {
            items: vec![ScoredCandidate {
                candidate,
                score: 3.0,
            }],
        }
        .to_records(run_date(), Utc.with_ymd_and_hms(2025, 7, 26, 6, 30, 0).unwrap())
    }

    #[tokio::test]
    async fn test_writes_dated_mode_file() {
        let tmp = tempfile::tempdir().unwrap();
        let sink = JsonFileSink::new(tmp.path().to_str().unwrap());
        let path = sink.accept(Mode::Daily, run_date(), &records()).await.unwrap();
        assert!(path.ends_with("2025-07-26/daily.json"));

        let raw = std::fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        let record = &value[0];
        assert_eq!(record["title"], "Power cut in Jayanagar");
        assert_eq!(record["date"], "2025-07-26");
        assert_eq!(record["location"], "Bangalore");
        assert_eq!(record["scraped_at"], "2025-07-26T06:30:00Z");
        assert_eq!(record["relevance_score"], 3.0);
    }

    #[tokio::test]
    async fn test_same_mode_same_day_overwrites() {
        let tmp = tempfile::tempdir().unwrap();
        let sink = JsonFileSink::new(tmp.path().to_str().unwrap());
        sink.accept(Mode::Hourly, run_date(), &records()).await.unwrap();
        let path = sink.accept(Mode::Hourly, run_date(), &[]).await.unwrap();
        let back: Vec<Record> =
            serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert!(back.is_empty());
    }
}
