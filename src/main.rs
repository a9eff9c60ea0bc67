//! # Civic Pulse
//!
//! Collects time-sensitive civic information for a city (traffic alerts,
//! utility disruptions, tenders, events) from heterogeneous web sources and
//! writes a deduplicated, ranked, time-windowed feed.
//!
//! ## Usage
//!
//! ```sh
//! civic_pulse --mode hourly -o ./feed
//! civic_pulse --mode daily --config sources.yaml
//! ```
//!
//! ## Architecture
//!
//! 1. **Settings**: load and validate the source catalog (fatal on error)
//! 2. **Planning**: expand query templates into one work item per (source, query)
//! 3. **Fan-out**: fetch, extract and score work items on a bounded pool
//! 4. **Merge & window**: collapse duplicates, drop stale items, rank
//! 5. **Output**: write the records as JSON and print a status summary

use chrono::Local;
use civic_pulse::config::{Config, Mode};
use civic_pulse::fetch::{AnyRenderer, HttpClient, SourceFetcher};
use civic_pulse::outputs::{JsonFileSink, Sink};
use civic_pulse::pipeline::{Pipeline, RunOptions};
use civic_pulse::utils::ensure_writable_dir;
use clap::Parser;
use serde_json::json;
use std::error::Error;
use std::time::Duration;
use tracing::{debug, error, info, instrument};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;

use cli::Cli;

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    let args = Cli::parse();

    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339());
    if args.log_json {
        builder.json().init();
    } else {
        builder.init();
    }

    let start_time = std::time::Instant::now();
    info!(mode = %args.mode, "civic_pulse starting up");
    debug!(?args, "Parsed CLI arguments");

    // ---- Settings: any problem here is fatal, before any fetch ----
    let config = match Config::load(args.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            return Err(e.into());
        }
    };

    let mut opts = RunOptions::from_settings(&config.settings, args.mode, Local::now().date_naive());
    if let Some(n) = args.concurrency {
        opts.concurrency = n.max(1);
    }
    if let Some(n) = args.max_results {
        opts.max_results = n;
    }
    if let Some(lookback) = args.lookback {
        opts.lookback = lookback;
    }

    let client = HttpClient::new(&config.settings.http)?;
    let render_timeout = Duration::from_secs(config.settings.renderer.timeout_secs);
    let renderer = AnyRenderer::from_backend(&config.renderer, render_timeout)?;
    let pipeline = Pipeline::new(&config, SourceFetcher::new(client, renderer, render_timeout));

    if args.dry_run {
        let plan = pipeline.plan(opts.mode, opts.run_date);
        let items: Vec<_> = plan
            .iter()
            .map(|w| {
                json!({
                    "index": w.index,
                    "source": config.sources[w.source].id(),
                    "query": w.query.as_ref().map(|q| q.as_str()),
                    "url": w.url,
                })
            })
            .collect();
        println!(
            "{}",
            serde_json::to_string_pretty(&json!({ "mode": opts.mode, "work_items": items }))?
        );
        return Ok(());
    }

    // Early check: ensure output dir is writable
    if let Err(e) = ensure_writable_dir(&args.output_dir).await {
        error!(
            path = %args.output_dir,
            error = %e,
            "Output directory is not writable (fix perms or choose a different path)"
        );
        return Err(e);
    }

    // ---- Run ----
    let report = pipeline.run(&opts).await;

    // ---- Output ----
    let records = report.records();
    let sink = JsonFileSink::new(args.output_dir.clone());
    let written = match sink.accept(report.mode, report.run_date, &records).await {
        Ok(path) => Some(path),
        Err(e) => {
            error!(error = %e, "Failed to write JSON output");
            None
        }
    };

    let elapsed = start_time.elapsed();
    let mode_label = match opts.mode {
        Mode::Hourly => "Hourly",
        Mode::Daily => "Daily",
    };
    let status = if written.is_some() { "ok" } else { "error" };
    let message = format!("{mode_label} scraping completed");
    let summary = json!({
        "status": status,
        "message": message,
        "mode": opts.mode,
        "date": report.run_date.to_string(),
        "records": records.len(),
        "work_items": report.stats.work_items,
        "failures": report.failures,
        "stats": report.stats,
        "output": written,
        "elapsed_ms": elapsed.as_millis() as u64,
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);

    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );

    Ok(())
}
