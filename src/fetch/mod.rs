//! One work item's markup, cheapest method first.
//!
//! A [`SourceFetcher`] tries an ordered list of [`FetchMethod`]s: the plain
//! HTTP fast path, then (for sources that allow it) a headless render. The
//! first method whose markup is *usable* wins. Usable means one of the
//! source's readiness selectors matches, or, for sources without any, that
//! the body is non-empty.
//!
//! Neither method ever raises past this module: failures are folded into the
//! returned [`FetchAttempt`] and the caller decides what to log.

pub mod http;
pub mod render;

use crate::config::Source;
use crate::error::FetchError;
use crate::models::{FetchAttempt, FetchMethod};
use scraper::Html;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

pub use http::HttpClient;
pub use render::{AnyRenderer, BrowserlessRenderer, ChromeRenderer};

/// Plain HTTP GET returning the response body.
pub trait PageClient {
    async fn get(&self, url: &str, referer: Option<&str>) -> Result<String, FetchError>;
}

/// What a renderer is asked to do for one page.
#[derive(Debug, Clone, Copy)]
pub struct RenderRequest<'a> {
    pub url: &'a str,
    /// Wait for any of these to appear before capturing.
    pub ready: &'a [String],
    /// Click the first of these that exists, once, after load.
    pub click: &'a [String],
    /// Settle period after load.
    pub wait: Duration,
}

/// Headless-browser rendering. Every call owns its own browser session.
pub trait Renderer {
    async fn render(&self, request: &RenderRequest<'_>) -> Result<String, FetchError>;
}

/// Resolves (source, url) pairs into markup using a shared HTTP client and
/// a per-call renderer.
#[derive(Debug)]
pub struct SourceFetcher<C, R> {
    client: C,
    renderer: R,
    render_timeout: Duration,
}

impl<C, R> SourceFetcher<C, R>
where
    C: PageClient,
    R: Renderer,
{
    pub fn new(client: C, renderer: R, render_timeout: Duration) -> Self {
        Self {
            client,
            renderer,
            render_timeout,
        }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Methods tried for `source`, in order.
    pub fn methods(source: &Source) -> Vec<FetchMethod> {
        let mut methods = vec![FetchMethod::Fast];
        if source.config.fetch.render {
            methods.push(FetchMethod::Rendered);
        }
        methods
    }

    #[instrument(level = "info", skip_all, fields(source = %source.id(), url = %url))]
    pub async fn fetch(&self, source: &Source, url: &str) -> FetchAttempt {
        let mut last = FetchMethod::Fast;
        let mut last_error: Option<FetchError> = None;

        for method in Self::methods(source) {
            last = method;
            let t0 = Instant::now();
            let result = match method {
                FetchMethod::Fast => {
                    self.client
                        .get(url, source.config.fetch.referer.as_deref())
                        .await
                }
                FetchMethod::Rendered => self.render(source, url).await,
            };

            match result {
                Ok(body) if usable(source, &body) => {
                    info!(
                        method = %method,
                        bytes = body.len(),
                        elapsed_ms = t0.elapsed().as_millis() as u64,
                        "Fetched usable markup"
                    );
                    return FetchAttempt {
                        source_id: source.id().to_string(),
                        url: url.to_string(),
                        method,
                        content: body,
                        error: None,
                    };
                }
                Ok(body) => {
                    debug!(method = %method, bytes = body.len(), "Markup not usable; trying next method");
                    last_error = Some(FetchError::Unusable {
                        url: url.to_string(),
                    });
                }
                Err(e) => {
                    warn!(method = %method, error = %e, "Fetch method failed");
                    last_error = Some(e);
                }
            }
        }

        FetchAttempt {
            source_id: source.id().to_string(),
            url: url.to_string(),
            method: last,
            content: String::new(),
            error: last_error.map(|e| e.to_string()),
        }
    }

    async fn render(&self, source: &Source, url: &str) -> Result<String, FetchError> {
        let plan = &source.config.fetch;
        let request = RenderRequest {
            url,
            ready: &plan.ready,
            click: &plan.click,
            wait: Duration::from_millis(plan.wait_ms),
        };
        match tokio::time::timeout(self.render_timeout, self.renderer.render(&request)).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout {
                url: url.to_string(),
                elapsed: self.render_timeout,
            }),
        }
    }
}

/// Whether `body` contains what `source` needs to extract from.
pub fn usable(source: &Source, body: &str) -> bool {
    if body.trim().is_empty() {
        return false;
    }
    if source.ready.is_empty() {
        return true;
    }
    let document = Html::parse_document(body);
    source
        .ready
        .iter()
        .any(|sel| document.select(sel).next().is_some())
}
