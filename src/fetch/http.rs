//! Fast path: a shared, connection-pooled reqwest client.

use super::PageClient;
use crate::config::HttpSettings;
use crate::error::FetchError;
use reqwest::header::{
    ACCEPT, ACCEPT_LANGUAGE, CACHE_CONTROL, HeaderMap, HeaderValue, PRAGMA, REFERER, USER_AGENT,
};
use std::time::Duration;
use tracing::{debug, warn};

const ACCEPT_HTML: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

/// Browser-like HTTP client shared read-only by every worker.
#[derive(Debug, Clone)]
pub struct HttpClient {
    inner: reqwest::Client,
    timeout: Duration,
}

impl HttpClient {
    pub fn new(settings: &HttpSettings) -> Result<Self, reqwest::Error> {
        Self::with_timeout(settings, Duration::from_secs(settings.timeout_secs))
    }

    pub fn with_timeout(settings: &HttpSettings, timeout: Duration) -> Result<Self, reqwest::Error> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_HTML));
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
        headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));
        for (name, value) in [
            (USER_AGENT, settings.user_agent.as_str()),
            (ACCEPT_LANGUAGE, settings.accept_language.as_str()),
        ] {
            match HeaderValue::from_str(value) {
                Ok(v) => {
                    headers.insert(name, v);
                }
                Err(e) => warn!(header = %name, error = %e, "Ignoring invalid header value"),
            }
        }

        let inner = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .gzip(true)
            .build()?;
        Ok(Self { inner, timeout })
    }
}

impl PageClient for HttpClient {
    async fn get(&self, url: &str, referer: Option<&str>) -> Result<String, FetchError> {
        let mut request = self.inner.get(url);
        if let Some(referer) = referer {
            request = request.header(REFERER, referer);
        }

        let resp = request
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e, self.timeout))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = resp
            .text()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e, self.timeout))?;
        debug!(url, bytes = body.len(), "HTTP GET ok");
        Ok(body)
    }
}
