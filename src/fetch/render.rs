//! Slow path: headless rendering backends.
//!
//! - [`ChromeRenderer`] launches a local Chromium per call with a throwaway
//!   profile directory and captures `--dump-dom`. The child is killed if the
//!   call is dropped (for example by the caller's timeout) and the profile is
//!   removed on every exit path.
//! - [`BrowserlessRenderer`] posts to a remote Browserless `/content`
//!   endpoint, which supports readiness waits and a click trigger.

use super::{RenderRequest, Renderer};
use crate::config::RendererBackend;
use crate::error::FetchError;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Local Chromium, one process per render.
#[derive(Debug, Clone)]
pub struct ChromeRenderer {
    binary: String,
}

impl ChromeRenderer {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl Renderer for ChromeRenderer {
    async fn render(&self, request: &RenderRequest<'_>) -> Result<String, FetchError> {
        let url = request.url;
        let render_err = |message: String| FetchError::Render {
            url: url.to_string(),
            message,
        };

        let profile = tempfile::tempdir().map_err(|e| render_err(format!("temp profile: {e}")))?;
        if !request.click.is_empty() {
            debug!(url, "Chrome --dump-dom cannot click; capturing without interaction");
        }

        info!(url, renderer = "chrome", "Rendering page");
        let output = tokio::process::Command::new(&self.binary)
            .args([
                "--headless",
                "--no-sandbox",
                "--disable-gpu",
                "--disable-dev-shm-usage",
                &format!("--user-data-dir={}", profile.path().display()),
                &format!("--virtual-time-budget={}", request.wait.as_millis()),
                "--dump-dom",
                url,
            ])
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| render_err(format!("failed to launch {}: {e}", self.binary)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!(url, renderer = "chrome", stderr = %stderr, "Chrome exited with error");
            return Err(render_err(format!("chrome exited with {}", output.status)));
        }

        let html = String::from_utf8_lossy(&output.stdout).into_owned();
        info!(url, renderer = "chrome", bytes = html.len(), "Rendered");
        Ok(html)
    }
}

/// Remote Browserless instance.
#[derive(Debug, Clone)]
pub struct BrowserlessRenderer {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl BrowserlessRenderer {
    pub fn new(base_url: &str, token: Option<&str>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.map(String::from),
        })
    }

    fn endpoint(&self) -> String {
        match &self.token {
            Some(token) => format!("{}/content?token={}", self.base_url, urlencoding::encode(token)),
            None => format!("{}/content", self.base_url),
        }
    }

    /// Request body for `/content`.
    pub fn body(request: &RenderRequest<'_>) -> serde_json::Value {
        let mut body = json!({
            "url": request.url,
            "gotoOptions": { "waitUntil": "networkidle2" },
        });
        if !request.ready.is_empty() {
            body["waitForSelector"] = json!({
                "selector": request.ready.join(", "),
                "timeout": request.wait.as_millis().max(1000) as u64,
            });
        }
        if !request.click.is_empty() {
            body["addScriptTag"] = json!([{ "content": click_script(request.click) }]);
        }
        if !request.wait.is_zero() {
            body["waitForTimeout"] = json!(request.wait.as_millis() as u64);
        }
        body
    }
}

/// Script clicking the first element matching any of `selectors`.
fn click_script(selectors: &[String]) -> String {
    let list = serde_json::Value::from(selectors.to_vec());
    format!(
        "(() => {{ for (const s of {list}) {{ const el = document.querySelector(s); if (el) {{ el.click(); break; }} }} }})();"
    )
}

impl Renderer for BrowserlessRenderer {
    async fn render(&self, request: &RenderRequest<'_>) -> Result<String, FetchError> {
        let url = request.url;
        info!(url, renderer = "browserless", "Rendering page");

        let resp = self
            .client
            .post(self.endpoint())
            .json(&Self::body(request))
            .send()
            .await
            .map_err(|e| FetchError::Render {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(FetchError::Render {
                url: url.to_string(),
                message: format!("browserless returned {status}: {message}"),
            });
        }

        let html = resp.text().await.map_err(|e| FetchError::Render {
            url: url.to_string(),
            message: e.to_string(),
        })?;
        info!(url, renderer = "browserless", bytes = html.len(), "Rendered");
        Ok(html)
    }
}

/// The backend picked at startup.
#[derive(Debug, Clone)]
pub enum AnyRenderer {
    None,
    Chrome(ChromeRenderer),
    Browserless(BrowserlessRenderer),
}

impl AnyRenderer {
    pub fn from_backend(backend: &RendererBackend, timeout: Duration) -> Result<Self, reqwest::Error> {
        Ok(match backend {
            RendererBackend::None => AnyRenderer::None,
            RendererBackend::Chrome { binary } => AnyRenderer::Chrome(ChromeRenderer::new(binary)),
            RendererBackend::Browserless { url, token } => AnyRenderer::Browserless(
                BrowserlessRenderer::new(url, token.as_deref(), timeout)?,
            ),
        })
    }
}

impl Renderer for AnyRenderer {
    async fn render(&self, request: &RenderRequest<'_>) -> Result<String, FetchError> {
        match self {
            AnyRenderer::None => Err(FetchError::NoRenderer),
            AnyRenderer::Chrome(r) => r.render(request).await,
            AnyRenderer::Browserless(r) => r.render(request).await,
        }
    }
}
