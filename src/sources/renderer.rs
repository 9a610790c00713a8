use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use spider_client::shapes::request::{ReturnFormat, ReturnFormatHandling};
use spider_client::{RequestParams, Spider};
use tracing::{debug, info, warn};

/// Anything that can turn a URL into fully rendered HTML.
#[async_trait]
pub trait PageRenderer: Send + Sync {
    async fn render(&self, url: &str) -> Result<String>;

    /// End of use. Renderers holding a remote session release it here.
    fn finish(self)
    where
        Self: Sized,
    {
    }
}

/// A rendering session backed by spider.cloud. It is opened once per
/// extraction, lent by reference to every page fetch, and closed when the
/// extraction finishes. Dropping it without `close` still releases the
/// client; the early exit is logged.
pub struct RenderSession {
    spider: Spider,
    rendered: AtomicUsize,
    closed: bool,
}

impl RenderSession {
    pub fn open(api_key: &str) -> Result<Self> {
        let spider = Spider::new(Some(api_key.to_string()))
            .map_err(|e| anyhow!("Failed to create Spider client: {}", e))?;
        debug!("Render session opened");
        Ok(RenderSession {
            spider,
            rendered: AtomicUsize::new(0),
            closed: false,
        })
    }

    pub fn rendered(&self) -> usize {
        self.rendered.load(Ordering::Relaxed)
    }

    pub fn close(mut self) {
        self.closed = true;
        info!("Render session closed after {} pages", self.rendered());
    }
}

impl Drop for RenderSession {
    fn drop(&mut self) {
        if !self.closed {
            warn!(
                "Render session released without close after {} pages",
                self.rendered()
            );
        }
    }
}

#[async_trait]
impl PageRenderer for RenderSession {
    async fn render(&self, url: &str) -> Result<String> {
        let params = RequestParams {
            return_format: Some(ReturnFormatHandling::Single(ReturnFormat::Raw)),
            ..Default::default()
        };

        let response = self
            .spider
            .scrape_url(url, Some(params), "application/json")
            .await
            .map_err(|e| anyhow!("Spider scrape failed: {}", e))?;
        self.rendered.fetch_add(1, Ordering::Relaxed);

        let (content, status) = first_page(response);
        if let Some(status) = status.filter(|s| *s != 200) {
            bail!("{} rendered with status {}", url, status);
        }
        content.ok_or_else(|| anyhow!("No content in spider response for {}", url))
    }

    fn finish(self) {
        self.close();
    }
}

/// Spider answers with a one-element array (sometimes JSON-encoded as a
/// string) holding `content` and `status`.
fn first_page(response: serde_json::Value) -> (Option<String>, Option<i64>) {
    let parsed: serde_json::Value = match response.as_str() {
        Some(s) => serde_json::from_str(s).unwrap_or(response.clone()),
        None => response,
    };
    let first = parsed.as_array().and_then(|arr| arr.first());
    let content = first
        .and_then(|obj| obj.get("content"))
        .and_then(|c| c.as_str())
        .map(String::from);
    let status = first
        .and_then(|obj| obj.get("status"))
        .and_then(|s| s.as_i64());
    (content, status)
}

// ── Tests ──
