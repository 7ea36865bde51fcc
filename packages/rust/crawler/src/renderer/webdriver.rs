//! Browser rendering over WebDriver.
//!
//! Each render opens a fresh browser session and closes it before returning.
//! Sessions are never pooled or shared between runs.

use std::time::Duration;

use fantoccini::{Client, ClientBuilder};
use serde_json::{Map, Value, json};
use tracing::{debug, warn};

use linkscout_shared::{FetchError, FetcherConfig};

use super::{PageRenderer, RenderResult, RenderedPage, with_budget};

/// Renders pages in a real browser through a WebDriver server.
#[derive(Debug, Clone)]
pub struct WebDriverRenderer {
    webdriver_url: String,
    user_agent: String,
    headless: bool,
    settle: Duration,
}

impl WebDriverRenderer {
    pub fn new(config: &FetcherConfig) -> Self {
        Self {
            webdriver_url: config.webdriver_url.clone(),
            user_agent: config.user_agent.clone(),
            headless: config.headless,
            settle: config.settle,
        }
    }

    /// Session capabilities for Chrome and Firefox drivers; each ignores the other's block.
    fn capabilities(&self) -> Map<String, Value> {
        let mut chrome_args = vec![
            format!("--user-agent={}", self.user_agent),
            "--no-sandbox".to_string(),
            "--disable-dev-shm-usage".to_string(),
            "--disable-gpu".to_string(),
            "--window-size=1920,1080".to_string(),
        ];
        let mut firefox_args: Vec<String> = Vec::new();
        if self.headless {
            chrome_args.insert(0, "--headless=new".to_string());
            firefox_args.push("-headless".to_string());
        }

        let mut caps = Map::new();
        caps.insert("goog:chromeOptions".into(), json!({ "args": chrome_args }));
        caps.insert(
            "moz:firefoxOptions".into(),
            json!({
                "args": firefox_args,
                "prefs": { "general.useragent.override": self.user_agent },
            }),
        );
        caps
    }
}

impl PageRenderer for WebDriverRenderer {
    async fn render(&self, url: &str, budget: Duration) -> RenderResult {
        debug!(url, budget_ms = budget.as_millis() as u64, "rendering via webdriver");

        with_budget(url, budget, async {
            let session = BrowserSession::open(&self.webdriver_url, self.capabilities()).await?;
            let page = session.load(url, self.settle).await;
            session.close().await;
            page
        })
        .await
    }
}

// ---------------------------------------------------------------------------
// Session guard
// ---------------------------------------------------------------------------

/// Owns one WebDriver session.
///
/// `close` is the normal release path. If the guard is dropped without it
/// (error, timeout, cancellation) `Drop` schedules the close on the runtime.
/// Close failures are logged only, so they never mask the caller's error.
struct BrowserSession {
    client: Option<Client>,
    runtime: tokio::runtime::Handle,
}

impl BrowserSession {
    async fn open(
        webdriver_url: &str,
        caps: Map<String, Value>,
    ) -> std::result::Result<Self, FetchError> {
        let client = ClientBuilder::native()
            .capabilities(caps)
            .connect(webdriver_url)
            .await
            .map_err(|e| {
                FetchError::ResourceUnavailable(format!("WebDriver at {webdriver_url}: {e}"))
            })?;

        debug!(webdriver_url, "browser session opened");

        Ok(Self {
            client: Some(client),
            runtime: tokio::runtime::Handle::current(),
        })
    }

    async fn load(&self, url: &str, settle: Duration) -> RenderResult {
        let Some(client) = self.client.as_ref() else {
            return Err(FetchError::ResourceUnavailable(
                "browser session already closed".into(),
            ));
        };

        client
            .goto(url)
            .await
            .map_err(|e| FetchError::navigation(url, e.to_string()))?;

        // Give client-side scripts time to populate the DOM.
        if !settle.is_zero() {
            tokio::time::sleep(settle).await;
        }

        let html = client
            .source()
            .await
            .map_err(|e| FetchError::navigation(url, format!("reading page source: {e}")))?;

        let final_url = match client.current_url().await {
            Ok(current) => current.to_string(),
            Err(_) => url.to_string(),
        };

        Ok(RenderedPage {
            url: final_url,
            html,
        })
    }

    async fn close(mut self) {
        if let Some(client) = self.client.take() {
            match client.close().await {
                Ok(()) => debug!("browser session closed"),
                Err(e) => warn!(error = %e, "failed to close browser session"),
            }
        }
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        if let Some(client) = self.client.take() {
            self.runtime.spawn(async move {
                if let Err(e) = client.close().await {
                    warn!(error = %e, "browser session cleanup after abort failed");
                }
            });
        }
    }
}
