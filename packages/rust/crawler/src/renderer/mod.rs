//! Page renderers: the capability of turning a URL into rendered HTML.
//!
//! Every call acquires its own rendering resource and releases it before
//! returning, and is bounded by a hard wall-clock budget. Two backends exist:
//! a real browser driven over WebDriver, and a plain HTTP client.

mod http;
mod webdriver;

use std::future::Future;
use std::time::Duration;

use linkscout_shared::{FetchError, FetcherBackend, FetcherConfig, Result};

pub use http::HttpRenderer;
pub use webdriver::WebDriverRenderer;

/// Result of a single render call.
pub type RenderResult = std::result::Result<RenderedPage, FetchError>;

/// HTML of a page after client-side rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPage {
    /// Final URL after redirects.
    pub url: String,
    pub html: String,
}

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Something that can render a page within a time budget.
pub trait PageRenderer: Send + Sync {
    /// Render `url`. Expiry of `budget` yields [`FetchError::Timeout`].
    fn render(&self, url: &str, budget: Duration) -> impl Future<Output = RenderResult> + Send;
}

impl<T: PageRenderer> PageRenderer for &T {
    fn render(&self, url: &str, budget: Duration) -> impl Future<Output = RenderResult> + Send {
        (**self).render(url, budget)
    }
}

/// Run `fut` under a hard wall-clock budget.
///
/// Dropping `fut` on expiry drops whatever resource guard it holds, which
/// triggers that guard's release path.
pub(crate) async fn with_budget<F>(url: &str, budget: Duration, fut: F) -> RenderResult
where
    F: Future<Output = RenderResult>,
{
    match tokio::time::timeout(budget, fut).await {
        Ok(result) => result,
        Err(_) => Err(FetchError::Timeout {
            url: url.to_string(),
            secs: budget.as_secs(),
        }),
    }
}

// ---------------------------------------------------------------------------
// Backend selection
// ---------------------------------------------------------------------------

/// Renderer chosen at runtime from [`FetcherConfig::backend`].
#[derive(Debug, Clone)]
pub enum Renderer {
    WebDriver(WebDriverRenderer),
    Http(HttpRenderer),
}

impl Renderer {
    pub fn from_config(config: &FetcherConfig) -> Result<Self> {
        match config.backend {
            FetcherBackend::Webdriver => Ok(Self::WebDriver(WebDriverRenderer::new(config))),
            FetcherBackend::Http => Ok(Self::Http(HttpRenderer::new(&config.user_agent)?)),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::WebDriver(_) => "webdriver",
            Self::Http(_) => "http",
        }
    }
}

impl PageRenderer for Renderer {
    async fn render(&self, url: &str, budget: Duration) -> RenderResult {
        match self {
            Self::WebDriver(r) => r.render(url, budget).await,
            Self::Http(r) => r.render(url, budget).await,
        }
    }
}
