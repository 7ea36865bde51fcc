//! Page fetching: render a URL and reduce it to a [`PageSnapshot`].
//!
//! The fetcher owns the per-call budget; the renderer owns the browser or
//! HTTP resource. A failed fetch never leaves a resource behind.

use std::time::Duration;

use tracing::{debug, instrument, warn};

use linkscout_shared::{FetchError, PageSnapshot};

use crate::extract;
use crate::renderer::PageRenderer;

/// Renders and extracts pages with a fixed default budget.
#[derive(Debug, Clone)]
pub struct PageFetcher<R> {
    renderer: R,
    timeout: Duration,
}

impl<R: PageRenderer> PageFetcher<R> {
    pub fn new(renderer: R, timeout: Duration) -> Self {
        Self { renderer, timeout }
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    /// Default per-page budget.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Fetch `url` within the default budget.
    pub async fn fetch(&self, url: &str) -> Result<PageSnapshot, FetchError> {
        self.fetch_with_budget(url, self.timeout).await
    }

    /// Fetch `url` within an explicit budget.
    ///
    /// The snapshot keeps the requested URL, not the post-redirect one, so
    /// results can be matched back to their discovery entries.
    #[instrument(skip_all, fields(url = %url, budget_ms = budget.as_millis() as u64))]
    pub async fn fetch_with_budget(
        &self,
        url: &str,
        budget: Duration,
    ) -> Result<PageSnapshot, FetchError> {
        let started = std::time::Instant::now();

        let page = match self.renderer.render(url, budget).await {
            Ok(page) => page,
            Err(e) => {
                warn!(error = %e, "page fetch failed");
                return Err(e);
            }
        };

        if page.url != url {
            debug!(final_url = %page.url, "followed redirect");
        }

        let snapshot = extract::snapshot(&page.html, url);

        debug!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            content_chars = snapshot.main_content.chars().count(),
            signals = snapshot.interactive_features.detected().len(),
            "page extracted"
        );

        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::{RenderResult, RenderedPage};

    /// Serves canned HTML, or fails the way a real backend would.
    struct StubRenderer {
        html: Option<&'static str>,
    }

    impl PageRenderer for StubRenderer {
        async fn render(&self, url: &str, budget: Duration) -> RenderResult {
            match self.html {
                Some(html) => Ok(RenderedPage {
                    url: format!("{url}?redirected=1"),
                    html: html.to_string(),
                }),
                None => Err(FetchError::Timeout {
                    url: url.to_string(),
                    secs: budget.as_secs(),
                }),
            }
        }
    }

    #[tokio::test]
    async fn fetch_extracts_snapshot_for_requested_url() {
        let fetcher = PageFetcher::new(
            StubRenderer {
                html: Some(
                    r#"<html><head><title>Kosmetik Forum</title></head>
                    <body><h1>Forum</h1><a href="/login">Login</a></body></html>"#,
                ),
            },
            Duration::from_secs(30),
        );

        let snap = fetcher.fetch("https://forum.example.de/").await.unwrap();
        assert_eq!(snap.url, "https://forum.example.de/");
        assert_eq!(snap.title, "Kosmetik Forum");
        assert_eq!(snap.headings, vec!["Forum"]);
        assert!(snap.interactive_features.has_login_form);
    }

    #[tokio::test]
    async fn fetch_propagates_renderer_error() {
        let fetcher = PageFetcher::new(StubRenderer { html: None }, Duration::from_secs(7));
        let err = fetcher.fetch("https://slow.example.de/").await.unwrap_err();
        assert_eq!(
            err,
            FetchError::Timeout {
                url: "https://slow.example.de/".into(),
                secs: 7,
            }
        );
    }

    #[tokio::test]
    async fn explicit_budget_overrides_default() {
        let fetcher = PageFetcher::new(StubRenderer { html: None }, Duration::from_secs(30));
        let err = fetcher
            .fetch_with_budget("https://slow.example.de/", Duration::from_secs(3))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Timeout { secs: 3, .. }));
    }

    #[tokio::test]
    async fn fetcher_works_through_a_borrowed_renderer() {
        let stub = StubRenderer {
            html: Some("<html><body><p>x</p></body></html>"),
        };
        let fetcher = PageFetcher::new(&stub, Duration::from_secs(1));
        assert!(fetcher.fetch("https://a.example.de/").await.is_ok());
    }
}
