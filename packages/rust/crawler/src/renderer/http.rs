//! Plain HTTP rendering (no script execution).

use std::time::Duration;

use reqwest::Client;
use tracing::debug;

use linkscout_shared::{FetchError, LinkScoutError, Result};

use super::{PageRenderer, RenderResult, RenderedPage, with_budget};

/// Maximum number of redirects to follow.
const MAX_REDIRECTS: usize = 5;

/// Fetches raw HTML with a browser-like identity.
#[derive(Debug, Clone)]
pub struct HttpRenderer {
    client: Client,
}

impl HttpRenderer {
    pub fn new(user_agent: &str) -> Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .build()
            .map_err(|e| {
                LinkScoutError::from(FetchError::ResourceUnavailable(format!(
                    "failed to build HTTP client: {e}"
                )))
            })?;

        Ok(Self { client })
    }
}

impl PageRenderer for HttpRenderer {
    async fn render(&self, url: &str, budget: Duration) -> RenderResult {
        debug!(url, budget_ms = budget.as_millis() as u64, "rendering via http");

        with_budget(url, budget, async {
            let response = self
                .client
                .get(url)
                .send()
                .await
                .map_err(|e| request_error(url, budget, e))?;

            let status = response.status();
            if !status.is_success() {
                return Err(FetchError::navigation(url, format!("HTTP {status}")));
            }

            let final_url = response.url().to_string();
            let html = response
                .text()
                .await
                .map_err(|e| request_error(url, budget, e))?;

            Ok(RenderedPage {
                url: final_url,
                html,
            })
        })
        .await
    }
}

fn request_error(url: &str, budget: Duration, e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
            secs: budget.as_secs(),
        }
    } else {
        FetchError::navigation(url, e.to_string())
    }
}
