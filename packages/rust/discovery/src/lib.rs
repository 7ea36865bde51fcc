//! Candidate-page discovery.
//!
//! Expands keywords into search queries, runs a bounded prefix of them
//! through a search engine one at a time, keeps relevant result links, adds
//! curated community sites for matching industries, and deduplicates.
//!
//! This crate provides:
//! - [`queries`] — deterministic query expansion
//! - [`industry`] — keyword-triggered industry profiles and curated entries
//! - [`parser`] — search-results page parsing
//! - [`filter`] — denylist plus opportunity-indicator relevance filter
//! - [`Discovery`] — the stage itself

pub mod filter;
pub mod industry;
pub mod parser;
pub mod queries;

use std::collections::HashMap;

use tracing::{debug, info, instrument, warn};
use url::Url;

use linkscout_crawler::PageRenderer;
use linkscout_shared::{
    DiscoveredPage, DiscoveryConfig, KeywordSet, LinkScoutError, PageSource, Result, TargetUrl,
};

pub use filter::RelevanceFilter;
pub use industry::{IndustryProfile, Trigger, curated_pages};
pub use parser::{SearchHit, parse_results};
pub use queries::generate_queries;

// ---------------------------------------------------------------------------
// DiscoveryOutcome
// ---------------------------------------------------------------------------

/// Pages found by one discovery run, plus query bookkeeping.
#[derive(Debug, Clone)]
pub struct DiscoveryOutcome {
    /// Deduplicated candidates, at most `max_results`.
    pub pages: Vec<DiscoveredPage>,
    /// Number of search queries sent.
    pub queries_attempted: usize,
    /// Number of those whose results page could not be fetched.
    pub queries_failed: usize,
}

// ---------------------------------------------------------------------------
// Discovery
// ---------------------------------------------------------------------------

/// The discovery stage over a page renderer.
#[derive(Debug, Clone)]
pub struct Discovery<R> {
    renderer: R,
    config: DiscoveryConfig,
}

impl<R: PageRenderer> Discovery<R> {
    pub fn new(renderer: R, config: DiscoveryConfig) -> Self {
        Self { renderer, config }
    }

    pub fn config(&self) -> &DiscoveryConfig {
        &self.config
    }

    /// Discover candidate pages for `keywords`.
    ///
    /// Individual query failures are logged and skipped. Only when every
    /// budgeted query fails is the search surface considered unreachable,
    /// which is reported as [`LinkScoutError::Upstream`].
    #[instrument(skip_all, fields(keywords = %keywords, target = %target))]
    pub async fn discover(
        &self,
        keywords: &KeywordSet,
        target: &TargetUrl,
    ) -> Result<DiscoveryOutcome> {
        let queries: Vec<String> = generate_queries(keywords)
            .into_iter()
            .take(self.config.query_budget)
            .collect();

        let engine_host = self.search_url("probe")?.host_str().map(str::to_string);
        let filter = RelevanceFilter::new(keywords, engine_host.as_deref());

        info!(
            queries = queries.len(),
            results_per_query = self.config.results_per_query,
            "starting discovery"
        );

        let mut found: Vec<DiscoveredPage> = Vec::new();
        let mut failed = 0usize;
        let mut last_error: Option<String> = None;

        for (i, query) in queries.iter().enumerate() {
            if i > 0 && !self.config.inter_query_delay.is_zero() {
                tokio::time::sleep(self.config.inter_query_delay).await;
            }

            match self.run_query(query, &filter).await {
                Ok(pages) => {
                    debug!(%query, kept = pages.len(), "query done");
                    found.extend(pages);
                }
                Err(e) => {
                    warn!(%query, error = %e, "search query failed, continuing");
                    failed += 1;
                    last_error = Some(e.to_string());
                }
            }
        }

        if !queries.is_empty() && failed == queries.len() {
            return Err(LinkScoutError::upstream(format!(
                "search surface unreachable: all {} queries failed (last: {})",
                failed,
                last_error.unwrap_or_default()
            )));
        }

        let curated = curated_pages(keywords);
        debug!(curated = curated.len(), "adding curated entries");
        found.extend(curated);

        let mut pages = dedup_last_wins(found);
        pages.truncate(self.config.max_results);

        info!(
            pages = pages.len(),
            queries_attempted = queries.len(),
            queries_failed = failed,
            "discovery complete"
        );

        Ok(DiscoveryOutcome {
            pages,
            queries_attempted: queries.len(),
            queries_failed: failed,
        })
    }

    async fn run_query(
        &self,
        query: &str,
        filter: &RelevanceFilter,
    ) -> Result<Vec<DiscoveredPage>> {
        let search_url = self.search_url(query)?;
        let page = self
            .renderer
            .render(search_url.as_str(), self.config.search_timeout)
            .await?;

        let base = Url::parse(&page.url).unwrap_or(search_url);
        let pages = parse_results(&page.html, &base, self.config.results_per_query)
            .into_iter()
            .filter(|hit| filter.accepts(hit))
            .map(|hit| DiscoveredPage {
                url: hit.url,
                title: hit.title,
                snippet: hit.snippet,
                source: PageSource::Search,
            })
            .collect();

        Ok(pages)
    }

    fn search_url(&self, query: &str) -> Result<Url> {
        let encoded: String = url::form_urlencoded::byte_serialize(query.as_bytes()).collect();
        let raw = self.config.search_url_template.replace("{query}", &encoded);
        Url::parse(&raw)
            .map_err(|e| LinkScoutError::config(format!("invalid search URL '{raw}': {e}")))
    }
}

/// Deduplicate by URL. A later duplicate replaces the earlier entry in place.
pub fn dedup_last_wins(pages: Vec<DiscoveredPage>) -> Vec<DiscoveredPage> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut out: Vec<DiscoveredPage> = Vec::with_capacity(pages.len());

    for page in pages {
        match index.get(&page.url) {
            Some(&i) => out[i] = page,
            None => {
                index.insert(page.url.clone(), out.len());
                out.push(page);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use linkscout_crawler::{HttpRenderer, RenderResult, RenderedPage};
    use linkscout_shared::FetchError;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    const RESULTS_HTML: &str = r#"<html><body>
        <div class="result"><h2><a href="https://garden-forum.de/t/1">Forum</a></h2>
            <div class="result-snippet">Mitglied werden</div></div>
        <div class="result"><h2><a href="https://www.youtube.com/watch?v=1">Video</a></h2></div>
        <div class="result"><h2><a href="https://shop.example.com/">Shop</a></h2>
            <div class="result-snippet">Samen kaufen</div></div>
        <div class="result"><h2><a href="https://blog.example.com/post">Blog</a></h2></div>
    </body></html>"#;

    fn config(budget: usize) -> DiscoveryConfig {
        DiscoveryConfig {
            query_budget: budget,
            results_per_query: 5,
            max_results: 20,
            inter_query_delay: Duration::ZERO,
            search_url_template: "https://search.example.org/?q={query}".into(),
            search_timeout: Duration::from_secs(5),
        }
    }

    fn kw(s: &str) -> KeywordSet {
        KeywordSet::parse(s).unwrap()
    }

    fn target() -> TargetUrl {
        TargetUrl::parse("https://my-garden.example.com").unwrap()
    }

    /// Serves [`RESULTS_HTML`], failing the calls whose index is in `fail`.
    struct ScriptedRenderer {
        calls: AtomicUsize,
        fail: Vec<usize>,
    }

    impl ScriptedRenderer {
        fn new(fail: Vec<usize>) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail,
            }
        }
    }

    impl PageRenderer for ScriptedRenderer {
        async fn render(&self, url: &str, _budget: Duration) -> RenderResult {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail.contains(&n) {
                return Err(FetchError::ResourceUnavailable("search engine down".into()));
            }
            Ok(RenderedPage {
                url: url.to_string(),
                html: RESULTS_HTML.to_string(),
            })
        }
    }

    #[tokio::test]
    async fn discovers_filters_and_dedups_over_http() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_string(RESULTS_HTML))
            .expect(3)
            .mount(&server)
            .await;

        let mut cfg = config(3);
        cfg.search_url_template = format!("{}/?q={{query}}", server.uri());
        let discovery = Discovery::new(HttpRenderer::new("test-agent").unwrap(), cfg);

        let outcome = discovery.discover(&kw("gardening"), &target()).await.unwrap();

        let urls: Vec<&str> = outcome.pages.iter().map(|p| p.url.as_str()).collect();
        assert_eq!(urls, vec!["https://garden-forum.de/t/1", "https://blog.example.com/post"]);
        assert_eq!(outcome.queries_attempted, 3);
        assert_eq!(outcome.queries_failed, 0);
    }

    #[tokio::test]
    async fn single_query_failure_does_not_stop_the_stage() {
        let renderer = ScriptedRenderer::new(vec![0, 2]);
        let discovery = Discovery::new(&renderer, config(4));

        let outcome = discovery.discover(&kw("gardening"), &target()).await.unwrap();

        assert_eq!(renderer.calls.load(Ordering::SeqCst), 4);
        assert_eq!(outcome.queries_attempted, 4);
        assert_eq!(outcome.queries_failed, 2);
        assert_eq!(outcome.pages.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn queries_are_spaced_by_the_delay_only_between_queries() {
        let renderer = ScriptedRenderer::new(vec![1]);
        let mut cfg = config(4);
        cfg.inter_query_delay = Duration::from_secs(3);
        let discovery = Discovery::new(&renderer, cfg);

        let started = tokio::time::Instant::now();
        discovery.discover(&kw("gardening"), &target()).await.unwrap();
        let elapsed = started.elapsed();

        assert_eq!(renderer.calls.load(Ordering::SeqCst), 4);
        // three gaps for four queries, none after the last
        assert!(elapsed >= Duration::from_secs(9), "{elapsed:?}");
        assert!(elapsed < Duration::from_secs(12), "{elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn single_query_has_no_delay() {
        let renderer = ScriptedRenderer::new(vec![]);
        let mut cfg = config(1);
        cfg.inter_query_delay = Duration::from_secs(3);
        let discovery = Discovery::new(&renderer, cfg);

        let started = tokio::time::Instant::now();
        discovery.discover(&kw("gardening"), &target()).await.unwrap();

        assert!(started.elapsed() < Duration::from_secs(3));
    }

    #[tokio::test]
    async fn total_outage_is_upstream_error() {
        let renderer = ScriptedRenderer::new((0..8).collect());
        let discovery = Discovery::new(&renderer, config(8));

        let err = discovery.discover(&kw("gold kosmetik"), &target()).await.unwrap_err();

        assert!(matches!(err, LinkScoutError::Upstream { .. }), "got {err:?}");
        assert_eq!(renderer.calls.load(Ordering::SeqCst), 8);
    }

    #[tokio::test]
    async fn zero_budget_returns_curated_only() {
        let renderer = ScriptedRenderer::new(vec![]);
        let discovery = Discovery::new(&renderer, config(0));

        let outcome = discovery.discover(&kw("gold kosmetik"), &target()).await.unwrap();

        assert_eq!(renderer.calls.load(Ordering::SeqCst), 0);
        assert_eq!(outcome.pages.len(), 5);
        assert!(outcome.pages.iter().all(|p| p.source == PageSource::Curated));
    }

    #[tokio::test]
    async fn output_is_unique_and_capped() {
        let renderer = ScriptedRenderer::new(vec![]);
        let mut cfg = config(8);
        cfg.max_results = 3;
        let discovery = Discovery::new(&renderer, cfg);

        let outcome = discovery.discover(&kw("gold kosmetik"), &target()).await.unwrap();

        assert_eq!(outcome.pages.len(), 3);
        let unique: HashSet<_> = outcome.pages.iter().map(|p| &p.url).collect();
        assert_eq!(unique.len(), outcome.pages.len());
    }

    #[tokio::test]
    async fn search_engine_host_is_denied() {
        struct SelfLinking;
        impl PageRenderer for SelfLinking {
            async fn render(&self, url: &str, _budget: Duration) -> RenderResult {
                Ok(RenderedPage {
                    url: url.to_string(),
                    html: r#"<div class="result"><h2><a href="/forum/help">Help forum</a></h2></div>"#
                        .into(),
                })
            }
        }

        let discovery = Discovery::new(SelfLinking, config(2));
        let outcome = discovery.discover(&kw("gardening"), &target()).await.unwrap();
        assert!(outcome.pages.is_empty());
    }

    #[test]
    fn dedup_keeps_first_position_with_last_value() {
        let page = |url: &str, title: &str, source| DiscoveredPage {
            url: url.into(),
            title: title.into(),
            snippet: String::new(),
            source,
        };
        let pages = dedup_last_wins(vec![
            page("https://a.de/", "first", PageSource::Search),
            page("https://b.de/", "b", PageSource::Search),
            page("https://a.de/", "curated", PageSource::Curated),
        ]);

        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].title, "curated");
        assert_eq!(pages[0].source, PageSource::Curated);
        assert_eq!(pages[1].url, "https://b.de/");
    }

    #[test]
    fn invalid_template_is_config_error() {
        let mut cfg = config(1);
        cfg.search_url_template = "not a url {query}".into();
        let discovery = Discovery::new(ScriptedRenderer::new(vec![]), cfg);
        assert!(matches!(
            discovery.search_url("x"),
            Err(LinkScoutError::Config { .. })
        ));
    }
}
