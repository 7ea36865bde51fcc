//! End-to-end run: keywords → discovery → fetch + extract → classify → summary.
//!
//! Pages are analyzed strictly one after another. Each page's fetch and
//! classification run to their own timeouts before the next page starts,
//! and a per-page failure becomes a degraded result instead of an error.

use std::time::{Duration, Instant};

use tracing::{info, instrument, warn};
use url::Url;

use linkscout_crawler::{PageFetcher, PageRenderer, Renderer};
use linkscout_discovery::{Discovery, DiscoveryOutcome};
use linkscout_shared::{
    AnalysisResult, ClassificationVerdict, CrawlResponse, DiscoveredPage, DiscoveryResponse,
    KeywordSet, LinkScoutError, PipelineConfig, PipelineResponse, Result, RunId, RunSummary,
    TargetUrl,
};

use crate::classifier::{self, Classifier, OllamaClassifier};

/// Result of one complete run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_id: RunId,
    pub discovery: DiscoveryOutcome,
    /// One entry per analyzed page, in discovery order.
    pub results: Vec<AnalysisResult>,
    pub summary: RunSummary,
    pub elapsed: Duration,
}

impl RunReport {
    pub fn to_response(&self) -> PipelineResponse {
        PipelineResponse {
            success: true,
            results: self.results.clone(),
            summary: self.summary,
        }
    }
}

/// Progress callback for reporting run status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called before a page is analyzed.
    fn page_started(&self, url: &str, current: usize, total: usize);
    /// Called after a page has been analyzed, successfully or not.
    fn page_finished(&self, result: &AnalysisResult, current: usize, total: usize);
    /// Called when the run completes.
    fn done(&self, summary: &RunSummary);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn page_started(&self, _url: &str, _current: usize, _total: usize) {}
    fn page_finished(&self, _result: &AnalysisResult, _current: usize, _total: usize) {}
    fn done(&self, _summary: &RunSummary) {}
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// The discovery-crawl-analyze pipeline.
///
/// The renderer is cloned into the discovery stage and the page fetcher; it
/// holds configuration only, every render acquires its own resource.
pub struct Pipeline<R, C> {
    discovery: Discovery<R>,
    fetcher: PageFetcher<R>,
    classifier: C,
    analysis_cap: usize,
    inter_analysis_delay: Duration,
}

impl Pipeline<Renderer, OllamaClassifier> {
    /// Build the production pipeline from a validated config.
    pub fn from_config(config: &PipelineConfig) -> Result<Self> {
        config.validate()?;
        let renderer = Renderer::from_config(&config.fetcher)?;
        let classifier = OllamaClassifier::new(&config.classifier)?;
        Ok(Self::new(renderer, classifier, config))
    }
}

impl<R: PageRenderer + Clone, C: Classifier> Pipeline<R, C> {
    pub fn new(renderer: R, classifier: C, config: &PipelineConfig) -> Self {
        Self {
            discovery: Discovery::new(renderer.clone(), config.discovery.clone()),
            fetcher: PageFetcher::new(renderer, config.fetcher.page_timeout),
            classifier,
            analysis_cap: config.analysis_cap,
            inter_analysis_delay: config.inter_analysis_delay,
        }
    }

    /// Run discovery alone.
    pub async fn discover(
        &self,
        keywords: &KeywordSet,
        target: &TargetUrl,
    ) -> Result<DiscoveryOutcome> {
        self.discovery.discover(keywords, target).await
    }

    /// Run discovery alone and shape it as the discovery response.
    pub async fn search(
        &self,
        keywords: &KeywordSet,
        target: &TargetUrl,
    ) -> Result<DiscoveryResponse> {
        let outcome = self.discover(keywords, target).await?;
        Ok(DiscoveryResponse::new(outcome.pages))
    }

    /// Run the full pipeline.
    ///
    /// Only a discovery failure is returned as an error. Every discovered
    /// page up to the analysis cap yields exactly one [`AnalysisResult`].
    #[instrument(skip_all, fields(keywords = %keywords, target = %target))]
    pub async fn run(
        &self,
        keywords: &KeywordSet,
        target: &TargetUrl,
        progress: &dyn ProgressReporter,
    ) -> Result<RunReport> {
        let started = Instant::now();
        let run_id = RunId::new();
        info!(%run_id, analysis_cap = self.analysis_cap, "starting run");

        progress.phase("Discovering pages");
        let discovery = self.discover(keywords, target).await?;

        let batch: Vec<&DiscoveredPage> = discovery.pages.iter().take(self.analysis_cap).collect();
        let total = batch.len();
        info!(
            discovered = discovery.pages.len(),
            to_analyze = total,
            "discovery finished"
        );

        progress.phase("Analyzing pages");
        let mut results = Vec::with_capacity(total);
        for (i, page) in batch.into_iter().enumerate() {
            if i > 0 && !self.inter_analysis_delay.is_zero() {
                tokio::time::sleep(self.inter_analysis_delay).await;
            }

            progress.page_started(&page.url, i + 1, total);
            let result = self.analyze_page(page, keywords, target).await;
            progress.page_finished(&result, i + 1, total);
            results.push(result);
        }

        let summary = RunSummary::compute(discovery.pages.len(), &results);
        progress.done(&summary);

        let elapsed = started.elapsed();
        info!(
            %run_id,
            analyzed = summary.analyzed_count,
            opportunities = summary.opportunity_count,
            average_confidence = summary.average_confidence,
            elapsed_ms = elapsed.as_millis() as u64,
            "run complete"
        );

        Ok(RunReport {
            run_id,
            discovery,
            results,
            summary,
            elapsed,
        })
    }

    /// Fetch, extract and classify one discovered page. Never fails.
    #[instrument(skip_all, fields(url = %page.url))]
    pub async fn analyze_page(
        &self,
        page: &DiscoveredPage,
        keywords: &KeywordSet,
        target: &TargetUrl,
    ) -> AnalysisResult {
        let snapshot = match self.fetcher.fetch(&page.url).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(error = %e, "fetch failed, recording degraded result");
                return AnalysisResult {
                    success: false,
                    error: Some(e.to_string()),
                    discovery_info: page.clone(),
                    page_data: linkscout_shared::PageSnapshot::placeholder(page),
                    analysis: ClassificationVerdict::failed(
                        format!("Failed to analyze page: {e}"),
                        "Unable to analyze - try manually",
                    ),
                    raw_analysis: None,
                };
            }
        };

        let text = classifier::page_text(&snapshot);
        match self.classifier.classify(&text, keywords, target).await {
            Ok(classification) => AnalysisResult {
                success: true,
                error: None,
                discovery_info: page.clone(),
                page_data: snapshot,
                analysis: classification.verdict,
                raw_analysis: Some(classification.raw),
            },
            Err(e) => {
                warn!(error = %e, "classification failed, recording degraded result");
                AnalysisResult {
                    success: false,
                    error: Some(e.to_string()),
                    discovery_info: page.clone(),
                    page_data: snapshot,
                    analysis: ClassificationVerdict::failed(
                        format!("Analysis error: {e}"),
                        "Manual review required",
                    ),
                    raw_analysis: None,
                }
            }
        }
    }

    /// Fetch and classify a single URL. Unlike [`run`](Self::run), any
    /// failure is returned as an error.
    #[instrument(skip_all, fields(url = %url))]
    pub async fn crawl_page(
        &self,
        url: &str,
        keywords: &KeywordSet,
        target: &TargetUrl,
    ) -> Result<CrawlResponse> {
        validate_page_url(url)?;

        let snapshot = self.fetcher.fetch(url).await?;
        let classification = self
            .classifier
            .classify(&classifier::page_text(&snapshot), keywords, target)
            .await?;

        Ok(CrawlResponse {
            success: true,
            page_data: snapshot,
            analysis: classification.verdict,
            raw_analysis: classification.raw,
        })
    }
}

fn validate_page_url(url: &str) -> Result<()> {
    let parsed = Url::parse(url.trim())
        .map_err(|e| LinkScoutError::validation(format!("invalid page URL '{url}': {e}")))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(LinkScoutError::validation(format!(
            "page URL must be http(s), got scheme '{other}'"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use linkscout_crawler::{RenderResult, RenderedPage};
    use linkscout_shared::{ClassificationError, FetchError, Signal};

    use super::*;
    use crate::classifier::Classification;

    const SEARCH_HTML: &str = r#"<html><body>
        <div class="result"><h2><a href="https://forum-a.example.de/">A</a></h2></div>
        <div class="result"><h2><a href="https://forum-b.example.de/">B</a></h2></div>
        <div class="result"><h2><a href="https://broken-c.example.de/">C</a></h2></div>
        <div class="result"><h2><a href="https://slow-d.example.de/">D</a></h2></div>
    </body></html>"#;

    const VERDICT: &str = r#"Sure! {"isOpportunity": true, "confidence": 80, "reason": "open forum",
        "backlinkContext": "profile", "pageType": "forum", "difficulty": "easy",
        "recommendedAction": "register and post"}"#;

    /// Search engine plus a handful of sites, all in memory.
    struct FakeWeb {
        search_down: bool,
        fetched: Mutex<Vec<String>>,
    }

    impl FakeWeb {
        fn new() -> Self {
            Self {
                search_down: false,
                fetched: Mutex::new(Vec::new()),
            }
        }
    }

    impl PageRenderer for FakeWeb {
        async fn render(&self, url: &str, budget: Duration) -> RenderResult {
            if url.starts_with("https://search.example.org/") {
                if self.search_down {
                    return Err(FetchError::ResourceUnavailable("no route to host".into()));
                }
                return Ok(RenderedPage {
                    url: url.to_string(),
                    html: SEARCH_HTML.to_string(),
                });
            }

            self.fetched.lock().unwrap().push(url.to_string());
            if url.contains("slow") {
                return Err(FetchError::Timeout {
                    url: url.to_string(),
                    secs: budget.as_secs(),
                });
            }
            let title = if url.contains("broken") { "broken page" } else { "Community" };
            Ok(RenderedPage {
                url: url.to_string(),
                html: format!(
                    r#"<html><head><title>{title}</title></head>
                    <body><main>Forum</main><a href="/login">Login</a></body></html>"#
                ),
            })
        }
    }

    /// Answers with [`VERDICT`], except for pages titled "broken page".
    struct FakeModel;

    impl Classifier for FakeModel {
        async fn classify(
            &self,
            page_text: &str,
            _keywords: &KeywordSet,
            _target: &TargetUrl,
        ) -> std::result::Result<Classification, ClassificationError> {
            if page_text.contains("broken page") {
                return Err(ClassificationError::Unavailable("connection refused".into()));
            }
            Ok(Classification::from_raw(VERDICT))
        }
    }

    fn config(cap: usize) -> PipelineConfig {
        let mut config = PipelineConfig::default();
        config.discovery.search_url_template = "https://search.example.org/?q={query}".into();
        config.discovery.inter_query_delay = Duration::ZERO;
        config.inter_analysis_delay = Duration::ZERO;
        config.analysis_cap = cap;
        config
    }

    fn kw(s: &str) -> KeywordSet {
        KeywordSet::parse(s).unwrap()
    }

    fn target() -> TargetUrl {
        TargetUrl::parse("https://my-dev-blog.com").unwrap()
    }

    #[tokio::test]
    async fn result_count_is_min_of_cap_and_discovered() {
        let web = FakeWeb::new();

        let capped = Pipeline::new(&web, FakeModel, &config(2));
        let report = capped.run(&kw("gardening"), &target(), &SilentProgress).await.unwrap();
        assert_eq!(report.discovery.pages.len(), 4);
        assert_eq!(report.results.len(), 2);

        let roomy = Pipeline::new(&web, FakeModel, &config(10));
        let report = roomy.run(&kw("gardening"), &target(), &SilentProgress).await.unwrap();
        assert_eq!(report.results.len(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn analyses_are_spaced_by_the_delay_only_between_pages() {
        let web = FakeWeb::new();
        let mut cfg = config(10);
        cfg.inter_analysis_delay = Duration::from_secs(2);
        let pipeline = Pipeline::new(&web, FakeModel, &cfg);

        let started = tokio::time::Instant::now();
        let report = pipeline.run(&kw("gardening"), &target(), &SilentProgress).await.unwrap();
        let elapsed = started.elapsed();

        assert_eq!(report.results.len(), 4);
        // three gaps for four pages, including around failed pages
        assert!(elapsed >= Duration::from_secs(6), "{elapsed:?}");
        assert!(elapsed < Duration::from_secs(8), "{elapsed:?}");
    }

    #[tokio::test]
    async fn results_follow_discovery_order() {
        let web = FakeWeb::new();
        let pipeline = Pipeline::new(&web, FakeModel, &config(5));
        let report = pipeline.run(&kw("gardening"), &target(), &SilentProgress).await.unwrap();

        let discovered: Vec<&str> = report.discovery.pages.iter().map(|p| p.url.as_str()).collect();
        let analyzed: Vec<&str> = report
            .results
            .iter()
            .map(|r| r.discovery_info.url.as_str())
            .collect();
        assert_eq!(analyzed, discovered);
        assert_eq!(*web.fetched.lock().unwrap(), discovered);
    }

    #[tokio::test]
    async fn fetch_timeout_yields_all_false_features() {
        let web = FakeWeb::new();
        let pipeline = Pipeline::new(&web, FakeModel, &config(5));
        let report = pipeline.run(&kw("gardening"), &target(), &SilentProgress).await.unwrap();

        let slow = report
            .results
            .iter()
            .find(|r| r.discovery_info.url.contains("slow"))
            .unwrap();
        assert!(!slow.success);
        assert!(slow.error.as_deref().unwrap().contains("timed out"));
        assert!(Signal::ALL.iter().all(|s| !slow.page_data.interactive_features.get(*s)));
        assert_eq!(slow.analysis.confidence, 0);
        assert!(!slow.analysis.is_opportunity);

        let json = serde_json::to_value(slow).unwrap();
        assert_eq!(json["pageData"]["interactiveFeatures"]["hasForum"], false);
    }

    #[tokio::test]
    async fn classifier_failure_keeps_snapshot() {
        let web = FakeWeb::new();
        let pipeline = Pipeline::new(&web, FakeModel, &config(5));
        let report = pipeline.run(&kw("gardening"), &target(), &SilentProgress).await.unwrap();

        let broken = report
            .results
            .iter()
            .find(|r| r.discovery_info.url.contains("broken"))
            .unwrap();
        assert!(!broken.success);
        assert_eq!(broken.page_data.title, "broken page");
        assert!(broken.page_data.interactive_features.has_login_form);
        assert_eq!(broken.analysis.confidence, 0);
        assert!(broken.analysis.reason.starts_with("Analysis error"));
    }

    #[tokio::test]
    async fn summary_averages_over_degraded_results() {
        let web = FakeWeb::new();
        let pipeline = Pipeline::new(&web, FakeModel, &config(5));
        let report = pipeline.run(&kw("gardening"), &target(), &SilentProgress).await.unwrap();

        // two successes at 80, two degraded at 0
        assert_eq!(report.summary.analyzed_count, 4);
        assert_eq!(report.summary.opportunity_count, 2);
        assert_eq!(report.summary.average_confidence, 40);
        assert_eq!(report.summary.discovered_count, 4);
    }

    #[tokio::test]
    async fn search_outage_fails_the_run() {
        let web = FakeWeb {
            search_down: true,
            ..FakeWeb::new()
        };
        let pipeline = Pipeline::new(&web, FakeModel, &config(5));
        let err = pipeline
            .run(&kw("web development programming"), &target(), &SilentProgress)
            .await
            .unwrap_err();

        assert!(matches!(err, LinkScoutError::Upstream { .. }));
        assert!(web.fetched.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn web_development_scenario() {
        let web = FakeWeb::new();
        let pipeline = Pipeline::new(&web, FakeModel, &config(5));
        let report = pipeline
            .run(&kw("web development programming"), &target(), &SilentProgress)
            .await
            .unwrap();

        let response = serde_json::to_value(report.to_response()).unwrap();
        let results = response["results"].as_array().unwrap();

        assert_eq!(response["success"], true);
        assert!(results.len() <= 5);
        assert!(response["summary"]["discoveredPages"].as_u64().unwrap() >= results.len() as u64);
        assert!(results.iter().all(|r| r["analysis"].is_object()));
        // the curated dev.to entry is part of the run
        assert!(
            report
                .discovery
                .pages
                .iter()
                .any(|p| p.url.starts_with("https://dev.to/search"))
        );
    }

    #[tokio::test]
    async fn crawl_page_surfaces_errors() {
        let web = FakeWeb::new();
        let pipeline = Pipeline::new(&web, FakeModel, &config(5));

        let ok = pipeline
            .crawl_page("https://forum-a.example.de/", &kw("seo"), &target())
            .await
            .unwrap();
        assert!(ok.success);
        assert_eq!(ok.analysis.confidence, 80);
        assert_eq!(ok.raw_analysis, VERDICT);

        let invalid = pipeline.crawl_page("ftp://files.example.de", &kw("seo"), &target()).await;
        assert!(matches!(invalid, Err(LinkScoutError::Validation { .. })));

        let slow = pipeline
            .crawl_page("https://slow-d.example.de/", &kw("seo"), &target())
            .await;
        assert!(matches!(slow, Err(LinkScoutError::Fetch(FetchError::Timeout { .. }))));

        let broken = pipeline
            .crawl_page("https://broken-c.example.de/", &kw("seo"), &target())
            .await;
        assert!(matches!(broken, Err(LinkScoutError::Classification(_))));
    }

    #[test]
    fn production_pipeline_rejects_bad_config() {
        let mut config = PipelineConfig::default();
        config.discovery.search_url_template = "https://duckduckgo.com/".into();
        assert!(matches!(
            Pipeline::from_config(&config),
            Err(LinkScoutError::Config { .. })
        ));
    }
}
