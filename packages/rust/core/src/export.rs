//! JSON export of a run for offline analysis.
//!
//! Discovered pages are enriched with categorical tags derived from URL and
//! snippet heuristics; analyzed pages are flattened and aggregated into
//! confidence-band metrics.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::info;

use linkscout_discovery::DiscoveryOutcome;
use linkscout_shared::{
    AnalysisResult, DiscoveredPage, KeywordSet, LinkScoutError, PageSource, PipelineConfig,
    Result, RunId, TargetUrl,
};

/// Lower bound of the high-confidence band.
pub const HIGH_CONFIDENCE: u8 = 70;
/// Lower bound of the medium-confidence band.
pub const MEDIUM_CONFIDENCE: u8 = 40;

const MAX_SLUG_CHARS: usize = 30;

static NON_ALNUM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-zA-Z0-9]").expect("slug regex"));

// ---------------------------------------------------------------------------
// Document
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument {
    pub keywords: String,
    pub target_url: String,
    pub timestamp: DateTime<Utc>,
    pub run_id: RunId,
    pub discovery_statistics: DiscoveryStatistics,
    pub discovered_pages: Vec<ExportedPage>,
    pub analyzed_pages: Vec<AnalyzedPage>,
    pub analysis_metrics: AnalysisMetrics,
    pub metadata: ExportMetadata,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveryStatistics {
    pub total_found: usize,
    /// `success`, or `partial` when some search queries failed.
    pub search_status: String,
    pub search_queries: usize,
    pub failed_queries: usize,
    pub max_results: usize,
    pub analysis_capacity: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportedPage {
    /// 1-based position in discovery order.
    pub id: usize,
    pub title: String,
    pub url: String,
    pub description: String,
    pub source: PageSource,
    pub discovery_method: String,
    pub potential_backlink_types: Vec<String>,
    pub target_market: TargetMarket,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetMarket {
    pub language: String,
    pub region: String,
    pub industry: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzedPage {
    pub url: String,
    pub success: bool,
    pub is_opportunity: bool,
    pub confidence: u8,
    pub page_type: String,
    pub difficulty: linkscout_shared::Difficulty,
    pub recommended_action: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisMetrics {
    pub german_sites_found: usize,
    pub beauty_specific_sites: usize,
    pub forum_opportunities: usize,
    pub blog_opportunities: usize,
    pub total_analyzed: usize,
    pub total_opportunities: usize,
    pub high_confidence: usize,
    pub medium_confidence: usize,
    pub low_confidence: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportMetadata {
    pub generated_by: String,
    pub version: String,
    pub export_format: String,
}

impl ExportDocument {
    /// Assemble the export for a run. `results` is empty for discovery-only exports.
    pub fn new(
        run_id: RunId,
        keywords: &KeywordSet,
        target: &TargetUrl,
        discovery: &DiscoveryOutcome,
        results: &[AnalysisResult],
        config: &PipelineConfig,
    ) -> Self {
        let pages = &discovery.pages;

        let search_status = if discovery.queries_failed == 0 { "success" } else { "partial" };

        let discovered_pages = pages
            .iter()
            .enumerate()
            .map(|(i, page)| ExportedPage {
                id: i + 1,
                title: non_empty_or(&page.title, "Untitled"),
                url: page.url.clone(),
                description: non_empty_or(&page.snippet, "No description available"),
                source: page.source,
                discovery_method: match page.source {
                    PageSource::Search => "Automated Search",
                    PageSource::Curated => "Curated Database",
                }
                .to_string(),
                potential_backlink_types: backlink_types(page)
                    .into_iter()
                    .map(str::to_string)
                    .collect(),
                target_market: target_market(page),
            })
            .collect();

        let analyzed_pages: Vec<AnalyzedPage> = results
            .iter()
            .map(|r| AnalyzedPage {
                url: r.discovery_info.url.clone(),
                success: r.success,
                is_opportunity: r.analysis.is_opportunity,
                confidence: r.analysis.confidence,
                page_type: r.analysis.page_type.clone(),
                difficulty: r.analysis.difficulty,
                recommended_action: r.analysis.recommended_action.clone(),
            })
            .collect();

        let analysis_metrics = AnalysisMetrics::compute(pages, &analyzed_pages);

        Self {
            keywords: keywords.joined(),
            target_url: target.to_string(),
            timestamp: Utc::now(),
            run_id,
            discovery_statistics: DiscoveryStatistics {
                total_found: pages.len(),
                search_status: search_status.to_string(),
                search_queries: discovery.queries_attempted,
                failed_queries: discovery.queries_failed,
                max_results: config.discovery.max_results,
                analysis_capacity: config.analysis_cap,
            },
            discovered_pages,
            analyzed_pages,
            analysis_metrics,
            metadata: ExportMetadata {
                generated_by: "LinkScout".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                export_format: "JSON".to_string(),
            },
        }
    }

    /// File name for this export.
    pub fn filename(&self) -> String {
        export_filename(&self.keywords, self.timestamp.date_naive())
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| LinkScoutError::parse(format!("failed to serialize export: {e}")))
    }

    /// Write the document into `dir` under [`filename`](Self::filename).
    pub fn write_to(&self, dir: &Path) -> Result<PathBuf> {
        std::fs::create_dir_all(dir).map_err(|e| LinkScoutError::io(dir, e))?;
        let path = dir.join(self.filename());
        std::fs::write(&path, self.to_json_pretty()?).map_err(|e| LinkScoutError::io(&path, e))?;

        info!(
            path = %path.display(),
            pages = self.discovered_pages.len(),
            analyzed = self.analyzed_pages.len(),
            "export written"
        );
        Ok(path)
    }
}

impl AnalysisMetrics {
    fn compute(pages: &[DiscoveredPage], analyzed: &[AnalyzedPage]) -> Self {
        let count = |pred: fn(&DiscoveredPage) -> bool| pages.iter().filter(|p| pred(p)).count();

        Self {
            german_sites_found: count(|p| is_german(&p.url)),
            beauty_specific_sites: count(is_beauty),
            forum_opportunities: count(|p| mentions(p, "forum")),
            blog_opportunities: count(|p| mentions(p, "blog")),
            total_analyzed: analyzed.len(),
            total_opportunities: analyzed.iter().filter(|a| a.is_opportunity).count(),
            high_confidence: analyzed.iter().filter(|a| a.confidence >= HIGH_CONFIDENCE).count(),
            medium_confidence: analyzed
                .iter()
                .filter(|a| (MEDIUM_CONFIDENCE..HIGH_CONFIDENCE).contains(&a.confidence))
                .count(),
            low_confidence: analyzed.iter().filter(|a| a.confidence < MEDIUM_CONFIDENCE).count(),
        }
    }
}

// ---------------------------------------------------------------------------
// Heuristic tags
// ---------------------------------------------------------------------------

fn backlink_types(page: &DiscoveredPage) -> Vec<&'static str> {
    let snippet = page.snippet.to_lowercase();
    let mut types = Vec::new();
    if page.url.contains("forum") {
        types.push("Forum Discussion");
    }
    if page.url.contains("blog") {
        types.push("Blog Comment");
    }
    if snippet.contains("gastbeitrag") {
        types.push("Guest Post");
    }
    if snippet.contains("kommentar") {
        types.push("User Comment");
    }
    if snippet.contains("bewertung") {
        types.push("User Review");
    }
    types
}

/// URL or title mentions `word`.
fn mentions(page: &DiscoveredPage, word: &str) -> bool {
    page.url.contains(word) || page.title.to_lowercase().contains(word)
}

fn is_german(url: &str) -> bool {
    [".de", ".at", ".ch"].iter().any(|tld| url.contains(tld))
}

fn is_beauty(page: &DiscoveredPage) -> bool {
    page.url.contains("beauty")
        || page.url.contains("kosmetik")
        || page.title.to_lowercase().contains("beauty")
}

fn target_market(page: &DiscoveredPage) -> TargetMarket {
    let url = &page.url;
    let region = if url.contains(".de") {
        "Germany"
    } else if url.contains(".at") {
        "Austria"
    } else if url.contains(".ch") {
        "Switzerland"
    } else {
        "Other"
    };

    TargetMarket {
        language: if is_german(url) { "German" } else { "International" }.to_string(),
        region: region.to_string(),
        industry: if is_beauty(page) { "Beauty/Cosmetics" } else { "General" }.to_string(),
    }
}

fn non_empty_or(s: &str, fallback: &str) -> String {
    if s.trim().is_empty() {
        fallback.to_string()
    } else {
        s.to_string()
    }
}

// ---------------------------------------------------------------------------
// File naming
// ---------------------------------------------------------------------------

/// Lowercased keywords with every non-alphanumeric replaced by `-`, at most 30 chars.
pub fn keyword_slug(keywords: &str) -> String {
    NON_ALNUM_RE
        .replace_all(keywords, "-")
        .to_lowercase()
        .chars()
        .take(MAX_SLUG_CHARS)
        .collect()
}

pub fn export_filename(keywords: &str, date: NaiveDate) -> String {
    format!(
        "backlink-opportunities-{}-{}.json",
        keyword_slug(keywords),
        date.format("%Y-%m-%d")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use linkscout_shared::{ClassificationVerdict, Difficulty, PageSnapshot, RunSummary};

    fn page(url: &str, title: &str, snippet: &str, source: PageSource) -> DiscoveredPage {
        DiscoveredPage {
            url: url.into(),
            title: title.into(),
            snippet: snippet.into(),
            source,
        }
    }

    fn result(page: &DiscoveredPage, confidence: u8, is_opportunity: bool) -> AnalysisResult {
        AnalysisResult {
            success: confidence > 0,
            error: None,
            discovery_info: page.clone(),
            page_data: PageSnapshot::placeholder(page),
            analysis: ClassificationVerdict {
                is_opportunity,
                confidence,
                reason: "r".into(),
                backlink_context: "c".into(),
                page_type: "forum".into(),
                difficulty: Difficulty::Medium,
                recommended_action: "register".into(),
            },
            raw_analysis: None,
        }
    }

    fn outcome() -> DiscoveryOutcome {
        DiscoveryOutcome {
            pages: vec![
                page(
                    "https://www.beautyjunkies.de/forum/",
                    "Beauty Junkies",
                    "Forum mit Kommentar und Bewertung",
                    PageSource::Curated,
                ),
                page("https://blog.example.at/post", "", "", PageSource::Search),
                page("https://dev.example.com/", "Dev Blog", "Gastbeitrag", PageSource::Search),
            ],
            queries_attempted: 8,
            queries_failed: 1,
        }
    }

    fn document(results: &[AnalysisResult]) -> ExportDocument {
        ExportDocument::new(
            RunId::new(),
            &KeywordSet::parse("gold kosmetik").unwrap(),
            &TargetUrl::parse("https://shop.example.de").unwrap(),
            &outcome(),
            results,
            &PipelineConfig::default(),
        )
    }

    #[test]
    fn total_opportunities_round_trips_through_json() {
        let pages = outcome().pages;
        let results = vec![
            result(&pages[0], 85, true),
            result(&pages[1], 0, false),
            result(&pages[2], 55, true),
        ];
        let summary = RunSummary::compute(pages.len(), &results);

        let json = document(&results).to_json_pretty().unwrap();
        let back: ExportDocument = serde_json::from_str(&json).unwrap();

        let rederived = back.analyzed_pages.iter().filter(|a| a.is_opportunity).count();
        assert_eq!(rederived, summary.opportunity_count);
        assert_eq!(back.analysis_metrics.total_opportunities, summary.opportunity_count);
    }

    #[test]
    fn metrics_bucket_confidence() {
        let pages = outcome().pages;
        let results = vec![
            result(&pages[0], 70, true),
            result(&pages[1], 40, false),
            result(&pages[2], 39, false),
        ];
        let metrics = document(&results).analysis_metrics;

        assert_eq!(metrics.high_confidence, 1);
        assert_eq!(metrics.medium_confidence, 1);
        assert_eq!(metrics.low_confidence, 1);
        assert_eq!(metrics.total_analyzed, 3);
        assert_eq!(metrics.german_sites_found, 2);
        assert_eq!(metrics.beauty_specific_sites, 1);
        assert_eq!(metrics.forum_opportunities, 1);
        assert_eq!(metrics.blog_opportunities, 2);
    }

    #[test]
    fn discovered_pages_are_tagged() {
        let doc = document(&[]);
        let first = &doc.discovered_pages[0];

        assert_eq!(first.id, 1);
        assert_eq!(first.discovery_method, "Curated Database");
        assert_eq!(
            first.potential_backlink_types,
            vec!["Forum Discussion", "User Comment", "User Review"]
        );
        assert_eq!(
            first.target_market,
            TargetMarket {
                language: "German".into(),
                region: "Germany".into(),
                industry: "Beauty/Cosmetics".into(),
            }
        );

        let second = &doc.discovered_pages[1];
        assert_eq!(second.title, "Untitled");
        assert_eq!(second.description, "No description available");
        assert_eq!(second.target_market.region, "Austria");

        let third = &doc.discovered_pages[2];
        assert_eq!(third.target_market.language, "International");
        assert_eq!(third.potential_backlink_types, vec!["Guest Post"]);

        assert_eq!(doc.discovery_statistics.search_status, "partial");
        assert_eq!(doc.discovery_statistics.search_queries, 8);
        assert!(doc.analyzed_pages.is_empty());
    }

    #[test]
    fn wire_names_are_camel_case() {
        let json = serde_json::to_value(document(&[])).unwrap();
        assert!(json["targetUrl"].is_string());
        assert!(json["discoveryStatistics"]["totalFound"].is_number());
        assert!(json["discoveredPages"][0]["potentialBacklinkTypes"].is_array());
        assert!(json["analysisMetrics"]["totalOpportunities"].is_number());
        assert_eq!(json["metadata"]["exportFormat"], "JSON");
    }

    #[test]
    fn filename_slug_is_sanitized_and_capped() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 9).unwrap();
        assert_eq!(
            export_filename("Gold Kosmetik", date),
            "backlink-opportunities-gold-kosmetik-2026-03-09.json"
        );

        let slug = keyword_slug("luxus hautpflege und kosmetik für anspruchsvolle haut");
        assert_eq!(slug.chars().count(), 30);
        assert!(slug.chars().all(|c| c.is_ascii_alphanumeric() || c == '-'));
    }

    #[test]
    fn write_to_creates_file() {
        let dir = std::env::temp_dir().join(format!("linkscout-export-{}", RunId::new()));
        let doc = document(&[]);
        let path = doc.write_to(&dir).unwrap();

        assert!(path.exists());
        assert_eq!(path.file_name().unwrap().to_str().unwrap(), doc.filename());
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
