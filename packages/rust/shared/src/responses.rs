//! Request/response shapes for the pipeline surfaces.
//!
//! These are what the CLI prints; field names follow the JSON contract
//! (camelCase, `success` flag on every response).

use serde::{Deserialize, Serialize};

use crate::error::LinkScoutError;
use crate::types::{
    AnalysisResult, ClassificationVerdict, DiscoveredPage, PageSnapshot, RunSummary,
};

/// Output of the discovery stage alone.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveryResponse {
    pub success: bool,
    pub discovered_pages: Vec<DiscoveredPage>,
    pub total_found: usize,
}

impl DiscoveryResponse {
    pub fn new(discovered_pages: Vec<DiscoveredPage>) -> Self {
        Self {
            success: true,
            total_found: discovered_pages.len(),
            discovered_pages,
        }
    }
}

/// Output of fetching and classifying a single page.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlResponse {
    pub success: bool,
    pub page_data: PageSnapshot,
    pub analysis: ClassificationVerdict,
    pub raw_analysis: String,
}

/// Output of classifying caller-supplied page content.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeResponse {
    pub success: bool,
    pub analysis: ClassificationVerdict,
    pub raw_response: String,
}

/// Output of a full discover → fetch → classify run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineResponse {
    pub success: bool,
    pub results: Vec<AnalysisResult>,
    pub summary: RunSummary,
}

/// Top-level failure. Never carries partial results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    pub details: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
            details: details.into(),
        }
    }

    /// Build a failure response from an error, with a surface-specific headline.
    pub fn from_error(headline: &str, err: &LinkScoutError) -> Self {
        Self::new(format!("{headline} ({})", err.kind()), err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_response_shape() {
        let err = LinkScoutError::upstream("search surface unreachable");
        let resp = ErrorResponse::from_error("Failed to discover pages", &err);
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "Failed to discover pages (upstream)");
        assert!(json["details"].as_str().unwrap().contains("unreachable"));
        assert!(json.get("discoveredPages").is_none());
    }

    #[test]
    fn discovery_response_counts_pages() {
        let resp = DiscoveryResponse::new(vec![]);
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["totalFound"], 0);
        assert_eq!(json["success"], true);
    }
}
