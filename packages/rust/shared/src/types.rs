//! Core domain types for a discovery/analysis run.

use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

use crate::error::{LinkScoutError, Result};

// ---------------------------------------------------------------------------
// RunId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper identifying one pipeline run (time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub Uuid);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// Ordered, immutable set of free-text keywords.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeywordSet {
    terms: Vec<String>,
}

impl KeywordSet {
    /// Split a free-text keyword string on whitespace and commas.
    pub fn parse(input: &str) -> Result<Self> {
        let terms: Vec<String> = input
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect();

        if terms.is_empty() {
            return Err(LinkScoutError::validation("keywords are required"));
        }

        Ok(Self { terms })
    }

    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    /// Keywords joined by single spaces, as used in search queries and prompts.
    pub fn joined(&self) -> String {
        self.terms.join(" ")
    }

    /// Lowercased joined form for substring category matching.
    pub fn lowercase(&self) -> String {
        self.joined().to_lowercase()
    }
}

impl std::fmt::Display for KeywordSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.joined())
    }
}

/// The URL a placed backlink should point to. Validated, never dereferenced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TargetUrl(Url);

impl TargetUrl {
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(LinkScoutError::validation("target URL is required"));
        }
        let url = Url::parse(trimmed).map_err(|e| {
            LinkScoutError::validation(format!("invalid target URL '{trimmed}': {e}"))
        })?;
        match url.scheme() {
            "http" | "https" => Ok(Self(url)),
            other => Err(LinkScoutError::validation(format!(
                "target URL must be http(s), got scheme '{other}'"
            ))),
        }
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl std::fmt::Display for TargetUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.0.as_str())
    }
}

// ---------------------------------------------------------------------------
// DiscoveredPage
// ---------------------------------------------------------------------------

/// Where a candidate page came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageSource {
    Search,
    Curated,
}

/// A candidate page produced by the discovery stage. `url` is unique per run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveredPage {
    pub url: String,
    pub title: String,
    pub snippet: String,
    pub source: PageSource,
}

// ---------------------------------------------------------------------------
// PageSnapshot
// ---------------------------------------------------------------------------

/// The eight interactive-content signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signal {
    Comments,
    ContactForm,
    Forum,
    UserProfiles,
    LoginForm,
    Registration,
    ContentSubmission,
    SocialSharing,
}

impl Signal {
    pub const ALL: [Signal; 8] = [
        Signal::Comments,
        Signal::ContactForm,
        Signal::Forum,
        Signal::UserProfiles,
        Signal::LoginForm,
        Signal::Registration,
        Signal::ContentSubmission,
        Signal::SocialSharing,
    ];

    /// Wire name, matching the serialized [`InteractiveFeatures`] field.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Comments => "hasComments",
            Self::ContactForm => "hasContactForm",
            Self::Forum => "hasForum",
            Self::UserProfiles => "hasUserProfiles",
            Self::LoginForm => "hasLoginForm",
            Self::Registration => "hasRegistration",
            Self::ContentSubmission => "hasContentSubmission",
            Self::SocialSharing => "hasSocialSharing",
        }
    }
}

/// Boolean interactive-content signals detected on a page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractiveFeatures {
    pub has_comments: bool,
    pub has_contact_form: bool,
    pub has_forum: bool,
    pub has_user_profiles: bool,
    pub has_login_form: bool,
    pub has_registration: bool,
    pub has_content_submission: bool,
    pub has_social_sharing: bool,
}

impl InteractiveFeatures {
    pub fn get(&self, signal: Signal) -> bool {
        match signal {
            Signal::Comments => self.has_comments,
            Signal::ContactForm => self.has_contact_form,
            Signal::Forum => self.has_forum,
            Signal::UserProfiles => self.has_user_profiles,
            Signal::LoginForm => self.has_login_form,
            Signal::Registration => self.has_registration,
            Signal::ContentSubmission => self.has_content_submission,
            Signal::SocialSharing => self.has_social_sharing,
        }
    }

    pub fn set(&mut self, signal: Signal, value: bool) {
        let slot = match signal {
            Signal::Comments => &mut self.has_comments,
            Signal::ContactForm => &mut self.has_contact_form,
            Signal::Forum => &mut self.has_forum,
            Signal::UserProfiles => &mut self.has_user_profiles,
            Signal::LoginForm => &mut self.has_login_form,
            Signal::Registration => &mut self.has_registration,
            Signal::ContentSubmission => &mut self.has_content_submission,
            Signal::SocialSharing => &mut self.has_social_sharing,
        };
        *slot = value;
    }

    /// Signals that are set, in [`Signal::ALL`] order.
    pub fn detected(&self) -> Vec<Signal> {
        Signal::ALL.into_iter().filter(|s| self.get(*s)).collect()
    }
}

/// Rendered, extracted representation of one fetched page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageSnapshot {
    pub url: String,
    pub title: String,
    pub meta_description: String,
    /// H1 texts followed by H2 texts, document order within each level.
    pub headings: Vec<String>,
    /// Whitespace-normalized text, at most 5000 characters.
    pub main_content: String,
    pub interactive_features: InteractiveFeatures,
}

impl PageSnapshot {
    /// Placeholder snapshot carrying only discovery metadata, used when a fetch fails.
    pub fn placeholder(page: &DiscoveredPage) -> Self {
        Self {
            url: page.url.clone(),
            title: page.title.clone(),
            meta_description: page.snippet.clone(),
            ..Default::default()
        }
    }
}

// ---------------------------------------------------------------------------
// ClassificationVerdict
// ---------------------------------------------------------------------------

/// Estimated effort to place a backlink.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
    #[default]
    Unknown,
}

impl Difficulty {
    /// Lenient parse of free-form model output; anything unrecognized is `Unknown`.
    pub fn from_loose(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "easy" => Self::Easy,
            "medium" => Self::Medium,
            "hard" => Self::Hard,
            _ => Self::Unknown,
        }
    }
}

/// Structured judgement of whether a page is a backlink opportunity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationVerdict {
    pub is_opportunity: bool,
    /// 0 to 100.
    pub confidence: u8,
    pub reason: String,
    pub backlink_context: String,
    pub page_type: String,
    pub difficulty: Difficulty,
    pub recommended_action: String,
}

impl ClassificationVerdict {
    /// Zero-confidence verdict explaining why no real judgement was possible.
    pub fn failed(reason: impl Into<String>, recommended_action: impl Into<String>) -> Self {
        Self {
            is_opportunity: false,
            confidence: 0,
            reason: reason.into(),
            backlink_context: "N/A".into(),
            page_type: "unknown".into(),
            difficulty: Difficulty::Unknown,
            recommended_action: recommended_action.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// AnalysisResult / RunSummary
// ---------------------------------------------------------------------------

/// Outcome of analyzing one discovered page. Always carries a verdict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub discovery_info: DiscoveredPage,
    pub page_data: PageSnapshot,
    pub analysis: ClassificationVerdict,
    /// Raw classifier text, kept for audit when the classifier answered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_analysis: Option<String>,
}

/// Aggregate statistics for one run, computed once at the end.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    #[serde(rename = "discoveredPages")]
    pub discovered_count: usize,
    #[serde(rename = "totalAnalyzed")]
    pub analyzed_count: usize,
    #[serde(rename = "opportunitiesFound")]
    pub opportunity_count: usize,
    /// Mean confidence over all attempted results, degraded ones included.
    #[serde(rename = "averageConfidence")]
    pub average_confidence: u8,
}

impl RunSummary {
    pub fn compute(discovered_count: usize, results: &[AnalysisResult]) -> Self {
        let opportunity_count = results.iter().filter(|r| r.analysis.is_opportunity).count();
        let average_confidence = if results.is_empty() {
            0
        } else {
            let total: u32 = results.iter().map(|r| u32::from(r.analysis.confidence)).sum();
            (f64::from(total) / results.len() as f64).round() as u8
        };

        Self {
            discovered_count,
            analyzed_count: results.len(),
            opportunity_count,
            average_confidence,
        }
    }
}
