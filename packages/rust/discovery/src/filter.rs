//! Relevance filter for search hits.
//!
//! A hit is kept when its URL avoids the denylist and at least one
//! opportunity indicator matches. Matches are not scored: the first hit wins.

use linkscout_shared::KeywordSet;

use crate::industry;
use crate::parser::SearchHit;

/// URL substrings of platforms that are never backlink candidates.
const DENYLIST: &[&str] = &[
    "google.com",
    "youtube.com",
    "facebook.com",
    "twitter.com",
    "instagram.com",
    "pinterest.com",
    "amazon.",
    "ebay.",
];

/// URL substrings suggesting community or regional content.
const URL_INDICATORS: &[&str] = &[
    "forum",
    "community",
    "discuss",
    "blog",
    "reddit",
    ".de",
    ".at",
    ".ch",
];

/// Snippet vocabulary suggesting user participation.
const SNIPPET_INDICATORS: &[&str] = &[
    "login",
    "register",
    "anmelden",
    "registrieren",
    "kommentar",
    "forum",
    "diskussion",
    "bewertung",
    "erfahrung",
    "gastbeitrag",
    "mitglied",
];

#[derive(Debug, Clone)]
pub struct RelevanceFilter {
    denied_hosts: Vec<String>,
    url_indicators: Vec<&'static str>,
}

impl RelevanceFilter {
    /// Build a filter for `keywords`; `engine_host` (the search engine
    /// itself) is denied in addition to the static denylist.
    pub fn new(keywords: &KeywordSet, engine_host: Option<&str>) -> Self {
        let url_indicators = URL_INDICATORS
            .iter()
            .copied()
            .chain(industry::matching(keywords).flat_map(|p| p.url_indicators.iter().copied()))
            .collect();

        Self {
            denied_hosts: engine_host.map(str::to_lowercase).into_iter().collect(),
            url_indicators,
        }
    }

    pub fn is_denied(&self, url: &str) -> bool {
        let lower = url.to_lowercase();
        if DENYLIST.iter().any(|d| lower.contains(d)) {
            return true;
        }

        let Some(host) = url::Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_lowercase))
        else {
            return false;
        };
        self.denied_hosts
            .iter()
            .any(|denied| host == *denied || host.ends_with(&format!(".{denied}")))
    }

    /// Whether the hit carries any opportunity indicator.
    pub fn has_indicator(&self, hit: &SearchHit) -> bool {
        let url = hit.url.to_lowercase();
        let snippet = hit.snippet.to_lowercase();

        self.url_indicators.iter().any(|i| url.contains(i))
            || SNIPPET_INDICATORS.iter().any(|i| snippet.contains(i))
    }

    pub fn accepts(&self, hit: &SearchHit) -> bool {
        !self.is_denied(&hit.url) && self.has_indicator(hit)
    }
}
