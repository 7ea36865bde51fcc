//! Search-results page parsing.
//!
//! Handles the result markup of DuckDuckGo's script-rendered and HTML-only
//! pages, plus the generic `.result` containers most engines use.

use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};
use tracing::debug;
use url::Url;

static RESULT_SEL: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"article[data-testid="result"], .result, .web-result"#)
        .expect("result selector")
});

static TITLE_LINK_SEL: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"h2 a, h3 a, .result-title a, [data-testid="result-title-a"]"#)
        .expect("title selector")
});

static SNIPPET_SEL: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#".result-snippet, [data-testid="result-snippet"]"#).expect("snippet selector")
});

/// One organic search result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    pub url: String,
    pub title: String,
    pub snippet: String,
}

/// Parse at most `limit` result containers from a search page.
///
/// Containers without a resolvable title link are skipped but still count
/// toward the limit.
pub fn parse_results(html: &str, page_url: &Url, limit: usize) -> Vec<SearchHit> {
    let doc = Html::parse_document(html);

    let hits: Vec<SearchHit> = doc
        .select(&RESULT_SEL)
        .take(limit)
        .filter_map(|container| parse_container(container, page_url))
        .collect();

    debug!(hits = hits.len(), "parsed search results");
    hits
}

fn parse_container(container: ElementRef<'_>, page_url: &Url) -> Option<SearchHit> {
    let link = container.select(&TITLE_LINK_SEL).next()?;
    let href = link.value().attr("href")?.trim();
    if href.is_empty() {
        return None;
    }

    let url = resolve_result_url(href, page_url)?;
    let title = collapse(&link.text().collect::<String>());
    let snippet = container
        .select(&SNIPPET_SEL)
        .next()
        .map(|s| collapse(&s.text().collect::<String>()))
        .unwrap_or_default();

    Some(SearchHit {
        url,
        title,
        snippet,
    })
}

/// Resolve `href` against the search page and unwrap redirect links.
pub fn resolve_result_url(href: &str, page_url: &Url) -> Option<String> {
    let resolved = page_url.join(href).ok()?;

    // DuckDuckGo's HTML results route through /l/?uddg=<target>.
    if resolved.path() == "/l/" {
        if let Some((_, target)) = resolved.query_pairs().find(|(k, _)| k == "uddg") {
            return Url::parse(&target).ok().map(String::from);
        }
    }

    match resolved.scheme() {
        "http" | "https" => Some(resolved.into()),
        _ => None,
    }
}

fn collapse(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
