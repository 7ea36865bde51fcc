//! Snapshot extraction from rendered HTML.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use linkscout_shared::PageSnapshot;

use crate::features;

/// A content candidate must exceed this many characters to be accepted.
pub const MIN_CONTENT_CHARS: usize = 100;

/// Extracted text is truncated to this many characters.
pub const MAX_CONTENT_CHARS: usize = 5000;

/// Content regions in priority order; `body` is the last resort.
const CONTENT_SELECTORS: [&str; 8] = [
    "main",
    "article",
    ".content",
    ".post-content",
    ".entry-content",
    "#content",
    ".container",
    "body",
];

/// Subtrees whose text is never page content.
const SKIPPED_TAGS: [&str; 4] = ["script", "style", "noscript", "template"];

static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace regex"));

static TITLE_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("title").expect("title selector"));

static META_DESC_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"meta[name="description"]"#).expect("meta selector"));

static H1_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("h1").expect("h1 selector"));

static H2_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("h2").expect("h2 selector"));

static CONTENT_SELS: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    CONTENT_SELECTORS
        .iter()
        .map(|s| Selector::parse(s).expect("content selector"))
        .collect()
});

/// Build a [`PageSnapshot`] from rendered HTML.
pub fn snapshot(html: &str, url: &str) -> PageSnapshot {
    let doc = Html::parse_document(html);

    PageSnapshot {
        url: url.to_string(),
        title: first_text(&doc, &TITLE_SEL),
        meta_description: meta_description(&doc),
        headings: headings(&doc),
        main_content: main_content(&doc),
        interactive_features: features::detect(&doc),
    }
}

fn first_text(doc: &Html, sel: &Selector) -> String {
    doc.select(sel)
        .next()
        .map(|el| normalize_whitespace(&el.text().collect::<String>()))
        .unwrap_or_default()
}

fn meta_description(doc: &Html) -> String {
    doc.select(&META_DESC_SEL)
        .next()
        .and_then(|el| el.value().attr("content"))
        .map(|c| c.trim().to_string())
        .unwrap_or_default()
}

/// Non-empty H1 texts followed by non-empty H2 texts.
fn headings(doc: &Html) -> Vec<String> {
    [&*H1_SEL, &*H2_SEL]
        .into_iter()
        .flat_map(|sel| doc.select(sel))
        .map(|el| normalize_whitespace(&visible_text(el)))
        .filter(|t| !t.is_empty())
        .collect()
}

/// Text of the first content region that is long enough to be real content.
fn main_content(doc: &Html) -> String {
    let mut content = String::new();

    for sel in CONTENT_SELS.iter() {
        let Some(el) = doc.select(sel).next() else {
            continue;
        };
        let text = normalize_whitespace(&visible_text(el));
        if text.is_empty() {
            continue;
        }
        content = text;
        if content.chars().count() > MIN_CONTENT_CHARS {
            break;
        }
    }

    truncate_chars(&content, MAX_CONTENT_CHARS)
}

/// Concatenated text nodes under `el`, skipping script-like subtrees.
fn visible_text(el: ElementRef<'_>) -> String {
    let mut out = String::new();
    for node in el.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node.ancestors().any(|a| {
            a.value()
                .as_element()
                .is_some_and(|e| SKIPPED_TAGS.contains(&e.name()))
        });
        if !hidden {
            out.push_str(text);
        }
    }
    out
}

/// Collapse every whitespace run into a single space and trim.
pub fn normalize_whitespace(s: &str) -> String {
    WHITESPACE_RE.replace_all(s, " ").trim().to_string()
}

/// Truncate to at most `max` characters without splitting a code point.
pub fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}
