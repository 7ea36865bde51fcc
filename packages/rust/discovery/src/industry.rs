//! Industry profiles: keyword-triggered query phrases, relevance indicators,
//! and curated community sites.

use url::form_urlencoded;

use linkscout_shared::{DiscoveredPage, KeywordSet, PageSource};

/// A statically known candidate page.
///
/// `url` may contain `{q}` (URL-encoded keywords); `title` may contain
/// `{keywords}` (the keywords as typed).
#[derive(Debug)]
pub struct CuratedEntry {
    pub url: &'static str,
    pub title: &'static str,
    pub snippet: &'static str,
}

impl CuratedEntry {
    fn to_page(&self, keywords: &KeywordSet) -> DiscoveredPage {
        let joined = keywords.joined();
        DiscoveredPage {
            url: self.url.replace("{q}", &encode_component(&joined)),
            title: self.title.replace("{keywords}", &joined),
            snippet: self.snippet.to_string(),
            source: PageSource::Curated,
        }
    }
}

/// A case-insensitive keyword test that activates a profile.
///
/// Short tokens like `ui` or `dev` occur inside unrelated words ("luxus",
/// "device"), so they are matched against whole words only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// Contained anywhere in a keyword term.
    Stem(&'static str),
    /// A word of a term starts with it.
    Prefix(&'static str),
    /// A word of a term equals it.
    Word(&'static str),
}

impl Trigger {
    fn matches_term(self, term: &str) -> bool {
        let mut words = term.split(|c: char| !c.is_alphanumeric()).filter(|w| !w.is_empty());
        match self {
            Self::Stem(stem) => term.contains(stem),
            Self::Prefix(prefix) => words.any(|w| w.starts_with(prefix)),
            Self::Word(word) => words.any(|w| w == word),
        }
    }
}

#[derive(Debug)]
pub struct IndustryProfile {
    pub name: &'static str,
    pub triggers: &'static [Trigger],
    pub query_phrases: &'static [&'static str],
    /// Extra URL substrings that mark a search result as relevant.
    pub url_indicators: &'static [&'static str],
    pub curated: &'static [CuratedEntry],
}

impl IndustryProfile {
    pub fn matches(&self, keywords: &KeywordSet) -> bool {
        keywords.terms().iter().any(|term| {
            let term = term.to_lowercase();
            self.triggers.iter().any(|t| t.matches_term(&term))
        })
    }
}

pub const PROFILES: &[IndustryProfile] = &[
    IndustryProfile {
        name: "beauty",
        triggers: &[
            Trigger::Stem("kosmetik"),
            Trigger::Stem("hautpflege"),
            Trigger::Stem("beauty"),
            Trigger::Prefix("gold"),
        ],
        query_phrases: &[
            "kosmetik forum diskussion",
            "beauty blog gastautor",
            "hautpflege community",
            "luxuskosmetik forum",
            "schönheit blog kommentar",
        ],
        url_indicators: &["beauty", "kosmetik", "hautpflege"],
        curated: &[
            CuratedEntry {
                url: "https://www.beautyjunkies.de/forum/",
                title: "Beauty Junkies - Deutsches Beauty Forum",
                snippet: "Größtes deutschsprachiges Beauty-Forum mit aktiver Community",
            },
            CuratedEntry {
                url: "https://www.kosmetik-vegan.de/forum/",
                title: "Kosmetik Vegan Forum - Naturkosmetik Community",
                snippet: "Forum für vegane und natürliche Kosmetik mit Diskussionen",
            },
            CuratedEntry {
                url: "https://www.planet-liebe.de/forum/beauty-und-styling/",
                title: "Planet Liebe - Beauty und Styling Forum",
                snippet: "Community-Forum mit Beauty- und Styling-Diskussionen",
            },
            CuratedEntry {
                url: "https://www.mein-wahres-ich.de/community/",
                title: "Mein wahres Ich - Beauty Community",
                snippet: "Deutsche Beauty-Community mit Produktbewertungen",
            },
            CuratedEntry {
                url: "https://forum.glamour.de/",
                title: "Glamour Forum - Beauty und Mode",
                snippet: "Glamour Magazin Forum mit Beauty-Diskussionen",
            },
        ],
    },
    IndustryProfile {
        name: "tech",
        triggers: &[
            Trigger::Stem("programming"),
            Trigger::Stem("develop"),
            Trigger::Prefix("tech"),
            Trigger::Word("dev"),
        ],
        query_phrases: &[
            "developer forum",
            "programming blog guest post",
            "dev community write for us",
            "tech discussion board",
            "coding help forum",
        ],
        url_indicators: &["dev", "code", "stackoverflow", "hashnode"],
        curated: &[CuratedEntry {
            url: "https://dev.to/search?q={q}",
            title: "Dev.to - {keywords} discussions",
            snippet: "Developer community with articles and discussions",
        }],
    },
    IndustryProfile {
        name: "design",
        triggers: &[Trigger::Stem("design"), Trigger::Word("ui"), Trigger::Word("ux")],
        query_phrases: &[
            "design community portfolio",
            "ui ux forum",
            "design blog guest post",
            "designer netzwerk profil",
            "design critique forum",
        ],
        url_indicators: &["design", "dribbble", "behance"],
        curated: &[CuratedEntry {
            url: "https://dribbble.com/search/{q}",
            title: "Dribbble - {keywords} designs",
            snippet: "Design community with portfolios and discussions",
        }],
    },
];

/// Profiles triggered by `keywords`, in table order.
pub fn matching(keywords: &KeywordSet) -> impl Iterator<Item = &'static IndustryProfile> + '_ {
    PROFILES.iter().filter(move |p| p.matches(keywords))
}

/// Curated pages for every triggered profile.
pub fn curated_pages(keywords: &KeywordSet) -> Vec<DiscoveredPage> {
    matching(keywords)
        .flat_map(|p| p.curated.iter())
        .map(|entry| entry.to_page(keywords))
        .collect()
}

/// Percent-encode a path or query component, spaces as `%20`.
pub fn encode_component(s: &str) -> String {
    // form encoding emits '+' only for spaces; literal '+' becomes %2B
    form_urlencoded::byte_serialize(s.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kw(s: &str) -> KeywordSet {
        KeywordSet::parse(s).unwrap()
    }

    fn names(keywords: &str) -> Vec<&'static str> {
        matching(&kw(keywords)).map(|p| p.name).collect()
    }

    #[test]
    fn triggers_are_case_insensitive() {
        assert_eq!(names("Luxus HAUTPFLEGE"), vec!["beauty"]);
        assert_eq!(names("web development programming"), vec!["tech"]);
        assert_eq!(names("Goldschmuck"), vec!["beauty"]);
        assert!(names("gardening").is_empty());
    }

    #[test]
    fn short_triggers_need_whole_words() {
        assert!(names("device repair guide").is_empty());
        assert!(names("build tools").is_empty());
        assert_eq!(names("UI/UX portfolio"), vec!["design"]);
        assert_eq!(names("dev blog"), vec!["tech"]);
    }

    #[test]
    fn beauty_keywords_yield_curated_forums() {
        let pages = curated_pages(&kw("gold kosmetik"));
        assert_eq!(pages.len(), 5);
        assert!(pages.iter().all(|p| p.source == PageSource::Curated));
        assert_eq!(pages[0].url, "https://www.beautyjunkies.de/forum/");
    }

    #[test]
    fn templated_entries_encode_keywords() {
        let pages = curated_pages(&kw("web development programming"));
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].url, "https://dev.to/search?q=web%20development%20programming");
        assert_eq!(pages[0].title, "Dev.to - web development programming discussions");
    }

    #[test]
    fn encoding_keeps_plus_distinct_from_space() {
        assert_eq!(encode_component("c++ ui"), "c%2B%2B%20ui");
    }
}
