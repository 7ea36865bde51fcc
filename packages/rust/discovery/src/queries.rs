//! Search-query expansion.
//!
//! A keyword set is crossed with every opportunity-category phrase, in a
//! fixed category order, followed by the phrases of any industry profile the
//! keywords trigger. Generation is a pure function of the keyword set.

use linkscout_shared::KeywordSet;

use crate::industry;

/// One opportunity category and its query phrases.
#[derive(Debug)]
pub struct Category {
    pub name: &'static str,
    pub phrases: &'static [&'static str],
}

/// Mandatory categories, in generation order.
pub const BASE_CATEGORIES: &[Category] = &[
    Category {
        name: "forum",
        phrases: &[
            "forum diskussion anmelden registrieren",
            "community forum mitglied werden",
            r#""forum beitrag" "kommentar schreiben""#,
            "diskussionsforum login register",
            "forum community discussion",
        ],
    },
    Category {
        name: "blog",
        phrases: &[
            "blog gastbeitrag schreiben",
            r#""guest post" "gastautor werden""#,
            "blog kommentare login",
            r#""blogger werden" "artikel schreiben""#,
            r#""blog beitrag" "kommentar hinterlassen""#,
        ],
    },
    Category {
        name: "directory",
        phrases: &[
            "linkverzeichnis eintrag kostenlos",
            r#""link exchange" "linkpartner""#,
            "verzeichnis eintragen kostenlos",
            r#""backlink tausch" "link tausch""#,
            "webkatalog eintrag submit",
        ],
    },
    Category {
        name: "reviews",
        phrases: &[
            "bewertung schreiben login",
            "erfahrungsbericht schreiben",
            r#""nutzer bewertung" registrieren"#,
            "testbericht verfassen",
            r#""user review" "account erstellen""#,
        ],
    },
    Category {
        name: "professional",
        phrases: &[
            "xing profil erstellen",
            "linkedin artikel schreiben",
            "business netzwerk profil",
            "fachmagazin gastbeitrag",
            "expertennetzwerk anmelden",
        ],
    },
    Category {
        name: "qa",
        phrases: &[
            "frage antwort portal",
            r#""fragen stellen" registrierung"#,
            "hilfe forum anmelden",
            "ratgeber community",
            "expertentipps forum",
        ],
    },
];

/// Expand `keywords` into the full ordered query sequence.
pub fn generate_queries(keywords: &KeywordSet) -> Vec<String> {
    let base = keywords.joined();

    let base_phrases = BASE_CATEGORIES.iter().flat_map(|c| c.phrases.iter());
    let industry_phrases = industry::matching(keywords).flat_map(|p| p.query_phrases.iter());

    base_phrases
        .chain(industry_phrases)
        .map(|phrase| format!("{base} {phrase}"))
        .collect()
}
