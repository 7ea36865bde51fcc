//! Interactive-content signal detection.
//!
//! Each signal is a disjunction of structural probes over the rendered DOM,
//! kept as a data table ([`RULES`]) and evaluated uniformly. Signals are
//! independent; a page may have any subset. False positives are expected:
//! the result is auxiliary input for the classifier, not ground truth.

use std::collections::HashMap;
use std::sync::LazyLock;

use scraper::{Html, Selector};
use tracing::warn;

use linkscout_shared::{InteractiveFeatures, Signal};

/// One structural test against the DOM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Probe {
    /// Any element matching a raw CSS selector.
    Css(&'static str),
    /// Any element whose `class` attribute contains the pattern.
    ClassContains(&'static str),
    /// Any element whose `id` attribute contains the pattern.
    IdContains(&'static str),
    /// Any element whose `href` attribute contains the pattern.
    HrefContains(&'static str),
}

impl Probe {
    /// The probe expressed as a CSS selector.
    pub fn to_css(&self) -> String {
        match self {
            Self::Css(css) => (*css).to_string(),
            Self::ClassContains(p) => format!(r#"[class*="{p}"]"#),
            Self::IdContains(p) => format!(r#"[id*="{p}"]"#),
            Self::HrefContains(p) => format!(r#"[href*="{p}"]"#),
        }
    }
}

/// A signal and the probes any one of which sets it.
#[derive(Debug)]
pub struct SignalRule {
    pub signal: Signal,
    pub probes: &'static [Probe],
}

use Probe::{ClassContains, Css, HrefContains, IdContains};

/// The detection table, one rule per signal.
pub const RULES: &[SignalRule] = &[
    SignalRule {
        signal: Signal::Comments,
        probes: &[
            Css(".comments"),
            Css("#comments"),
            Css(".comment-form"),
            ClassContains("comment"),
            IdContains("comment"),
            Css(".disqus"),
            Css("#disqus_thread"),
            Css(r#"textarea[placeholder*="comment"]"#),
            Css(r#"form[action*="comment"]"#),
        ],
    },
    SignalRule {
        signal: Signal::ContactForm,
        probes: &[
            Css(r#"form[class*="contact"]"#),
            Css(r#"form[id*="contact"]"#),
            Css(r#"input[type="email"]"#),
            Css(r#"input[name*="email"]"#),
            Css(r#"textarea[name*="message"]"#),
            ClassContains("contact-form"),
        ],
    },
    SignalRule {
        signal: Signal::Forum,
        probes: &[
            Css(".forum"),
            Css(".discussion"),
            Css(".topic"),
            Css(".thread"),
            Css(".post-reply"),
            ClassContains("forum"),
            ClassContains("discussion"),
            IdContains("forum"),
            HrefContains("forum"),
        ],
    },
    SignalRule {
        signal: Signal::UserProfiles,
        probes: &[
            Css(".profile"),
            Css(".user-profile"),
            Css(".member"),
            Css(".avatar"),
            ClassContains("member"),
            HrefContains("profile"),
            HrefContains("user"),
        ],
    },
    SignalRule {
        signal: Signal::LoginForm,
        probes: &[
            Css(r#"form[class*="login"]"#),
            Css(r#"form[id*="login"]"#),
            Css(r#"input[name="password"]"#),
            Css(r#"input[type="password"]"#),
            Css(r#"button[class*="login"]"#),
            Css(".login-form"),
            HrefContains("login"),
            HrefContains("signin"),
        ],
    },
    SignalRule {
        signal: Signal::Registration,
        probes: &[
            Css(r#"form[class*="register"]"#),
            Css(r#"form[class*="signup"]"#),
            Css(r#"button[class*="register"]"#),
            Css(r#"button[class*="signup"]"#),
            Css(".registration-form"),
            HrefContains("register"),
            HrefContains("signup"),
            HrefContains("join"),
        ],
    },
    SignalRule {
        signal: Signal::ContentSubmission,
        probes: &[
            Css(r#"textarea[class*="post"]"#),
            Css(r#"form[action*="submit"]"#),
            ClassContains("submit"),
            ClassContains("contribute"),
            HrefContains("submit"),
            HrefContains("write"),
        ],
    },
    SignalRule {
        signal: Signal::SocialSharing,
        probes: &[
            Css(".twitter-share-button"),
            Css(".facebook-share-button"),
            ClassContains("share"),
            ClassContains("social"),
            HrefContains("twitter.com/share"),
            HrefContains("facebook.com/sharer"),
        ],
    },
];

/// Evaluate [`RULES`] with an arbitrary probe oracle.
pub fn evaluate<F>(mut matches: F) -> InteractiveFeatures
where
    F: FnMut(&Probe) -> bool,
{
    let mut features = InteractiveFeatures::default();
    for rule in RULES {
        let hit = rule.probes.iter().any(|probe| matches(probe));
        features.set(rule.signal, hit);
    }
    features
}

/// Compiled selector per probe. Probes that fail to compile are absent and
/// never match.
static COMPILED: LazyLock<HashMap<Probe, Selector>> = LazyLock::new(|| {
    RULES
        .iter()
        .flat_map(|rule| rule.probes.iter().copied())
        .filter_map(|probe| {
            let css = probe.to_css();
            match Selector::parse(&css) {
                Ok(sel) => Some((probe, sel)),
                Err(e) => {
                    warn!(%css, error = ?e, "invalid feature selector, probe disabled");
                    None
                }
            }
        })
        .collect()
});

/// Detect the interactive-content signals present in a parsed document.
pub fn detect(doc: &Html) -> InteractiveFeatures {
    evaluate(|probe| {
        COMPILED
            .get(probe)
            .is_some_and(|sel| doc.select(sel).next().is_some())
    })
}
