//! Classifier gateway: asks a local language model whether a page is a
//! backlink opportunity and turns its free-form answer into a verdict.
//!
//! The model is expected to embed one JSON record in its reply. Parsing is
//! three-tiered ([`ParsedVerdict`]): a well-formed record is used as is, a
//! reply without any record becomes a keyword-guess verdict, and a record
//! that fails to parse becomes a zero-confidence failure verdict. None of
//! these is an error; only transport failures are.

use std::future::Future;
use std::time::{Duration, Instant};

use reqwest::Client;
use serde_json::Value;
use tracing::{debug, instrument, warn};

use linkscout_shared::{
    AnalyzeResponse, ClassificationError, ClassificationVerdict, ClassifierConfig, Difficulty,
    KeywordSet, LinkScoutError, PageSnapshot, Result, TargetUrl,
};

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// A verdict plus the raw reply it was derived from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub verdict: ClassificationVerdict,
    pub raw: String,
    /// Which parse tier produced `verdict`.
    pub tier: ParseTier,
}

impl Classification {
    /// Parse a raw model reply.
    pub fn from_raw(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let parsed = parse_verdict(&raw);
        let tier = parsed.tier();
        Self {
            verdict: parsed.into_verdict(),
            raw,
            tier,
        }
    }
}

/// The classification service.
pub trait Classifier: Send + Sync {
    fn classify(
        &self,
        page_text: &str,
        keywords: &KeywordSet,
        target: &TargetUrl,
    ) -> impl Future<Output = std::result::Result<Classification, ClassificationError>> + Send;
}

impl<T: Classifier> Classifier for &T {
    fn classify(
        &self,
        page_text: &str,
        keywords: &KeywordSet,
        target: &TargetUrl,
    ) -> impl Future<Output = std::result::Result<Classification, ClassificationError>> + Send {
        (**self).classify(page_text, keywords, target)
    }
}

/// Classify caller-supplied page content.
///
/// Blank content is rejected before the service is called. Classifier
/// failures surface as errors.
pub async fn analyze_content<C: Classifier>(
    classifier: &C,
    content: &str,
    keywords: &KeywordSet,
    target: &TargetUrl,
) -> Result<AnalyzeResponse> {
    if content.trim().is_empty() {
        return Err(LinkScoutError::validation("content is required"));
    }

    let classification = classifier.classify(content, keywords, target).await?;
    Ok(AnalyzeResponse {
        success: true,
        analysis: classification.verdict,
        raw_response: classification.raw,
    })
}

// ---------------------------------------------------------------------------
// Prompt
// ---------------------------------------------------------------------------

/// Flatten a snapshot into the text block sent to the model.
pub fn page_text(snapshot: &PageSnapshot) -> String {
    format!(
        "Title: {}\nDescription: {}\nHeadings: {}\nContent: {}",
        snapshot.title,
        snapshot.meta_description,
        snapshot.headings.join(", "),
        snapshot.main_content
    )
}

pub fn build_prompt(page_text: &str, keywords: &KeywordSet, target: &TargetUrl) -> String {
    format!(
        r#"As a backlink SEO expert, analyze the following webpage content to determine if it's a good opportunity for placing a backlink to "{target}".

Target keywords: {keywords}
Webpage content: {page_text}

Please evaluate this page for backlink opportunities and respond in JSON format with the following structure:
{{
  "isOpportunity": boolean,
  "confidence": number (0-100),
  "reason": "string explaining why this is or isn't a good opportunity",
  "backlinkContext": "suggested context or section where the backlink could be placed",
  "pageType": "forum, blog, article, directory, etc.",
  "difficulty": "easy, medium, hard",
  "recommendedAction": "specific action to take (e.g., 'comment on post', 'contact author', 'register and post')"
}}

Focus on:
1. Content relevance to the target keywords
2. Whether the page accepts user-generated content (comments, forum posts, etc.)
3. Domain authority indicators
4. Existing backlink opportunities (comment sections, user profiles, etc.)
5. Content quality and spam indicators
"#
    )
}

// ---------------------------------------------------------------------------
// Verdict parsing
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseTier {
    Structured,
    Unstructured,
    Malformed,
}

/// Result of interpreting a model reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedVerdict {
    /// A well-formed record was found.
    Structured(ClassificationVerdict),
    /// No record at all; verdict guessed from the text.
    Unstructured(ClassificationVerdict),
    /// A record was present but could not be read.
    Malformed {
        verdict: ClassificationVerdict,
        error: String,
    },
}

impl ParsedVerdict {
    pub fn tier(&self) -> ParseTier {
        match self {
            Self::Structured(_) => ParseTier::Structured,
            Self::Unstructured(_) => ParseTier::Unstructured,
            Self::Malformed { .. } => ParseTier::Malformed,
        }
    }

    pub fn verdict(&self) -> &ClassificationVerdict {
        match self {
            Self::Structured(v) | Self::Unstructured(v) => v,
            Self::Malformed { verdict, .. } => verdict,
        }
    }

    pub fn into_verdict(self) -> ClassificationVerdict {
        match self {
            Self::Structured(v) | Self::Unstructured(v) => v,
            Self::Malformed { verdict, .. } => verdict,
        }
    }
}

/// Confidence assigned when the verdict is only a keyword guess.
pub const UNSTRUCTURED_CONFIDENCE: u8 = 50;

/// Interpret a raw model reply.
///
/// Every `{` is a candidate start; the first candidate holding a valid
/// verdict record wins. Replies often echo template placeholders such as
/// `{targetUrl}` before the real record.
pub fn parse_verdict(raw: &str) -> ParsedVerdict {
    let Some(first) = raw.find('{') else {
        return unstructured(raw);
    };
    if !raw[first..].contains('}') {
        return unstructured(raw);
    }

    let mut first_error = None;
    for (start, _) in raw.match_indices('{') {
        match record_at(&raw[start..]) {
            Ok(verdict) => return ParsedVerdict::Structured(verdict),
            Err(error) => {
                first_error.get_or_insert(error);
            }
        }
    }

    let error = first_error.unwrap_or_default();
    ParsedVerdict::Malformed {
        verdict: ClassificationVerdict::failed(
            format!("Error parsing AI response: {error}"),
            "Manual review required",
        ),
        error,
    }
}

/// Parse the first JSON value at the start of `text` as a verdict record.
fn record_at(text: &str) -> std::result::Result<ClassificationVerdict, String> {
    let value = serde_json::Deserializer::from_str(text)
        .into_iter::<Value>()
        .next()
        .ok_or_else(|| "empty JSON record".to_string())?
        .map_err(|e| e.to_string())?;
    verdict_from_value(&value)
}

fn unstructured(raw: &str) -> ParsedVerdict {
    let lower = raw.to_lowercase();
    ParsedVerdict::Unstructured(ClassificationVerdict {
        is_opportunity: lower.contains("good opportunity") || lower.contains("yes"),
        confidence: UNSTRUCTURED_CONFIDENCE,
        reason: raw.to_string(),
        backlink_context: "Manual analysis needed".into(),
        page_type: "unknown".into(),
        difficulty: Difficulty::Medium,
        recommended_action: "Manual review required".into(),
    })
}

fn verdict_from_value(value: &Value) -> std::result::Result<ClassificationVerdict, String> {
    let obj = value
        .as_object()
        .ok_or_else(|| format!("expected a JSON object, got {value}"))?;

    let is_opportunity = match obj.get("isOpportunity") {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) if s.eq_ignore_ascii_case("true") => true,
        Some(Value::String(s)) if s.eq_ignore_ascii_case("false") => false,
        Some(other) => return Err(format!("isOpportunity is not a boolean: {other}")),
        None => return Err("missing field isOpportunity".into()),
    };

    let confidence = match obj.get("confidence") {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s
            .trim()
            .trim_end_matches('%')
            .parse::<f64>()
            .map_err(|_| format!("confidence is not a number: {s:?}"))?,
        Some(other) => return Err(format!("confidence is not a number: {other}")),
        None => return Err("missing field confidence".into()),
    };

    let text = |key: &str| -> String {
        match obj.get(key) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        }
    };

    Ok(ClassificationVerdict {
        is_opportunity,
        confidence: clamp_confidence(confidence),
        reason: text("reason"),
        backlink_context: text("backlinkContext"),
        page_type: text("pageType"),
        difficulty: Difficulty::from_loose(&text("difficulty")),
        recommended_action: text("recommendedAction"),
    })
}

fn clamp_confidence(value: f64) -> u8 {
    value.clamp(0.0, 100.0).round() as u8
}

// ---------------------------------------------------------------------------
// Ollama
// ---------------------------------------------------------------------------

#[derive(serde::Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    stream: bool,
}

#[derive(serde::Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(serde::Deserialize)]
struct ChatResponse {
    message: ChatResponseMessage,
}

#[derive(serde::Deserialize)]
struct ChatResponseMessage {
    content: String,
}

/// Classifier backed by an Ollama server's chat endpoint.
#[derive(Debug, Clone)]
pub struct OllamaClassifier {
    client: Client,
    endpoint: String,
    model: String,
    timeout: Duration,
}

impl OllamaClassifier {
    pub fn new(config: &ClassifierConfig) -> Result<Self> {
        let client = Client::builder().build().map_err(|e| {
            LinkScoutError::from(ClassificationError::Unavailable(format!(
                "failed to build HTTP client: {e}"
            )))
        })?;

        Ok(Self {
            client,
            endpoint: format!("{}/api/chat", config.base_url.trim_end_matches('/')),
            model: config.model.clone(),
            timeout: config.timeout,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn chat(&self, prompt: &str) -> std::result::Result<String, ClassificationError> {
        let request = ChatRequest {
            model: &self.model,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
            stream: false,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| ClassificationError::Unavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClassificationError::Unavailable(format!(
                "HTTP {status}: {}",
                body.chars().take(200).collect::<String>()
            )));
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| ClassificationError::MalformedResponse(e.to_string()))?;

        Ok(body.message.content)
    }
}

impl Classifier for OllamaClassifier {
    #[instrument(skip_all, fields(model = %self.model, target = %target))]
    async fn classify(
        &self,
        page_text: &str,
        keywords: &KeywordSet,
        target: &TargetUrl,
    ) -> std::result::Result<Classification, ClassificationError> {
        let started = Instant::now();
        let prompt = build_prompt(page_text, keywords, target);

        let raw = match tokio::time::timeout(self.timeout, self.chat(&prompt)).await {
            Ok(result) => result?,
            Err(_) => {
                warn!(secs = self.timeout.as_secs(), "classifier timed out");
                return Err(ClassificationError::Timeout {
                    secs: self.timeout.as_secs(),
                });
            }
        };

        let classification = Classification::from_raw(raw);
        debug!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            tier = ?classification.tier,
            confidence = classification.verdict.confidence,
            "classified page"
        );
        Ok(classification)
    }
}
