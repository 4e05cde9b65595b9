//! Encyclopedia lookup collaborator.
//!
//! The processor talks to a [`Lookup`] implementation and only ever sees
//! "the topic exists with this summary", "the topic does not exist", or an
//! error it converts into a spoken apology. The production implementation
//! queries the Wikipedia REST summary endpoint.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;

/// REST endpoint serving one-page summaries.
const SUMMARY_ENDPOINT: &str = "https://en.wikipedia.org/api/rest_v1/page/summary";

/// User agent sent with lookup requests.
const USER_AGENT: &str = "JarvisAssistant/1.0";

/// Sentence cap applied to spoken synopses.
const MAX_SENTENCES: usize = 4;

/// Character cap applied to spoken synopses.
const MAX_SYNOPSIS_CHARS: usize = 600;

/// Lookup result for a topic.
#[derive(Clone, Debug)]
pub struct LookupPage {
    /// Whether the topic resolved to a page.
    pub exists: bool,
    /// Raw page summary; empty when the topic does not exist.
    pub summary: String,
}

/// Narrow interface to the encyclopedia service.
#[async_trait]
pub trait Lookup: Send + Sync {
    /// Resolves a topic to a page summary.
    ///
    /// # Errors
    /// Returns an error when the service is unreachable or replies with
    /// something other than a page or a not-found outcome.
    async fn lookup(&self, topic: &str) -> Result<LookupPage>;
}

/// Wikipedia REST client.
pub struct WikipediaClient {
    client: reqwest::Client,
}

/// Response payload of the summary endpoint; only the extract matters here.
#[derive(Deserialize)]
struct SummaryResponse {
    #[serde(default)]
    extract: String,
}

impl WikipediaClient {
    /// Creates a client with a fresh connection pool.
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for WikipediaClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Lookup for WikipediaClient {
    async fn lookup(&self, topic: &str) -> Result<LookupPage> {
        let url = format!("{}/{}", SUMMARY_ENDPOINT, urlencoding::encode(topic));
        let response = self
            .client
            .get(&url)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .send()
            .await
            .with_context(|| format!("Failed to query Wikipedia for '{}'", topic))?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(LookupPage {
                exists: false,
                summary: String::new(),
            });
        }
        let response = response
            .error_for_status()
            .with_context(|| format!("Wikipedia rejected the lookup for '{}'", topic))?;
        let body: SummaryResponse = response
            .json()
            .await
            .with_context(|| "Failed to parse Wikipedia response")?;
        Ok(LookupPage {
            exists: true,
            summary: body.extract,
        })
    }
}

/// Reduces a raw page summary to a short spoken synopsis.
///
/// # Details
/// Strips bracketed citation markers and parenthetical asides, keeps at
/// most the first four sentences, and truncates to 600 characters at the
/// last whole-word boundary with a trailing ellipsis when over.
///
/// # Parameters
/// * `raw` - The unmodified summary text.
///
/// # Returns
/// The cleaned synopsis ready for the speech queue.
pub fn clean_synopsis(raw: &str) -> String {
    let without_citations = strip_delimited(raw, '[', ']');
    let without_asides = strip_delimited(&without_citations, '(', ')');
    let sentences = split_sentences(&without_asides);
    let short = sentences[..sentences.len().min(MAX_SENTENCES)].join(" ");
    truncate_at_word(&short, MAX_SYNOPSIS_CHARS)
}

/// Removes every `open ... close` span, shortest match first.
///
/// An unclosed opener is left in place, matching the behavior of a
/// non-greedy regex substitution.
fn strip_delimited(text: &str, open: char, close: char) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find(open) {
        match rest[start..].find(close) {
            Some(offset) => {
                out.push_str(&rest[..start]);
                rest = &rest[start + offset + close.len_utf8()..];
            }
            None => break,
        }
    }
    out.push_str(rest);
    out
}

/// Splits text into sentences on terminal punctuation followed by spaces.
fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();
    while let Some((_, c)) = chars.next() {
        if matches!(c, '.' | '!' | '?') {
            if let Some((next_idx, ' ')) = chars.peek().copied() {
                sentences.push(&text[start..next_idx]);
                while let Some((_, ' ')) = chars.peek().copied() {
                    chars.next();
                }
                start = chars.peek().map_or(text.len(), |(i, _)| *i);
            }
        }
    }
    if start < text.len() {
        sentences.push(&text[start..]);
    }
    sentences
}

/// Truncates to `limit` characters at the last whole-word boundary,
/// appending an ellipsis when anything was cut.
fn truncate_at_word(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let cut: String = text.chars().take(limit).collect();
    let trimmed = match cut.rfind(' ') {
        Some(idx) => &cut[..idx],
        None => cut.as_str(),
    };
    format!("{}...", trimmed)
}
