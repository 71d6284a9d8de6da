//! General-knowledge lookup via the Wikipedia REST summary endpoint.
//!
//! The tool never fails: disambiguation pages, missing pages, HTTP errors
//! and network failures all produce the fixed [`NOT_FOUND`] sentence so the
//! router always receives an observation it can reason about.

use std::time::Duration;

use async_trait::async_trait;
use nugget_config::LookupConfig;
use nugget_core::error::Error;
use nugget_core::message::ChatHistory;
use nugget_core::tool::{RouterTool, ToolKind};
use serde::Deserialize;
use tracing::{debug, warn};

/// Returned whenever no usable summary exists.
pub const NOT_FOUND: &str = "I couldn't find any information on that.";

pub struct WikipediaLookup {
    client: reqwest::Client,
    base_url: String,
    sentences: usize,
}

impl WikipediaLookup {
    pub fn new(base_url: impl Into<String>, sentences: usize, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("nugget/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_else(|e| {
                warn!(error = %e, "Falling back to a default HTTP client");
                reqwest::Client::new()
            });

        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            sentences: sentences.max(1),
        }
    }

    pub fn from_config(config: &LookupConfig) -> Self {
        Self::new(
            &config.base_url,
            config.sentences,
            Duration::from_secs(config.timeout_secs),
        )
    }

    /// Summary endpoint for `topic`, with the title percent-encoded.
    fn summary_url(&self, topic: &str) -> Option<reqwest::Url> {
        let title = topic.replace(' ', "_");
        let mut url = reqwest::Url::parse(&self.base_url).ok()?;
        url.path_segments_mut()
            .ok()?
            .pop_if_empty()
            .extend(["page", "summary", title.as_str()]);
        Some(url)
    }

    async fn fetch(&self, topic: &str) -> Option<String> {
        let url = self.summary_url(topic)?;
        debug!(%url, "Looking up topic");

        let response = match self.client.get(url).send().await {
            Ok(r) => r,
            Err(e) => {
                warn!(topic, error = %e, "Lookup request failed");
                return None;
            }
        };

        if !response.status().is_success() {
            debug!(topic, status = response.status().as_u16(), "No page for topic");
            return None;
        }

        match response.json::<PageSummary>().await {
            Ok(page) => page.into_extract(),
            Err(e) => {
                warn!(topic, error = %e, "Unreadable summary response");
                None
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct PageSummary {
    #[serde(default, rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    extract: Option<String>,
}

impl PageSummary {
    fn into_extract(self) -> Option<String> {
        if self.kind.as_deref() == Some("disambiguation") {
            return None;
        }
        self.extract
            .map(|e| e.trim().to_string())
            .filter(|e| !e.is_empty())
    }
}

/// Trim the topic the model produced: whitespace, wrapping quotes, and a
/// trailing question mark.
fn normalize_topic(input: &str) -> &str {
    input
        .trim()
        .trim_matches(['"', '\'', '`'])
        .trim_end_matches('?')
        .trim()
}

/// The first `n` sentences of `text`.
///
/// A sentence ends at `.`, `!` or `?` followed by whitespace or the end of
/// the text, so abbreviations like "Dr." also end one. Decimals do not.
fn first_sentences(text: &str, n: usize) -> String {
    let mut count = 0;
    let mut chars = text.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        if matches!(c, '.' | '!' | '?') {
            let at_boundary = chars.peek().is_none_or(|(_, next)| next.is_whitespace());
            if at_boundary {
                count += 1;
                if count == n {
                    return text[..i + c.len_utf8()].to_string();
                }
            }
        }
    }
    text.to_string()
}

#[async_trait]
impl RouterTool for WikipediaLookup {
    fn kind(&self) -> ToolKind {
        ToolKind::Lookup
    }

    fn name(&self) -> &str {
        "wikipedia"
    }

    fn description(&self) -> &str {
        "Looks up a short general-knowledge summary of a topic (a cuisine, dish, city or landmark). \
         Input is a short topic name. Use it only when the restaurant database has nothing relevant."
    }

    fn may_raise(&self) -> bool {
        false
    }

    async fn invoke(&self, input: &str, _history: ChatHistory<'_>) -> Result<String, Error> {
        let topic = normalize_topic(input);
        if topic.is_empty() {
            return Ok(NOT_FOUND.to_string());
        }

        Ok(match self.fetch(topic).await {
            Some(extract) => first_sentences(&extract, self.sentences),
            None => NOT_FOUND.to_string(),
        })
    }
}
