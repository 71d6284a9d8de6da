//! Query reformulation: follow-up question → standalone question.
//!
//! With no prior turns there is nothing to resolve, so the question is
//! returned as-is and the model is never called.

use std::sync::Arc;

use nugget_core::error::ProviderError;
use nugget_core::message::{ChatHistory, Message};
use nugget_core::provider::Provider;
use tracing::debug;

use crate::prompts::CONTEXTUALIZE_PROMPT;
use crate::settings::ModelSettings;

/// A question that can be understood without the chat history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StandaloneQuery(String);

impl StandaloneQuery {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl AsRef<str> for StandaloneQuery {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for StandaloneQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

pub struct QueryReformulator {
    provider: Arc<dyn Provider>,
    settings: ModelSettings,
}

impl QueryReformulator {
    /// Reformulation runs at temperature 0 regardless of the configured
    /// sampling temperature.
    pub fn new(provider: Arc<dyn Provider>, settings: ModelSettings) -> Self {
        Self {
            provider,
            settings: settings.with_temperature(0.0),
        }
    }

    pub async fn reformulate(
        &self,
        question: &str,
        history: ChatHistory<'_>,
    ) -> Result<StandaloneQuery, ProviderError> {
        if history.is_empty() {
            return Ok(StandaloneQuery::new(question));
        }

        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(Message::system(CONTEXTUALIZE_PROMPT));
        messages.extend(history.messages());
        messages.push(Message::user(question));

        let response = self.provider.complete(self.settings.request(messages)).await?;
        let rewritten = response.message.content.trim();

        if rewritten.is_empty() {
            debug!("Reformulator returned nothing, keeping the original question");
            return Ok(StandaloneQuery::new(question));
        }

        debug!(original = question, standalone = rewritten, "Question reformulated");
        Ok(StandaloneQuery::new(rewritten))
    }
}
