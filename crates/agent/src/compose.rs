//! Grounded answer composition.
//!
//! Builds the final answer from retrieved passages, the conversation so far
//! and the user's question. Grounding is enforced by instruction: the
//! system prompt carries the passages and tells the model to admit when they
//! don't cover the question.

use std::sync::Arc;

use nugget_core::document::RetrievedPassage;
use nugget_core::error::ProviderError;
use nugget_core::message::{ChatHistory, Message};
use nugget_core::provider::Provider;
use tracing::debug;

use crate::prompts::answer_system_prompt;
use crate::settings::ModelSettings;

pub struct AnswerComposer {
    provider: Arc<dyn Provider>,
    settings: ModelSettings,
}

impl AnswerComposer {
    pub fn new(provider: Arc<dyn Provider>, settings: ModelSettings) -> Self {
        Self { provider, settings }
    }

    pub async fn compose(
        &self,
        question: &str,
        passages: &[RetrievedPassage],
        history: ChatHistory<'_>,
    ) -> Result<String, ProviderError> {
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(Message::system(answer_system_prompt(passages)));
        messages.extend(history.messages());
        messages.push(Message::user(question));

        let response = self.provider.complete(self.settings.request(messages)).await?;
        let answer = response.message.content.trim().to_string();
        debug!(passages = passages.len(), answer_len = answer.len(), "Answer composed");
        Ok(answer)
    }
}
