//! RAG pattern: reformulate, retrieve, compose.
//!
//! # Flow
//!
//! 1. Rewrite the question so it stands without the chat history
//! 2. Query the document store with the standalone question
//! 3. Compose an answer grounded in whatever came back (possibly nothing)
//!
//! [`RagTool`] exposes the pipeline to the router as the `restaurant_rag`
//! tool.

use std::sync::Arc;

use async_trait::async_trait;
use nugget_core::document::{DocumentStore, RetrievedPassage};
use nugget_core::error::{Error, ToolError};
use nugget_core::message::ChatHistory;
use nugget_core::tool::{RouterTool, ToolKind};
use tracing::{debug, info};

use crate::compose::AnswerComposer;
use crate::reformulate::{QueryReformulator, StandaloneQuery};

pub struct RagPipeline {
    reformulator: QueryReformulator,
    store: Arc<dyn DocumentStore>,
    composer: AnswerComposer,
    top_k: usize,
}

/// Result of a RAG execution.
#[derive(Debug, Clone)]
pub struct RagResult {
    pub answer: String,
    /// The query used for retrieval.
    pub standalone_query: StandaloneQuery,
    pub passages: Vec<RetrievedPassage>,
}

impl RagPipeline {
    pub fn new(
        reformulator: QueryReformulator,
        store: Arc<dyn DocumentStore>,
        composer: AnswerComposer,
    ) -> Self {
        Self {
            reformulator,
            store,
            composer,
            top_k: 4,
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub async fn answer(&self, question: &str, history: ChatHistory<'_>) -> Result<RagResult, Error> {
        let standalone_query = self.reformulator.reformulate(question, history).await?;

        let passages = self.store.query(standalone_query.as_str(), self.top_k).await?;
        info!(
            store = self.store.name(),
            passages = passages.len(),
            query = %standalone_query,
            "RAG: passages retrieved"
        );
        if passages.is_empty() {
            debug!("RAG: nothing relevant, composing without grounding");
        }

        let answer = self
            .composer
            .compose(standalone_query.as_str(), &passages, history)
            .await?;

        Ok(RagResult {
            answer,
            standalone_query,
            passages,
        })
    }
}

/// The restaurant database, as seen by the router.
pub struct RagTool {
    pipeline: RagPipeline,
}

impl RagTool {
    pub const NAME: &'static str = "restaurant_rag";

    pub fn new(pipeline: RagPipeline) -> Self {
        Self { pipeline }
    }
}

#[async_trait]
impl RouterTool for RagTool {
    fn kind(&self) -> ToolKind {
        ToolKind::Rag
    }

    fn name(&self) -> &str {
        Self::NAME
    }

    fn description(&self) -> &str {
        "Answers questions about local restaurants (menus, dishes, prices, locations, opening hours, \
         contact details, special offers) from the restaurant database. Input: the user's question."
    }

    fn may_raise(&self) -> bool {
        true
    }

    async fn invoke(&self, input: &str, history: ChatHistory<'_>) -> Result<String, Error> {
        match self.pipeline.answer(input, history).await {
            Ok(result) => Ok(result.answer),
            Err(Error::Provider(source)) => Err(ToolError::Upstream {
                tool_name: Self::NAME.to_string(),
                source,
            }
            .into()),
            Err(other) => Err(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::ModelSettings;
    use crate::test_helpers::SequentialMockProvider;
    use nugget_core::error::ProviderError;
    use nugget_core::message::Turn;
    use nugget_store::{Document, InMemoryStore};
    use std::collections::BTreeMap;

    async fn restaurant_store() -> Arc<InMemoryStore> {
        let store = InMemoryStore::new();
        for (id, name, text) in [
            (
                "restaurant_1",
                "KFC",
                "Name: KFC\nLocations: Shahjahan Road, Lucknow\nMenu Items:\n\
                 - Zinger Burger: Crispy chicken burger (₹ 199)\nHours: 11am - 11pm",
            ),
            (
                "restaurant_2",
                "Domino's",
                "Name: Domino's Pizza\nLocations: Hazratganj, Lucknow\nMenu Items:\n\
                 - Margherita: Classic cheese pizza (₹ 239)",
            ),
        ] {
            let mut metadata = BTreeMap::new();
            metadata.insert("name".to_string(), name.to_string());
            store
                .upsert(Document {
                    id: id.into(),
                    text: text.into(),
                    metadata,
                })
                .await;
        }
        Arc::new(store)
    }

    fn pipeline(provider: Arc<SequentialMockProvider>, store: Arc<InMemoryStore>) -> RagPipeline {
        RagPipeline::new(
            QueryReformulator::new(provider.clone(), ModelSettings::default()),
            store,
            AnswerComposer::new(provider, ModelSettings::default()),
        )
    }

    #[tokio::test]
    async fn first_question_retrieves_and_composes() {
        let provider = Arc::new(SequentialMockProvider::texts(&[
            "KFC is located on Shahjahan Road, Lucknow.",
        ]));
        let rag = pipeline(provider.clone(), restaurant_store().await);

        let result = rag.answer("Where is KFC located?", ChatHistory::empty()).await.unwrap();
        assert_eq!(result.standalone_query.as_str(), "Where is KFC located?");
        assert_eq!(result.passages[0].id, "restaurant_1");
        assert!(result.answer.contains("Shahjahan Road"));
        // No history: the reformulator is skipped, only the composer calls out.
        assert_eq!(provider.call_count(), 1);
        assert!(provider.last_request().unwrap().messages[0].content.contains("[KFC]"));
    }

    #[tokio::test]
    async fn follow_up_uses_reformulated_query() {
        let provider = Arc::new(SequentialMockProvider::texts(&[
            "How much is a Zinger Burger at KFC?",
            "The Zinger Burger at KFC costs ₹ 199.",
        ]));
        let rag = pipeline(provider.clone(), restaurant_store().await);
        let turns = vec![
            Turn::user("Where is KFC located?"),
            Turn::assistant("KFC is on Shahjahan Road."),
        ];

        let result = rag
            .answer("How much is their burger?", ChatHistory::from(&turns))
            .await
            .unwrap();
        assert_eq!(result.standalone_query.as_str(), "How much is a Zinger Burger at KFC?");
        assert_eq!(result.passages.len(), 1);
        assert!(result.answer.contains("₹ 199"));
        assert_eq!(provider.call_count(), 2);
    }

    #[tokio::test]
    async fn unrelated_question_composes_without_passages() {
        let provider = Arc::new(SequentialMockProvider::texts(&[
            "I don't have information about that in my restaurant data.",
        ]));
        let rag = pipeline(provider.clone(), restaurant_store().await);

        let result = rag
            .answer("How tall is the Eiffel Tower?", ChatHistory::empty())
            .await
            .unwrap();
        assert!(result.passages.is_empty());
        let answer = result.answer.to_lowercase();
        for invented in ["kfc", "domino", "zinger", "₹"] {
            assert!(!answer.contains(invented), "answer mentions {invented}");
        }
    }

    #[tokio::test]
    async fn tool_wraps_provider_errors() {
        let provider = Arc::new(SequentialMockProvider::new(vec![Err(
            ProviderError::RateLimitExhausted {
                attempts: 5,
                message: "429 Too Many Requests".into(),
            },
        )]));
        let tool = RagTool::new(pipeline(provider, restaurant_store().await));
        assert_eq!(tool.kind(), ToolKind::Rag);
        assert!(tool.may_raise());

        let err = tool.invoke("Where is KFC?", ChatHistory::empty()).await.unwrap_err();
        assert!(matches!(err, Error::Tool(ToolError::Upstream { ref tool_name, .. }) if tool_name == "restaurant_rag"));
        assert!(err.is_rate_limit_exhausted());
    }
}
