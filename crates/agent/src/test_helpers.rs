//! Shared test helpers: scripted providers and tools.

use async_trait::async_trait;
use nugget_core::error::{Error, ProviderError};
use nugget_core::message::{ChatHistory, Message};
use nugget_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
use nugget_core::tool::{RouterTool, ToolKind};
use std::collections::VecDeque;
use std::sync::Mutex;

/// A mock provider that returns a sequence of scripted results and records
/// every request it receives.
///
/// Panics if more calls are made than results provided.
pub struct SequentialMockProvider {
    responses: Mutex<VecDeque<Result<ProviderResponse, ProviderError>>>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl SequentialMockProvider {
    pub fn new(responses: Vec<Result<ProviderResponse, ProviderError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Successful text responses, in order.
    pub fn texts(texts: &[&str]) -> Self {
        Self::new(texts.iter().map(|t| Ok(make_text_response(t))).collect())
    }

    /// The same text response `n` times.
    pub fn repeating(text: &str, n: usize) -> Self {
        Self::new((0..n).map(|_| Ok(make_text_response(text))).collect())
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn last_request(&self) -> Option<ProviderRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl Provider for SequentialMockProvider {
    fn name(&self) -> &str {
        "sequential_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let call = {
            let mut requests = self.requests.lock().unwrap();
            requests.push(request);
            requests.len()
        };

        match self.responses.lock().unwrap().pop_front() {
            Some(response) => response,
            None => panic!("SequentialMockProvider: no more responses (call #{call})"),
        }
    }
}

/// Create a simple text response.
pub fn make_text_response(text: &str) -> ProviderResponse {
    ProviderResponse {
        message: Message::assistant(text),
        usage: Some(Usage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        }),
        model: "mock-model".into(),
    }
}

/// A router decision that calls `tool` with `input`.
pub fn action(thought: &str, tool: &str, input: &str) -> String {
    format!("Thought: {thought}\nAction: {tool}\nAction Input: {input}")
}

/// A router decision that finishes with `answer`.
pub fn final_answer(answer: &str) -> String {
    format!("Thought: I now know the final answer\nFinal Answer: {answer}")
}

/// A tool with a fixed reply that records its inputs.
pub struct StubTool {
    kind: ToolKind,
    name: String,
    reply: Result<String, ProviderError>,
    inputs: Mutex<Vec<(String, usize)>>,
}

impl StubTool {
    pub fn new(kind: ToolKind, name: &str, reply: &str) -> Self {
        Self {
            kind,
            name: name.into(),
            reply: Ok(reply.into()),
            inputs: Mutex::new(Vec::new()),
        }
    }

    /// A tool whose every call fails upstream with `error`.
    pub fn failing(kind: ToolKind, name: &str, error: ProviderError) -> Self {
        Self {
            kind,
            name: name.into(),
            reply: Err(error),
            inputs: Mutex::new(Vec::new()),
        }
    }

    /// Inputs received, each with the length of the history it was given.
    pub fn inputs(&self) -> Vec<(String, usize)> {
        self.inputs.lock().unwrap().clone()
    }
}

#[async_trait]
impl RouterTool for StubTool {
    fn kind(&self) -> ToolKind {
        self.kind
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "A scripted tool"
    }

    fn may_raise(&self) -> bool {
        self.reply.is_err()
    }

    async fn invoke(&self, input: &str, history: ChatHistory<'_>) -> Result<String, Error> {
        self.inputs
            .lock()
            .unwrap()
            .push((input.to_string(), history.len()));
        match &self.reply {
            Ok(reply) => Ok(reply.clone()),
            Err(e) => Err(nugget_core::error::ToolError::Upstream {
                tool_name: self.name.clone(),
                source: e.clone(),
            }
            .into()),
        }
    }
}
