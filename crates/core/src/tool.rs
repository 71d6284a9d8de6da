//! Router tools: the capabilities the reasoning loop can choose between.
//!
//! The set is closed: a retrieval-grounded answerer and a general-knowledge
//! lookup. Each implementation carries an explicit [`ToolKind`] tag, and the
//! router dispatches on that tag rather than probing the object.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use crate::error::Error;
use crate::message::ChatHistory;

/// Which of the two router tools an implementation is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolKind {
    /// Answer from the restaurant index (reformulate → retrieve → compose).
    Rag,
    /// General-knowledge lookup used when the index has nothing.
    Lookup,
}

impl ToolKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rag => "rag",
            Self::Lookup => "lookup",
        }
    }
}

impl std::fmt::Display for ToolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The capability interface every router tool implements.
#[async_trait]
pub trait RouterTool: Send + Sync {
    /// The tag the router dispatches on.
    fn kind(&self) -> ToolKind;

    /// The name the model uses in `Action:` lines.
    fn name(&self) -> &str;

    /// One-line description rendered into the router prompt.
    fn description(&self) -> &str;

    /// Whether `invoke` can return an error. Tools that return `false`
    /// must turn every failure into text.
    fn may_raise(&self) -> bool;

    /// Run the tool on `input`. `history` holds the turns before the
    /// current question; tools that do not need it ignore it.
    async fn invoke(&self, input: &str, history: ChatHistory<'_>) -> Result<String, Error>;
}
