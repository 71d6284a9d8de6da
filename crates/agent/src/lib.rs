//! The answering pipeline for Nugget.
//!
//! A user turn flows through:
//!
//! 1. **Orchestrator**: records the turn, picks the reply mode, persists
//! 2. **Tool router**: a bounded Thought → Action → Observation loop
//! 3. **Tools**: the restaurant RAG pipeline (reformulate → retrieve →
//!    compose) or a general-knowledge lookup
//!
//! Failures degrade instead of surfacing: a spent rate-limit budget yields
//! a keyword fallback, anything else an apology.

pub mod compose;
pub mod context;
pub mod fallback;
pub mod orchestrator;
pub mod patterns;
pub mod prompts;
pub mod reformulate;
pub mod session;
pub mod settings;

#[cfg(test)]
mod test_helpers;

pub use compose::AnswerComposer;
pub use context::{ToolInvocationRecord, TraceEntry, TraceKind, WorkingMemory};
pub use fallback::{DEGRADED_PREFIX, FallbackCategory, categorize, fallback_response};
pub use orchestrator::{TurnOrchestrator, TurnOutcome};
pub use patterns::{RagPipeline, RagResult, RagTool, RouterResult, ToolRouter};
pub use reformulate::{QueryReformulator, StandaloneQuery};
pub use session::{Session, SessionStore};
pub use settings::ModelSettings;
