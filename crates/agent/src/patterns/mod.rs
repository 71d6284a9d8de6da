//! Reasoning patterns the assistant answers with.
//!
//! 1. **ReAct**: the tool router's Thought → Action → Observation loop
//! 2. **RAG**: reformulate, retrieve and compose, exposed to the router as a tool

pub mod parser;
pub mod rag;
pub mod react;

pub use parser::{Decision, ParseError};
pub use rag::{RagPipeline, RagResult, RagTool};
pub use react::{RouterResult, STOP_SEQUENCE, ToolRouter};
