//! # Nugget Core
//!
//! Domain types, traits, and error definitions for the Nugget restaurant
//! assistant. This crate has **no framework dependencies**: it defines the
//! model every other crate implements against.
//!
//! ## Design Philosophy
//!
//! Every out-of-process collaborator (LLM endpoint, document index, lookup
//! service) is a trait here. Implementations live in their own crates, so
//! the answering pipeline can be exercised end-to-end with scripted stubs.

pub mod document;
pub mod error;
pub mod event;
pub mod message;
pub mod provider;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use document::{DocumentStore, RetrievedPassage};
pub use error::{Error, Result};
pub use event::{DomainEvent, EventBus};
pub use message::{ChatHistory, Message, Role, Turn, TurnMode};
pub use provider::{Provider, ProviderRequest, ProviderResponse};
pub use tool::{RouterTool, ToolKind};
