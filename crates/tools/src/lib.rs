//! Router tools that live outside the answering pipeline.
//!
//! Currently a single general-knowledge lookup backed by Wikipedia page
//! summaries, used when the restaurant index has nothing relevant.

pub mod wikipedia;

pub use wikipedia::{NOT_FOUND, WikipediaLookup};
