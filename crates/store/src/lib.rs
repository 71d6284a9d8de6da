//! Document index for Nugget.
//!
//! Backends implementing `nugget_core::DocumentStore`:
//! - `in_memory`: hashed bag-of-words vectors ranked by cosine similarity
//! - `file_backend`: the same index persisted as a JSONL document file
//!
//! `ingest` turns scraped restaurant records into indexable documents.

pub mod file_backend;
pub mod in_memory;
pub mod ingest;
pub mod vector;

pub use file_backend::FileStore;
pub use in_memory::{Document, InMemoryStore};
pub use ingest::{MenuItem, RestaurantRecord};
