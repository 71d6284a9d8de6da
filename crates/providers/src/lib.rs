//! Chat model providers for Nugget.
//!
//! All providers implement the `nugget_core::Provider` trait. Every provider
//! built from configuration is wrapped in a [`RetryingProvider`] so that
//! throttled calls back off and retry before surfacing.

pub mod builder;
pub mod openai_compat;
pub mod retry;

pub use builder::build_from_config;
pub use openai_compat::OpenAiCompatProvider;
pub use retry::{ErrorClass, RetryError, RetryPolicy, RetryState, RetryingProvider, classify};
