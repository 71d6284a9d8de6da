//! Turn tracing and usage counters for Nugget.
//!
//! Records a span-based trace of every turn (model calls, tool executions)
//! and keeps running counters for completed, degraded and failed turns,
//! tool invocations and rate-limit hits.

pub mod counter;
pub mod engine;
pub mod model;

pub use counter::RateLimitCounter;
pub use engine::TelemetryEngine;
pub use model::{Span, SpanKind, Trace, UsageSnapshot};

/// Errors from the telemetry subsystem.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("unknown trace id: {0}")]
    UnknownTrace(String),

    #[error("serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
}
