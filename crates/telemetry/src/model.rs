//! Data model for turn traces, spans and usage snapshots.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ── Span ──────────────────────────────────────────────────────────────────

/// The kind of work a span represents.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SpanKind {
    /// A chat completion call.
    LlmCall,
    /// A router tool execution.
    ToolExecution,
    /// Top-level turn (user message → reply).
    Turn,
}

impl std::fmt::Display for SpanKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LlmCall => write!(f, "llm_call"),
            Self::ToolExecution => write!(f, "tool_execution"),
            Self::Turn => write!(f, "turn"),
        }
    }
}

/// A single traced execution unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Span {
    pub id: String,
    pub kind: SpanKind,
    /// Tool name, model name, or the turn mode.
    pub label: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub duration_ms: Option<u64>,
    pub success: Option<bool>,
}

impl Span {
    pub fn new(kind: SpanKind, label: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            kind,
            label: label.into(),
            started_at: Utc::now(),
            ended_at: None,
            duration_ms: None,
            success: None,
        }
    }

    /// A span that already finished, with a known duration.
    pub fn completed(kind: SpanKind, label: impl Into<String>, duration_ms: u64, success: bool) -> Self {
        let mut span = Self::new(kind, label);
        span.ended_at = Some(span.started_at);
        span.duration_ms = Some(duration_ms);
        span.success = Some(success);
        span
    }
}

// ── Trace ─────────────────────────────────────────────────────────────────

/// All spans recorded while answering one user turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trace {
    pub id: String,
    pub spans: Vec<Span>,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl Trace {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            spans: Vec::new(),
            started_at: Utc::now(),
            ended_at: None,
        }
    }

    pub fn add_span(&mut self, span: Span) {
        self.spans.push(span);
    }

    pub fn end(&mut self) {
        self.ended_at = Some(Utc::now());
    }

    pub fn total_duration_ms(&self) -> u64 {
        self.spans.iter().filter_map(|s| s.duration_ms).sum()
    }

    pub fn count(&self, kind: SpanKind) -> usize {
        self.spans.iter().filter(|s| s.kind == kind).count()
    }
}

impl Default for Trace {
    fn default() -> Self {
        Self::new()
    }
}

// ── Aggregated view ───────────────────────────────────────────────────────

/// A point-in-time usage snapshot (printed by `nugget chat --verbose`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageSnapshot {
    /// Turns answered normally.
    pub completed_turns: u64,
    /// Turns answered by the keyword fallback after rate-limit exhaustion.
    pub degraded_turns: u64,
    /// Turns that ended in an apologetic error reply.
    pub failed_turns: u64,
    /// Router tool executions.
    pub tool_invocations: u64,
    /// Model calls that went out.
    pub llm_calls: u64,
    /// Rate-limit errors seen by the retry wrapper.
    pub rate_limit_hits: u64,
    /// Traces currently retained.
    pub trace_count: u64,
}
