//! Thread-safe telemetry engine: collects turn traces and keeps usage
//! counters.

use crate::TelemetryError;
use crate::counter::RateLimitCounter;
use crate::model::*;
use nugget_core::message::TurnMode;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};

/// Traces kept before the oldest are dropped.
const MAX_TRACES: usize = 256;

/// The core telemetry engine.
///
/// Counters are atomics; the trace list sits behind an `RwLock`.
pub struct TelemetryEngine {
    traces: RwLock<Vec<Trace>>,
    rate_limits: RateLimitCounter,
    completed_turns: AtomicU64,
    degraded_turns: AtomicU64,
    failed_turns: AtomicU64,
    tool_invocations: AtomicU64,
    llm_calls: AtomicU64,
}

impl TelemetryEngine {
    pub fn new() -> Self {
        Self::with_rate_limit_counter(RateLimitCounter::new())
    }

    /// Build an engine that reports an existing shared counter.
    pub fn with_rate_limit_counter(rate_limits: RateLimitCounter) -> Self {
        Self {
            traces: RwLock::new(Vec::new()),
            rate_limits,
            completed_turns: AtomicU64::new(0),
            degraded_turns: AtomicU64::new(0),
            failed_turns: AtomicU64::new(0),
            tool_invocations: AtomicU64::new(0),
            llm_calls: AtomicU64::new(0),
        }
    }

    /// The counter handed to the retry wrapper.
    pub fn rate_limit_counter(&self) -> RateLimitCounter {
        self.rate_limits.clone()
    }

    // ── Trace management ──────────────────────────────────────────────

    /// Start a new trace for a user turn.
    pub fn start_trace(&self) -> String {
        let trace = Trace::new();
        let id = trace.id.clone();
        let mut traces = self.traces.write().unwrap_or_else(PoisonError::into_inner);
        if traces.len() >= MAX_TRACES {
            traces.remove(0);
        }
        traces.push(trace);
        id
    }

    pub fn end_trace(&self, trace_id: &str) {
        let mut traces = self.traces.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(trace) = traces.iter_mut().find(|t| t.id == trace_id) {
            trace.end();
        }
    }

    /// Record a finished span in a trace and update the counters.
    pub fn record_span(&self, trace_id: &str, span: Span) -> Result<(), TelemetryError> {
        match span.kind {
            SpanKind::LlmCall => {
                self.llm_calls.fetch_add(1, Ordering::Relaxed);
            }
            SpanKind::ToolExecution => {
                self.tool_invocations.fetch_add(1, Ordering::Relaxed);
            }
            SpanKind::Turn => {}
        }

        let mut traces = self.traces.write().unwrap_or_else(PoisonError::into_inner);
        let trace = traces
            .iter_mut()
            .find(|t| t.id == trace_id)
            .ok_or_else(|| TelemetryError::UnknownTrace(trace_id.to_string()))?;
        trace.add_span(span);
        Ok(())
    }

    /// Count a finished turn by the mode its reply was produced in.
    pub fn record_turn(&self, mode: TurnMode) {
        let counter = match mode {
            TurnMode::Normal => &self.completed_turns,
            TurnMode::Degraded => &self.degraded_turns,
            TurnMode::Error => &self.failed_turns,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    // ── Queries ───────────────────────────────────────────────────────

    pub fn get_trace(&self, trace_id: &str) -> Option<Trace> {
        let traces = self.traces.read().unwrap_or_else(PoisonError::into_inner);
        traces.iter().find(|t| t.id == trace_id).cloned()
    }

    /// Recent traces, most recent first.
    pub fn recent_traces(&self, limit: usize) -> Vec<Trace> {
        let traces = self.traces.read().unwrap_or_else(PoisonError::into_inner);
        traces.iter().rev().take(limit).cloned().collect()
    }

    pub fn snapshot(&self) -> UsageSnapshot {
        UsageSnapshot {
            completed_turns: self.completed_turns.load(Ordering::Relaxed),
            degraded_turns: self.degraded_turns.load(Ordering::Relaxed),
            failed_turns: self.failed_turns.load(Ordering::Relaxed),
            tool_invocations: self.tool_invocations.load(Ordering::Relaxed),
            llm_calls: self.llm_calls.load(Ordering::Relaxed),
            rate_limit_hits: self.rate_limits.get(),
            trace_count: self.traces.read().unwrap_or_else(PoisonError::into_inner).len() as u64,
        }
    }

    /// The snapshot rendered as pretty JSON.
    pub fn snapshot_json(&self) -> Result<String, TelemetryError> {
        Ok(serde_json::to_string_pretty(&self.snapshot())?)
    }
}

impl Default for TelemetryEngine {
    fn default() -> Self {
        Self::new()
    }
}
