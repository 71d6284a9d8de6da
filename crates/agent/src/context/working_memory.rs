//! Working memory: the router's scratchpad for a single question.
//!
//! Records the Thought/Action/Observation trace, the ordered tool
//! invocations and the step counter. [`WorkingMemory::render`] turns the
//! trace back into the text the model continues from on the next step.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkingMemory {
    /// Reasoning trace entries, in order.
    pub trace: Vec<TraceEntry>,

    /// Every tool call made so far, in order.
    pub invocations: Vec<ToolInvocationRecord>,

    /// Decision steps consumed.
    pub steps: usize,

    /// Step budget.
    pub max_steps: usize,
}

/// A single entry in the reasoning trace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceEntry {
    pub kind: TraceKind,
    pub content: String,
    /// Tool input, set on `Action` entries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<String>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TraceKind {
    Thought,
    Action,
    Observation,
}

/// One tool call: which tool, what it was given, what it returned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolInvocationRecord {
    pub tool: String,
    pub input: String,
    pub output: String,
    pub success: bool,
    pub duration_ms: u64,
}

impl WorkingMemory {
    pub fn new(max_steps: usize) -> Self {
        Self {
            trace: Vec::new(),
            invocations: Vec::new(),
            steps: 0,
            max_steps,
        }
    }

    /// Consume one step. Returns `false` once the budget is spent.
    pub fn tick(&mut self) -> bool {
        if self.steps >= self.max_steps {
            return false;
        }
        self.steps += 1;
        true
    }

    pub fn remaining_steps(&self) -> usize {
        self.max_steps.saturating_sub(self.steps)
    }

    pub fn add_thought(&mut self, thought: &str) {
        self.push(TraceKind::Thought, thought, None);
    }

    pub fn add_action(&mut self, tool: &str, input: &str) {
        self.push(TraceKind::Action, tool, Some(input.to_string()));
    }

    pub fn add_observation(&mut self, observation: &str) {
        self.push(TraceKind::Observation, observation, None);
    }

    fn push(&mut self, kind: TraceKind, content: &str, input: Option<String>) {
        self.trace.push(TraceEntry {
            kind,
            content: content.trim().to_string(),
            input,
            timestamp: Utc::now(),
        });
    }

    pub fn record_invocation(&mut self, record: ToolInvocationRecord) {
        self.invocations.push(record);
    }

    /// Output of the most recent tool call, if any tool ran.
    pub fn last_output(&self) -> Option<&str> {
        self.invocations.last().map(|r| r.output.as_str())
    }

    /// The trace in the decision grammar, ending ready for the next
    /// `Thought:`. Empty when nothing has happened yet.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for entry in &self.trace {
            match entry.kind {
                TraceKind::Thought => {
                    out.push_str("Thought: ");
                    out.push_str(&entry.content);
                    out.push('\n');
                }
                TraceKind::Action => {
                    out.push_str("Action: ");
                    out.push_str(&entry.content);
                    out.push_str("\nAction Input: ");
                    out.push_str(entry.input.as_deref().unwrap_or_default());
                    out.push('\n');
                }
                TraceKind::Observation => {
                    out.push_str("Observation: ");
                    out.push_str(&entry.content);
                    out.push('\n');
                }
            }
        }
        out
    }

    pub fn is_empty(&self) -> bool {
        self.trace.is_empty() && self.invocations.is_empty()
    }
}

impl Default for WorkingMemory {
    fn default() -> Self {
        Self::new(6)
    }
}
