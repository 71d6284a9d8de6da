//! Tool router: a bounded Thought → Action → Observation loop.
//!
//! Each step asks the model for one decision in the text grammar handled by
//! [`super::parser`]. Actions are dispatched to the matching
//! [`RouterTool`], whose output becomes the next observation. The loop ends
//! with a final answer, or with a degraded answer once `max_steps` decision
//! calls have been made.
//!
//! # States
//!
//! | State | Does |
//! |-------|------|
//! | `Thinking` | one model call, parse the decision |
//! | `Acting` | run the chosen tool |
//! | `Observing` | append the tool result to the scratchpad |
//! | `Done` | carry the final answer out |
//!
//! Tool errors are not observations: they abort the loop and reach the
//! caller, which decides how to degrade.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use nugget_core::error::Error;
use nugget_core::event::{DomainEvent, EventBus};
use nugget_core::message::{ChatHistory, Message};
use nugget_core::provider::Provider;
use nugget_core::tool::RouterTool;
use nugget_telemetry::{Span, SpanKind, TelemetryEngine};
use tracing::{debug, info, warn};

use super::parser::{self, Decision};
use crate::context::{ToolInvocationRecord, TraceEntry, WorkingMemory};
use crate::prompts::{BUDGET_EXHAUSTED_REPLY, format_reminder, router_system_prompt};
use crate::settings::ModelSettings;

/// Generation stops here so the model never writes its own observations.
pub const STOP_SEQUENCE: &str = "\nObservation:";

#[derive(Debug, Clone, PartialEq, Eq)]
enum LoopState {
    Thinking,
    Acting { tool: String, input: String },
    Observing(String),
    Done(String),
}

/// Chooses and sequences tool calls for one question, bounded by a step
/// budget.
pub struct ToolRouter {
    provider: Arc<dyn Provider>,
    settings: ModelSettings,
    tools: Vec<Arc<dyn RouterTool>>,
    max_steps: usize,
    max_parse_retries: usize,
    events: Option<Arc<EventBus>>,
    telemetry: Option<Arc<TelemetryEngine>>,
}

/// What one routed question produced.
#[derive(Debug, Clone)]
pub struct RouterResult {
    /// Never empty.
    pub answer: String,
    /// Thought, action and observation entries in order.
    pub trace: Vec<TraceEntry>,
    /// Every tool call, failed ones included.
    pub invocations: Vec<ToolInvocationRecord>,
    /// Decision calls made.
    pub steps: usize,
    /// The step budget ran out before a final answer.
    pub budget_exhausted: bool,
    /// Replies that didn't follow the decision grammar.
    pub parse_failures: usize,
}

impl ToolRouter {
    /// A router over `tools` with a six-step budget and two format retries.
    pub fn new(
        provider: Arc<dyn Provider>,
        settings: ModelSettings,
        tools: Vec<Arc<dyn RouterTool>>,
    ) -> Self {
        Self {
            provider,
            settings,
            tools,
            max_steps: 6,
            max_parse_retries: 2,
            events: None,
            telemetry: None,
        }
    }

    /// Decision calls allowed per question.
    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    /// Format reminders sent before raw output is taken as the answer.
    pub fn with_max_parse_retries(mut self, retries: usize) -> Self {
        self.max_parse_retries = retries;
        self
    }

    /// Publish a `ToolExecuted` event per tool call.
    pub fn with_events(mut self, events: Arc<EventBus>) -> Self {
        self.events = Some(events);
        self
    }

    /// Attach a telemetry engine; spans are recorded for traced runs.
    pub fn with_telemetry(mut self, engine: Arc<TelemetryEngine>) -> Self {
        self.telemetry = Some(engine);
        self
    }

    pub fn tools(&self) -> &[Arc<dyn RouterTool>] {
        &self.tools
    }

    pub fn max_steps(&self) -> usize {
        self.max_steps
    }

    pub async fn run(&self, question: &str, history: ChatHistory<'_>) -> Result<RouterResult, Error> {
        self.run_traced(question, history, None).await
    }

    /// Route `question`, recording LLM and tool spans under `trace_id`.
    pub async fn run_traced(
        &self,
        question: &str,
        history: ChatHistory<'_>,
        trace_id: Option<&str>,
    ) -> Result<RouterResult, Error> {
        let mut wm = WorkingMemory::new(self.max_steps);
        let mut parse_failures = 0usize;
        let mut budget_exhausted = false;
        let mut state = LoopState::Thinking;

        info!(max_steps = self.max_steps, tools = self.tools.len(), "Routing question");

        let answer = loop {
            state = match state {
                LoopState::Thinking => {
                    if !wm.tick() {
                        warn!(steps = wm.steps, "Router step budget exhausted");
                        budget_exhausted = true;
                        let answer = match wm.last_output() {
                            Some(output) if !output.trim().is_empty() => output.trim().to_string(),
                            _ => BUDGET_EXHAUSTED_REPLY.to_string(),
                        };
                        LoopState::Done(answer)
                    } else {
                        let output = self.decide(question, history, &wm, trace_id).await?;
                        match parser::parse(&output) {
                            Ok(Decision::Finish { thought, answer }) => {
                                if !thought.is_empty() {
                                    wm.add_thought(&thought);
                                }
                                LoopState::Done(answer)
                            }
                            Ok(Decision::Act { thought, tool, input }) => {
                                if !thought.is_empty() {
                                    wm.add_thought(&thought);
                                }
                                wm.add_action(&tool, &input);
                                LoopState::Acting { tool, input }
                            }
                            Err(e) => {
                                parse_failures += 1;
                                let trimmed = output.trim();
                                debug!(step = wm.steps, error = %e, "Unparseable router decision");
                                if parse_failures > self.max_parse_retries && !trimmed.is_empty() {
                                    LoopState::Done(trimmed.to_string())
                                } else {
                                    LoopState::Observing(format_reminder(&e.to_string()))
                                }
                            }
                        }
                    }
                }
                LoopState::Acting { tool, input } => {
                    let observation = match self.find_tool(&tool) {
                        Some(found) => self.invoke(found, &input, history, &mut wm, trace_id).await?,
                        None => {
                            debug!(tool = %tool, "Model asked for an unknown tool");
                            self.unknown_tool(&tool)
                        }
                    };
                    LoopState::Observing(observation)
                }
                LoopState::Observing(observation) => {
                    wm.add_observation(&observation);
                    LoopState::Thinking
                }
                LoopState::Done(answer) => break answer,
            };
        };

        info!(
            steps = wm.steps,
            tool_calls = wm.invocations.len(),
            budget_exhausted,
            "Router finished"
        );

        Ok(RouterResult {
            answer,
            steps: wm.steps,
            trace: wm.trace,
            invocations: wm.invocations,
            budget_exhausted,
            parse_failures,
        })
    }

    /// One decision call: instructions, prior turns, then the question with
    /// the scratchpad so far.
    async fn decide(
        &self,
        question: &str,
        history: ChatHistory<'_>,
        wm: &WorkingMemory,
        trace_id: Option<&str>,
    ) -> Result<String, Error> {
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(Message::system(router_system_prompt(&self.tools)));
        messages.extend(history.messages());
        messages.push(Message::user(format!("Question: {question}\n{}", wm.render())));

        let request = self
            .settings
            .request(messages)
            .with_stop(vec![STOP_SEQUENCE.to_string()]);

        let start = Instant::now();
        let result = self.provider.complete(request).await;
        let duration_ms = start.elapsed().as_millis() as u64;
        self.record_span(
            trace_id,
            Span::completed(SpanKind::LlmCall, &self.settings.model, duration_ms, result.is_ok()),
        );

        let response = result?;
        debug!(step = wm.steps, chars = response.message.content.len(), "Router decision received");
        Ok(response.message.content)
    }

    async fn invoke(
        &self,
        tool: &Arc<dyn RouterTool>,
        input: &str,
        history: ChatHistory<'_>,
        wm: &mut WorkingMemory,
        trace_id: Option<&str>,
    ) -> Result<String, Error> {
        let start = Instant::now();
        let result = tool.invoke(input, history).await;
        let duration_ms = start.elapsed().as_millis() as u64;
        let success = result.is_ok();

        if let Some(events) = &self.events {
            events.publish(DomainEvent::ToolExecuted {
                tool_name: tool.name().to_string(),
                success,
                duration_ms,
                timestamp: Utc::now(),
            });
        }
        self.record_span(
            trace_id,
            Span::completed(SpanKind::ToolExecution, tool.name(), duration_ms, success),
        );

        let output = match result {
            Ok(output) => output,
            Err(e) => {
                warn!(tool = tool.name(), error = %e, "Tool failed");
                wm.record_invocation(ToolInvocationRecord {
                    tool: tool.name().to_string(),
                    input: input.to_string(),
                    output: e.to_string(),
                    success: false,
                    duration_ms,
                });
                return Err(e);
            }
        };

        debug!(tool = tool.name(), duration_ms, "Tool returned");
        wm.record_invocation(ToolInvocationRecord {
            tool: tool.name().to_string(),
            input: input.to_string(),
            output: output.clone(),
            success: true,
            duration_ms,
        });
        Ok(output)
    }

    /// Match by name or by kind tag, ignoring case.
    fn find_tool(&self, requested: &str) -> Option<&Arc<dyn RouterTool>> {
        self.tools.iter().find(|t| {
            t.name().eq_ignore_ascii_case(requested) || t.kind().as_str().eq_ignore_ascii_case(requested)
        })
    }

    fn unknown_tool(&self, requested: &str) -> String {
        let names: Vec<&str> = self.tools.iter().map(|t| t.name()).collect();
        format!("`{requested}` is not a valid tool, try one of [{}].", names.join(", "))
    }

    fn record_span(&self, trace_id: Option<&str>, span: Span) {
        if let (Some(telemetry), Some(id)) = (&self.telemetry, trace_id) {
            if let Err(e) = telemetry.record_span(id, span) {
                debug!(error = %e, "Span dropped");
            }
        }
    }
}
