//! Session/turn orchestration.
//!
//! One user message in, one assistant reply out. The orchestrator owns the
//! policy for failures: a spent rate-limit budget degrades to a canned
//! reply, anything else becomes an apology. Neither reaches the caller as an
//! error.
//!
//! | Outcome | Reply | Mode | Persisted |
//! |---------|-------|------|-----------|
//! | router answered | the answer | `Normal` | yes |
//! | rate limit exhausted | keyword fallback, prefixed | `Degraded` | yes |
//! | any other error | apology with the error detail | `Error` | no |

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use nugget_core::error::Error;
use nugget_core::event::{DomainEvent, EventBus};
use nugget_core::message::{Turn, TurnMode};
use nugget_telemetry::{Span, SpanKind, TelemetryEngine};
use tracing::{debug, error, info, warn};

use crate::fallback::degraded_reply;
use crate::patterns::ToolRouter;
use crate::session::{Session, SessionStore};

/// What a single turn produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnOutcome {
    /// Text shown to the user, also appended to the session.
    pub reply: String,
    /// How the reply was produced; decides whether it is saved.
    pub mode: TurnMode,
    /// Router decision calls made (0 when the router failed).
    pub steps: usize,
}

/// Runs one user turn end to end and applies the failure policy.
pub struct TurnOrchestrator {
    router: ToolRouter,
    persistence: Option<SessionStore>,
    events: Option<Arc<EventBus>>,
    telemetry: Option<Arc<TelemetryEngine>>,
}

impl TurnOrchestrator {
    pub fn new(router: ToolRouter) -> Self {
        Self {
            router,
            persistence: None,
            events: None,
            telemetry: None,
        }
    }

    /// Save the session after every normal or degraded turn.
    pub fn with_persistence(mut self, store: SessionStore) -> Self {
        self.persistence = Some(store);
        self
    }

    /// Publish `TurnCompleted` and `ErrorOccurred` events.
    pub fn with_events(mut self, events: Arc<EventBus>) -> Self {
        self.events = Some(events);
        self
    }

    /// Record a trace and a turn span per call, and count turns by mode.
    pub fn with_telemetry(mut self, engine: Arc<TelemetryEngine>) -> Self {
        self.telemetry = Some(engine);
        self
    }

    pub fn router(&self) -> &ToolRouter {
        &self.router
    }

    pub async fn handle_turn(&self, session: &mut Session, text: &str) -> TurnOutcome {
        session.push(Turn::user(text));
        let trace_id = self.telemetry.as_ref().map(|t| t.start_trace());
        let start = Instant::now();

        let result = self
            .router
            .run_traced(text, session.history_before(1), trace_id.as_deref())
            .await;

        let outcome = match result {
            Ok(routed) => TurnOutcome {
                reply: routed.answer,
                mode: TurnMode::Normal,
                steps: routed.steps,
            },
            Err(e) if e.is_rate_limit_exhausted() => {
                warn!(error = %e, "Rate limit budget spent, answering from fallback");
                TurnOutcome {
                    reply: degraded_reply(text),
                    mode: TurnMode::Degraded,
                    steps: 0,
                }
            }
            Err(e) => {
                error!(error = %e, "Turn failed");
                self.publish(DomainEvent::ErrorOccurred {
                    context: "turn".into(),
                    error_message: e.to_string(),
                    timestamp: Utc::now(),
                });
                TurnOutcome {
                    reply: error_reply(&e),
                    mode: TurnMode::Error,
                    steps: 0,
                }
            }
        };

        session.push(Turn::assistant(&outcome.reply).with_mode(outcome.mode));
        if outcome.mode != TurnMode::Error {
            self.persist(session);
        }

        if let (Some(telemetry), Some(id)) = (&self.telemetry, trace_id.as_deref()) {
            let span = Span::completed(
                SpanKind::Turn,
                format!("{:?}", outcome.mode).to_lowercase(),
                start.elapsed().as_millis() as u64,
                outcome.mode == TurnMode::Normal,
            );
            if let Err(e) = telemetry.record_span(id, span) {
                debug!(error = %e, "Turn span dropped");
            }
            telemetry.record_turn(outcome.mode);
            telemetry.end_trace(id);
        }

        self.publish(DomainEvent::TurnCompleted {
            mode: outcome.mode,
            steps: outcome.steps,
            timestamp: Utc::now(),
        });
        info!(mode = ?outcome.mode, steps = outcome.steps, "Turn completed");
        outcome
    }

    fn persist(&self, session: &Session) {
        let Some(store) = &self.persistence else {
            return;
        };
        if let Err(e) = store.save(session) {
            warn!(path = %store.path().display(), error = %e, "Failed to save session");
        }
    }

    fn publish(&self, event: DomainEvent) {
        if let Some(events) = &self.events {
            events.publish(event);
        }
    }
}

/// The apology shown for unrecoverable failures.
pub fn error_reply(error: &Error) -> String {
    format!(
        "I'm sorry, I ran into a problem answering that: {error}. Please try again or rephrase your question."
    )
}
