//! Domain events: what a turn did, for whoever is listening.
//!
//! The router, the retry wrapper and the orchestrator publish; the CLI's
//! verbose mode and the tests subscribe.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Something observable happened while answering a turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DomainEvent {
    /// The orchestrator produced a reply
    TurnCompleted {
        mode: crate::message::TurnMode,
        steps: usize,
        timestamp: DateTime<Utc>,
    },

    /// The router invoked a tool
    ToolExecuted {
        tool_name: String,
        success: bool,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },

    /// An outbound call was throttled and will be retried (or gave up)
    RateLimited {
        attempt: u32,
        max_attempts: u32,
        timestamp: DateTime<Utc>,
    },

    /// A turn failed for a reason other than rate limiting
    ErrorOccurred {
        context: String,
        error_message: String,
        timestamp: DateTime<Utc>,
    },
}

/// Fan-out of [`DomainEvent`]s over a `tokio::sync::broadcast` channel.
///
/// Slow subscribers lag and lose the oldest events; publishers never block.
pub struct EventBus {
    sender: broadcast::Sender<Arc<DomainEvent>>,
}

impl EventBus {
    /// `capacity` events are buffered per subscriber.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn publish(&self, event: DomainEvent) {
        // Err only means nobody is subscribed.
        let _ = self.sender.send(Arc::new(event));
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Arc<DomainEvent>> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_receive_published_events() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        bus.publish(DomainEvent::ToolExecuted {
            tool_name: "restaurant_rag".into(),
            success: true,
            duration_ms: 42,
            timestamp: Utc::now(),
        });

        let event = rx.recv().await.unwrap();
        match event.as_ref() {
            DomainEvent::ToolExecuted { tool_name, success, .. } => {
                assert_eq!(tool_name, "restaurant_rag");
                assert!(success);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn publishing_without_subscribers_is_silent() {
        let bus = EventBus::default();
        bus.publish(DomainEvent::RateLimited {
            attempt: 1,
            max_attempts: 5,
            timestamp: Utc::now(),
        });

        let mut late = bus.subscribe();
        assert!(late.try_recv().is_err());
    }
}
