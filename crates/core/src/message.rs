//! Message and Turn domain types.
//!
//! A `Turn` is what the session remembers; a `Message` is what goes over the
//! wire to the model. `ChatHistory` is the read-only bridge between the two:
//! the orchestrator lends a slice of turns, the reformulator and composer
//! render it into messages per call and keep nothing afterwards.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The role of a message sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The end user
    User,
    /// The assistant
    Assistant,
    /// Instructions for the model
    System,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::System => "system",
        }
    }
}

/// A single message sent to a provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Unique message ID
    pub id: String,

    /// Who sent this message
    pub role: Role,

    /// The text content
    pub content: String,

    /// Timestamp
    pub timestamp: DateTime<Utc>,
}

impl Message {
    fn with_role(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    /// Create a new user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::with_role(Role::User, content)
    }

    /// Create a new assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::with_role(Role::Assistant, content)
    }

    /// Create a new system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::with_role(Role::System, content)
    }
}

/// How an assistant turn was produced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnMode {
    /// Normal answer (also used for every user turn).
    #[default]
    Normal,
    /// Canned fallback produced while the model was rate limited.
    Degraded,
    /// Apology produced after an unrecoverable failure.
    Error,
}

impl TurnMode {
    pub fn is_normal(&self) -> bool {
        *self == Self::Normal
    }
}

/// One entry of the chat history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "TurnMode::is_normal")]
    pub mode: TurnMode,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            mode: TurnMode::Normal,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            mode: TurnMode::Normal,
        }
    }

    /// Set the mode annotation.
    pub fn with_mode(mut self, mode: TurnMode) -> Self {
        self.mode = mode;
        self
    }

    /// Convert to a provider message.
    pub fn to_message(&self) -> Message {
        match self.role {
            Role::User => Message::user(&self.content),
            Role::System => Message::system(&self.content),
            Role::Assistant => Message::assistant(&self.content),
        }
    }
}

/// A borrowed, read-only view over prior turns.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChatHistory<'a> {
    turns: &'a [Turn],
}

impl<'a> ChatHistory<'a> {
    pub fn new(turns: &'a [Turn]) -> Self {
        Self { turns }
    }

    pub fn empty() -> Self {
        Self { turns: &[] }
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn turns(&self) -> &'a [Turn] {
        self.turns
    }

    /// Render as human/assistant messages, in order.
    pub fn messages(&self) -> Vec<Message> {
        self.turns.iter().map(Turn::to_message).collect()
    }
}

impl<'a> From<&'a [Turn]> for ChatHistory<'a> {
    fn from(turns: &'a [Turn]) -> Self {
        Self::new(turns)
    }
}

impl<'a> From<&'a Vec<Turn>> for ChatHistory<'a> {
    fn from(turns: &'a Vec<Turn>) -> Self {
        Self::new(turns.as_slice())
    }
}
