//! Chat session state and its JSON snapshot on disk.
//!
//! The snapshot is read once at startup and rewritten in full after each
//! turn that should survive a restart. A missing or unreadable file is an
//! empty session, never an error.

use std::io;
use std::path::{Path, PathBuf};

use nugget_core::message::{ChatHistory, Role, Turn, TurnMode};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// The ordered turns of one conversation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Session {
    pub turns: Vec<Turn>,
    /// Set when the turns came from a saved snapshot.
    #[serde(skip)]
    pub loaded: bool,
}

impl PartialEq for Session {
    fn eq(&self, other: &Self) -> bool {
        self.turns == other.turns
    }
}

impl Eq for Session {}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    /// All turns except the last `skip`.
    pub fn history_before(&self, skip: usize) -> ChatHistory<'_> {
        let end = self.turns.len().saturating_sub(skip);
        ChatHistory::new(&self.turns[..end])
    }

    pub fn history(&self) -> ChatHistory<'_> {
        ChatHistory::new(&self.turns)
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }

    /// The turns worth saving: every error reply is dropped together with
    /// the user message that triggered it.
    pub fn persistable(&self) -> Vec<&Turn> {
        let mut kept: Vec<&Turn> = Vec::with_capacity(self.turns.len());
        for turn in &self.turns {
            if turn.mode == TurnMode::Error {
                if kept.last().is_some_and(|prev| prev.role == Role::User) {
                    kept.pop();
                }
                continue;
            }
            kept.push(turn);
        }
        kept
    }
}

/// On-disk shape written by [`SessionStore::save`].
#[derive(Serialize)]
struct SnapshotRef<'a> {
    turns: Vec<&'a Turn>,
}

/// Accepts the current `{"turns": [...]}` document and the older bare array.
#[derive(Deserialize)]
#[serde(untagged)]
enum Snapshot {
    Current(Session),
    Legacy(Vec<Turn>),
}

/// Where a [`Session`] is persisted.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the saved session, or an empty one when there is none.
    pub fn load(&self) -> Session {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No saved session, starting fresh");
                return Session::new();
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Failed to read saved session");
                return Session::new();
            }
        };

        match serde_json::from_str::<Snapshot>(&content) {
            Ok(Snapshot::Current(session)) => {
                info!(turns = session.len(), "Session restored");
                Session {
                    loaded: true,
                    ..session
                }
            }
            Ok(Snapshot::Legacy(turns)) => {
                info!(turns = turns.len(), "Session restored from legacy format");
                Session {
                    turns,
                    loaded: true,
                }
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Saved session is corrupt, starting fresh");
                Session::new()
            }
        }
    }

    /// Overwrite the snapshot with the persistable part of `session`.
    ///
    /// Writes to a sibling temp file first, so a failed write leaves the
    /// previous snapshot intact.
    pub fn save(&self, session: &Session) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let snapshot = SnapshotRef {
            turns: session.persistable(),
        };
        let json = serde_json::to_string_pretty(&snapshot)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &self.path)?;
        debug!(path = %self.path.display(), turns = snapshot.turns.len(), "Session saved");
        Ok(())
    }

    /// Delete the snapshot. Missing is fine.
    pub fn clear(&self) -> io::Result<()> {
        match std::fs::remove_file(&self.path) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }
}
