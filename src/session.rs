//! Conversation session: an ordered, append-only turn log

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Role of a turn's speaker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// A single conversation turn, immutable once appended
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    /// Position of this turn within its session
    pub turn_id: u64,

    /// Who spoke
    pub role: Role,

    /// What was said
    pub content: String,

    /// When the turn was appended
    pub timestamp: DateTime<Utc>,
}

/// An ordered, append-only log of conversation turns.
///
/// The session id is generated once per process start; sessions are not
/// resumed across restarts.
pub struct Session {
    id: Uuid,
    turns: Vec<Turn>,
}

impl Session {
    /// Start a fresh session with a new id
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            turns: Vec::new(),
        }
    }

    /// The session's id
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Append a turn and return it
    pub fn append(&mut self, role: Role, content: impl Into<String>) -> Turn {
        let turn = Turn {
            turn_id: self.turns.len() as u64,
            role,
            content: content.into(),
            timestamp: Utc::now(),
        };
        self.turns.push(turn.clone());
        turn
    }

    /// The `n` most recent turns, oldest first
    pub fn last_n(&self, n: usize) -> &[Turn] {
        let start = self.turns.len().saturating_sub(n);
        &self.turns[start..]
    }

    /// Number of turns appended so far
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_preserves_order_and_numbers_turns() {
        let mut session = Session::new();
        session.append(Role::User, "first");
        session.append(Role::Assistant, "second");
        session.append(Role::User, "third");

        assert_eq!(session.len(), 3);
        let turns = session.last_n(3);
        assert_eq!(turns[0].turn_id, 0);
        assert_eq!(turns[0].content, "first");
        assert_eq!(turns[2].turn_id, 2);
        assert_eq!(turns[2].content, "third");
    }

    #[test]
    fn last_n_is_chronological_oldest_first() {
        let mut session = Session::new();
        for i in 0..5 {
            session.append(Role::User, format!("turn {}", i));
        }

        let tail = session.last_n(2);
        assert_eq!(tail.len(), 2);
        assert_eq!(tail[0].content, "turn 3");
        assert_eq!(tail[1].content, "turn 4");
    }

    #[test]
    fn last_n_beyond_length_returns_everything() {
        let mut session = Session::new();
        session.append(Role::User, "only");

        assert_eq!(session.last_n(10).len(), 1);
        assert!(Session::new().last_n(10).is_empty());
    }

    #[test]
    fn each_run_gets_a_fresh_session_id() {
        let a = Session::new();
        let b = Session::new();
        assert_ne!(a.id(), b.id());
    }
}
