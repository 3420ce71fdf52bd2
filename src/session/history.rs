//! Turn types and the append-only history.

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use serde::{Deserialize, Serialize};

/// Author of a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    /// Wire and CSS class name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One completed message of the conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Ordered, append-only sequence of completed turns.
///
/// Turns are never mutated or removed once pushed.
#[derive(Debug, Clone, Default)]
pub struct History {
    turns: Arc<RwLock<Vec<ChatTurn>>>,
}

impl History {
    /// Create an empty history.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a user turn.
    pub fn push_user(&self, content: impl Into<String>) {
        self.push(ChatTurn::user(content));
    }

    /// Record a completed assistant turn.
    pub fn push_assistant(&self, content: impl Into<String>) {
        self.push(ChatTurn::assistant(content));
    }

    fn push(&self, turn: ChatTurn) {
        self.turns
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(turn);
    }

    /// Copy of every turn so far, oldest first.
    #[must_use]
    pub fn snapshot(&self) -> Vec<ChatTurn> {
        self.turns
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Most recent turn, if any.
    #[must_use]
    pub fn last(&self) -> Option<ChatTurn> {
        self.turns
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .cloned()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.turns
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_appends_in_order() {
        let history = History::new();
        assert!(history.is_empty());

        history.push_user("Hello");
        history.push_assistant("Hi there!");
        assert_eq!(history.len(), 2);

        let turns = history.snapshot();
        assert_eq!(turns[0], ChatTurn::user("Hello"));
        assert_eq!(turns[1], ChatTurn::assistant("Hi there!"));
        assert_eq!(history.last(), Some(ChatTurn::assistant("Hi there!")));
    }

    #[test]
    fn test_clones_share_turns() {
        let history = History::new();
        let handle = history.clone();

        handle.push_user("from a clone");
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn test_turn_wire_format() {
        let json = serde_json::to_string(&ChatTurn::assistant("ok")).unwrap();
        assert_eq!(json, r#"{"role":"assistant","content":"ok"}"#);

        let turn: ChatTurn = serde_json::from_str(r#"{"role":"user","content":"q"}"#).unwrap();
        assert_eq!(turn.role, Role::User);
    }
}
