//! Conversation turns and the widget's history.
//!
//! The history is an explicit state object owned by one widget instance.
//! Clones share the same underlying turns, so the exchange futures spawned
//! by a send can append to it without borrowing the widget.
//!
//! # Example
//!
//! ```rust
//! use rag_chat_widget::session::{History, Role};
//!
//! let history = History::new();
//! history.push_user("Hello!");
//!
//! let turns = history.snapshot();
//! assert_eq!(turns.len(), 1);
//! assert_eq!(turns[0].role, Role::User);
//! ```

mod history;

pub use history::{ChatTurn, History, Role};
