//! Rendering surface for the widget.
//!
//! [`ChatView`] is the widget's only way to touch its page: read and clear
//! the input, add message bubbles, rewrite a bubble's text, scroll, and fill
//! the sources panel. Implementations use interior mutability so a view can
//! be shared between the widget and the exchanges it launches.
//!
//! # Implementations
//!
//! - [`DomView`]: mounted on an in-memory [`Document`] with the element ids of
//!   the host page; serialisable with [`Document::to_html`].
//! - [`TerminalView`]: line-oriented transcript for the terminal host.

pub mod dom;
pub mod html;
pub mod terminal;

pub use dom::{Document, DomView, Element, NodeId};
pub use terminal::TerminalView;

use crate::session::Role;

/// Handle to one message bubble in a view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageId(pub usize);

/// The page surface the widget renders into.
pub trait ChatView: Send + Sync {
    /// Current contents of the input field.
    fn input_value(&self) -> String;

    /// Empty the input field.
    fn clear_input(&self);

    /// Append a bubble for `role` showing `text`, optionally flagged as loading.
    fn append_message(&self, role: Role, text: &str, loading: bool) -> MessageId;

    /// Set or clear the loading flag of a bubble.
    fn set_loading(&self, id: MessageId, loading: bool);

    /// Replace the whole text of a bubble.
    fn set_message_text(&self, id: MessageId, text: &str);

    /// Scroll the transcript to its last bubble.
    fn scroll_to_bottom(&self);

    /// Remove every rendered source.
    fn clear_sources(&self);

    /// Append one source row.
    fn append_source(&self, title: &str, score: &str);

    /// Show or hide the sources panel.
    fn set_sources_visible(&self, visible: bool);
}
