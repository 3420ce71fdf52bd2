//! Line-oriented view for the terminal host.
//!
//! A terminal cannot rewrite earlier output, so bubble rewrites are printed
//! as the suffix past what is already on screen. A rewrite that does not
//! extend the shown text (the error message replacing a partial reply)
//! starts a fresh line instead.

use std::io::Write;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::warn;

use super::{ChatView, MessageId};
use crate::session::Role;

struct Bubble {
    role: Role,
    shown: String,
}

struct TerminalState {
    out: Box<dyn Write + Send>,
    input: String,
    bubbles: Vec<Bubble>,
    /// Bubble whose line is still open at the end of the output.
    open: Option<usize>,
    pending_sources: Vec<(String, String)>,
}

/// [`ChatView`] writing the transcript to a terminal.
pub struct TerminalView {
    state: Mutex<TerminalState>,
}

impl std::fmt::Debug for TerminalView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TerminalView").finish_non_exhaustive()
    }
}

impl TerminalView {
    /// View printing to stdout.
    #[must_use]
    pub fn stdout() -> Self {
        Self::new(Box::new(std::io::stdout()))
    }

    #[must_use]
    pub fn new(out: Box<dyn Write + Send>) -> Self {
        Self {
            state: Mutex::new(TerminalState {
                out,
                input: String::new(),
                bubbles: Vec::new(),
                open: None,
                pending_sources: Vec::new(),
            }),
        }
    }

    /// Put a line the user typed into the input buffer.
    pub fn set_input(&self, text: &str) {
        self.state().input = text.to_string();
    }

    /// Terminate the line of a finished reply.
    pub fn end_line(&self) {
        let mut state = self.state();
        state.close_line();
        let _ = state.out.flush();
    }

    fn state(&self) -> MutexGuard<'_, TerminalState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl TerminalState {
    fn write(&mut self, text: &str) {
        if let Err(e) = self.out.write_all(text.as_bytes()) {
            warn!(error = %e, "Terminal write failed");
        }
    }

    fn close_line(&mut self) {
        if self.open.take().is_some() {
            self.write("\n");
        }
    }

    fn prefix(role: Role) -> &'static str {
        match role {
            Role::User => "you> ",
            Role::Assistant => "assistant> ",
        }
    }
}

impl ChatView for TerminalView {
    fn input_value(&self) -> String {
        self.state().input.clone()
    }

    fn clear_input(&self) {
        self.state().input.clear();
    }

    fn append_message(&self, role: Role, text: &str, _loading: bool) -> MessageId {
        let mut state = self.state();
        state.close_line();
        state.write(TerminalState::prefix(role));
        state.write(text);
        state.bubbles.push(Bubble {
            role,
            shown: text.to_string(),
        });
        let index = state.bubbles.len() - 1;
        state.open = Some(index);
        MessageId(index)
    }

    fn set_loading(&self, _id: MessageId, _loading: bool) {}

    fn set_message_text(&self, id: MessageId, text: &str) {
        let mut state = self.state();
        let Some(bubble) = state.bubbles.get(id.0) else {
            return;
        };
        let role = bubble.role;

        let suffix = match text.strip_prefix(bubble.shown.as_str()) {
            Some(suffix) if state.open == Some(id.0) => Some(suffix.to_string()),
            _ => None,
        };
        match suffix {
            Some(suffix) => state.write(&suffix),
            None => {
                state.close_line();
                state.write(TerminalState::prefix(role));
                state.write(text);
                state.open = Some(id.0);
            }
        }
        state.bubbles[id.0].shown = text.to_string();
    }

    fn scroll_to_bottom(&self) {
        if let Err(e) = self.state().out.flush() {
            warn!(error = %e, "Terminal flush failed");
        }
    }

    fn clear_sources(&self) {
        self.state().pending_sources.clear();
    }

    fn append_source(&self, title: &str, score: &str) {
        self.state()
            .pending_sources
            .push((title.to_string(), score.to_string()));
    }

    fn set_sources_visible(&self, visible: bool) {
        if !visible {
            return;
        }
        let mut state = self.state();
        state.close_line();
        let rows = std::mem::take(&mut state.pending_sources);
        let mut panel = String::from("sources:\n");
        for (title, score) in &rows {
            panel.push_str(&format!("  - {title} ({score})\n"));
        }
        state.write(&panel);
        state.pending_sources = rows;
        let _ = state.out.flush();
    }
}
