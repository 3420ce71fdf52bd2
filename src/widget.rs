//! The chat widget.
//!
//! [`ChatWidget`] ties a [`ChatView`] to a [`ChatTransport`]. A send does its
//! view work immediately (user bubble, cleared input, loading placeholder,
//! user turn in history) and hands back an [`Exchange`]: a future that runs
//! the reply stream and the sources fetch concurrently. The host decides how
//! to drive it. Exchanges are never cancelled by later sends.
//!
//! # Turn lifecycle
//!
//! Each assistant turn moves through [`TurnPhase`]:
//! `Loading` until the first chunk, `Streaming` while chunks arrive, then
//! `Completed` (reply pushed to history) or `Failed` (error text shown,
//! history untouched).
//!
//! # Stale sources
//!
//! Every send bumps a generation counter. Bubbles belong to one exchange, but
//! the sources panel is shared, so a sources result from an older generation
//! is dropped instead of replacing the newer panel.

use std::fmt;
use std::future::{Future, IntoFuture};
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::StreamExt;
use futures::future::{BoxFuture, FutureExt};
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::config::{UiConfig, WidgetConfig};
use crate::error::Result;
use crate::session::{ChatTurn, History, Role};
use crate::sources::SourcesRequest;
use crate::transport::{ChatRequest, ChatTransport, HttpTransport};
use crate::view::{ChatView, MessageId};

/// Phase of the assistant turn in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnPhase {
    Idle,
    Loading,
    Streaming,
    Completed,
    Failed,
}

impl TurnPhase {
    /// Whether `next` is a legal step from `self`.
    #[must_use]
    pub fn can_advance_to(self, next: TurnPhase) -> bool {
        use TurnPhase::{Completed, Failed, Idle, Loading, Streaming};
        matches!(
            (self, next),
            (Idle, Loading)
                | (Loading, Streaming | Completed | Failed)
                | (Streaming, Completed | Failed)
        )
    }

    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// How the reply half of an exchange ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyOutcome {
    /// Full reply text, now the last assistant turn recorded for this exchange.
    Completed(String),
    /// The error message replaced the bubble.
    Failed,
}

/// How the sources half of an exchange ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourcesOutcome {
    /// Panel repopulated with this many sources.
    Shown(usize),
    /// Empty result or fetch failure, panel hidden.
    Hidden,
    /// A newer send owns the panel; result discarded.
    Superseded,
}

/// Result of driving an [`Exchange`] to completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeOutcome {
    pub request_id: Uuid,
    pub generation: u64,
    pub reply: ReplyOutcome,
    pub sources: SourcesOutcome,
}

/// The network half of one send. Await it, or spawn `into_future()`.
///
/// Nothing goes over the network until the exchange is polled, so dropping
/// it leaves the placeholder bubble loading forever:
///
/// ```compile_fail
/// #![deny(unused_must_use)]
/// fn send(widget: &rag_chat_widget::ChatWidget) {
///     widget.send_message().unwrap();
/// }
/// ```
#[must_use = "the exchange does nothing unless awaited or spawned"]
pub struct Exchange {
    request_id: Uuid,
    generation: u64,
    message_id: MessageId,
    future: BoxFuture<'static, ExchangeOutcome>,
}

impl Exchange {
    #[must_use]
    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Bubble the reply streams into.
    #[must_use]
    pub fn message_id(&self) -> MessageId {
        self.message_id
    }
}

impl fmt::Debug for Exchange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Exchange")
            .field("request_id", &self.request_id)
            .field("generation", &self.generation)
            .field("message_id", &self.message_id)
            .finish_non_exhaustive()
    }
}

impl IntoFuture for Exchange {
    type Output = ExchangeOutcome;
    type IntoFuture = Pin<Box<dyn Future<Output = ExchangeOutcome> + Send>>;

    fn into_future(self) -> Self::IntoFuture {
        self.future
    }
}

/// User input delivered by the host page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEvent {
    /// Key pressed in the input field, named like `KeyboardEvent.key`.
    KeyDown { key: String, shift: bool },
    /// Send button clicked.
    SendClick,
}

impl InputEvent {
    pub fn key(key: impl Into<String>, shift: bool) -> Self {
        Self::KeyDown {
            key: key.into(),
            shift,
        }
    }
}

/// What the host should do after an [`InputEvent`].
#[derive(Debug, Default)]
pub struct EventResponse {
    /// Suppress the host's default action (inserting a newline).
    pub prevent_default: bool,
    /// Exchange started by the event, if a message was sent.
    pub exchange: Option<Exchange>,
}

struct WidgetInner {
    transport: Arc<dyn ChatTransport>,
    view: Arc<dyn ChatView>,
    history: History,
    ui: UiConfig,
    generation: AtomicU64,
}

/// Chat widget instance. Clones share the same history and view.
#[derive(Clone)]
pub struct ChatWidget {
    inner: Arc<WidgetInner>,
}

impl fmt::Debug for ChatWidget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatWidget")
            .field("history_len", &self.inner.history.len())
            .field("generation", &self.generation())
            .finish_non_exhaustive()
    }
}

impl ChatWidget {
    pub fn new(transport: Arc<dyn ChatTransport>, view: Arc<dyn ChatView>, ui: UiConfig) -> Self {
        Self {
            inner: Arc::new(WidgetInner {
                transport,
                view,
                history: History::new(),
                ui,
                generation: AtomicU64::new(0),
            }),
        }
    }

    /// Widget talking HTTP to the configured backend.
    pub fn from_config(config: &WidgetConfig, view: Arc<dyn ChatView>) -> Result<Self> {
        let transport = HttpTransport::new(&config.backend)?;
        Ok(Self::new(Arc::new(transport), view, config.ui.clone()))
    }

    #[must_use]
    pub fn history(&self) -> &History {
        &self.inner.history
    }

    /// Generation of the most recent send, 0 before the first.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.inner.generation.load(Ordering::SeqCst)
    }

    /// Route a host input event. Enter sends unless Shift is held; the send
    /// button always sends.
    pub fn handle_event(&self, event: &InputEvent) -> EventResponse {
        match event {
            InputEvent::KeyDown { key, shift: false } if key == "Enter" => EventResponse {
                prevent_default: true,
                exchange: self.send_message(),
            },
            InputEvent::SendClick => EventResponse {
                prevent_default: false,
                exchange: self.send_message(),
            },
            InputEvent::KeyDown { .. } => EventResponse::default(),
        }
    }

    /// Send the input field's contents.
    ///
    /// Returns `None` without touching the view when the trimmed input is
    /// empty. Otherwise the view and history are updated right away and the
    /// returned [`Exchange`] performs the network calls when driven.
    ///
    /// ```compile_fail
    /// #![deny(unused_must_use)]
    /// fn send(widget: &rag_chat_widget::ChatWidget) {
    ///     widget.send_message();
    /// }
    /// ```
    #[must_use = "the exchange does nothing unless awaited or spawned"]
    pub fn send_message(&self) -> Option<Exchange> {
        let inner = &self.inner;
        let message = inner.view.input_value().trim().to_string();
        if message.is_empty() {
            return None;
        }

        inner.view.append_message(Role::User, &message, false);
        inner.view.scroll_to_bottom();
        inner.view.clear_input();

        let message_id = inner.view.append_message(Role::Assistant, "", true);
        inner.view.scroll_to_bottom();

        inner.history.push_user(&message);
        let history = inner.history.snapshot();

        let generation = inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let request_id = Uuid::new_v4();

        info!(
            name: "chat.exchange.started",
            request_id = %request_id,
            generation,
            history_len = history.len(),
            "Sending message"
        );

        let turn = Turn {
            inner: Arc::clone(inner),
            request_id,
            generation,
            message_id,
            message,
        };
        let future = async move {
            let (reply, sources) = futures::join!(turn.stream_reply(history), turn.load_sources());
            info!(
                name: "chat.exchange.finished",
                request_id = %turn.request_id,
                completed = matches!(reply, ReplyOutcome::Completed(_)),
                sources = ?sources,
                "Exchange finished"
            );
            ExchangeOutcome {
                request_id: turn.request_id,
                generation: turn.generation,
                reply,
                sources,
            }
        }
        .boxed();

        Some(Exchange {
            request_id,
            generation,
            message_id,
            future,
        })
    }
}

/// Everything one exchange needs after `send_message` returns.
struct Turn {
    inner: Arc<WidgetInner>,
    request_id: Uuid,
    generation: u64,
    message_id: MessageId,
    message: String,
}

impl Turn {
    async fn stream_reply(&self, history: Vec<ChatTurn>) -> ReplyOutcome {
        let inner = &self.inner;
        match self.read_reply(history).await {
            Ok(text) => {
                inner.history.push_assistant(&text);
                debug!(
                    request_id = %self.request_id,
                    phase = ?TurnPhase::Completed,
                    reply_len = text.len(),
                    "Reply completed"
                );
                ReplyOutcome::Completed(text)
            }
            Err(e) => {
                error!(
                    name: "chat.stream.failed",
                    request_id = %self.request_id,
                    error = %e,
                    "Error fetching streaming response"
                );
                inner.view.set_loading(self.message_id, false);
                inner
                    .view
                    .set_message_text(self.message_id, &inner.ui.error_message);
                inner.view.scroll_to_bottom();
                ReplyOutcome::Failed
            }
        }
    }

    /// Stream the reply into the bubble, returning the full text.
    async fn read_reply(&self, history: Vec<ChatTurn>) -> Result<String> {
        let view = &self.inner.view;
        let request = ChatRequest {
            message: self.message.clone(),
            history,
        };
        let mut stream = self.inner.transport.stream_chat(request).await?;

        let mut phase = TurnPhase::Loading;
        let mut reply = String::new();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            if phase == TurnPhase::Loading {
                debug_assert!(phase.can_advance_to(TurnPhase::Streaming));
                view.set_loading(self.message_id, false);
                phase = TurnPhase::Streaming;
                debug!(request_id = %self.request_id, phase = ?phase, "First chunk received");
            }
            reply.push_str(&chunk);
            view.set_message_text(self.message_id, &reply);
            view.scroll_to_bottom();
        }

        // Empty body: no chunk ever cleared the flag
        if phase == TurnPhase::Loading {
            view.set_loading(self.message_id, false);
        }
        Ok(reply)
    }

    fn is_current(&self) -> bool {
        self.inner.generation.load(Ordering::SeqCst) == self.generation
    }

    async fn load_sources(&self) -> SourcesOutcome {
        let inner = &self.inner;
        let request = SourcesRequest {
            message: self.message.clone(),
        };
        let result = inner.transport.fetch_sources(request).await;

        if !self.is_current() {
            debug!(
                request_id = %self.request_id,
                generation = self.generation,
                "Discarding sources from superseded send"
            );
            return SourcesOutcome::Superseded;
        }

        match result {
            Ok(sources) if !sources.is_empty() => {
                inner.view.clear_sources();
                for source in &sources {
                    inner.view.append_source(
                        source.display_title(&inner.ui.untitled_label),
                        &source.relevance_label(),
                    );
                }
                inner.view.set_sources_visible(true);
                SourcesOutcome::Shown(sources.len())
            }
            Ok(_) => {
                inner.view.set_sources_visible(false);
                SourcesOutcome::Hidden
            }
            Err(e) => {
                error!(
                    name: "chat.sources.failed",
                    request_id = %self.request_id,
                    error = %e,
                    "Error fetching sources"
                );
                inner.view.set_sources_visible(false);
                SourcesOutcome::Hidden
            }
        }
    }
}
