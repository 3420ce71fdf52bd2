//! RAG chat widget
//!
//! A chat widget that streams assistant replies from a retrieval-augmented
//! backend and shows the sources each answer was grounded on.
//!
//! # Architecture
//!
//! - **Widget**: input handling, message bubbles, streamed replies, sources panel
//! - **Transport**: `reqwest` client for `/api/chat` (chunked text or SSE) and `/api/sources`
//! - **View**: the page surface, either an in-memory document or a terminal
//!
//! # Modules
//!
//! - [`widget`]: [`ChatWidget`] and the exchange lifecycle
//! - [`transport`]: backend transport trait and HTTP implementation
//! - [`view`]: rendering surface trait and implementations
//! - [`session`]: turns and conversation history
//! - [`sources`]: citation types and formatting
//! - [`config`]: layered configuration
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use rag_chat_widget::{ChatWidget, config::WidgetConfig, view::DomView};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = WidgetConfig::load_from_args(["widget", "--base-url", "http://127.0.0.1:5000"])?;
//! let view = Arc::new(DomView::with_host_page(&config.dom)?);
//! let widget = ChatWidget::from_config(&config, view.clone())?;
//!
//! view.set_input("What does the service cost?");
//! if let Some(exchange) = widget.send_message() {
//!     let outcome = exchange.await;
//!     println!("{:?}", outcome.reply);
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod session;
pub mod sources;
pub mod transport;
pub mod view;
pub mod widget;

pub use error::{Result, WidgetError};
pub use widget::{ChatWidget, EventResponse, Exchange, ExchangeOutcome, InputEvent};
