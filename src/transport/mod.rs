//! Backend transport for the widget.
//!
//! The widget never talks HTTP directly. It asks a [`ChatTransport`] for two
//! things: a lazy, finite stream of decoded text chunks for the assistant
//! reply, and the ranked source list for a query. Dropping a [`TextStream`]
//! stops reading the body.
//!
//! # Implementations
//!
//! - [`HttpTransport`]: `reqwest` client against `/api/chat` and `/api/sources`,
//!   reading the chat body either as plain chunked text or as Server-Sent Events
//!   (see [`StreamFormat`]).

pub mod decoder;
pub mod http;
pub mod sse;

pub use decoder::Utf8ChunkDecoder;
pub use http::HttpTransport;

use std::fmt;
use std::pin::Pin;

use futures::Stream;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::session::ChatTurn;
use crate::sources::{Source, SourcesRequest};

/// Stream of decoded text chunks making up one assistant reply.
pub type TextStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// Request body for `POST /api/chat`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    pub history: Vec<ChatTurn>,
}

/// How the chat endpoint frames its streamed body.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum StreamFormat {
    /// Plain text, each network chunk is a piece of the reply.
    #[default]
    #[serde(alias = "text")]
    #[value(alias = "text")]
    Chunked,
    /// `text/event-stream`, each `data:` payload is a piece of the reply.
    #[serde(alias = "event-stream")]
    #[value(alias = "event-stream")]
    Sse,
}

impl StreamFormat {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Chunked => "chunked",
            Self::Sse => "sse",
        }
    }
}

impl fmt::Display for StreamFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Source of assistant replies and source citations.
#[async_trait::async_trait]
pub trait ChatTransport: Send + Sync {
    /// Start streaming the assistant reply for `request`.
    ///
    /// Resolves once the backend has accepted the request; a non-success
    /// status is an error here, before any chunk is produced.
    async fn stream_chat(&self, request: ChatRequest) -> Result<TextStream>;

    /// Fetch ranked sources for `request`.
    async fn fetch_sources(&self, request: SourcesRequest) -> Result<Vec<Source>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_format_wire_names() {
        let parse = |s: &str| serde_json::from_value::<StreamFormat>(serde_json::json!(s));
        assert_eq!(parse("chunked").unwrap(), StreamFormat::Chunked);
        assert_eq!(parse("text").unwrap(), StreamFormat::Chunked);
        assert_eq!(parse("sse").unwrap(), StreamFormat::Sse);
        assert_eq!(parse("event-stream").unwrap(), StreamFormat::Sse);
        assert!(parse("carrier-pigeon").is_err());
        assert_eq!(serde_json::to_value(StreamFormat::Sse).unwrap(), "sse");
    }
}
