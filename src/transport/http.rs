//! `reqwest` transport against the chat backend.

use futures::{Stream, StreamExt};
use tracing::debug;
use url::Url;

use super::decoder::Utf8ChunkDecoder;
use super::sse::{SseFrame, SseParser};
use super::{ChatRequest, ChatTransport, StreamFormat, TextStream};
use crate::config::BackendConfig;
use crate::error::{Result, WidgetError};
use crate::sources::{Source, SourcesRequest, SourcesResponse};

/// HTTP transport posting JSON to the chat and sources endpoints.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: reqwest::Client,
    chat_url: Url,
    sources_url: Url,
    format: StreamFormat,
}

impl HttpTransport {
    /// Build a transport from backend settings.
    pub fn new(config: &BackendConfig) -> Result<Self> {
        Self::with_client(config, reqwest::Client::new())
    }

    /// Build a transport with a custom reqwest client.
    pub fn with_client(config: &BackendConfig, http: reqwest::Client) -> Result<Self> {
        let base = Url::parse(&config.base_url)?;
        Ok(Self {
            http,
            chat_url: endpoint(&base, &config.chat_path)?,
            sources_url: endpoint(&base, &config.sources_path)?,
            format: config.stream_format,
        })
    }

    #[must_use]
    pub fn chat_url(&self) -> &Url {
        &self.chat_url
    }

    #[must_use]
    pub fn sources_url(&self) -> &Url {
        &self.sources_url
    }

    async fn post<T: serde::Serialize + Sync>(
        &self,
        url: &Url,
        body: &T,
    ) -> Result<reqwest::Response> {
        let response = self.http.post(url.clone()).json(body).send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<unreadable body>".into());
        Err(WidgetError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

/// Resolve `path` under the base URL's path, so `http://host/rag` with
/// `/api/chat` gives `http://host/rag/api/chat`.
fn endpoint(base: &Url, path: &str) -> Result<Url> {
    let mut base = base.clone();
    if !base.path().ends_with('/') {
        let dir = format!("{}/", base.path());
        base.set_path(&dir);
    }
    Ok(base.join(path.trim_start_matches('/'))?)
}

#[async_trait::async_trait]
impl ChatTransport for HttpTransport {
    async fn stream_chat(&self, request: ChatRequest) -> Result<TextStream> {
        debug!(
            url = %self.chat_url,
            history_len = request.history.len(),
            format = %self.format,
            "Posting chat request"
        );
        let response = self.post(&self.chat_url, &request).await?;
        let bytes = response.bytes_stream();

        let stream: TextStream = match self.format {
            StreamFormat::Chunked => Box::pin(chunked_text(bytes)),
            StreamFormat::Sse => Box::pin(sse_text(bytes)),
        };

        Ok(stream)
    }

    async fn fetch_sources(&self, request: SourcesRequest) -> Result<Vec<Source>> {
        debug!(url = %self.sources_url, "Posting sources request");
        let response = self.post(&self.sources_url, &request).await?;
        let body: SourcesResponse = response.json().await?;
        Ok(body.sources)
    }
}

/// Decode a raw body into text chunks, one per network chunk.
pub fn chunked_text<S, B, E>(bytes: S) -> impl Stream<Item = Result<String>> + Send
where
    S: Stream<Item = std::result::Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send,
    E: std::fmt::Display + Send,
{
    async_stream::stream! {
        let mut decoder = Utf8ChunkDecoder::new();
        futures::pin_mut!(bytes);
        while let Some(chunk) = bytes.next().await {
            match chunk {
                Ok(chunk) => yield Ok(decoder.decode(chunk.as_ref())),
                Err(e) => {
                    yield Err(WidgetError::Stream(e.to_string()));
                    return;
                }
            }
        }
        let tail = decoder.finish();
        if !tail.is_empty() {
            yield Ok(tail);
        }
    }
}

/// Decode an event-stream body into text chunks, one per `data:` frame.
pub fn sse_text<S, B, E>(bytes: S) -> impl Stream<Item = Result<String>> + Send
where
    S: Stream<Item = std::result::Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send,
    E: std::fmt::Display + Send,
{
    async_stream::stream! {
        let mut decoder = Utf8ChunkDecoder::new();
        let mut parser = SseParser::new();
        futures::pin_mut!(bytes);
        while let Some(chunk) = bytes.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => {
                    yield Err(WidgetError::Stream(e.to_string()));
                    return;
                }
            };
            for frame in parser.push(&decoder.decode(chunk.as_ref())) {
                match frame {
                    SseFrame::Data { data, .. } => yield Ok(data),
                    SseFrame::Done => return,
                }
            }
        }
        parser.push(&decoder.finish());
        if let Some(SseFrame::Data { data, .. }) = parser.finish() {
            yield Ok(data);
        }
    }
}
