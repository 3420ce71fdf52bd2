//! End-to-end tests: widget + HTTP transport against an in-process backend.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Json, Router,
    body::Body,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::post,
};
use futures::StreamExt;
use serde_json::json;

use rag_chat_widget::config::{BackendConfig, DomConfig, UiConfig};
use rag_chat_widget::session::ChatTurn;
use rag_chat_widget::sources::SourcesRequest;
use rag_chat_widget::transport::{ChatRequest, ChatTransport, HttpTransport, StreamFormat};
use rag_chat_widget::view::{ChatView, DomView};
use rag_chat_widget::widget::{ReplyOutcome, SourcesOutcome};
use rag_chat_widget::{ChatWidget, InputEvent, WidgetError};

/// Bind `router` on an ephemeral port and return its base URL.
async fn spawn_backend(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

/// Streams the answer one word at a time, the way the RAG backend does.
async fn chat_words(Json(req): Json<ChatRequest>) -> Response {
    if req.message.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "no message provided"})),
        )
            .into_response();
    }
    let answer = format!("You asked {} after {} turns", req.message, req.history.len());
    let words: Vec<String> = answer.split(' ').map(ToString::to_string).collect();
    let last = words.len() - 1;
    let chunks = futures::stream::iter(words.into_iter().enumerate())
        .then(move |(i, word)| async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            let chunk = if i < last { format!("{word} ") } else { word };
            Ok::<_, Infallible>(chunk)
        });
    Body::from_stream(chunks).into_response()
}

async fn chat_sse(Json(_req): Json<ChatRequest>) -> Response {
    (
        [(header::CONTENT_TYPE, "text/event-stream")],
        "data: Hel\n\ndata: lo\n\ndata: [DONE]\n\n",
    )
        .into_response()
}

async fn chat_broken() -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, "model offline").into_response()
}

async fn chat_cut_off() -> Response {
    let chunks = futures::stream::iter(vec![
        Ok(axum::body::Bytes::from_static(b"partial ")),
        Err(std::io::Error::other("upstream reset")),
    ]);
    Body::from_stream(chunks).into_response()
}

async fn sources_two(Json(req): Json<SourcesRequest>) -> Json<serde_json::Value> {
    Json(json!({
        "sources": [
            {
                "content": format!("TITLE: Doc A\n\n{}", req.message),
                "metadata": {"title": "Doc A", "url": "https://example.com/a"},
                "relevance_score": 0.873
            },
            {"content": "no title", "metadata": {}, "relevance_score": 0.4}
        ]
    }))
}

async fn sources_empty() -> Json<serde_json::Value> {
    Json(json!({"sources": []}))
}

fn backend(base_url: &str, stream_format: StreamFormat) -> BackendConfig {
    BackendConfig {
        base_url: base_url.to_string(),
        chat_path: "/api/chat".to_string(),
        sources_path: "/api/sources".to_string(),
        stream_format,
    }
}

fn widget_for(config: &BackendConfig) -> (ChatWidget, Arc<DomView>) {
    let view = Arc::new(DomView::with_host_page(&DomConfig::default()).unwrap());
    let transport = HttpTransport::new(config).unwrap();
    let widget = ChatWidget::new(
        Arc::new(transport),
        Arc::clone(&view) as Arc<dyn ChatView>,
        UiConfig::default(),
    );
    (widget, view)
}

#[tokio::test]
async fn test_streamed_reply_and_sources() {
    let base = spawn_backend(
        Router::new()
            .route("/api/chat", post(chat_words))
            .route("/api/sources", post(sources_two)),
    )
    .await;
    let (widget, view) = widget_for(&backend(&base, StreamFormat::Chunked));

    view.set_input("pricing?");
    let exchange = widget
        .handle_event(&InputEvent::key("Enter", false))
        .exchange
        .expect("message should be sent");
    let reply_id = exchange.message_id();
    let outcome = exchange.await;

    let expected = "You asked pricing? after 1 turns";
    assert_eq!(outcome.reply, ReplyOutcome::Completed(expected.to_string()));
    assert_eq!(view.message_text(reply_id).as_deref(), Some(expected));
    assert!(!view.is_loading(reply_id));

    assert_eq!(outcome.sources, SourcesOutcome::Shown(2));
    assert!(view.sources_visible());
    assert_eq!(
        view.sources(),
        vec![
            ("Doc A".to_string(), "relevance: 87.3%".to_string()),
            ("untitled".to_string(), "relevance: 40.0%".to_string()),
        ]
    );

    // The second send carries the whole conversation so far
    view.set_input("and shipping?");
    widget.send_message().unwrap().await;
    assert_eq!(
        widget.history().snapshot(),
        vec![
            ChatTurn::user("pricing?"),
            ChatTurn::assistant(expected),
            ChatTurn::user("and shipping?"),
            ChatTurn::assistant("You asked and shipping? after 3 turns"),
        ]
    );
}

#[tokio::test]
async fn test_sse_reply() {
    let base = spawn_backend(
        Router::new()
            .route("/api/chat", post(chat_sse))
            .route("/api/sources", post(sources_empty)),
    )
    .await;
    let (widget, view) = widget_for(&backend(&base, StreamFormat::Sse));

    view.set_input("hi");
    let outcome = widget.send_message().unwrap().await;

    assert_eq!(outcome.reply, ReplyOutcome::Completed("Hello".to_string()));
    assert_eq!(outcome.sources, SourcesOutcome::Hidden);
    assert!(!view.sources_visible());
}

#[tokio::test]
async fn test_server_error_surfaces_fixed_message() {
    let base = spawn_backend(
        Router::new()
            .route("/api/chat", post(chat_broken))
            .route("/api/sources", post(chat_broken)),
    )
    .await;
    let (widget, view) = widget_for(&backend(&base, StreamFormat::Chunked));

    view.set_input("hi");
    let exchange = widget.send_message().unwrap();
    let reply_id = exchange.message_id();
    let outcome = exchange.await;

    assert_eq!(outcome.reply, ReplyOutcome::Failed);
    assert_eq!(outcome.sources, SourcesOutcome::Hidden);
    assert_eq!(
        view.message_text(reply_id).as_deref(),
        Some("sorry, there was an error processing your request.")
    );
    assert_eq!(widget.history().snapshot(), vec![ChatTurn::user("hi")]);
}

#[tokio::test]
async fn test_body_cut_off_fails_the_turn() {
    let base = spawn_backend(
        Router::new()
            .route("/api/chat", post(chat_cut_off))
            .route("/api/sources", post(sources_empty)),
    )
    .await;
    let (widget, view) = widget_for(&backend(&base, StreamFormat::Chunked));

    view.set_input("hi");
    let outcome = widget.send_message().unwrap().await;

    assert_eq!(outcome.reply, ReplyOutcome::Failed);
    assert_eq!(widget.history().len(), 1);
}

#[tokio::test]
async fn test_unreachable_backend() {
    // Bind then drop to get a port nothing listens on
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let (widget, view) = widget_for(&backend(&format!("http://{addr}"), StreamFormat::Chunked));
    view.set_input("hi");
    let outcome = widget.send_message().unwrap().await;

    assert_eq!(outcome.reply, ReplyOutcome::Failed);
    assert_eq!(outcome.sources, SourcesOutcome::Hidden);
}

#[tokio::test]
async fn test_transport_reports_status_and_body() {
    let base = spawn_backend(Router::new().route("/api/chat", post(chat_broken))).await;
    let transport = HttpTransport::new(&backend(&base, StreamFormat::Chunked)).unwrap();

    let err = match transport
        .stream_chat(ChatRequest {
            message: "hi".to_string(),
            history: Vec::new(),
        })
        .await
    {
        Ok(_) => panic!("expected a status error"),
        Err(e) => e,
    };
    assert!(matches!(
        err,
        WidgetError::Status { status: 500, ref body } if body == "model offline"
    ));
}

#[tokio::test]
async fn test_transport_reads_sources() {
    let base = spawn_backend(Router::new().route("/api/sources", post(sources_two))).await;
    let transport = HttpTransport::new(&backend(&base, StreamFormat::Chunked)).unwrap();

    let sources = transport
        .fetch_sources(SourcesRequest {
            message: "refunds".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(sources.len(), 2);
    assert_eq!(sources[0].metadata.url.as_deref(), Some("https://example.com/a"));
    assert_eq!(
        sources[0].content.as_deref(),
        Some("TITLE: Doc A\n\nrefunds")
    );
}
