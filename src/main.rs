//! Terminal host for the chat widget.
//!
//! Reads questions from stdin, one per line. A line ending in `\` continues
//! the message on the next line, the way Shift+Enter does in the page.

use mimalloc::MiMalloc;

/// Global allocator for improved performance (M-MIMALLOC-APPS).
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

use std::sync::Arc;

use clap::Parser;
use dotenvy::dotenv;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use rag_chat_widget::config::{Cli, WidgetConfig};
use rag_chat_widget::view::{ChatView, TerminalView, html};
use rag_chat_widget::{ChatWidget, InputEvent};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env (if present)
    let _ = dotenv();

    // Initialize tracing (M-LOG-STRUCTURED), on stderr so the transcript stays clean
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(log_filter(std::env::var(EnvFilter::DEFAULT_ENV).ok().as_deref()))
        .init();

    let cli = Cli::parse();
    let config = WidgetConfig::load()?;

    if cli.print_page {
        println!("{}", html::host_page("Chat", &config.dom));
        return Ok(());
    }

    info!(
        name: "widget.config.loaded",
        base_url = %config.backend.base_url,
        stream_format = %config.backend.stream_format,
        "Widget configuration loaded"
    );

    let view = Arc::new(TerminalView::stdout());
    let widget = ChatWidget::from_config(&config, Arc::clone(&view) as Arc<dyn ChatView>)?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut draft = String::new();
    while let Some(line) = lines.next_line().await? {
        if let Some(head) = line.strip_suffix('\\') {
            draft.push_str(head);
            draft.push('\n');
            continue;
        }
        draft.push_str(&line);
        view.set_input(&draft);
        draft.clear();

        let response = widget.handle_event(&InputEvent::key("Enter", false));
        if let Some(exchange) = response.exchange {
            let outcome = exchange.await;
            view.end_line();
            info!(
                request_id = %outcome.request_id,
                sources = ?outcome.sources,
                "Reply finished"
            );
        }
    }

    Ok(())
}

/// `RUST_LOG` when set and valid, `warn` otherwise.
fn log_filter(rust_log: Option<&str>) -> EnvFilter {
    rust_log
        .filter(|directives| !directives.trim().is_empty())
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new("warn"))
}
