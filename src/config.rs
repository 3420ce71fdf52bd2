use std::path::Path;

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;

use crate::transport::StreamFormat;

/// Fallback config file picked up from the working directory.
const DEFAULT_CONFIG_FILE: &str = "widget.yaml";

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(short, long, env = "CONFIG_FILE")]
    pub config: Option<String>,

    /// Backend base URL, e.g. http://127.0.0.1:5000
    #[arg(long, env = "WIDGET_BASE_URL")]
    pub base_url: Option<String>,

    /// Body format of the chat endpoint (chunked or sse)
    #[arg(long, env = "WIDGET_STREAM_FORMAT")]
    pub stream_format: Option<StreamFormat>,

    /// Print the widget's host page HTML and exit
    #[arg(long)]
    pub print_page: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WidgetConfig {
    pub backend: BackendConfig,
    pub ui: UiConfig,
    pub dom: DomConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BackendConfig {
    /// Backend root. A path here (`http://host/rag`) prefixes both endpoints.
    pub base_url: String,
    /// Chat endpoint, relative to `base_url` with or without a leading `/`.
    pub chat_path: String,
    pub sources_path: String,
    pub stream_format: StreamFormat,
}

#[derive(Debug, Deserialize, Clone)]
pub struct UiConfig {
    /// Text that replaces the assistant bubble when an exchange fails.
    pub error_message: String,
    /// Title shown for sources without `metadata.title`.
    pub untitled_label: String,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            error_message: "sorry, there was an error processing your request.".to_string(),
            untitled_label: "untitled".to_string(),
        }
    }
}

/// Element ids the widget looks up in its host page.
#[derive(Debug, Deserialize, Clone)]
pub struct DomConfig {
    pub messages_id: String,
    pub input_id: String,
    pub send_button_id: String,
    pub sources_container_id: String,
    pub sources_list_id: String,
}

impl Default for DomConfig {
    fn default() -> Self {
        Self {
            messages_id: "chat-messages".to_string(),
            input_id: "chat-input".to_string(),
            send_button_id: "send-button".to_string(),
            sources_container_id: "sources-container".to_string(),
            sources_list_id: "sources-list".to_string(),
        }
    }
}

impl DomConfig {
    /// All required ids, in page order.
    pub fn required_ids(&self) -> [&str; 5] {
        [
            &self.messages_id,
            &self.input_id,
            &self.send_button_id,
            &self.sources_container_id,
            &self.sources_list_id,
        ]
    }
}

impl WidgetConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from_args(std::env::args())
    }

    pub fn load_from_args<I, T>(args: I) -> Result<Self, config::ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let cli =
            Cli::try_parse_from(args).map_err(|e| config::ConfigError::Message(e.to_string()))?;

        let ui = UiConfig::default();
        let dom = DomConfig::default();

        // 1. Defaults
        let mut builder = Config::builder()
            .set_default("backend.base_url", "http://127.0.0.1:5000")?
            .set_default("backend.chat_path", "/api/chat")?
            .set_default("backend.sources_path", "/api/sources")?
            .set_default("backend.stream_format", "chunked")?
            .set_default("ui.error_message", ui.error_message)?
            .set_default("ui.untitled_label", ui.untitled_label)?
            .set_default("dom.messages_id", dom.messages_id)?
            .set_default("dom.input_id", dom.input_id)?
            .set_default("dom.send_button_id", dom.send_button_id)?
            .set_default("dom.sources_container_id", dom.sources_container_id)?
            .set_default("dom.sources_list_id", dom.sources_list_id)?;

        // 2. Config file: explicit path must exist, the cwd fallback is optional
        if let Some(path) = &cli.config {
            builder = builder.add_source(File::with_name(path));
        } else if Path::new(DEFAULT_CONFIG_FILE).exists() {
            builder = builder.add_source(File::with_name(DEFAULT_CONFIG_FILE));
        }

        // 3. Environment, e.g. WIDGET_BACKEND__BASE_URL=http://localhost:8000
        builder = builder.add_source(
            Environment::with_prefix("WIDGET")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        // 4. CLI flags (and their clap env aliases) win
        if let Some(url) = cli.base_url {
            builder = builder.set_override("backend.base_url", url)?;
        }
        if let Some(format) = cli.stream_format {
            builder = builder.set_override("backend.stream_format", format.as_str())?;
        }

        let cfg = builder.build()?;
        cfg.try_deserialize()
    }
}
