//! Error types for the widget.

use thiserror::Error;

/// Widget error type.
#[derive(Error, Debug)]
pub enum WidgetError {
    /// HTTP request failed before a response arrived.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Backend answered with a non-success status. The body is opaque.
    #[error("backend returned {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Raw response body, kept for diagnostics only.
        body: String,
    },

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid backend URL.
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// Reading the response body failed part way through.
    #[error("stream error: {0}")]
    Stream(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The host page lacks an element the widget needs.
    #[error("missing element #{0}")]
    MissingElement(String),
}

impl From<config::ConfigError> for WidgetError {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

/// Result type alias for widget operations.
pub type Result<T> = std::result::Result<T, WidgetError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_error_display() {
        let err = WidgetError::Status {
            status: 502,
            body: "bad gateway".to_string(),
        };
        assert_eq!(err.to_string(), "backend returned 502: bad gateway");
    }

    #[test]
    fn test_config_error_conversion() {
        let err: WidgetError = config::ConfigError::Message("no backend".to_string()).into();
        assert!(matches!(err, WidgetError::Config(msg) if msg == "no backend"));
    }
}
