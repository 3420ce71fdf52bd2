//! Source citations returned by the sources endpoint.
//!
//! A [`Source`] is one retrieved document chunk with its relevance score.
//! The widget only renders the title and the score, but the backend also
//! ships chunk text and a URL, so those are accepted too. Metadata keys the
//! widget does not know about are kept in [`SourceMetadata::extra`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Request body for `POST /api/sources`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourcesRequest {
    pub message: String,
}

/// Response body of `POST /api/sources`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourcesResponse {
    /// A missing key reads as no sources.
    #[serde(default)]
    pub sources: Vec<Source>,
}

/// A retrieved document reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    #[serde(default)]
    pub metadata: SourceMetadata,
    /// Relevance in `[0, 1]`.
    pub relevance_score: f64,
    /// Chunk text the answer was grounded on.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

/// Metadata attached to a source chunk.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl Source {
    /// Title to render, or `fallback` when the metadata has none.
    ///
    /// An empty title counts as missing.
    pub fn display_title<'a>(&'a self, fallback: &'a str) -> &'a str {
        match self.metadata.title.as_deref() {
            Some(title) if !title.is_empty() => title,
            _ => fallback,
        }
    }

    /// Score line, e.g. `relevance: 87.3%`.
    pub fn relevance_label(&self) -> String {
        format_relevance(self.relevance_score)
    }
}

/// Formats a `[0, 1]` score as a percentage with one decimal place.
pub fn format_relevance(score: f64) -> String {
    format!("relevance: {:.1}%", score * 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relevance_label_one_decimal() {
        assert_eq!(format_relevance(0.873), "relevance: 87.3%");
        assert_eq!(format_relevance(1.0), "relevance: 100.0%");
        assert_eq!(format_relevance(0.0), "relevance: 0.0%");
        assert_eq!(format_relevance(0.12345), "relevance: 12.3%");
    }

    #[test]
    fn test_parse_backend_payload() {
        let body = r#"{
            "sources": [
                {
                    "content": "TITLE: Doc A\n\nbody",
                    "metadata": {"title": "Doc A", "url": "https://example.com/a", "chunk_id": 3},
                    "relevance_score": 0.873
                },
                {"metadata": {}, "relevance_score": 0.5}
            ]
        }"#;
        let resp: SourcesResponse = serde_json::from_str(body).unwrap();
        assert_eq!(resp.sources.len(), 2);

        let first = &resp.sources[0];
        assert_eq!(first.display_title("untitled"), "Doc A");
        assert_eq!(first.relevance_label(), "relevance: 87.3%");
        assert_eq!(first.metadata.url.as_deref(), Some("https://example.com/a"));
        assert_eq!(first.metadata.extra["chunk_id"], serde_json::json!(3));

        assert_eq!(resp.sources[1].display_title("untitled"), "untitled");
    }

    #[test]
    fn test_missing_sources_key_is_empty() {
        let resp: SourcesResponse = serde_json::from_str("{}").unwrap();
        assert!(resp.sources.is_empty());
    }

    #[test]
    fn test_missing_metadata_falls_back() {
        let source: Source = serde_json::from_str(r#"{"relevance_score": 0.2}"#).unwrap();
        assert_eq!(source.display_title("untitled"), "untitled");

        let source: Source =
            serde_json::from_str(r#"{"metadata": {"title": ""}, "relevance_score": 0.2}"#).unwrap();
        assert_eq!(source.display_title("untitled"), "untitled");
    }
}
