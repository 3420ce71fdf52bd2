//! Host page markup.

use super::dom::Document;
use crate::config::DomConfig;

/// Escape text for use in element content and quoted attributes.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Full HTML page hosting the widget, with every element id the widget mounts on.
pub fn host_page(title: &str, dom: &DomConfig) -> String {
    html_shell(title, &Document::host_page(dom).to_html())
}

/// Wrap a serialised `<body>` in the page head.
fn html_shell(title: &str, body: &str) -> String {
    let title = escape_html(title);
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <title>{title}</title>
    <style>
        .chat-messages {{ overflow-y: auto; }}
        .message.user {{ text-align: right; }}
        .message.loading .message-content::after {{ content: "…"; }}
        .message-content {{ white-space: pre-wrap; }}
        .source-score {{ font-size: 0.8em; opacity: 0.7; }}
    </style>
</head>
{body}
</html>"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html(r#"<a href="x">'&'</a>"#), "&lt;a href=&quot;x&quot;&gt;&#39;&amp;&#39;&lt;/a&gt;");
        assert_eq!(escape_html("plain"), "plain");
    }

    #[test]
    fn test_host_page_markup() {
        let page = host_page("Ask <the> docs", &DomConfig::default());
        assert!(page.starts_with("<!DOCTYPE html>"));
        assert!(page.contains("<title>Ask &lt;the&gt; docs</title>"));
        for id in DomConfig::default().required_ids() {
            assert!(page.contains(&format!("id=\"{id}\"")), "missing {id}");
        }
    }
}
