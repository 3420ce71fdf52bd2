//! Server-Sent Events framing for the chat body.
//!
//! Frames are separated by a blank line. Each frame's `data:` lines are
//! joined with `\n` into one payload; comment lines (`:`) and frames
//! without data are skipped. A `[DONE]` payload ends the reply.

/// Payload that marks the end of the reply.
pub const DONE_SENTINEL: &str = "[DONE]";

/// One parsed frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseFrame {
    /// A piece of the reply, with its `event:` name when present.
    Data { event: Option<String>, data: String },
    /// The `[DONE]` sentinel.
    Done,
}

/// Incremental frame parser over decoded text.
#[derive(Debug, Default)]
pub struct SseParser {
    buf: String,
}

impl SseParser {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed decoded text, returning every frame completed by it.
    pub fn push(&mut self, text: &str) -> Vec<SseFrame> {
        self.buf.push_str(text);
        if self.buf.contains('\r') {
            self.buf = self.buf.replace("\r\n", "\n");
        }

        let mut frames = Vec::new();
        while let Some(pos) = self.buf.find("\n\n") {
            let raw: String = self.buf.drain(..pos + 2).collect();
            if let Some(frame) = parse_frame(&raw) {
                frames.push(frame);
            }
        }
        frames
    }

    /// Parse whatever is left once the body ends without a trailing blank line.
    pub fn finish(&mut self) -> Option<SseFrame> {
        let rest = std::mem::take(&mut self.buf);
        parse_frame(&rest)
    }
}

fn parse_frame(raw: &str) -> Option<SseFrame> {
    let mut event = None;
    let mut data: Option<String> = None;

    for line in raw.lines() {
        if line.is_empty() || line.starts_with(':') {
            continue;
        }
        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        match field {
            "event" => event = Some(value.to_string()),
            "data" => match &mut data {
                Some(existing) => {
                    existing.push('\n');
                    existing.push_str(value);
                }
                None => data = Some(value.to_string()),
            },
            _ => {}
        }
    }

    let data = data?;
    if data == DONE_SENTINEL {
        return Some(SseFrame::Done);
    }
    Some(SseFrame::Data { event, data })
}
