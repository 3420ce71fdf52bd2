//! Incremental UTF-8 decoding of a byte stream.

use std::fmt;

use encoding_rs::{CoderResult, Decoder, UTF_8};

/// Decodes UTF-8 that arrives in arbitrary byte chunks, the way a WHATWG
/// `TextDecoder` in streaming mode does.
///
/// A multi-byte character split across two chunks is held back until its
/// remaining bytes arrive. Invalid sequences become U+FFFD instead of
/// failing the stream, and a leading byte order mark is dropped.
pub struct Utf8ChunkDecoder {
    inner: Decoder,
}

impl fmt::Debug for Utf8ChunkDecoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Utf8ChunkDecoder").finish_non_exhaustive()
    }
}

impl Default for Utf8ChunkDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Utf8ChunkDecoder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: UTF_8.new_decoder(),
        }
    }

    /// Decode `bytes`, returning every complete character seen so far.
    pub fn decode(&mut self, bytes: &[u8]) -> String {
        decode_into(&mut self.inner, bytes, false)
    }

    /// Flush at end of stream. A dangling partial character decodes as U+FFFD.
    ///
    /// The decoder is reset afterwards and can start a new stream.
    pub fn finish(&mut self) -> String {
        let mut done = std::mem::replace(&mut self.inner, UTF_8.new_decoder());
        decode_into(&mut done, &[], true)
    }
}

fn decode_into(decoder: &mut Decoder, mut bytes: &[u8], last: bool) -> String {
    let mut out = String::new();
    loop {
        let room = decoder
            .max_utf8_buffer_length(bytes.len())
            .unwrap_or(bytes.len() * 3 + 4);
        out.reserve(room);
        let (result, read, _) = decoder.decode_to_string(bytes, &mut out, last);
        bytes = &bytes[read..];
        match result {
            CoderResult::InputEmpty => return out,
            CoderResult::OutputFull => {}
        }
    }
}
