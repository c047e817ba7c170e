//! # SSE Parser
//!
//! Shared Server-Sent Events parsing for the backend streams.
//!
//! All four backends deliver their streaming responses as HTTP SSE. The
//! [`SseLineDecoder`] is a push-based state machine: feed it raw byte
//! chunks, get back complete `data:` payloads. [`sse_data_lines`] wraps the
//! decoder around a byte stream for the provider adapters.
//!
//! Wire rules handled here:
//! - Line buffering across chunk boundaries (a payload may split anywhere)
//! - `data: ` prefix extraction (with or without the space)
//! - `[DONE]` marker and comment filtering
//! - Optional trailing-buffer processing (Google can end without a final
//!   newline; `OpenAI`-style streams always close with `[DONE]`)

use bytes::BytesMut;
use futures::Stream;
use tokio_stream::StreamExt;
use tracing::warn;

use mosaic_core::text::truncate_str;

/// Options for the SSE decoder.
#[derive(Clone, Copy, Debug)]
pub struct SseOptions {
    /// Whether to process remaining buffer content after the stream ends.
    pub process_remaining_buffer: bool,
}

impl Default for SseOptions {
    fn default() -> Self {
        Self {
            process_remaining_buffer: true,
        }
    }
}

/// Push-based SSE line decoder.
#[derive(Debug, Default)]
pub struct SseLineDecoder {
    buffer: BytesMut,
}

impl SseLineDecoder {
    /// Create an empty decoder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(8192),
        }
    }

    /// Feed a raw byte chunk; returns every complete `data:` payload it
    /// unlocked, in arrival order.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);

        let mut payloads = Vec::new();
        while let Some(newline_pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let mut line_bytes = self.buffer.split_to(newline_pos + 1);
            line_bytes.truncate(line_bytes.len() - 1);
            if line_bytes.last() == Some(&b'\r') {
                line_bytes.truncate(line_bytes.len() - 1);
            }

            // Skip invalid UTF-8 lines rather than poisoning the stream
            let Ok(line) = std::str::from_utf8(&line_bytes) else {
                continue;
            };
            if let Some(data) = extract_sse_data(line) {
                payloads.push(data);
            }
        }
        payloads
    }

    /// Drain a trailing payload left in the buffer after end-of-stream.
    pub fn finish(&mut self) -> Option<String> {
        if self.buffer.is_empty() {
            return None;
        }
        let line = std::str::from_utf8(&self.buffer).ok()?.trim().to_owned();
        self.buffer.clear();
        extract_sse_data(&line)
    }
}

/// Decode a byte stream into `data:` payload strings.
pub fn sse_data_lines<S>(byte_stream: S, options: SseOptions) -> impl Stream<Item = String> + Send
where
    S: Stream<Item = Result<bytes::Bytes, reqwest::Error>> + Send + Unpin + 'static,
{
    async_stream::stream! {
        let mut decoder = SseLineDecoder::new();
        let mut byte_stream = byte_stream;

        while let Some(chunk) = byte_stream.next().await {
            match chunk {
                Ok(bytes) => {
                    for payload in decoder.push(&bytes) {
                        yield payload;
                    }
                }
                Err(e) => {
                    warn!("SSE stream read error: {e}");
                    return;
                }
            }
        }

        if options.process_remaining_buffer {
            if let Some(payload) = decoder.finish() {
                yield payload;
            }
        }
    }
}

/// Extract the data payload from an SSE line.
///
/// Returns `Some(data)` for valid data lines, `None` for comments, empty
/// lines, other fields, and `[DONE]` markers.
fn extract_sse_data(line: &str) -> Option<String> {
    let trimmed = line.trim();

    if trimmed.is_empty() || trimmed.starts_with(':') {
        return None;
    }

    let data = trimmed
        .strip_prefix("data: ")
        .or_else(|| trimmed.strip_prefix("data:"))?
        .trim();

    if data == "[DONE]" || data.is_empty() {
        return None;
    }

    Some(data.to_string())
}

/// Parse JSON from an SSE data payload, logging on failure.
pub fn parse_sse_data<T: serde::de::DeserializeOwned>(data: &str, provider: &str) -> Option<T> {
    match serde_json::from_str(data) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            warn!(
                provider = provider,
                error = %e,
                data_preview = truncate_str(data, 100),
                "failed to parse SSE data"
            );
            None
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(decoder: &mut SseLineDecoder, chunks: &[&str]) -> Vec<String> {
        let mut out = Vec::new();
        for chunk in chunks {
            out.extend(decoder.push(chunk.as_bytes()));
        }
        out
    }

    // ── extract_sse_data ─────────────────────────────────────────────────

    #[test]
    fn extract_data_line() {
        assert_eq!(
            extract_sse_data("data: {\"type\":\"message\"}"),
            Some("{\"type\":\"message\"}".into())
        );
    }

    #[test]
    fn extract_data_line_no_space() {
        assert_eq!(
            extract_sse_data("data:{\"type\":\"message\"}"),
            Some("{\"type\":\"message\"}".into())
        );
    }

    #[test]
    fn extract_skips_done_marker() {
        assert_eq!(extract_sse_data("data: [DONE]"), None);
    }

    #[test]
    fn extract_skips_empty_and_comments() {
        assert_eq!(extract_sse_data(""), None);
        assert_eq!(extract_sse_data("   "), None);
        assert_eq!(extract_sse_data(": keep-alive"), None);
        assert_eq!(extract_sse_data("data: "), None);
    }

    #[test]
    fn extract_skips_non_data_fields() {
        assert_eq!(extract_sse_data("event: message_start"), None);
        assert_eq!(extract_sse_data("id: 42"), None);
    }

    // ── SseLineDecoder ───────────────────────────────────────────────────

    #[test]
    fn decoder_single_event() {
        let mut d = SseLineDecoder::new();
        let out = collect(&mut d, &["data: {\"a\":1}\n\n"]);
        assert_eq!(out, vec!["{\"a\":1}"]);
    }

    #[test]
    fn decoder_multiple_events_one_chunk() {
        let mut d = SseLineDecoder::new();
        let out = collect(&mut d, &["data: {\"a\":1}\n\ndata: {\"b\":2}\n\n"]);
        assert_eq!(out, vec!["{\"a\":1}", "{\"b\":2}"]);
    }

    #[test]
    fn decoder_payload_split_across_chunks() {
        let mut d = SseLineDecoder::new();
        let out = collect(&mut d, &["data: {\"par", "tial\":true}\n\n"]);
        assert_eq!(out, vec!["{\"partial\":true}"]);
    }

    #[test]
    fn decoder_filters_done_and_comments() {
        let mut d = SseLineDecoder::new();
        let out = collect(
            &mut d,
            &[": ping\n\ndata: {\"v\":1}\n\ndata: [DONE]\n\nevent: end\n\n"],
        );
        assert_eq!(out, vec!["{\"v\":1}"]);
    }

    #[test]
    fn decoder_handles_crlf() {
        let mut d = SseLineDecoder::new();
        let out = collect(&mut d, &["data: {\"cr\":true}\r\n\r\n"]);
        assert_eq!(out, vec!["{\"cr\":true}"]);
    }

    #[test]
    fn decoder_finish_drains_trailing_payload() {
        let mut d = SseLineDecoder::new();
        assert!(d.push(b"data: {\"trailing\":true}").is_empty());
        assert_eq!(d.finish(), Some("{\"trailing\":true}".into()));
        assert_eq!(d.finish(), None);
    }

    #[test]
    fn decoder_finish_empty_buffer() {
        let mut d = SseLineDecoder::new();
        assert_eq!(d.finish(), None);
    }

    // ── sse_data_lines ───────────────────────────────────────────────────

    #[tokio::test]
    async fn stream_yields_payloads_in_order() {
        let chunks: Vec<Result<bytes::Bytes, reqwest::Error>> = vec![
            Ok(bytes::Bytes::from("data: {\"a\":1}\n\n")),
            Ok(bytes::Bytes::from("data: {\"b\":2}\n\n")),
        ];
        let stream = futures::stream::iter(chunks);
        let out: Vec<String> = sse_data_lines(stream, SseOptions::default()).collect().await;
        assert_eq!(out, vec!["{\"a\":1}", "{\"b\":2}"]);
    }

    #[tokio::test]
    async fn stream_remaining_buffer_enabled() {
        let chunks: Vec<Result<bytes::Bytes, reqwest::Error>> =
            vec![Ok(bytes::Bytes::from("data: {\"trailing\":true}"))];
        let stream = futures::stream::iter(chunks);
        let out: Vec<String> = sse_data_lines(stream, SseOptions::default()).collect().await;
        assert_eq!(out, vec!["{\"trailing\":true}"]);
    }

    #[tokio::test]
    async fn stream_remaining_buffer_disabled() {
        let chunks: Vec<Result<bytes::Bytes, reqwest::Error>> =
            vec![Ok(bytes::Bytes::from("data: {\"trailing\":true}"))];
        let stream = futures::stream::iter(chunks);
        let options = SseOptions {
            process_remaining_buffer: false,
        };
        let out: Vec<String> = sse_data_lines(stream, options).collect().await;
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn stream_empty_input() {
        let chunks: Vec<Result<bytes::Bytes, reqwest::Error>> = vec![];
        let stream = futures::stream::iter(chunks);
        let out: Vec<String> = sse_data_lines(stream, SseOptions::default()).collect().await;
        assert!(out.is_empty());
    }

    // ── parse_sse_data ───────────────────────────────────────────────────

    #[test]
    fn parse_valid_json() {
        let result: Option<serde_json::Value> = parse_sse_data("{\"type\":\"text\"}", "test");
        assert_eq!(result.unwrap()["type"], "text");
    }

    #[test]
    fn parse_invalid_json_returns_none() {
        let result: Option<serde_json::Value> = parse_sse_data("not json", "test");
        assert!(result.is_none());
    }
}
