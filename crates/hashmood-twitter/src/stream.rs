//! Line decoding for the filtered stream body.

use hashmood_sentiment::{EventStream, SentimentError, StreamItem};

use crate::error::TwitterError;
use crate::types::StreamEnvelope;

/// Longest line accepted; the rest of an oversized line is skipped.
const MAX_LINE_BYTES: usize = 1 << 20;

/// Splits body chunks into trimmed, non-empty lines.
#[derive(Debug)]
struct LineBuffer {
    buf: Vec<u8>,
    max_line: usize,
    /// Set after an oversized prefix was dropped; everything up to the next
    /// newline belongs to that line and is dropped too.
    discarding: bool,
}

impl LineBuffer {
    fn new(max_line: usize) -> Self {
        Self {
            buf: Vec::new(),
            max_line,
            discarding: false,
        }
    }

    fn push(&mut self, chunk: &[u8]) {
        self.buf.extend_from_slice(chunk);
    }

    /// Next complete line, `None` if more input is needed.
    fn next_line(&mut self) -> Option<String> {
        while let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
            let raw: Vec<u8> = self.buf.drain(..=pos).collect();
            if self.discarding {
                self.discarding = false;
                continue;
            }
            let line = String::from_utf8_lossy(&raw).trim().to_owned();
            // Blank lines are keep-alives.
            if !line.is_empty() {
                return Some(line);
            }
        }

        if self.buf.len() > self.max_line {
            tracing::warn!(bytes = self.buf.len(), "stream: oversized line discarded");
            self.buf.clear();
            self.discarding = true;
        }
        None
    }

    /// Unterminated remainder once the body has ended.
    fn finish(&mut self) -> Option<String> {
        let rest = String::from_utf8_lossy(&self.buf).trim().to_owned();
        self.buf.clear();
        if std::mem::take(&mut self.discarding) || rest.is_empty() {
            return None;
        }
        Some(rest)
    }
}

/// An open filtered-stream connection.
///
/// Owns the HTTP response; dropping the stream closes the connection.
#[derive(Debug)]
pub struct TweetStream {
    response: reqwest::Response,
    lines: LineBuffer,
}

impl TweetStream {
    pub(crate) fn new(response: reqwest::Response) -> Self {
        Self {
            response,
            lines: LineBuffer::new(MAX_LINE_BYTES),
        }
    }

    /// Next non-empty line, `None` once the body ends.
    ///
    /// # Errors
    ///
    /// Returns [`TwitterError::Http`] if reading the body fails or stalls
    /// past the read timeout.
    pub async fn next_line(&mut self) -> Result<Option<String>, TwitterError> {
        loop {
            if let Some(line) = self.lines.next_line() {
                return Ok(Some(line));
            }
            match self.response.chunk().await? {
                Some(chunk) => self.lines.push(&chunk),
                None => return Ok(self.lines.finish()),
            }
        }
    }
}

/// Decode one stream line.
///
/// Tweet envelopes become events; anything else (error payloads, system
/// messages, garbage) is passed on as unrecognized so the consumer can log
/// and skip it.
#[must_use]
pub fn parse_line(line: &str) -> StreamItem {
    if let Ok(envelope) = serde_json::from_str::<StreamEnvelope>(line) {
        return StreamItem::Event(envelope.into_raw_event());
    }

    match serde_json::from_str::<serde_json::Value>(line) {
        Ok(value) => {
            let title = value
                .pointer("/errors/0/title")
                .and_then(serde_json::Value::as_str);
            match title {
                Some(title) => StreamItem::Unrecognized(format!("error payload: {title}")),
                None => StreamItem::Unrecognized("JSON without tweet data".to_owned()),
            }
        }
        Err(_) => StreamItem::Unrecognized("non-JSON line".to_owned()),
    }
}

impl EventStream for TweetStream {
    async fn next_item(&mut self) -> Option<Result<StreamItem, SentimentError>> {
        match self.next_line().await {
            Ok(Some(line)) => Some(Ok(parse_line(&line))),
            Ok(None) => None,
            Err(e) => Some(Err(e.into_stream_error())),
        }
    }
}
