//! Incremental parser for SSE-style streaming response bodies
//!
//! The report service streams its output as `text/event-stream` lines:
//! `data: <json>` events terminated by a `data: [DONE]` sentinel, with `:`
//! comment lines interleaved as keep-alives. Chunked transport can split a
//! line anywhere, including inside a multi-byte UTF-8 sequence, so the parser
//! buffers the trailing partial line as raw bytes between `feed` calls.
//!
//! Malformed JSON payloads are dropped with a diagnostic and parsing
//! continues with the next line. They are never pushed back into the buffer:
//! re-buffering bad lines grows the buffer without bound when a server emits
//! persistently malformed output.

use serde_json::Value;

/// One decoded record from the event stream.
#[derive(Debug, Clone, PartialEq)]
pub enum SseEvent {
    /// A `data:` line with a well-formed JSON payload.
    Data(Value),
    /// The `[DONE]` sentinel; no further events follow.
    Done,
    /// A comment, blank, non-data, or malformed line. Safe to ignore.
    Skip,
}

/// Stateful line reassembler for chunked SSE bodies.
#[derive(Debug, Default)]
pub struct SseLineParser {
    /// Pending partial line carried across `feed` calls. Kept as bytes so a
    /// chunk boundary inside a UTF-8 sequence cannot corrupt the line.
    buffer: Vec<u8>,
}

impl SseLineParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one transport chunk, returning every event completed by it.
    ///
    /// The final (possibly incomplete) line fragment is held back until the
    /// next call or `flush`.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        self.buffer.extend_from_slice(chunk);

        let mut events = Vec::new();
        while let Some(newline) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=newline).collect();
            let line = String::from_utf8_lossy(&line[..line.len() - 1]);
            events.push(parse_line(&line));
        }
        events
    }

    /// Consume any remaining buffered content as a final line.
    ///
    /// Called when the transport signals end-of-stream. A trailing fragment
    /// that is not a well-formed event is discarded.
    pub fn flush(&mut self) -> Option<SseEvent> {
        if self.buffer.is_empty() {
            return None;
        }
        let line = String::from_utf8_lossy(&self.buffer).into_owned();
        self.buffer.clear();
        match parse_line(&line) {
            SseEvent::Skip => None,
            event => Some(event),
        }
    }
}

/// Classify one complete line of the stream.
fn parse_line(line: &str) -> SseEvent {
    let line = line.strip_suffix('\r').unwrap_or(line);

    if line.starts_with(':') || line.trim().is_empty() {
        return SseEvent::Skip;
    }
    let Some(payload) = line.strip_prefix("data: ") else {
        return SseEvent::Skip;
    };

    let payload = payload.trim();
    if payload == "[DONE]" {
        return SseEvent::Done;
    }

    match serde_json::from_str::<Value>(payload) {
        Ok(value) => SseEvent::Data(value),
        Err(e) => {
            tracing::warn!("Dropping malformed stream payload: {}", e);
            SseEvent::Skip
        }
    }
}
