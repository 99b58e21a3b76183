/// Shared SSE (Server-Sent Events) parser for streaming answer providers.
///
/// SSE format: events separated by a blank line, each containing optional `event:` and `data:` lines.
/// Bytes are buffered until a block is complete, so a UTF-8 character split across
/// network chunks is decoded whole.

/// A single parsed SSE event.
#[derive(Debug, Clone)]
pub struct SseEvent {
    /// The `event:` field, if present (e.g., "content_block_delta", "message_stop").
    pub event: Option<String>,
    /// The `data:` field content.
    pub data: String,
}

impl SseEvent {
    /// OpenAI-style terminal sentinel.
    pub fn is_done(&self) -> bool {
        self.data.trim() == "[DONE]"
    }
}

/// Incremental SSE parser that buffers incomplete blocks across chunk boundaries.
#[derive(Default)]
pub struct SseParser {
    buffer: Vec<u8>,
}

impl SseParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed raw bytes from the HTTP response. Returns any complete SSE events found.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        self.buffer.extend_from_slice(chunk);
        if self.buffer.windows(2).any(|w| w == b"\r\n") {
            self.buffer = strip_crlf(&self.buffer);
        }

        let mut events = Vec::new();

        while let Some(boundary) = self.buffer.windows(2).position(|w| w == b"\n\n") {
            let raw: Vec<u8> = self.buffer.drain(..boundary + 2).collect();
            // '\n' never occurs inside a multi-byte sequence, so the block is whole.
            let block = String::from_utf8_lossy(&raw);

            let mut event_type: Option<String> = None;
            let mut data_lines: Vec<&str> = Vec::new();

            for line in block.lines() {
                if let Some(val) = line.strip_prefix("event:") {
                    event_type = Some(val.trim().to_string());
                } else if let Some(val) = line.strip_prefix("data:") {
                    data_lines.push(val.strip_prefix(' ').unwrap_or(val));
                }
                // id:, retry: and ":" comments carry nothing we use
            }

            if !data_lines.is_empty() {
                events.push(SseEvent {
                    event: event_type,
                    data: data_lines.join("\n"),
                });
            }
        }

        events
    }
}

/// Line splitter for newline-delimited JSON streams (Ollama).
#[derive(Default)]
pub struct LineBuffer {
    buffer: Vec<u8>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed raw bytes. Returns every complete, non-blank line, trimmed.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);
        let mut lines = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let raw: Vec<u8> = self.buffer.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&raw);
            let line = line.trim();
            if !line.is_empty() {
                lines.push(line.to_string());
            }
        }
        lines
    }
}

fn strip_crlf(bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(bytes.len());
    let mut iter = bytes.iter().peekable();
    while let Some(&b) = iter.next() {
        if b == b'\r' && iter.peek() == Some(&&b'\n') {
            continue;
        }
        out.push(b);
    }
    out
}
