//! Incremental chunk parsing
//!
//! Bytes arrive in whatever pieces the network delivers. [`LineBuffer`]
//! reassembles them into complete lines, a protocol [`FrameDecoder`] turns
//! each line into a [`Frame`], and [`ChunkParser`] accumulates the result and
//! forwards text deltas to the caller.

use tracing::{trace, warn};

/// What one complete line of the response means
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// A data frame, possibly carrying text and/or a running token count
    Data {
        delta: Option<String>,
        total_tokens: Option<u32>,
    },
    /// The server reported an error inside the stream
    Error(String),
    /// End-of-stream marker
    Done,
    /// Framing noise (blank lines, comments, `event:` lines)
    Ignored,
    /// A data frame that could not be decoded
    Malformed(String),
}

/// Protocol-specific line decoder
pub trait FrameDecoder: Send {
    fn decode(&mut self, line: &str) -> Frame;
}

/// Reassembles newline-terminated lines from arbitrary byte chunks
///
/// Works on bytes so a multi-byte UTF-8 character split across two network
/// chunks is only decoded once its line is complete.
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: Vec<u8>,
    /// Prefix of `pending` already known to hold no newline
    scanned: usize,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append bytes and return every line completed by them
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(bytes);

        let mut lines = Vec::new();
        let mut start = 0;
        while let Some(offset) = self.pending[self.scanned..].iter().position(|b| *b == b'\n') {
            let end = self.scanned + offset;
            lines.push(decode_line(&self.pending[start..end]));
            start = end + 1;
            self.scanned = start;
        }
        self.pending.drain(..start);
        self.scanned = self.pending.len();
        lines
    }

    /// Take the unterminated trailing line, if any
    pub fn take_remaining(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let rest = std::mem::take(&mut self.pending);
        self.scanned = 0;
        Some(decode_line(&rest))
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

fn decode_line(bytes: &[u8]) -> String {
    let line = String::from_utf8_lossy(bytes);
    line.strip_suffix('\r').unwrap_or(&line).to_string()
}

/// Per-call stream parser
///
/// Owns the accumulated text and token count of exactly one call.
pub struct ChunkParser {
    decoder: Box<dyn FrameDecoder>,
    lines: LineBuffer,
    text: String,
    total_tokens: u32,
    detected_error: Option<String>,
    malformed_frames: usize,
    deltas: usize,
}

impl ChunkParser {
    pub fn new(decoder: Box<dyn FrameDecoder>) -> Self {
        Self {
            decoder,
            lines: LineBuffer::new(),
            text: String::new(),
            total_tokens: 0,
            detected_error: None,
            malformed_frames: 0,
            deltas: 0,
        }
    }

    /// Consume bytes as delivered by the transport
    pub fn feed(&mut self, bytes: &[u8], on_delta: &mut (dyn FnMut(&str) + Send)) {
        for line in self.lines.push(bytes) {
            self.handle_line(&line, on_delta);
        }
    }

    /// Flush a trailing line that arrived without a terminating newline
    pub fn finish(&mut self, on_delta: &mut (dyn FnMut(&str) + Send)) {
        if self.lines.pending_len() > 0 {
            trace!("Flushing {} unterminated bytes", self.lines.pending_len());
        }
        if let Some(line) = self.lines.take_remaining() {
            self.handle_line(&line, on_delta);
        }
    }

    fn handle_line(&mut self, line: &str, on_delta: &mut (dyn FnMut(&str) + Send)) {
        if self.detected_error.is_some() {
            return;
        }
        trace!("frame: {}", line);

        match self.decoder.decode(line) {
            Frame::Data { delta, total_tokens } => {
                if let Some(tokens) = total_tokens {
                    self.total_tokens = tokens;
                }
                if let Some(delta) = delta.filter(|d| !d.is_empty()) {
                    self.text.push_str(&delta);
                    self.deltas += 1;
                    on_delta(&delta);
                }
            }
            Frame::Error(message) => {
                warn!("Error reported inside stream: {}", message);
                self.detected_error = Some(message);
            }
            Frame::Malformed(reason) => {
                warn!("Failed to parse streaming response chunk: {}", reason);
                self.malformed_frames += 1;
            }
            Frame::Done | Frame::Ignored => {}
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn total_tokens(&self) -> u32 {
        self.total_tokens
    }

    pub fn detected_error(&self) -> Option<&str> {
        self.detected_error.as_deref()
    }

    pub fn malformed_frames(&self) -> usize {
        self.malformed_frames
    }

    /// Number of deltas forwarded to the callback
    pub fn delta_count(&self) -> usize {
        self.deltas
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Treats every non-empty line as a delta; `!` lines as errors
    struct EchoDecoder;

    impl FrameDecoder for EchoDecoder {
        fn decode(&mut self, line: &str) -> Frame {
            if line.is_empty() {
                Frame::Ignored
            } else if let Some(err) = line.strip_prefix('!') {
                Frame::Error(err.to_string())
            } else {
                Frame::Data { delta: Some(line.to_string()), total_tokens: None }
            }
        }
    }

    #[test]
    fn test_line_buffer_reassembles_split_lines() {
        let mut buf = LineBuffer::new();
        assert!(buf.push(b"hel").is_empty());
        assert_eq!(buf.push(b"lo\r\nwor"), vec!["hello".to_string()]);
        assert_eq!(buf.pending_len(), 3);
        assert_eq!(buf.take_remaining(), Some("wor".to_string()));
        assert_eq!(buf.take_remaining(), None);
    }

    #[test]
    fn test_line_buffer_long_line_in_small_pieces() {
        let mut buf = LineBuffer::new();
        let long = "x".repeat(100_000);
        for piece in long.as_bytes().chunks(3) {
            assert!(buf.push(piece).is_empty());
        }
        assert_eq!(buf.pending_len(), long.len());

        let lines = buf.push(b"\nnext\nta");
        assert_eq!(lines, vec![long, "next".to_string()]);
        assert_eq!(buf.pending_len(), 2);
        assert_eq!(buf.push(b"il\n"), vec!["tail".to_string()]);
        assert_eq!(buf.pending_len(), 0);
    }

    #[test]
    fn test_line_buffer_split_utf8() {
        let bytes = "é\n".as_bytes();
        let mut buf = LineBuffer::new();
        assert!(buf.push(&bytes[..1]).is_empty());
        assert_eq!(buf.push(&bytes[1..]), vec!["é".to_string()]);
    }

    #[test]
    fn test_parser_stops_after_error() {
        let mut parser = ChunkParser::new(Box::new(EchoDecoder));
        let mut seen = Vec::new();
        parser.feed(b"a\n!boom\nb\n", &mut |d: &str| seen.push(d.to_string()));

        assert_eq!(seen, vec!["a"]);
        assert_eq!(parser.text(), "a");
        assert_eq!(parser.detected_error(), Some("boom"));
    }

    #[test]
    fn test_finish_flushes_trailing_line() {
        let mut parser = ChunkParser::new(Box::new(EchoDecoder));
        let mut seen = Vec::new();
        parser.feed(b"a\nb", &mut |d: &str| seen.push(d.to_string()));
        assert_eq!(seen, vec!["a"]);
        parser.finish(&mut |d: &str| seen.push(d.to_string()));
        assert_eq!(seen, vec!["a", "b"]);
        assert_eq!(parser.delta_count(), 2);
    }
}
