//! Incremental reconstruction of sample events from a record stream.
//!
//! A [`StreamParser`] owns the state of one upstream connection: the bytes
//! not yet consumed and the header currently in force. Bytes may arrive in
//! any chunking; the events produced are the same as if the whole stream had
//! arrived at once.
//!
//! # Processing
//!
//! The buffer is consumed front to back. At each step the parser looks at
//! whichever comes first, a complete line or a payload marker (` - {`):
//!
//! - A complete line is consumed. A header line retags the stream; anything
//!   else is dropped.
//! - A marker starts a block. Braces are counted from depth 1 until the
//!   depth returns to zero. An incomplete block stays in the buffer until
//!   more bytes arrive.
//!
//! A complete block is cleaned of noise, normalized, decoded and combined
//! with the current header. A block that fails any step is dropped and the
//! parser carries on with the next one; the header in force is untouched.

use crate::domain::foundation::Timestamp;
use crate::domain::telemetry::{RecordHeader, SampleEvent, HEADER_PREFIX, PAYLOAD_MARKER};

use super::noise::{is_diagnostic_line, strip_noise};
use super::normalize::decode_block;

/// Default upper bound on buffered, unconsumed bytes.
pub const DEFAULT_MAX_BUFFER_BYTES: usize = 1024 * 1024;

/// Counters describing what a parser has consumed so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParserStats {
    pub events: u64,
    pub headers: u64,
    pub rejected_headers: u64,
    pub malformed_blocks: u64,
    pub untagged_blocks: u64,
    pub overflows: u64,
}

/// Parser state for one source stream.
#[derive(Debug)]
pub struct StreamParser {
    source: String,
    buffer: Vec<u8>,
    topic_tag: Option<RecordHeader>,
    max_buffer_bytes: usize,
    stats: ParserStats,
}

impl StreamParser {
    /// New parser; `source` names the stream in logs.
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            buffer: Vec::new(),
            topic_tag: None,
            max_buffer_bytes: DEFAULT_MAX_BUFFER_BYTES,
            stats: ParserStats::default(),
        }
    }

    pub fn with_max_buffer(mut self, bytes: usize) -> Self {
        self.max_buffer_bytes = bytes.max(PAYLOAD_MARKER.len());
        self
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Header currently governing new blocks.
    pub fn topic_tag(&self) -> Option<RecordHeader> {
        self.topic_tag
    }

    /// Bytes held while waiting for the rest of a line or block.
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    pub fn stats(&self) -> ParserStats {
        self.stats
    }

    /// Appends `bytes` and returns every event completed by them, stamped now.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<SampleEvent> {
        self.feed_at(bytes, Timestamp::now())
    }

    /// Like [`feed`](Self::feed) with an explicit receive time.
    pub fn feed_at(&mut self, bytes: &[u8], received_at: Timestamp) -> Vec<SampleEvent> {
        self.buffer.extend_from_slice(bytes);
        let mut events = Vec::new();

        loop {
            let marker = find(&self.buffer, PAYLOAD_MARKER.as_bytes());
            let newline = self.buffer.iter().position(|&b| b == b'\n');

            match (newline, marker) {
                (Some(nl), m) if m.map_or(true, |m| nl < m) => {
                    let line: Vec<u8> = self.buffer.drain(..=nl).collect();
                    self.consume_line(&line[..nl]);
                }
                (_, Some(m)) => {
                    let open = m + PAYLOAD_MARKER.len() - 1;
                    match matching_brace(&self.buffer[open..]) {
                        Some(len) => {
                            let end = open + len;
                            let block = String::from_utf8_lossy(&self.buffer[open..end]).into_owned();
                            self.buffer.drain(..end);
                            if let Some(event) = self.decode(&block, received_at) {
                                events.push(event);
                            }
                        }
                        None => {
                            self.enforce_bound();
                            break;
                        }
                    }
                }
                _ => {
                    self.enforce_bound();
                    break;
                }
            }
        }

        events
    }

    fn consume_line(&mut self, line: &[u8]) {
        let line = String::from_utf8_lossy(line);
        let Some(start) = line.find(HEADER_PREFIX) else {
            if !line.trim().is_empty() && !is_diagnostic_line(&line) {
                tracing::trace!(source = %self.source, line = %line, "dropping stray line");
            }
            return;
        };

        match RecordHeader::parse(&line[start..]) {
            Some(header) => {
                self.stats.headers += 1;
                self.topic_tag = Some(header);
            }
            None => {
                self.stats.rejected_headers += 1;
                tracing::debug!(source = %self.source, line = %line, "unrecognized header, tag unchanged");
            }
        }
    }

    fn decode(&mut self, block: &str, received_at: Timestamp) -> Option<SampleEvent> {
        let cleaned = strip_noise(block);
        let fields = match decode_block(&cleaned) {
            Ok(fields) => fields,
            Err(e) => {
                self.stats.malformed_blocks += 1;
                tracing::warn!(source = %self.source, error = %e, "discarding malformed block");
                return None;
            }
        };

        let Some(header) = self.topic_tag else {
            self.stats.untagged_blocks += 1;
            tracing::debug!(source = %self.source, "discarding block received before any header");
            return None;
        };

        self.stats.events += 1;
        Some(SampleEvent::assemble(header, fields, received_at))
    }

    /// Drops an in-flight block or line that outgrew the buffer bound.
    fn enforce_bound(&mut self) {
        if self.buffer.len() > self.max_buffer_bytes {
            self.stats.overflows += 1;
            tracing::warn!(
                source = %self.source,
                buffered = self.buffer.len(),
                limit = self.max_buffer_bytes,
                "unterminated data exceeds buffer bound, discarding"
            );
            self.buffer.clear();
        }
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|window| window == needle)
}

/// Length of the span starting at an opening `{` up to and including the
/// brace that brings the depth back to zero.
fn matching_brace(span: &[u8]) -> Option<usize> {
    let mut depth = 0usize;
    for (index, &byte) in span.iter().enumerate() {
        match byte {
            b'{' => depth += 1,
            b'}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(index + 1);
                }
            }
            _ => {}
        }
    }
    None
}
