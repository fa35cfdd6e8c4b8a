//! Extraction of back-to-back JSON objects from a byte stream.
//!
//! The controller writes objects with no delimiter or length prefix, and a
//! single TCP read can end anywhere inside one (including in the middle of a
//! multi-byte character). Bytes are buffered until a whole object parses.

use serde_json::{Deserializer, Value};

/// Incremental JSON object framer
#[derive(Debug, Default)]
pub struct MessageFramer {
    buffer: Vec<u8>,
}

impl MessageFramer {
    /// Largest incomplete object kept while waiting for its end
    pub const MAX_PENDING: usize = 64 * 1024;

    pub fn new() -> Self {
        Self::default()
    }

    /// Append bytes received from the stream
    pub fn push(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Bytes waiting for the rest of an object
    pub fn pending(&self) -> &[u8] {
        &self.buffer
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    /// Take the next complete object off the front of the buffer.
    ///
    /// Returns `None` when the buffer holds no complete object; the partial
    /// tail is kept for the next [`push`](Self::push) unless it has grown past
    /// [`MAX_PENDING`](Self::MAX_PENDING), in which case it is discarded.
    pub fn next_message(&mut self) -> Option<Value> {
        loop {
            let (decoded, end) = {
                let mut stream = Deserializer::from_slice(&self.buffer).into_iter::<Value>();
                let decoded = stream.next();
                (decoded, stream.byte_offset())
            };
            match decoded {
                None => {
                    // Only whitespace left.
                    self.buffer.clear();
                    return None;
                }
                Some(Ok(value)) => {
                    self.buffer.drain(..end);
                    if value.is_object() {
                        return Some(value);
                    }
                    tracing::debug!("Skipping non-object value {}", value);
                }
                Some(Err(e)) if e.is_eof() => {
                    if self.buffer.len() > Self::MAX_PENDING {
                        tracing::warn!(
                            pending = self.buffer.len(),
                            "Dropping unterminated stream data"
                        );
                        self.buffer.clear();
                    }
                    return None;
                }
                Some(Err(e)) => {
                    tracing::warn!("Discarding undecodable stream data: {}", e);
                    self.resync();
                }
            }
        }
    }

    /// Drop bytes up to the next candidate object start
    fn resync(&mut self) {
        match self.buffer.iter().skip(1).position(|&b| b == b'{') {
            Some(pos) => {
                self.buffer.drain(..=pos);
            }
            None => self.buffer.clear(),
        }
        tracing::trace!(remaining = self.buffer.len(), "Framer resynchronised");
    }
}

impl Iterator for MessageFramer {
    type Item = Value;

    fn next(&mut self) -> Option<Value> {
        self.next_message()
    }
}
