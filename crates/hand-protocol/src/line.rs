//! Byte-at-a-time line assembly for the serial command stream.

use crate::error::{ProtocolError, ProtocolResult};

/// Longest accepted line, excluding the terminator. A full `command1` line
/// with 4-digit values is 48 bytes.
pub const DEFAULT_MAX_LINE_LEN: usize = 256;

/// Accumulates bytes until `\n`.
///
/// A trailing `\r` is dropped, blank lines are skipped, and a line that
/// grows past the limit is discarded up to its terminator and reported once
/// as [`ProtocolError::LineTooLong`].
#[derive(Debug, Clone)]
pub struct LineAssembler {
    buf: Vec<u8>,
    max_len: usize,
    overflowed: bool,
}

impl Default for LineAssembler {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_LINE_LEN)
    }
}

impl LineAssembler {
    pub fn new(max_len: usize) -> Self {
        Self {
            buf: Vec::with_capacity(max_len.min(DEFAULT_MAX_LINE_LEN)),
            max_len,
            overflowed: false,
        }
    }

    pub fn max_len(&self) -> usize {
        self.max_len
    }

    /// Bytes buffered since the last terminator.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }

    /// Feeds one byte. Returns a completed line (or the reason it was
    /// dropped) when `byte` is the terminator.
    pub fn push(&mut self, byte: u8) -> Option<ProtocolResult<String>> {
        if byte != b'\n' {
            if self.overflowed {
                return None;
            }
            // A `\r` right at the limit may still be the CRLF terminator.
            let at_limit = self.buf.len() >= self.max_len;
            let crlf_slack = byte == b'\r' && self.buf.len() == self.max_len;
            if at_limit && !crlf_slack {
                self.overflowed = true;
                self.buf.clear();
                return None;
            }
            self.buf.push(byte);
            return None;
        }

        if std::mem::take(&mut self.overflowed) {
            self.buf.clear();
            return Some(Err(ProtocolError::LineTooLong {
                limit: self.max_len,
            }));
        }

        if self.buf.last() == Some(&b'\r') {
            self.buf.pop();
        }
        let bytes = std::mem::take(&mut self.buf);
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return None;
        }
        Some(String::from_utf8(bytes).map_err(|e| {
            tracing::trace!(valid_up_to = e.utf8_error().valid_up_to(), "non-UTF-8 line");
            ProtocolError::InvalidUtf8
        }))
    }

    /// Feeds a chunk, returning every line it completes.
    pub fn extend(&mut self, bytes: &[u8]) -> Vec<ProtocolResult<String>> {
        bytes.iter().filter_map(|&b| self.push(b)).collect()
    }

    /// Drops any partial line.
    pub fn reset(&mut self) {
        self.buf.clear();
        self.overflowed = false;
    }
}
