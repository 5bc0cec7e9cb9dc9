//! Reassembly of newline-terminated lines from arbitrary byte chunks.

use crate::{HardwareError, Result};
use badgegate_core::constants::{LINE_TERMINATOR, MAX_LINE_LENGTH};

/// Accumulates bytes until a full line is available.
#[derive(Debug)]
pub struct LineAssembler {
    buffer: Vec<u8>,
    max_len: usize,

    /// Set after an overflow; input is ignored up to the next terminator.
    discarding: bool,
}

impl Default for LineAssembler {
    fn default() -> Self {
        Self::new(MAX_LINE_LENGTH)
    }
}

impl LineAssembler {
    pub fn new(max_len: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(max_len),
            max_len,
            discarding: false,
        }
    }

    /// Append a chunk of received bytes.
    ///
    /// # Errors
    ///
    /// Fails when the pending, unterminated data exceeds the maximum line
    /// length. The pending data is discarded, and so is everything that
    /// follows up to and including the next terminator, so no tail of the
    /// overlong line is ever returned as a line of its own.
    pub fn push(&mut self, bytes: &[u8]) -> Result<()> {
        let mut bytes = bytes;
        if self.discarding {
            match bytes.iter().position(|&b| b == LINE_TERMINATOR) {
                Some(pos) => {
                    self.discarding = false;
                    bytes = &bytes[pos + 1..];
                }
                None => return Ok(()),
            }
        }
        self.buffer.extend_from_slice(bytes);

        let pending = match self.buffer.iter().rposition(|&b| b == LINE_TERMINATOR) {
            Some(pos) => self.buffer.len() - pos - 1,
            None => self.buffer.len(),
        };
        if pending > self.max_len {
            let keep = self.buffer.len() - pending;
            self.buffer.truncate(keep);
            self.discarding = true;
            return Err(HardwareError::invalid_data(format!(
                "line exceeds {} bytes ({pending} pending)",
                self.max_len
            )));
        }
        Ok(())
    }

    /// Take the next complete line, with `\n` and any trailing `\r` removed.
    ///
    /// # Errors
    ///
    /// Fails when the line is longer than the maximum or not valid UTF-8.
    /// The line is consumed either way.
    pub fn next_line(&mut self) -> Result<Option<String>> {
        let Some(pos) = self.buffer.iter().position(|&b| b == LINE_TERMINATOR) else {
            return Ok(None);
        };

        let mut line: Vec<u8> = self.buffer.drain(..=pos).collect();
        line.pop();
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        if line.len() > self.max_len {
            return Err(HardwareError::invalid_data(format!(
                "line exceeds {} bytes ({} received)",
                self.max_len,
                line.len()
            )));
        }

        String::from_utf8(line)
            .map(Some)
            .map_err(|e| HardwareError::invalid_data(format!("line is not UTF-8: {e}")))
    }

    /// Number of buffered bytes not yet returned.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }
}
