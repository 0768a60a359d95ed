//! CRLF line framing
//!
//! Each connection owns a fixed-capacity [`LineBuffer`]. One call to
//! [`LineBuffer::read_from`] performs a single read into the free space of
//! the buffer; the caller then drains every complete frame with
//! [`LineBuffer::next_frame`] before reading again, so several lines that
//! arrive in one segment are handled in order.
//!
//! ```text
//!  buffer: | h e l l o \r \n w o r |            (capacity 142)
//!           └── frame ──┘       └─ kept for the next read
//! ```
//!
//! A peer that never sends a terminator is bounded by the capacity: once the
//! buffer is full without a terminator the read reports
//! [`ReadStatus::Overflow`] and the caller must drop the connection.

use std::io::ErrorKind;

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::Result;

use super::constants::{LINE_BUFFER_SIZE, MAX_LINE_LEN, TERMINATOR};

/// Outcome of one read into a [`LineBuffer`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadStatus {
    /// At least one complete frame is buffered
    Complete,
    /// No terminator yet; wait for more bytes
    ///
    /// `stalled` is set when the read returned zero bytes while a partial
    /// line was buffered.
    Incomplete {
        /// The read made no progress
        stalled: bool,
    },
    /// Peer shut down with nothing buffered
    Disconnected,
    /// Buffer filled up without a terminator
    Overflow,
}

/// Fixed-capacity inbound buffer for one connection
#[derive(Debug)]
pub struct LineBuffer {
    buf: BytesMut,
    capacity: usize,
    max_line_len: usize,
}

impl LineBuffer {
    /// Create a buffer holding at most `capacity` bytes whose frames keep at
    /// most `max_line_len` content bytes
    pub fn new(capacity: usize, max_line_len: usize) -> Self {
        // Anything smaller cannot hold a terminator.
        let capacity = capacity.max(TERMINATOR.len());

        Self {
            buf: BytesMut::with_capacity(capacity),
            capacity,
            max_line_len,
        }
    }

    /// Number of buffered bytes not yet consumed as frames
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Check if nothing is buffered
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Maximum number of buffered bytes
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Perform one read from `reader` into the free space of the buffer
    ///
    /// Interrupted reads are retried. Any other read failure is returned as
    /// an error and the connection should be torn down.
    pub async fn read_from<R>(&mut self, reader: &mut R) -> Result<ReadStatus>
    where
        R: AsyncRead + Unpin,
    {
        let free = self.capacity - self.buf.len();
        if free == 0 {
            return Ok(self.status(false));
        }

        let n = loop {
            let mut limited = (&mut *reader).take(free as u64);
            match limited.read_buf(&mut self.buf).await {
                Ok(n) => break n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        };

        if n == 0 && self.buf.is_empty() {
            return Ok(ReadStatus::Disconnected);
        }

        Ok(self.status(n == 0))
    }

    /// Extract the first complete frame, if any
    ///
    /// Content longer than the maximum line length is truncated. The raw
    /// bytes up to and including the terminator are always consumed.
    pub fn next_frame(&mut self) -> Option<Bytes> {
        let pos = find_terminator(&self.buf)?;
        let mut raw = self.buf.split_to(pos + TERMINATOR.len());
        raw.truncate(pos.min(self.max_line_len));
        Some(raw.freeze())
    }

    /// Discard everything buffered
    pub fn clear(&mut self) {
        self.buf.clear();
    }

    fn status(&self, stalled: bool) -> ReadStatus {
        if find_terminator(&self.buf).is_some() {
            ReadStatus::Complete
        } else if self.buf.len() >= self.capacity {
            ReadStatus::Overflow
        } else {
            ReadStatus::Incomplete { stalled }
        }
    }
}

impl Default for LineBuffer {
    fn default() -> Self {
        Self::new(LINE_BUFFER_SIZE, MAX_LINE_LEN)
    }
}

/// Index of the first CR LF pair in `buf`
///
/// Compares bytes pairwise so embedded NUL or non-ASCII bytes are treated
/// like any other content.
pub fn find_terminator(buf: &[u8]) -> Option<usize> {
    buf.windows(TERMINATOR.len()).position(|w| w == TERMINATOR)
}
