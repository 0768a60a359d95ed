//! Outbound line writer

use std::io::ErrorKind;

use bytes::{BufMut, BytesMut};
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::error::{Error, Result};

use super::constants::TERMINATOR;

/// Result of writing one line to a peer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// Every byte, terminator included, was handed to the socket
    Delivered,
    /// Write failed; the connection is unusable
    WriteError(ErrorKind),
    /// Peer is gone (zero-byte write, broken pipe or reset)
    PeerClosed,
}

impl WriteOutcome {
    /// Check if the line was delivered
    pub fn is_delivered(&self) -> bool {
        matches!(self, WriteOutcome::Delivered)
    }
}

/// Write `content` followed by CR LF to `writer`
///
/// Lines whose content plus terminator exceed `capacity` are rejected with
/// [`Error::LineTooLong`] before anything is written. Short writes are
/// continued and interrupted writes retried until the whole line is out.
pub async fn write_line<W>(writer: &mut W, content: &[u8], capacity: usize) -> Result<WriteOutcome>
where
    W: AsyncWrite + Unpin,
{
    if content.len() + TERMINATOR.len() > capacity {
        return Err(Error::LineTooLong {
            len: content.len(),
            capacity,
        });
    }

    let mut wire = BytesMut::with_capacity(content.len() + TERMINATOR.len());
    wire.put_slice(content);
    wire.put_slice(TERMINATOR);

    let mut written = 0;
    while written < wire.len() {
        match writer.write(&wire[written..]).await {
            Ok(0) => return Ok(WriteOutcome::PeerClosed),
            Ok(n) => written += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Ok(classify(e.kind())),
        }
    }

    loop {
        match writer.flush().await {
            Ok(()) => return Ok(WriteOutcome::Delivered),
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Ok(classify(e.kind())),
        }
    }
}

fn classify(kind: ErrorKind) -> WriteOutcome {
    match kind {
        ErrorKind::BrokenPipe | ErrorKind::ConnectionReset | ErrorKind::ConnectionAborted => {
            WriteOutcome::PeerClosed
        }
        other => WriteOutcome::WriteError(other),
    }
}
