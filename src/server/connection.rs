//! Per-connection reader task
//!
//! Each accepted socket is split. The write half goes into the registry; the
//! read half moves into a reader task together with the connection's
//! [`LineBuffer`]. The task performs one read at a time, drains every
//! complete frame, and forwards frames and the final close reason to the
//! event loop in order. It never touches the registry itself.
//!
//! Writer tasks (see [`super::outbound`]) report their failures over the
//! same channel.

use bytes::Bytes;
use tokio::io::AsyncRead;
use tokio::sync::mpsc;

use crate::protocol::framer::{LineBuffer, ReadStatus};
use crate::protocol::writer::WriteOutcome;
use crate::registry::ConnectionId;

/// Why a reader task stopped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseReason {
    /// Peer shut down cleanly
    Disconnected,
    /// Buffer filled up without a terminator
    Overflow,
    /// Reading from the socket failed
    ReadError(String),
    /// Writing to the socket failed or timed out
    WriteFailed(WriteOutcome),
}

/// Message from a connection's tasks to the event loop
#[derive(Debug)]
pub enum ConnectionEvent {
    /// A complete frame, already truncated to the maximum line length
    Frame {
        /// Sending connection
        id: ConnectionId,
        /// Line content without terminator
        content: Bytes,
    },
    /// The connection must be torn down
    Closed {
        /// Connection to remove
        id: ConnectionId,
        /// Cause
        reason: CloseReason,
    },
}

/// Read frames from `reader` until the connection ends
///
/// A peer that shuts down in the middle of a line loses the partial line:
/// it is discarded, and the next read finds the connection closed.
pub async fn read_frames<R>(
    id: ConnectionId,
    mut reader: R,
    mut lines: LineBuffer,
    events: mpsc::Sender<ConnectionEvent>,
) where
    R: AsyncRead + Unpin,
{
    let reason = loop {
        match lines.read_from(&mut reader).await {
            Ok(ReadStatus::Complete) => {
                while let Some(content) = lines.next_frame() {
                    if events.send(ConnectionEvent::Frame { id, content }).await.is_err() {
                        tracing::debug!(id = %id, "Event loop gone, reader stopping");
                        return;
                    }
                }
            }
            Ok(ReadStatus::Incomplete { stalled: false }) => {}
            Ok(ReadStatus::Incomplete { stalled: true }) => {
                tracing::debug!(
                    id = %id,
                    discarded = lines.len(),
                    "Peer shut down mid-line"
                );
                lines.clear();
            }
            Ok(ReadStatus::Disconnected) => break CloseReason::Disconnected,
            Ok(ReadStatus::Overflow) => break CloseReason::Overflow,
            Err(e) => break CloseReason::ReadError(e.to_string()),
        }
    };

    if events
        .send(ConnectionEvent::Closed { id, reason })
        .await
        .is_err()
    {
        tracing::debug!(id = %id, "Event loop gone, close not reported");
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use tokio_test::io::Builder;

    use super::*;
    use crate::protocol::constants::LINE_BUFFER_SIZE;

    fn frame(event: ConnectionEvent) -> Bytes {
        match event {
            ConnectionEvent::Frame { content, .. } => content,
            other => panic!("expected frame, got {:?}", other),
        }
    }

    fn closed(event: ConnectionEvent) -> CloseReason {
        match event {
            ConnectionEvent::Closed { reason, .. } => reason,
            other => panic!("expected close, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_frames_forwarded_in_order_then_disconnect() {
        let reader = Builder::new().read(b"one\r\ntw").read(b"o\r\nthree\r\n").build();
        let (tx, mut rx) = mpsc::channel(8);

        read_frames(ConnectionId::new(1), reader, LineBuffer::default(), tx).await;

        assert_eq!(frame(rx.recv().await.unwrap()), Bytes::from("one"));
        assert_eq!(frame(rx.recv().await.unwrap()), Bytes::from("two"));
        assert_eq!(frame(rx.recv().await.unwrap()), Bytes::from("three"));
        assert_eq!(closed(rx.recv().await.unwrap()), CloseReason::Disconnected);
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_overflow_reported() {
        let data = vec![b'x'; LINE_BUFFER_SIZE];
        let reader = Builder::new().read(&data).build();
        let (tx, mut rx) = mpsc::channel(8);

        read_frames(ConnectionId::new(2), reader, LineBuffer::default(), tx).await;

        match rx.recv().await.unwrap() {
            ConnectionEvent::Closed { id, reason } => {
                assert_eq!(id, ConnectionId::new(2));
                assert_eq!(reason, CloseReason::Overflow);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_read_error_reported() {
        let reader = Builder::new()
            .read(b"ok\r\n")
            .read_error(io::Error::new(io::ErrorKind::ConnectionReset, "reset"))
            .build();
        let (tx, mut rx) = mpsc::channel(8);

        read_frames(ConnectionId::new(3), reader, LineBuffer::default(), tx).await;

        assert_eq!(frame(rx.recv().await.unwrap()), Bytes::from("ok"));
        assert!(matches!(
            closed(rx.recv().await.unwrap()),
            CloseReason::ReadError(_)
        ));
    }

    #[tokio::test]
    async fn test_shutdown_mid_line_releases_connection() {
        let reader = Builder::new().read(b"done\r\npart").build();
        let (tx, mut rx) = mpsc::channel(8);

        read_frames(ConnectionId::new(4), reader, LineBuffer::default(), tx).await;

        assert_eq!(frame(rx.recv().await.unwrap()), Bytes::from("done"));
        assert_eq!(closed(rx.recv().await.unwrap()), CloseReason::Disconnected);
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_partial_line_never_forwarded() {
        let reader = Builder::new().read(b"no terminator").build();
        let (tx, mut rx) = mpsc::channel(8);

        read_frames(ConnectionId::new(5), reader, LineBuffer::default(), tx).await;

        assert_eq!(closed(rx.recv().await.unwrap()), CloseReason::Disconnected);
        assert!(rx.recv().await.is_none());
    }
}
