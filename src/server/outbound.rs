//! Per-connection writer task
//!
//! The event loop never writes to a socket. Every registered connection
//! owns an [`Outbound`] queue drained by its own writer task, so a peer that
//! stops reading only fills its own queue:
//!
//! ```text
//!   Router ── try_send ──► [ queue (bounded) ] ──► writer task ──► socket
//!                  │                                    │
//!        Full / Closed: drop peer        write fails or times out:
//!                                        ConnectionEvent::Closed
//! ```

use std::io::ErrorKind;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc::{self, error::TrySendError};

use crate::protocol::writer::{write_line, WriteOutcome};
use crate::registry::ConnectionId;
use crate::stats::ServerStats;

use super::config::ServerConfig;
use super::connection::{CloseReason, ConnectionEvent};

/// Limits applied by each writer task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutboundLimits {
    /// Wire buffer capacity, terminator included
    pub wire_capacity: usize,
    /// Lines waiting for the writer before the peer counts as too slow
    pub queue_len: usize,
    /// Bound on writing a single line
    pub write_timeout: Duration,
}

impl From<&ServerConfig> for OutboundLimits {
    fn from(config: &ServerConfig) -> Self {
        Self {
            wire_capacity: config.buffer_capacity,
            queue_len: config.outbound_queue,
            write_timeout: config.write_timeout,
        }
    }
}

/// Sending side of one connection's outbound queue
///
/// Dropping it lets the writer task flush what is queued, then shut the
/// socket down.
#[derive(Debug)]
pub struct Outbound {
    tx: mpsc::Sender<Bytes>,
}

impl Outbound {
    /// Spawn the writer task for connection `id`
    pub fn spawn<W>(
        id: ConnectionId,
        writer: W,
        limits: OutboundLimits,
        events: mpsc::Sender<ConnectionEvent>,
        stats: Arc<ServerStats>,
    ) -> Self
    where
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(limits.queue_len.max(1));
        tokio::spawn(drain(id, writer, rx, limits, events, stats));
        Self { tx }
    }

    /// Queue one line without waiting
    ///
    /// A full queue is reported as a `WouldBlock` write error; a queue whose
    /// writer task has ended as [`WriteOutcome::PeerClosed`].
    pub fn try_send(&self, line: Bytes) -> WriteOutcome {
        match self.tx.try_send(line) {
            Ok(()) => WriteOutcome::Delivered,
            Err(TrySendError::Full(_)) => WriteOutcome::WriteError(ErrorKind::WouldBlock),
            Err(TrySendError::Closed(_)) => WriteOutcome::PeerClosed,
        }
    }
}

async fn drain<W>(
    id: ConnectionId,
    mut writer: W,
    mut queue: mpsc::Receiver<Bytes>,
    limits: OutboundLimits,
    events: mpsc::Sender<ConnectionEvent>,
    stats: Arc<ServerStats>,
) where
    W: AsyncWrite + Unpin,
{
    while let Some(line) = queue.recv().await {
        let write = write_line(&mut writer, &line, limits.wire_capacity);
        let outcome = match tokio::time::timeout(limits.write_timeout, write).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => {
                tracing::warn!(id = %id, error = %e, "Line not written");
                continue;
            }
            Err(_) => WriteOutcome::WriteError(ErrorKind::TimedOut),
        };

        if outcome.is_delivered() {
            stats.record_delivered();
            continue;
        }

        tracing::debug!(id = %id, outcome = ?outcome, "Writer stopped");
        let reason = CloseReason::WriteFailed(outcome);
        if events.send(ConnectionEvent::Closed { id, reason }).await.is_err() {
            tracing::debug!(id = %id, "Event loop gone, write failure not reported");
        }
        return;
    }

    if let Err(e) = writer.shutdown().await {
        tracing::debug!(id = %id, error = %e, "Shutdown failed");
    }
}
