//! Registry entries
//!
//! This module defines the per-connection state stored in the registry.

use std::time::{Duration, Instant};

use tokio::task::AbortHandle;

/// Display identifier of a connection
///
/// Assigned from a strictly increasing counter and never reused, even after
/// the connection is gone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Create an id from its numeric value
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Numeric value shown to users
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A registered connection
///
/// `W` is the write side of the socket. The read side lives in a separate
/// reader task whose abort handle is attached after registration. Dropping
/// the entry closes the connection: the writer is dropped and the reader
/// task is aborted.
pub struct Connection<W> {
    /// Display id
    pub id: ConnectionId,

    /// Textual peer IP, empty when it could not be determined
    pub peer_ip: String,

    /// Write side of the socket
    pub writer: W,

    /// When the connection was accepted
    pub connected_at: Instant,

    reader: Option<AbortHandle>,
}

impl<W> Connection<W> {
    pub(super) fn new(id: ConnectionId, peer_ip: String, writer: W) -> Self {
        Self {
            id,
            peer_ip,
            writer,
            connected_at: Instant::now(),
            reader: None,
        }
    }

    /// Attach the reader task so that it is stopped when the entry is dropped
    pub fn attach_reader(&mut self, reader: AbortHandle) {
        if let Some(previous) = self.reader.replace(reader) {
            previous.abort();
        }
    }

    /// Check if this connection belongs to the broadcast group of `peer_ip`
    ///
    /// Empty addresses never match, not even each other.
    pub fn in_group(&self, peer_ip: &str) -> bool {
        !self.peer_ip.is_empty() && self.peer_ip == peer_ip
    }

    /// Time since the connection was accepted
    pub fn duration(&self) -> Duration {
        self.connected_at.elapsed()
    }
}

impl<W> Drop for Connection<W> {
    fn drop(&mut self) {
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
    }
}

impl<W> std::fmt::Debug for Connection<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("peer_ip", &self.peer_ip)
            .field("connected_at", &self.connected_at)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_membership() {
        let conn = Connection::new(ConnectionId::new(1), "10.0.0.5".into(), ());

        assert!(conn.in_group("10.0.0.5"));
        assert!(!conn.in_group("10.0.0.6"));
        assert!(!conn.in_group(""));
    }

    #[test]
    fn test_empty_address_joins_no_group() {
        let conn = Connection::new(ConnectionId::new(1), String::new(), ());

        assert!(!conn.in_group(""));
        assert!(!conn.in_group("10.0.0.5"));
    }

    #[tokio::test]
    async fn test_drop_aborts_reader() {
        let task = tokio::spawn(std::future::pending::<()>());
        let mut conn = Connection::new(ConnectionId::new(7), "127.0.0.1".into(), ());
        conn.attach_reader(task.abort_handle());

        drop(conn);

        let result = task.await;
        assert!(result.unwrap_err().is_cancelled());
    }
}
