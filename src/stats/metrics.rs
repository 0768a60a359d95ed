//! Statistics for the relay server

use std::sync::atomic::{AtomicU64, Ordering};

/// Live counters updated by the server's event loop
#[derive(Debug, Default)]
pub struct ServerStats {
    connections_accepted: AtomicU64,
    connections_rejected: AtomicU64,
    connections_closed: AtomicU64,
    frames_received: AtomicU64,
    lines_delivered: AtomicU64,
    overflows: AtomicU64,
    write_failures: AtomicU64,
}

impl ServerStats {
    /// Create zeroed counters
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_accepted(&self) {
        self.connections_accepted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_rejected(&self) {
        self.connections_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_closed(&self) {
        self.connections_closed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_frame(&self) {
        self.frames_received.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_delivered(&self) {
        self.lines_delivered.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_overflow(&self) {
        self.overflows.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_write_failure(&self) {
        self.write_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Copy the current counter values
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            connections_accepted: self.connections_accepted.load(Ordering::Relaxed),
            connections_rejected: self.connections_rejected.load(Ordering::Relaxed),
            connections_closed: self.connections_closed.load(Ordering::Relaxed),
            frames_received: self.frames_received.load(Ordering::Relaxed),
            lines_delivered: self.lines_delivered.load(Ordering::Relaxed),
            overflows: self.overflows.load(Ordering::Relaxed),
            write_failures: self.write_failures.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`ServerStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Connections registered
    pub connections_accepted: u64,
    /// Connections closed on arrival because the registry was full
    pub connections_rejected: u64,
    /// Registered connections that were removed
    pub connections_closed: u64,
    /// Complete frames extracted from clients
    pub frames_received: u64,
    /// Lines successfully written to clients
    pub lines_delivered: u64,
    /// Connections dropped for filling their buffer without a terminator
    pub overflows: u64,
    /// Writes that failed or found the peer gone
    pub write_failures: u64,
}

impl StatsSnapshot {
    /// Connections currently open according to the counters
    pub fn open_connections(&self) -> u64 {
        self.connections_accepted
            .saturating_sub(self.connections_closed)
    }
}
