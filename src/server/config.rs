//! Server configuration

use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use crate::protocol::constants::*;

/// Server configuration options
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to
    pub bind_addr: SocketAddr,

    /// Maximum concurrently registered connections
    pub max_connections: usize,

    /// Listen backlog
    pub backlog: u32,

    /// Content bytes kept from each inbound line
    pub max_line_len: usize,

    /// Per-connection inbound buffer capacity, also the outbound wire buffer
    pub buffer_capacity: usize,

    /// Capacity of the channel carrying reader events to the event loop
    pub event_queue_capacity: usize,

    /// Lines queued per connection before it is dropped as too slow
    pub outbound_queue: usize,

    /// Longest a single socket write may take before the connection is
    /// dropped
    pub write_timeout: Duration,

    /// Enable TCP_NODELAY (disable Nagle's algorithm)
    pub tcp_nodelay: bool,

    /// Enable SO_REUSEPORT in addition to SO_REUSEADDR (Unix only)
    pub reuse_port: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_PORT)),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            backlog: DEFAULT_BACKLOG,
            max_line_len: MAX_LINE_LEN,
            buffer_capacity: LINE_BUFFER_SIZE,
            event_queue_capacity: 1024,
            outbound_queue: DEFAULT_OUTBOUND_QUEUE,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
            tcp_nodelay: true,
            reuse_port: false,
        }
    }
}

impl ServerConfig {
    /// Create a new config with custom bind address
    pub fn with_addr(addr: SocketAddr) -> Self {
        Self {
            bind_addr: addr,
            ..Default::default()
        }
    }

    /// Create a config listening on all interfaces at `port`
    pub fn with_port(port: u16) -> Self {
        Self::with_addr(SocketAddr::from((Ipv4Addr::UNSPECIFIED, port)))
    }

    /// Set the bind address
    pub fn bind(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Set maximum connections
    pub fn max_connections(mut self, max: usize) -> Self {
        self.max_connections = max;
        self
    }

    /// Set the listen backlog
    pub fn backlog(mut self, backlog: u32) -> Self {
        self.backlog = backlog.max(1);
        self
    }

    /// Set the maximum content length per line
    ///
    /// Capped so that a truncated line always fits the buffer.
    pub fn max_line_len(mut self, len: usize) -> Self {
        self.max_line_len = len.min(self.buffer_capacity.saturating_sub(TERMINATOR.len()));
        self
    }

    /// Set the per-connection buffer capacity
    pub fn buffer_capacity(mut self, capacity: usize) -> Self {
        self.buffer_capacity = capacity.max(TERMINATOR.len());
        self.max_line_len = self
            .max_line_len
            .min(self.buffer_capacity - TERMINATOR.len());
        self
    }

    /// Set the per-connection outbound queue length
    pub fn outbound_queue(mut self, len: usize) -> Self {
        self.outbound_queue = len.max(1);
        self
    }

    /// Set the bound on a single socket write
    pub fn write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    /// Enable SO_REUSEPORT
    pub fn reuse_port(mut self) -> Self {
        self.reuse_port = true;
        self
    }
}
