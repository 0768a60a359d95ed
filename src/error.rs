//! Error types
//!
//! A single crate-level [`Error`] covers setup failures, socket I/O and
//! caller errors. Per-connection failures that the relay handles locally
//! (peer closed, overflow, rejected) are reported as outcome values by the
//! modules that produce them and only become an [`Error`] at the public
//! entry points.

use std::net::SocketAddr;

use crate::registry::RegistryError;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for relay operations
#[derive(Debug)]
pub enum Error {
    /// Underlying socket or stream I/O failed
    Io(std::io::Error),

    /// Creating, binding or listening on the server socket failed
    Setup {
        /// Address the server tried to bind
        addr: SocketAddr,
        /// Cause reported by the OS
        source: std::io::Error,
    },

    /// Registry operation failed
    Registry(RegistryError),

    /// Port number is not a positive integer
    InvalidPort(u16),

    /// Host is not a dotted-decimal IPv4 literal
    InvalidAddress(String),

    /// Line plus terminator does not fit the wire buffer
    LineTooLong {
        /// Content length in bytes
        len: usize,
        /// Wire buffer capacity in bytes
        capacity: usize,
    },

    /// Peer closed the connection while a line was being written
    PeerClosed,

    /// Server task stopped without reporting a result
    ServerStopped,
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Io(e) => write!(f, "I/O error: {}", e),
            Error::Setup { addr, source } => {
                write!(f, "Failed to set up listener on {}: {}", addr, source)
            }
            Error::Registry(e) => write!(f, "Registry error: {}", e),
            Error::InvalidPort(port) => write!(f, "Invalid port number: {}", port),
            Error::InvalidAddress(host) => write!(f, "Invalid IPv4 address: {}", host),
            Error::LineTooLong { len, capacity } => write!(
                f,
                "Line of {} bytes does not fit a {} byte wire buffer",
                len, capacity
            ),
            Error::PeerClosed => write!(f, "Peer closed the connection"),
            Error::ServerStopped => write!(f, "Server task stopped unexpectedly"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            Error::Setup { source, .. } => Some(source),
            Error::Registry(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<RegistryError> for Error {
    fn from(e: RegistryError) -> Self {
        Error::Registry(e)
    }
}
