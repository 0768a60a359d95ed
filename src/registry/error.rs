//! Registry error types

use super::entry::ConnectionId;

/// Error type for registry operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// Registry already holds the maximum number of connections
    Full(usize),
    /// Connection is not registered
    NotFound(ConnectionId),
}

impl std::fmt::Display for RegistryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegistryError::Full(max) => write!(f, "Connection limit reached: {}", max),
            RegistryError::NotFound(id) => write!(f, "Connection not registered: {}", id),
        }
    }
}

impl std::error::Error for RegistryError {}
