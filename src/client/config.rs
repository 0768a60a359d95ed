//! Client configuration

use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::protocol::constants::*;

/// Client configuration options
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Server to connect to
    pub server_addr: SocketAddr,

    /// Pause between connection attempts
    pub retry_delay: Duration,

    /// Content bytes kept from each local input line
    pub max_line_len: usize,

    /// Capacity of the buffer for lines coming from the server, also the
    /// outbound wire buffer
    pub buffer_capacity: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, DEFAULT_PORT)),
            retry_delay: CONNECT_RETRY_DELAY,
            max_line_len: MAX_LINE_LEN,
            buffer_capacity: LINE_BUFFER_SIZE,
        }
    }
}

impl ClientConfig {
    /// Create a config for the given server address
    pub fn new(server_addr: SocketAddr) -> Self {
        Self {
            server_addr,
            ..Default::default()
        }
    }

    /// Create a config from a dotted-decimal IPv4 host and a port
    ///
    /// Host names are not resolved.
    pub fn from_host(host: &str, port: u16) -> Result<Self> {
        if port == 0 {
            return Err(Error::InvalidPort(port));
        }
        let ip: Ipv4Addr = host
            .parse()
            .map_err(|_| Error::InvalidAddress(host.to_string()))?;

        Ok(Self::new(SocketAddr::from((ip, port))))
    }

    /// Set the delay between connection attempts
    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Set the maximum content length per line
    pub fn max_line_len(mut self, len: usize) -> Self {
        self.max_line_len = len.min(self.buffer_capacity.saturating_sub(TERMINATOR.len()));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();

        assert_eq!(config.server_addr, "127.0.0.1:30000".parse().unwrap());
        assert_eq!(config.retry_delay, Duration::from_secs(2));
        assert_eq!(config.max_line_len, 128);
        assert_eq!(config.buffer_capacity, 142);
    }

    #[test]
    fn test_from_host() {
        let config = ClientConfig::from_host("10.1.2.3", 4000).unwrap();
        assert_eq!(config.server_addr, "10.1.2.3:4000".parse().unwrap());
    }

    #[test]
    fn test_from_host_rejects_names_and_port_zero() {
        assert!(matches!(
            ClientConfig::from_host("localhost", 4000),
            Err(Error::InvalidAddress(host)) if host == "localhost"
        ));
        assert!(matches!(
            ClientConfig::from_host("::1", 4000),
            Err(Error::InvalidAddress(_))
        ));
        assert!(matches!(
            ClientConfig::from_host("127.0.0.1", 0),
            Err(Error::InvalidPort(0))
        ));
    }

    #[test]
    fn test_max_line_len_capped() {
        let config = ClientConfig::default().max_line_len(500);
        assert_eq!(config.max_line_len, 140);
    }
}
