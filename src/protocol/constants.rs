//! Protocol constants

use std::time::Duration;

/// Line terminator on the wire
pub const TERMINATOR: &[u8; 2] = b"\r\n";

/// Maximum display-name length reserved in a protocol line
pub const MAX_NAME_LEN: usize = 10;

/// Maximum content bytes kept from one inbound line
pub const MAX_LINE_LEN: usize = 128;

/// Longest line the server emits: name, space, content and terminator
pub const MAX_PROTOCOL_LINE: usize = MAX_NAME_LEN + 1 + MAX_LINE_LEN + TERMINATOR.len();

/// Capacity of per-connection inbound buffers and outbound wire buffers
pub const LINE_BUFFER_SIZE: usize = MAX_PROTOCOL_LINE + 1;

/// Content of the private "how many clients" query
pub const CONTROL_TOKEN: &[u8; 10] = b"\\connected";

/// Default server port
pub const DEFAULT_PORT: u16 = 30000;

/// Default bound on concurrently registered connections
pub const DEFAULT_MAX_CONNECTIONS: usize = 100_000;

/// Default listen backlog
pub const DEFAULT_BACKLOG: u32 = 5;

/// Default number of lines queued for one connection before it counts as
/// not keeping up
pub const DEFAULT_OUTBOUND_QUEUE: usize = 64;

/// Default bound on a single outbound socket write
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(5);

/// Delay between client connection attempts
pub const CONNECT_RETRY_DELAY: Duration = Duration::from_secs(2);
