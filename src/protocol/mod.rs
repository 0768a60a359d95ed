//! Wire protocol
//!
//! The relay speaks plain ASCII text lines terminated by CR LF. There are no
//! headers or length prefixes:
//!
//! ```text
//! client ──► server    hello\r\n
//! server ──► peers     client1: hello\r\n
//! client ──► server    \connected\r\n
//! server ──► client    Connected clients: 3\r\n
//! ```
//!
//! [`LineBuffer`] extracts frames from inbound bytes and [`write_line`]
//! sends one outbound line.

pub mod constants;
pub mod framer;
pub mod writer;

pub use framer::{LineBuffer, ReadStatus};
pub use writer::{write_line, WriteOutcome};
