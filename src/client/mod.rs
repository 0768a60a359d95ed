//! Chat relay client
//!
//! Provides the client side of the relay:
//! - An interactive session relaying local input lines to the server and
//!   displaying the server's lines
//! - A one-shot [`send_line`] for scripts

pub mod config;
pub mod connector;
pub mod session;

pub use config::ClientConfig;
pub use connector::{connect_with_retry, send_line};
pub use session::{start_client, ChatClient, ClientExit};
