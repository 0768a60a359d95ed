//! Chat relay server
//!
//! Accepts TCP connections, frames each connection's byte stream into CRLF
//! lines and relays every line to the other clients connected from the same
//! address.
//!
//! # Example
//! ```no_run
//! use chat_relay::console::StdConsole;
//! use chat_relay::server::{ChatServer, ServerConfig};
//!
//! # async fn example() -> chat_relay::error::Result<()> {
//! let config = ServerConfig::with_port(30000).max_connections(64);
//! let server = ChatServer::new(config, StdConsole);
//!
//! server.run_until(async {
//!     let _ = tokio::signal::ctrl_c().await;
//! }).await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod connection;
pub mod listener;
pub mod outbound;
pub mod router;

pub use config::ServerConfig;
pub use connection::{CloseReason, ConnectionEvent};
pub use listener::{start_server, ChatServer, ServerHandle};
pub use outbound::{Outbound, OutboundLimits};
pub use router::{RouteReport, Router};
