//! Line-oriented TCP chat relay
//!
//! A small multi-client relay: clients send CRLF-terminated text lines and the
//! server re-broadcasts each line, prefixed with the sender's display id, to
//! every other client connected from the same network address.
//!
//! ```text
//!   client A ──┐                         ┌──► client B (same address as A)
//!              │   reader task (framer)  │
//!              └──► frames ──► event loop ──► Router ──► write_line()
//!                               │   owns
//!                               ▼
//!                            Registry
//! ```
//!
//! The shell embedding the relay uses three entry points:
//! [`start_server`], [`start_client`] and [`send_line`]. Output meant for the
//! user goes through a caller-supplied [`Console`].
//!
//! # Example
//! ```no_run
//! use chat_relay::start_server;
//!
//! # async fn example() -> chat_relay::error::Result<()> {
//! let server = start_server(30000).await?;
//! println!("listening on {}", server.local_addr());
//! server.stop().await?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod console;
pub mod error;
pub mod protocol;
pub mod registry;
pub mod server;
pub mod stats;

pub use client::{send_line, start_client, ChatClient, ClientConfig, ClientExit};
pub use console::{Console, MemoryConsole, StdConsole};
pub use error::{Error, Result};
pub use server::{start_server, ChatServer, ServerConfig, ServerHandle};
