//! Connection registry
//!
//! The registry is the ordered set of live connections. It is owned by the
//! server's event loop task and only that task mutates it, so it needs no
//! lock. Connections are addressed by their display id, which doubles as a
//! stable handle:
//!
//! ```text
//!   Registry { connections: [ #1 10.0.0.5 | #3 10.0.0.5 | #4 10.0.0.9 ] }
//!                                  ▲
//!                  Cursor { next: 1 } ── remove_at(#1) ──► Cursor { next: 0 }
//! ```
//!
//! Removing a connection while a broadcast walks the registry goes through
//! [`Registry::remove_at`], which patches the walk's [`Cursor`] so the pass
//! neither skips nor revisits anyone.

pub mod entry;
pub mod error;
pub mod store;

pub use entry::{Connection, ConnectionId};
pub use error::RegistryError;
pub use store::{Cursor, Registry};
