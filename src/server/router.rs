//! Broadcast router
//!
//! Decides where each completed frame goes:
//!
//! - A frame equal to the control token is a private query answered with
//!   `Connected clients: <n>` to the sender only.
//! - Any other frame is formatted as `client<id>: <content>`, shown on the
//!   server console, and queued for every other connection whose peer
//!   address is textually equal to the sender's. Peers with an empty
//!   address belong to no group.
//!
//! Routing never waits on a socket. A destination whose queue is full or
//! whose writer has stopped is removed on the spot through the registry
//! cursor, and delivery continues with the remaining destinations.

use std::io::Write;
use std::sync::Arc;

use bytes::Bytes;

use crate::console::Console;
use crate::protocol::constants::{CONTROL_TOKEN, TERMINATOR};
use crate::protocol::writer::WriteOutcome;
use crate::registry::{ConnectionId, Registry};
use crate::stats::ServerStats;

use super::outbound::Outbound;

/// Summary of one routed frame
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteReport {
    /// Lines handed to destination queues
    pub queued: usize,
    /// Connections removed because they could not take the line
    pub removed: Vec<ConnectionId>,
}

/// Routes frames from one connection to its broadcast group
pub struct Router<C> {
    console: Arc<C>,
    wire_capacity: usize,
    stats: Arc<ServerStats>,
}

impl<C: Console> Router<C> {
    /// Create a router relaying lines of at most `wire_capacity` bytes
    pub fn new(console: Arc<C>, wire_capacity: usize, stats: Arc<ServerStats>) -> Self {
        Self {
            console,
            wire_capacity,
            stats,
        }
    }

    /// Route one frame received from `sender`
    pub fn dispatch(
        &self,
        registry: &mut Registry<Outbound>,
        sender: ConnectionId,
        content: &[u8],
    ) -> RouteReport {
        let mut report = RouteReport::default();

        let group = match registry.get(sender) {
            Some(conn) => conn.peer_ip.clone(),
            None => {
                tracing::debug!(id = %sender, "Frame from unregistered connection dropped");
                return report;
            }
        };

        if content == CONTROL_TOKEN {
            self.answer_query(registry, sender, &mut report);
            return report;
        }

        let line = format_line(sender, content);
        self.console.display(&String::from_utf8_lossy(&line));

        if group.is_empty() {
            return report;
        }
        if line.len() + TERMINATOR.len() > self.wire_capacity {
            tracing::warn!(
                sender = %sender,
                len = line.len(),
                capacity = self.wire_capacity,
                "Line too long to relay"
            );
            return report;
        }

        let line = Bytes::from(line);
        let mut cursor = registry.cursor();
        while let Some(conn) = registry.advance(&mut cursor) {
            if conn.id == sender || !conn.in_group(&group) {
                continue;
            }

            let id = conn.id;
            match conn.writer.try_send(line.clone()) {
                WriteOutcome::Delivered => report.queued += 1,
                outcome => {
                    tracing::warn!(
                        id = %id,
                        sender = %sender,
                        outcome = ?outcome,
                        "Destination cannot take line, dropping connection"
                    );
                    self.stats.record_write_failure();
                    if registry.remove_at(&mut cursor, id).is_ok() {
                        self.stats.record_closed();
                        report.removed.push(id);
                    }
                }
            }
        }

        tracing::debug!(
            sender = %sender,
            queued = report.queued,
            removed = report.removed.len(),
            "Frame relayed"
        );

        report
    }

    fn answer_query(
        &self,
        registry: &mut Registry<Outbound>,
        sender: ConnectionId,
        report: &mut RouteReport,
    ) {
        let reply = Bytes::from(format!("Connected clients: {}", registry.len()));
        let outcome = match registry.get(sender) {
            Some(conn) => conn.writer.try_send(reply),
            None => return,
        };

        if outcome.is_delivered() {
            report.queued += 1;
            return;
        }

        tracing::warn!(id = %sender, outcome = ?outcome, "Query reply failed, dropping connection");
        self.stats.record_write_failure();
        if registry.remove(sender).is_ok() {
            self.stats.record_closed();
            report.removed.push(sender);
        }
    }
}

/// Format the relayed line `client<id>: <content>`
pub fn format_line(sender: ConnectionId, content: &[u8]) -> Vec<u8> {
    let mut line = Vec::with_capacity(content.len() + 16);
    // Writing into a Vec cannot fail.
    let _ = write!(line, "client{}: ", sender);
    line.extend_from_slice(content);
    line
}
