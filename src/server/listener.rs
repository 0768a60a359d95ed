//! Relay server listener and event loop
//!
//! One task owns the listening socket and the registry. It waits on two
//! sources at once: the listener (new connections) and the channel fed by
//! the connection tasks (frames and close notices). Each turn of the loop
//! handles exactly one ready source and never waits on a client socket:
//! reads happen in reader tasks and writes in writer tasks. Frames from one
//! connection are routed in the order they were read.

use std::future::Future;
use std::io::ErrorKind;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::{TcpListener, TcpSocket, TcpStream};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::console::{Console, StdConsole};
use crate::error::{Error, Result};
use crate::protocol::framer::LineBuffer;
use crate::registry::Registry;
use crate::server::config::ServerConfig;
use crate::server::connection::{read_frames, CloseReason, ConnectionEvent};
use crate::server::outbound::{Outbound, OutboundLimits};
use crate::server::router::Router;
use crate::stats::{ServerStats, StatsSnapshot};

/// Chat relay server
pub struct ChatServer<C: Console> {
    config: ServerConfig,
    console: Arc<C>,
    stats: Arc<ServerStats>,
}

impl<C: Console> ChatServer<C> {
    /// Create a new server with the given configuration and console
    pub fn new(config: ServerConfig, console: C) -> Self {
        Self::with_console(config, Arc::new(console))
    }

    /// Create a new server sharing an existing console
    pub fn with_console(config: ServerConfig, console: Arc<C>) -> Self {
        Self {
            config,
            console,
            stats: Arc::new(ServerStats::new()),
        }
    }

    /// Get the server configuration
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Get the live statistics counters
    pub fn stats(&self) -> &Arc<ServerStats> {
        &self.stats
    }

    /// Create the listening socket
    ///
    /// Enables `SO_REUSEADDR` so the port can be reused immediately after a
    /// previous server exits. Any failure is a [`Error::Setup`].
    pub fn bind(&self) -> Result<TcpListener> {
        let addr = self.config.bind_addr;
        let setup = |source: std::io::Error| Error::Setup { addr, source };

        let socket = if addr.is_ipv4() {
            TcpSocket::new_v4()
        } else {
            TcpSocket::new_v6()
        }
        .map_err(setup)?;

        socket.set_reuseaddr(true).map_err(setup)?;
        if self.config.reuse_port {
            set_reuseport(&socket).map_err(setup)?;
        }

        socket.bind(addr).map_err(setup)?;
        socket.listen(self.config.backlog).map_err(setup)
    }

    /// Run the server until `shutdown` resolves
    ///
    /// Returns `Ok(())` after a graceful shutdown and an error if the
    /// listener could not be set up or failed fatally. Every connection is
    /// closed before this returns.
    pub async fn run_until<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let listener = self.bind()?;
        tracing::info!(addr = %self.config.bind_addr, "Chat server listening");
        self.serve(listener, shutdown).await
    }

    /// Bind and run the server in a background task
    pub async fn start(self) -> Result<ServerHandle> {
        let listener = self.bind()?;
        let local_addr = listener.local_addr()?;
        tracing::info!(addr = %local_addr, "Chat server listening");

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let stats = Arc::clone(&self.stats);

        let task = tokio::spawn(async move {
            let shutdown = async move {
                // A dropped handle detaches the server instead of stopping it.
                if shutdown_rx.await.is_err() {
                    std::future::pending::<()>().await;
                }
            };
            self.serve(listener, shutdown).await
        });

        Ok(ServerHandle {
            local_addr,
            shutdown: Some(shutdown_tx),
            task,
            stats,
        })
    }

    async fn serve<F>(&self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let (events_tx, mut events_rx) = mpsc::channel(self.config.event_queue_capacity);
        let mut registry = Registry::new(self.config.max_connections);
        let router = Router::new(
            Arc::clone(&self.console),
            self.config.buffer_capacity,
            Arc::clone(&self.stats),
        );
        tokio::pin!(shutdown);

        let result = loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("Shutdown signal received");
                    break Ok(());
                }
                accepted = listener.accept() => match accepted {
                    Ok((socket, peer_addr)) => {
                        self.admit(&mut registry, socket, peer_addr, &events_tx);
                    }
                    Err(e) if is_transient(&e) => {
                        tracing::debug!(error = %e, "Accept interrupted");
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Failed to accept connection");
                        break Err(Error::Io(e));
                    }
                },
                Some(event) = events_rx.recv() => {
                    self.handle_event(&mut registry, &router, event);
                }
            }
        };

        let closed = registry.clear();
        for _ in 0..closed {
            self.stats.record_closed();
        }
        tracing::info!(closed_connections = closed, "Chat server stopped");

        result
    }

    fn admit(
        &self,
        registry: &mut Registry<Outbound>,
        socket: TcpStream,
        peer_addr: SocketAddr,
        events: &mpsc::Sender<ConnectionEvent>,
    ) {
        if self.config.tcp_nodelay {
            if let Err(e) = socket.set_nodelay(true) {
                tracing::debug!(error = %e, "Failed to set TCP_NODELAY");
            }
        }

        let (reader, writer) = socket.into_split();
        let limits = OutboundLimits::from(&self.config);
        let stats = Arc::clone(&self.stats);
        let admitted = registry.insert_with(peer_addr.ip().to_string(), |id| {
            Outbound::spawn(id, writer, limits, events.clone(), stats)
        });
        let id = match admitted {
            Ok(id) => id,
            Err(e) => {
                // Both halves are dropped here, closing the socket.
                tracing::warn!(peer = %peer_addr, error = %e, "Connection rejected");
                self.stats.record_rejected();
                return;
            }
        };

        let lines = LineBuffer::new(self.config.buffer_capacity, self.config.max_line_len);
        let task = tokio::spawn(read_frames(id, reader, lines, events.clone()));
        if let Some(conn) = registry.get_mut(id) {
            conn.attach_reader(task.abort_handle());
        }
        self.stats.record_accepted();

        tracing::info!(
            id = %id,
            peer = %peer_addr,
            connections = registry.len(),
            "Client connected"
        );
    }

    fn handle_event(
        &self,
        registry: &mut Registry<Outbound>,
        router: &Router<C>,
        event: ConnectionEvent,
    ) {
        match event {
            ConnectionEvent::Frame { id, content } => {
                if !registry.contains(id) {
                    tracing::debug!(id = %id, "Frame from closed connection dropped");
                    return;
                }
                self.stats.record_frame();
                router.dispatch(registry, id, &content);
            }
            ConnectionEvent::Closed { id, reason } => {
                let conn = match registry.remove(id) {
                    Ok(conn) => conn,
                    Err(e) => {
                        tracing::debug!(id = %id, error = %e, "Close for removed connection");
                        return;
                    }
                };
                self.stats.record_closed();

                match reason {
                    CloseReason::Disconnected => {
                        tracing::info!(id = %id, duration = ?conn.duration(), "Client disconnected");
                    }
                    CloseReason::Overflow => {
                        self.stats.record_overflow();
                        tracing::warn!(id = %id, "Line exceeded buffer, client dropped");
                    }
                    CloseReason::ReadError(error) => {
                        tracing::warn!(id = %id, error = %error, "Read failed, client dropped");
                    }
                    CloseReason::WriteFailed(outcome) => {
                        self.stats.record_write_failure();
                        tracing::warn!(id = %id, outcome = ?outcome, "Write failed, client dropped");
                    }
                }
            }
        }
    }
}

#[cfg(unix)]
fn set_reuseport(socket: &TcpSocket) -> std::io::Result<()> {
    socket.set_reuseport(true)
}

#[cfg(not(unix))]
fn set_reuseport(_socket: &TcpSocket) -> std::io::Result<()> {
    Ok(())
}

/// Accept failures that concern a single pending connection
fn is_transient(e: &std::io::Error) -> bool {
    matches!(
        e.kind(),
        ErrorKind::Interrupted
            | ErrorKind::WouldBlock
            | ErrorKind::ConnectionAborted
            | ErrorKind::ConnectionReset
    )
}

/// Handle to a server running in the background
///
/// Dropping the handle leaves the server running.
#[derive(Debug)]
pub struct ServerHandle {
    local_addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<Result<()>>,
    stats: Arc<ServerStats>,
}

impl ServerHandle {
    /// Address the listener is bound to
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Current statistics
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Check if the event loop is still running
    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// Stop the server, closing every connection and the listener
    pub async fn stop(mut self) -> Result<()> {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        self.wait().await
    }

    /// Wait for the server to stop on its own
    ///
    /// Resolves with an error if the event loop failed fatally.
    pub async fn wait(self) -> Result<()> {
        match self.task.await {
            Ok(result) => result,
            Err(e) => {
                tracing::error!(error = %e, "Server task failed");
                Err(Error::ServerStopped)
            }
        }
    }
}

/// Start a server on all interfaces at `port`, displaying relayed lines on
/// stdout
pub async fn start_server(port: u16) -> Result<ServerHandle> {
    if port == 0 {
        return Err(Error::InvalidPort(port));
    }

    ChatServer::new(ServerConfig::with_port(port), StdConsole)
        .start()
        .await
}

#[cfg(test)]
mod tests {
    use std::io;

    use bytes::Bytes;
    use tokio_test::io::Builder;

    use super::*;
    use crate::console::MemoryConsole;
    use crate::protocol::writer::WriteOutcome;

    #[tokio::test]
    async fn test_write_failure_removes_destination() {
        let server = ChatServer::new(ServerConfig::default(), MemoryConsole::new());
        let router = Router::new(
            Arc::clone(&server.console),
            server.config.buffer_capacity,
            Arc::clone(&server.stats),
        );
        let limits = OutboundLimits::from(&server.config);
        let (events, mut events_rx) = mpsc::channel(8);
        let mut registry = Registry::new(4);

        let (_sender_peer, sender_writer) = tokio::io::duplex(256);
        let sender = registry
            .insert_with("10.0.0.1", |id| {
                Outbound::spawn(id, sender_writer, limits, events.clone(), Arc::clone(&server.stats))
            })
            .unwrap();
        let failing_writer = Builder::new()
            .write_error(io::Error::new(io::ErrorKind::Other, "device gone"))
            .build();
        let failing = registry
            .insert_with("10.0.0.1", |id| {
                Outbound::spawn(id, failing_writer, limits, events.clone(), Arc::clone(&server.stats))
            })
            .unwrap();

        let frame = ConnectionEvent::Frame {
            id: sender,
            content: Bytes::from("hello"),
        };
        server.handle_event(&mut registry, &router, frame);

        let event = events_rx.recv().await.unwrap();
        assert!(matches!(
            event,
            ConnectionEvent::Closed {
                id,
                reason: CloseReason::WriteFailed(WriteOutcome::WriteError(io::ErrorKind::Other)),
            } if id == failing
        ));
        server.handle_event(&mut registry, &router, event);

        assert!(!registry.contains(failing));
        assert!(registry.contains(sender));
        let stats = server.stats().snapshot();
        assert_eq!(stats.frames_received, 1);
        assert_eq!(stats.write_failures, 1);
        assert_eq!(stats.connections_closed, 1);
    }
}
