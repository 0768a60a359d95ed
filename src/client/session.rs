//! Interactive client session
//!
//! The client waits on two sources: lines typed locally and bytes from the
//! server. Local lines are sent with the wire terminator; server lines are
//! framed with the same [`LineBuffer`] the server uses and displayed as they
//! arrive.

use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::console::{Console, StdConsole};
use crate::error::Result;
use crate::protocol::constants::TERMINATOR;
use crate::protocol::framer::{LineBuffer, ReadStatus};
use crate::protocol::writer::{write_line, WriteOutcome};

use super::config::ClientConfig;
use super::connector::connect_with_retry;

/// Why a client session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientExit {
    /// Local input reached end of file
    InputClosed,
    /// Server closed the connection
    ServerClosed,
    /// Reading from the server failed
    ReadError,
    /// Server sent a line longer than the buffer
    Overflow,
    /// Sending a line to the server failed
    SendFailed,
}

/// Interactive chat client
pub struct ChatClient<C: Console> {
    config: ClientConfig,
    console: Arc<C>,
}

impl<C: Console> ChatClient<C> {
    /// Create a new client
    pub fn new(config: ClientConfig, console: C) -> Self {
        Self::with_console(config, Arc::new(console))
    }

    /// Create a new client sharing an existing console
    pub fn with_console(config: ClientConfig, console: Arc<C>) -> Self {
        Self { config, console }
    }

    /// Get the client configuration
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Run the session until either side ends it
    ///
    /// The stream is shut down before returning.
    pub async fn run<I, S>(&self, input: I, stream: S) -> Result<ClientExit>
    where
        I: AsyncBufRead + Unpin + Send + 'static,
        S: AsyncRead + AsyncWrite,
    {
        let capacity = self.config.buffer_capacity;
        let (mut reader, mut writer) = tokio::io::split(stream);
        let mut lines = LineBuffer::new(capacity, capacity.saturating_sub(TERMINATOR.len()));
        let (mut input_rx, input_task) = spawn_input(input, self.config.max_line_len);

        let exit = loop {
            tokio::select! {
                local = input_rx.recv() => match local {
                    Some(content) => {
                        if !self.send(&mut writer, &content).await {
                            break ClientExit::SendFailed;
                        }
                    }
                    None => {
                        self.console.display("Disconnected from server.");
                        break ClientExit::InputClosed;
                    }
                },
                status = lines.read_from(&mut reader) => match status {
                    Ok(ReadStatus::Complete) => {
                        while let Some(frame) = lines.next_frame() {
                            self.console.display(&String::from_utf8_lossy(&frame));
                        }
                    }
                    Ok(ReadStatus::Incomplete { stalled: false }) => {}
                    Ok(ReadStatus::Incomplete { stalled: true }) | Ok(ReadStatus::Disconnected) => {
                        self.console.display("Server closed the connection.");
                        break ClientExit::ServerClosed;
                    }
                    Ok(ReadStatus::Overflow) => {
                        tracing::warn!(capacity, "Server line exceeded buffer");
                        self.console.display_error("Error reading from server");
                        break ClientExit::Overflow;
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Read from server failed");
                        self.console.display_error("Error reading from server");
                        break ClientExit::ReadError;
                    }
                },
            }
        };

        input_task.abort();
        if let Err(e) = writer.shutdown().await {
            tracing::debug!(error = %e, "Shutdown failed");
        }
        tracing::info!(exit = ?exit, "Client session ended");

        Ok(exit)
    }

    async fn send<W>(&self, writer: &mut W, content: &[u8]) -> bool
    where
        W: AsyncWrite + Unpin,
    {
        match write_line(writer, content, self.config.buffer_capacity).await {
            Ok(WriteOutcome::Delivered) => true,
            Ok(outcome) => {
                tracing::warn!(outcome = ?outcome, "Send to server failed");
                self.console.display_error("Error sending message to server");
                false
            }
            Err(e) => {
                tracing::warn!(error = %e, "Send to server failed");
                self.console.display_error("Error sending message to server");
                false
            }
        }
    }
}

/// Read local lines in their own task
///
/// A line that is half read when the server side wins a select turn stays
/// with the task instead of being dropped.
fn spawn_input<I>(mut input: I, max_line_len: usize) -> (mpsc::Receiver<Vec<u8>>, JoinHandle<()>)
where
    I: AsyncBufRead + Unpin + Send + 'static,
{
    let (tx, rx) = mpsc::channel(16);
    let task = tokio::spawn(async move {
        loop {
            let mut line = Vec::new();
            match input.read_until(b'\n', &mut line).await {
                Ok(0) => break,
                Ok(_) => {
                    if tx.send(local_content(line, max_line_len)).await.is_err() {
                        break;
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Reading local input failed");
                    break;
                }
            }
        }
    });
    (rx, task)
}

/// Strip the local line ending and cap the content length
fn local_content(mut line: Vec<u8>, max_line_len: usize) -> Vec<u8> {
    if line.last() == Some(&b'\n') {
        line.pop();
        if line.last() == Some(&b'\r') {
            line.pop();
        }
    }
    line.truncate(max_line_len);
    line
}

/// Connect to `host:port` and chat using stdin and stdout
///
/// Connection attempts are retried until the server accepts.
pub async fn start_client(port: u16, host: &str) -> Result<ClientExit> {
    let config = ClientConfig::from_host(host, port)?;
    let stream = connect_with_retry(&config).await;

    ChatClient::new(config, StdConsole)
        .run(BufReader::new(tokio::io::stdin()), stream)
        .await
}
