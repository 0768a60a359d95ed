//! Connection establishment and one-shot sends

use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;

use crate::error::{Error, Result};
use crate::protocol::writer::{write_line, WriteOutcome};

use super::config::ClientConfig;

/// Connect to the configured server, retrying until it accepts
///
/// There is no attempt limit: a server that is not up yet is waited for,
/// with `retry_delay` between attempts.
pub async fn connect_with_retry(config: &ClientConfig) -> TcpStream {
    let mut attempt: u64 = 0;
    loop {
        attempt += 1;
        match TcpStream::connect(config.server_addr).await {
            Ok(stream) => {
                tracing::info!(server = %config.server_addr, attempt, "Connected to server");
                return stream;
            }
            Err(e) => {
                tracing::debug!(
                    server = %config.server_addr,
                    attempt,
                    error = %e,
                    "Server not available, retrying"
                );
                tokio::time::sleep(config.retry_delay).await;
            }
        }
    }
}

/// Connect once, send `message` as a single line and close
///
/// The message is truncated to the maximum line length. Fails with
/// [`Error::InvalidAddress`] if `host` is not an IPv4 literal and with
/// [`Error::PeerClosed`] if the server hangs up before the line is written.
pub async fn send_line(host: &str, port: u16, message: &str) -> Result<()> {
    let config = ClientConfig::from_host(host, port)?;
    let mut stream = TcpStream::connect(config.server_addr).await?;

    let content = message.as_bytes();
    let content = &content[..content.len().min(config.max_line_len)];

    match write_line(&mut stream, content, config.buffer_capacity).await? {
        WriteOutcome::Delivered => {}
        WriteOutcome::PeerClosed => return Err(Error::PeerClosed),
        WriteOutcome::WriteError(kind) => return Err(Error::Io(kind.into())),
    }

    if let Err(e) = stream.shutdown().await {
        tracing::debug!(error = %e, "Shutdown after send failed");
    }
    tracing::debug!(server = %config.server_addr, len = content.len(), "Line sent");

    Ok(())
}
