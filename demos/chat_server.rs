//! Chat relay server
//!
//! Run with: cargo run --example chat_server [PORT]
//!
//! Clients connected from the same address see each other's lines:
//!   cargo run --example chat_client -- 30000 127.0.0.1
//!   cargo run --example send_line -- 30000 127.0.0.1 hello there
//!
//! Sending `\connected` asks the server how many clients are connected.
//! Stops on Ctrl+C.

use chat_relay::protocol::constants::DEFAULT_PORT;
use chat_relay::{ChatServer, ServerConfig, StdConsole};

fn print_usage() {
    eprintln!("Usage: chat_server [PORT]");
    eprintln!();
    eprintln!("  PORT  positive port number (default {})", DEFAULT_PORT);
}

fn parse_port(arg: &str) -> Option<u16> {
    arg.parse::<u16>().ok().filter(|port| *port > 0)
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = term.recv() => {}
                }
            }
            Err(_) => {
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

#[tokio::main]
async fn main() {
    let args: Vec<String> = std::env::args().collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_usage();
        return;
    }

    let port = match args.get(1) {
        Some(arg) => match parse_port(arg) {
            Some(port) => port,
            None => {
                eprintln!("Error: invalid port '{}'", arg);
                eprintln!();
                print_usage();
                std::process::exit(1);
            }
        },
        None => DEFAULT_PORT,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("chat_relay=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let server = ChatServer::new(ServerConfig::with_port(port), StdConsole);
    let stats = std::sync::Arc::clone(server.stats());

    match server.run_until(shutdown_signal()).await {
        Ok(()) => {
            let stats = stats.snapshot();
            eprintln!(
                "Server stopped: {} connections, {} lines relayed",
                stats.connections_accepted, stats.lines_delivered
            );
        }
        Err(e) => {
            eprintln!("Server error: {}", e);
            std::process::exit(1);
        }
    }
}
