//! Interactive chat client
//!
//! Run with: cargo run --example chat_client -- PORT HOST
//!
//! HOST must be a dotted-decimal IPv4 address. The client keeps retrying
//! until the server accepts, then sends each typed line and prints the
//! lines relayed by the server. End input (Ctrl+D) to leave.

use chat_relay::{start_client, ClientExit};

fn print_usage() {
    eprintln!("Usage: chat_client PORT HOST");
}

#[tokio::main]
async fn main() {
    let args: Vec<String> = std::env::args().collect();

    if args.len() != 3 || args.iter().any(|a| a == "--help" || a == "-h") {
        print_usage();
        std::process::exit(1);
    }

    let port = match args[1].parse::<u16>() {
        Ok(port) => port,
        Err(_) => {
            eprintln!("Error: invalid port '{}'", args[1]);
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("chat_relay=warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    // Stdin may still be blocked in a read, so exit instead of waiting for
    // the runtime to wind down.
    let code = match start_client(port, &args[2]).await {
        Ok(ClientExit::InputClosed) | Ok(ClientExit::ServerClosed) => 0,
        Ok(_) => 1,
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    };
    std::process::exit(code);
}
