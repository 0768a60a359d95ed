//! Send a single line to a chat relay server
//!
//! Run with: cargo run --example send_line -- PORT HOST MESSAGE...
//!
//! The message words are joined with single spaces.

use chat_relay::send_line;

#[tokio::main]
async fn main() {
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 3 || args.iter().any(|a| a == "--help" || a == "-h") {
        eprintln!("Usage: send_line PORT HOST MESSAGE...");
        std::process::exit(1);
    }

    let port = match args[1].parse::<u16>() {
        Ok(port) => port,
        Err(_) => {
            eprintln!("Error: invalid port '{}'", args[1]);
            std::process::exit(1);
        }
    };
    let message = args[3..].join(" ");

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("chat_relay=warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = send_line(&args[2], port, &message).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
