//! Interactive chat roulette client.
//!
//! Connects to the roulette server, prints events as they arrive and sends
//! every line typed at the ">" prompt to the current peer.
//! Automatically reconnects on disconnection (max 5 attempts with 5 second interval).
//!
//! Run with:
//! ```not_rust
//! cargo run --bin roulette-client
//! cargo run --bin roulette-client -- --url ws://example.com:8080/chat
//! ```

use clap::Parser;
use roulette_shared::logger::setup_logger;

#[derive(Parser, Debug)]
#[command(name = "roulette-client")]
#[command(about = "Interactive client for the chat roulette server", long_about = None)]
struct Args {
    /// WebSocket server URL
    #[arg(short = 'u', long, default_value = "ws://127.0.0.1:8080/chat")]
    url: String,
}

#[tokio::main]
async fn main() {
    setup_logger(env!("CARGO_BIN_NAME"), "info");

    let args = Args::parse();

    if let Err(e) = roulette_client::run_client(args.url).await {
        tracing::error!("Client error: {}", e);
        std::process::exit(1);
    }
}
