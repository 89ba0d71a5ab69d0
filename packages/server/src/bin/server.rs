//! Chat roulette server.
//!
//! Pairs anonymous WebSocket clients two at a time and relays their messages
//! until one side leaves, after which the remaining client is matched again.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin roulette-server
//! cargo run --bin roulette-server -- --host 127.0.0.1 --port 3000
//! PORT=3000 cargo run --bin roulette-server
//! ```

use std::{path::PathBuf, time::Duration};

use clap::Parser;
use roulette_server::{
    config::{ChatConfig, DEFAULT_PORT, ServerConfig},
    ui::Server,
};
use roulette_shared::logger::setup_logger;

#[derive(Parser, Debug)]
#[command(name = "roulette-server")]
#[command(about = "Anonymous two-party chat roulette server", long_about = None)]
struct Args {
    /// Host address to bind the server to
    #[arg(short = 'H', long, default_value = "0.0.0.0")]
    host: String,

    /// Port number to bind the server to
    #[arg(short = 'p', long, env = "PORT", default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Directory with the browser client
    #[arg(long, default_value = "static")]
    static_dir: PathBuf,

    /// Interval between active user count updates (milliseconds)
    #[arg(long, default_value_t = 1000, value_parser = clap::value_parser!(u64).range(1..))]
    status_interval_ms: u64,

    /// Interval between WebSocket keep-alive pings (seconds)
    #[arg(long, default_value_t = 5, value_parser = clap::value_parser!(u64).range(1..))]
    ping_interval_secs: u64,
}

impl From<Args> for ServerConfig {
    fn from(args: Args) -> Self {
        Self {
            host: args.host,
            port: args.port,
            static_dir: args.static_dir,
            ping_interval: Duration::from_secs(args.ping_interval_secs),
            chat: ChatConfig {
                status_interval: Duration::from_millis(args.status_interval_ms),
            },
        }
    }
}

#[tokio::main]
async fn main() {
    setup_logger(env!("CARGO_BIN_NAME"), "info");

    let args = Args::parse();
    let config = ServerConfig::from(args);
    tracing::debug!("Server configuration: {:?}", config);

    let server = Server::new(config);
    if let Err(e) = server.run().await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
