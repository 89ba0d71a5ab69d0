//! Load test for the chat roulette server.
//!
//! Starts waves of simulated users that chat, disconnect and reconnect
//! forever, verifying message order and sender along the way. A summary of
//! connects, messages and delivery delay is logged periodically.
//!
//! Run with:
//! ```not_rust
//! cargo run --release --bin roulette-loadtest -- --url ws://127.0.0.1:8080/chat
//! cargo run --release --bin roulette-loadtest -- --local --stages 3 --clients-per-stage 200
//! ```

use std::time::Duration;

use clap::Parser;
use roulette_client::loadtest::{Connector, LoadTestConfig, LocalServer, run_load_test};
use roulette_server::config::ChatConfig;
use roulette_shared::logger::setup_logger;

#[derive(Parser, Debug)]
#[command(name = "roulette-loadtest")]
#[command(about = "Load test for the chat roulette server", long_about = None)]
struct Args {
    /// WebSocket server URL
    #[arg(short = 'u', long, default_value = "ws://127.0.0.1:8080/chat", conflicts_with = "local")]
    url: String,

    /// Run against an in-process match maker instead of a server
    #[arg(long)]
    local: bool,

    /// Number of user waves
    #[arg(long, default_value_t = 14)]
    stages: u32,

    /// Users started per wave
    #[arg(long, default_value_t = 1000)]
    clients_per_stage: u32,

    /// Seconds between two waves
    #[arg(long, default_value_t = 60)]
    stage_interval_secs: u64,

    /// Messages each user sends before reconnecting
    #[arg(long, default_value_t = 100)]
    messages_per_connection: u32,

    /// Lower bound of the per-user send delay (milliseconds)
    #[arg(long, default_value_t = 300, value_parser = clap::value_parser!(u64).range(1..))]
    min_delay_ms: u64,

    /// Upper bound of the per-user send delay (milliseconds)
    #[arg(long, default_value_t = 6000, value_parser = clap::value_parser!(u64).range(1..))]
    max_delay_ms: u64,

    /// Seconds between status summaries
    #[arg(long, default_value_t = 25, value_parser = clap::value_parser!(u64).range(1..))]
    report_interval_secs: u64,

    /// Stop after this many seconds instead of running until Ctrl+C
    #[arg(long)]
    duration_secs: Option<u64>,
}

impl From<&Args> for LoadTestConfig {
    fn from(args: &Args) -> Self {
        Self {
            stages: args.stages,
            clients_per_stage: args.clients_per_stage,
            stage_interval: Duration::from_secs(args.stage_interval_secs),
            messages_per_connection: args.messages_per_connection,
            min_delay: Duration::from_millis(args.min_delay_ms),
            max_delay: Duration::from_millis(args.max_delay_ms),
            report_interval: Duration::from_secs(args.report_interval_secs),
            duration: args.duration_secs.map(Duration::from_secs),
        }
    }
}

#[tokio::main]
async fn main() {
    setup_logger(env!("CARGO_BIN_NAME"), "info");

    let args = Args::parse();
    if args.min_delay_ms > args.max_delay_ms {
        tracing::error!(
            "--min-delay-ms ({}) must not exceed --max-delay-ms ({})",
            args.min_delay_ms,
            args.max_delay_ms
        );
        std::process::exit(2);
    }

    let config = LoadTestConfig::from(&args);
    let connector = if args.local {
        tracing::info!("Running against an in-process match maker");
        Connector::Local(LocalServer::start(ChatConfig::default()))
    } else {
        tracing::info!("Running against {}", args.url);
        Connector::Remote { url: args.url }
    };

    let totals = run_load_test(config, connector).await;
    tracing::info!("Load test finished: {:?}", totals);
    if totals.protocol_errors > 0 {
        std::process::exit(1);
    }
}
