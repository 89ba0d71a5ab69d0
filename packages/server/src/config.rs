//! Server configuration.

use std::{path::PathBuf, time::Duration};

/// Default listening port when neither `--port` nor `PORT` is given.
pub const DEFAULT_PORT: u16 = 8080;

/// Per-connection behaviour
#[derive(Debug, Clone)]
pub struct ChatConfig {
    /// Interval between `UserCount` updates sent to each client
    pub status_interval: Duration,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            status_interval: Duration::from_secs(1),
        }
    }
}

/// Configuration of the whole server process
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host address to bind to (e.g., "0.0.0.0")
    pub host: String,
    pub port: u16,
    /// Directory served for every path that is not an API or WebSocket route
    pub static_dir: PathBuf,
    /// Interval between keep-alive pings on each WebSocket
    pub ping_interval: Duration,
    pub chat: ChatConfig,
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            static_dir: PathBuf::from("static"),
            ping_interval: Duration::from_secs(5),
            chat: ChatConfig::default(),
        }
    }
}
