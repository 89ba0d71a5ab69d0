//! Error types for the roulette clients.

use thiserror::Error;

/// Client-specific errors
#[derive(Debug, Error)]
pub enum ClientError {
    /// The server URL cannot be used at all
    #[error("Invalid server URL '{0}'")]
    InvalidUrl(String),

    /// Connection error
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Ran out of reconnection attempts
    #[error("Failed to reconnect after {0} attempts")]
    ReconnectExhausted(u32),
}
