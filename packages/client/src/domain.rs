//! Domain logic for client-side operations.
//!
//! This module contains pure functions that implement business logic
//! without side effects, making them easy to test.

use std::path::PathBuf;

use crate::error::ClientError;

/// One line typed by the user, interpreted.
#[derive(Debug, PartialEq, Eq)]
pub enum Input {
    /// Plain text message for the peer
    Text(String),
    /// `/image <path>`
    Image(PathBuf),
    /// `/typing on|off`
    Typing(bool),
    /// A command that could not be understood, with a usage hint
    Invalid(&'static str),
}

/// Interpret a (trimmed, non-empty) input line.
pub fn parse_input(line: &str) -> Input {
    if let Some(rest) = line.strip_prefix("/image") {
        let path = rest.trim();
        if path.is_empty() || !rest.starts_with(' ') {
            return Input::Invalid("usage: /image <path>");
        }
        return Input::Image(PathBuf::from(path));
    }
    if let Some(rest) = line.strip_prefix("/typing") {
        return match rest.trim() {
            "on" => Input::Typing(true),
            "off" => Input::Typing(false),
            _ => Input::Invalid("usage: /typing on|off"),
        };
    }
    Input::Text(line.to_string())
}

/// Remembers the last displayed user count so that only changes are shown.
#[derive(Debug, Default)]
pub struct UserCountTracker {
    last: Option<u64>,
}

impl UserCountTracker {
    /// Record `count`, returning `true` if it differs from the previous one.
    pub fn update(&mut self, count: u64) -> bool {
        let changed = self.last != Some(count);
        self.last = Some(count);
        changed
    }
}

/// Check if the client should exit immediately based on the error type.
///
/// # Arguments
///
/// * `error` - The client error to check
///
/// # Returns
///
/// `true` if retrying cannot help (e.g., InvalidUrl), `false` otherwise
pub fn should_exit_immediately(error: &ClientError) -> bool {
    matches!(
        error,
        ClientError::InvalidUrl(_) | ClientError::ReconnectExhausted(_)
    )
}

/// Check if the client should attempt to reconnect.
///
/// # Arguments
///
/// * `error` - The client error that occurred
/// * `current_attempt` - The current reconnection attempt count (0-indexed)
/// * `max_attempts` - The maximum number of reconnection attempts allowed
///
/// # Returns
///
/// `true` if reconnection should be attempted, `false` otherwise
pub fn should_attempt_reconnect(
    error: &ClientError,
    current_attempt: u32,
    max_attempts: u32,
) -> bool {
    // Don't reconnect if the error requires immediate exit
    if should_exit_immediately(error) {
        return false;
    }

    // Don't reconnect if we've exhausted all attempts
    current_attempt < max_attempts
}
