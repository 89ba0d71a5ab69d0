//! UI utilities for the client.

use std::io::Write;

use rustyline::{DefaultEditor, error::ReadlineError};
use tokio::sync::mpsc::{self, UnboundedReceiver};

pub const PROMPT: &str = "> ";

/// Print formatted output and redisplay the prompt after it
pub fn print_and_redisplay(output: &str) {
    print!("{}{}", output, PROMPT);
    std::io::stdout().flush().ok();
}

/// Spawn a blocking thread that reads lines with rustyline.
///
/// The returned channel closes when the user presses Ctrl+C or Ctrl+D. The
/// thread outlives individual sessions so reconnecting keeps the same editor
/// and history.
pub fn spawn_input_reader() -> UnboundedReceiver<String> {
    let (input_tx, input_rx) = mpsc::unbounded_channel::<String>();

    std::thread::spawn(move || {
        let mut rl = match DefaultEditor::new() {
            Ok(rl) => rl,
            Err(e) => {
                eprintln!("Failed to initialize readline: {}", e);
                return;
            }
        };

        loop {
            match rl.readline(PROMPT) {
                Ok(line) => {
                    let line = line.trim();
                    if !line.is_empty() {
                        rl.add_history_entry(line).ok();
                        if input_tx.send(line.to_string()).is_err() {
                            // Channel closed, exit thread
                            break;
                        }
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    // Ctrl+C
                    tracing::info!("Interrupted");
                    break;
                }
                Err(ReadlineError::Eof) => {
                    // Ctrl+D
                    tracing::info!("EOF");
                    break;
                }
                Err(err) => {
                    tracing::error!("Readline error: {}", err);
                    break;
                }
            }
        }
    });

    input_rx
}
