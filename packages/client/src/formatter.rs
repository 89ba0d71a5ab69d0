//! Message formatting utilities for client display.

use roulette_server::domain::{User, UserId};
use roulette_shared::time::timestamp_to_rfc3339;

const RULE: &str = "------------------------------------------------------------";

/// Message formatter for client display
pub struct MessageFormatter;

impl MessageFormatter {
    /// Format the id the server assigned to this connection
    pub fn format_user_id(id: UserId) -> String {
        format!(
            "\nYou are user {}. Looking for someone to chat with...\n",
            id
        )
    }

    pub fn format_user_count(count: u64) -> String {
        format!("\n* {} users online\n", count)
    }

    /// Format the greeting of a newly matched peer
    ///
    /// # Arguments
    ///
    /// * `peer` - The user this client was just matched with
    pub fn format_hello(peer: &User) -> String {
        let since = timestamp_to_rfc3339(peer.created_at.value())
            .unwrap_or_else(|| "an unknown time".to_string());
        format!(
            "\n\n============================================================\n\
             Connected to user {} (online since {}). Say hi!\n\
             ============================================================\n",
            peer.id, since
        )
    }

    pub fn format_peer_typing(typing: bool) -> String {
        if typing {
            "\n... stranger is typing\n".to_string()
        } else {
            "\n... stranger stopped typing\n".to_string()
        }
    }

    /// Format a text message from the peer
    pub fn format_text_message(text: &str) -> String {
        format!("\n\n{}\nstranger: {}\n{}\n", RULE, text, RULE)
    }

    /// Format an image notification; images are not rendered in a terminal
    pub fn format_image_message(byte_count: usize) -> String {
        format!("\n← stranger sent an image ({} bytes)\n", byte_count)
    }

    pub fn format_disconnected() -> String {
        "\n- stranger left. Looking for someone new...\n".to_string()
    }

    /// Format a confirmation message after sending
    ///
    /// # Arguments
    ///
    /// * `sent_at` - Unix timestamp when the message was sent (milliseconds)
    pub fn format_sent_confirmation(sent_at: i64) -> String {
        match timestamp_to_rfc3339(sent_at) {
            Some(timestamp) => format!("sent at {}\n", timestamp),
            None => "sent\n".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use roulette_server::domain::Timestamp;

    use super::*;

    #[test]
    fn test_format_user_id() {
        // テスト項目: 割り当てられたユーザー ID が表示される
        // given (前提条件):
        let id = UserId::new(42);

        // when (操作):
        let result = MessageFormatter::format_user_id(id);

        // then (期待する結果):
        assert!(result.contains("You are user 42"));
    }

    #[test]
    fn test_format_hello() {
        // テスト項目: マッチした相手の ID と接続時刻が表示される
        // given (前提条件):
        let peer = User {
            id: UserId::new(7),
            created_at: Timestamp::new(1672531200000),
        };

        // when (操作):
        let result = MessageFormatter::format_hello(&peer);

        // then (期待する結果):
        assert!(result.contains("Connected to user 7"));
        assert!(result.contains("2023-01-01T00:00:00"));
        assert!(result.contains("============================================================"));
    }

    #[test]
    fn test_format_peer_typing() {
        // テスト項目: 入力中状態の開始と終了が区別して表示される
        // given (前提条件) / when (操作):
        let started = MessageFormatter::format_peer_typing(true);
        let stopped = MessageFormatter::format_peer_typing(false);

        // then (期待する結果):
        assert!(started.contains("is typing"));
        assert!(stopped.contains("stopped typing"));
    }

    #[test]
    fn test_format_text_message() {
        // テスト項目: テキストメッセージが正しくフォーマットされる
        // given (前提条件):
        let text = "Hello, world!";

        // when (操作):
        let result = MessageFormatter::format_text_message(text);

        // then (期待する結果):
        assert!(result.contains("stranger: Hello, world!"));
        assert!(result.contains(RULE));
    }

    #[test]
    fn test_format_image_message() {
        // テスト項目: 画像の受信がバイト数付きで表示される
        // given (前提条件):
        let byte_count = 1024;

        // when (操作):
        let result = MessageFormatter::format_image_message(byte_count);

        // then (期待する結果):
        assert!(result.contains("1024 bytes"));
        assert!(result.contains("image"));
    }

    #[test]
    fn test_format_sent_confirmation() {
        // テスト項目: 送信確認メッセージが正しくフォーマットされる
        // given (前提条件):
        let sent_at = 1672531200000;

        // when (操作):
        let result = MessageFormatter::format_sent_confirmation(sent_at);

        // then (期待する結果):
        assert!(result.contains("sent at"));
        assert!(result.contains("2023-01-01"));
    }
}
