//! Chat events exchanged between clients, the server and paired peers.

use super::user::{User, UserId};

/// The closed set of events of the chat protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatEvent {
    /// Number of users connected to the server. Sent periodically to clients.
    UserCount(u64),
    /// Identity the server assigned to the client. Sent once, on connect.
    UserId(UserId),
    /// Identity of a new peer. Always the first event on a pairing.
    Hello(User),
    /// The peer has left.
    Disconnected,
    /// Whether the sender is typing.
    IsTyping(bool),
    Message(ChatMessage),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatMessage {
    Text(String),
    /// Raw image bytes. Always carried in a binary frame.
    Image(Vec<u8>),
}

impl ChatEvent {
    /// Whether a client may originate this event.
    ///
    /// Everything else is produced by the server and must not be relayed
    /// from one client to another.
    pub fn is_client_originated(&self) -> bool {
        matches!(self, ChatEvent::IsTyping(_) | ChatEvent::Message(_))
    }

    /// Short variant name for logging. Never includes the payload.
    pub fn kind(&self) -> &'static str {
        match self {
            ChatEvent::UserCount(_) => "user-count",
            ChatEvent::UserId(_) => "user-id",
            ChatEvent::Hello(_) => "hello",
            ChatEvent::Disconnected => "disconnected",
            ChatEvent::IsTyping(_) => "is-typing",
            ChatEvent::Message(ChatMessage::Text(_)) => "text",
            ChatEvent::Message(ChatMessage::Image(_)) => "image",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Timestamp;

    #[test]
    fn test_only_typing_and_messages_are_client_originated() {
        // テスト項目: クライアントが送信できるのはタイピング状態とメッセージのみ
        // given (前提条件):
        let user = User::new(UserId::new(1), Timestamp::new(0));

        // when (操作) / then (期待する結果):
        assert!(ChatEvent::IsTyping(true).is_client_originated());
        assert!(ChatEvent::Message(ChatMessage::Text("hi".to_string())).is_client_originated());
        assert!(ChatEvent::Message(ChatMessage::Image(vec![1, 2])).is_client_originated());
        assert!(!ChatEvent::Hello(user).is_client_originated());
        assert!(!ChatEvent::Disconnected.is_client_originated());
        assert!(!ChatEvent::UserCount(3).is_client_originated());
        assert!(!ChatEvent::UserId(UserId::new(1)).is_client_originated());
    }
}
