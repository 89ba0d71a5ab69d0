//! Conversion logic between DTOs and domain entities.

use crate::domain::{ChatEvent, ChatMessage, Timestamp, User, UserId};
use crate::infrastructure::{codec::CodecError, dto::websocket as dto};

// ========================================
// DTO → Domain Entity
// ========================================

impl From<dto::UserDto> for User {
    fn from(dto: dto::UserDto) -> Self {
        User::new(UserId::new(dto.id), Timestamp::new(dto.created_at))
    }
}

impl From<dto::WireEvent> for ChatEvent {
    fn from(dto: dto::WireEvent) -> Self {
        match dto {
            dto::WireEvent::UserCount { count } => ChatEvent::UserCount(count),
            dto::WireEvent::UserId { id } => ChatEvent::UserId(UserId::new(id)),
            dto::WireEvent::Hello { user } => ChatEvent::Hello(user.into()),
            dto::WireEvent::Disconnected => ChatEvent::Disconnected,
            dto::WireEvent::IsTyping { typing } => ChatEvent::IsTyping(typing),
            dto::WireEvent::Text { text } => ChatEvent::Message(ChatMessage::Text(text)),
        }
    }
}

// ========================================
// Domain Entity → DTO
// ========================================

impl From<&User> for dto::UserDto {
    fn from(model: &User) -> Self {
        Self {
            id: model.id.value(),
            created_at: model.created_at.value(),
        }
    }
}

/// Images have no JSON representation.
impl TryFrom<&ChatEvent> for dto::WireEvent {
    type Error = CodecError;

    fn try_from(model: &ChatEvent) -> Result<Self, Self::Error> {
        Ok(match model {
            ChatEvent::UserCount(count) => dto::WireEvent::UserCount { count: *count },
            ChatEvent::UserId(id) => dto::WireEvent::UserId { id: id.value() },
            ChatEvent::Hello(user) => dto::WireEvent::Hello { user: user.into() },
            ChatEvent::Disconnected => dto::WireEvent::Disconnected,
            ChatEvent::IsTyping(typing) => dto::WireEvent::IsTyping { typing: *typing },
            ChatEvent::Message(ChatMessage::Text(text)) => {
                dto::WireEvent::Text { text: text.clone() }
            }
            ChatEvent::Message(ChatMessage::Image(_)) => return Err(CodecError::BinaryOnly),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dto_hello_to_domain() {
        // テスト項目: DTO の Hello がドメインの ChatEvent に変換される
        // given (前提条件):
        let dto_event = dto::WireEvent::Hello {
            user: dto::UserDto {
                id: 42,
                created_at: 1000,
            },
        };

        // when (操作):
        let event: ChatEvent = dto_event.into();

        // then (期待する結果):
        assert_eq!(
            event,
            ChatEvent::Hello(User::new(UserId::new(42), Timestamp::new(1000)))
        );
    }

    #[test]
    fn test_domain_text_to_dto() {
        // テスト項目: ドメインのテキストメッセージが DTO に変換される
        // given (前提条件):
        let event = ChatEvent::Message(ChatMessage::Text("hi".to_string()));

        // when (操作):
        let dto_event = dto::WireEvent::try_from(&event);

        // then (期待する結果):
        assert_eq!(
            dto_event.unwrap(),
            dto::WireEvent::Text {
                text: "hi".to_string()
            }
        );
    }

    #[test]
    fn test_domain_image_has_no_dto() {
        // テスト項目: 画像メッセージは JSON の DTO に変換されない
        // given (前提条件):
        let event = ChatEvent::Message(ChatMessage::Image(vec![0xff, 0xd8]));

        // when (操作):
        let dto_event = dto::WireEvent::try_from(&event);

        // then (期待する結果):
        assert!(matches!(dto_event, Err(CodecError::BinaryOnly)));
    }
}
