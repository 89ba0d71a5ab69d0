//! WebSocket text frame DTOs.
//!
//! Every event except images travels as one JSON object per text frame,
//! tagged by a kebab-case `type` field. Images never appear here: they are
//! sent as raw binary frames.

use serde::{Deserialize, Serialize};

/// User as announced to a peer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDto {
    pub id: u64,
    /// Unix timestamp (milliseconds since epoch) in UTC
    pub created_at: i64,
}

/// JSON representation of a text-frame event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum WireEvent {
    UserCount { count: u64 },
    UserId { id: u64 },
    Hello { user: UserDto },
    Disconnected,
    IsTyping { typing: bool },
    Text { text: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_event_json_shape() {
        // テスト項目: 各イベントが type タグ付きの JSON にシリアライズされる
        // given (前提条件):
        let events = vec![
            (
                WireEvent::UserCount { count: 3 },
                r#"{"type":"user-count","count":3}"#,
            ),
            (WireEvent::UserId { id: 7 }, r#"{"type":"user-id","id":7}"#),
            (
                WireEvent::Hello {
                    user: UserDto {
                        id: 1,
                        created_at: 1000,
                    },
                },
                r#"{"type":"hello","user":{"id":1,"created_at":1000}}"#,
            ),
            (WireEvent::Disconnected, r#"{"type":"disconnected"}"#),
            (
                WireEvent::IsTyping { typing: true },
                r#"{"type":"is-typing","typing":true}"#,
            ),
            (
                WireEvent::Text {
                    text: "hi".to_string(),
                },
                r#"{"type":"text","text":"hi"}"#,
            ),
        ];

        for (event, expected) in events {
            // when (操作):
            let json = serde_json::to_string(&event).unwrap();

            // then (期待する結果):
            assert_eq!(json, expected);
        }
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        // テスト項目: 未知の type を持つ JSON はデシリアライズに失敗する
        // given (前提条件):
        let json = r#"{"type":"image","image":[1,2,3]}"#;

        // when (操作):
        let result = serde_json::from_str::<WireEvent>(json);

        // then (期待する結果):
        assert!(result.is_err());
    }
}
