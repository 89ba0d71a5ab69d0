//! Encoding of chat events onto transport frames.
//!
//! Text frames carry one JSON object (see `dto::websocket::WireEvent`).
//! Binary frames carry a raw image payload with no envelope; an image is never
//! encoded as JSON.

use std::fmt;

use thiserror::Error;

use crate::{
    domain::{ChatEvent, ChatMessage},
    infrastructure::dto::websocket::WireEvent,
};

/// Transport-neutral frame exchanged with a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    Binary(Vec<u8>),
}

/// Describes the frame without its payload, for logging.
impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Frame::Text(text) => write!(f, "text frame ({} bytes)", text.len()),
            Frame::Binary(bytes) => write!(f, "binary frame ({} bytes)", bytes.len()),
        }
    }
}

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("invalid event JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("event can only be carried in a binary frame")]
    BinaryOnly,
}

/// Encode an event into the frame kind its variant requires.
pub fn encode(event: &ChatEvent) -> Result<Frame, CodecError> {
    match event {
        ChatEvent::Message(ChatMessage::Image(bytes)) => Ok(Frame::Binary(bytes.clone())),
        other => Ok(Frame::Text(serde_json::to_string(&WireEvent::try_from(other)?)?)),
    }
}

/// Decode a frame received from a client or the server.
pub fn decode(frame: Frame) -> Result<ChatEvent, CodecError> {
    match frame {
        Frame::Text(text) => Ok(serde_json::from_str::<WireEvent>(&text)?.into()),
        Frame::Binary(bytes) => Ok(ChatEvent::Message(ChatMessage::Image(bytes))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Timestamp, User, UserId};

    #[test]
    fn test_image_is_encoded_as_raw_binary_frame() {
        // テスト項目: 画像は JSON ではなく生のバイナリフレームとしてエンコードされる
        // given (前提条件):
        let bytes = vec![0x89, b'P', b'N', b'G', 0x00, 0xff];
        let event = ChatEvent::Message(ChatMessage::Image(bytes.clone()));

        // when (操作):
        let frame = encode(&event).unwrap();

        // then (期待する結果):
        assert_eq!(frame, Frame::Binary(bytes));
    }

    #[test]
    fn test_binary_frame_decodes_to_image() {
        // テスト項目: バイナリフレームは常に画像メッセージとしてデコードされる
        // given (前提条件):
        let frame = Frame::Binary(vec![1, 2, 3]);

        // when (操作):
        let event = decode(frame).unwrap();

        // then (期待する結果):
        assert_eq!(event, ChatEvent::Message(ChatMessage::Image(vec![1, 2, 3])));
    }

    #[test]
    fn test_hello_is_encoded_as_json_text_frame() {
        // テスト項目: Hello はユーザー情報を含む JSON テキストフレームになる
        // given (前提条件):
        let event = ChatEvent::Hello(User::new(UserId::new(5), Timestamp::new(1234)));

        // when (操作):
        let frame = encode(&event).unwrap();

        // then (期待する結果):
        assert_eq!(
            frame,
            Frame::Text(r#"{"type":"hello","user":{"id":5,"created_at":1234}}"#.to_string())
        );
        assert_eq!(decode(frame).unwrap(), event);
    }

    #[test]
    fn test_malformed_text_frame_is_an_error() {
        // テスト項目: JSON として不正なテキストフレームはエラーになる
        // given (前提条件):
        let frame = Frame::Text("typing true".to_string());

        // when (操作):
        let result = decode(frame);

        // then (期待する結果):
        assert!(matches!(result, Err(CodecError::InvalidJson(_))));
    }
}
