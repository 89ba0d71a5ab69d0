//! Conversion between tungstenite messages and chat events.

use roulette_server::{
    domain::ChatEvent,
    infrastructure::codec::{self, CodecError, Frame},
};
use tokio_tungstenite::tungstenite::Message;

/// Decode a received WebSocket message.
///
/// Returns `None` for control messages (ping, pong, close).
pub fn decode_message(message: Message) -> Option<Result<ChatEvent, CodecError>> {
    let frame = match message {
        Message::Text(text) => Frame::Text(text.as_str().to_owned()),
        Message::Binary(bytes) => Frame::Binary(bytes.to_vec()),
        _ => return None,
    };
    Some(codec::decode(frame))
}

/// Encode an event into a WebSocket message.
pub fn encode_message(event: &ChatEvent) -> Result<Message, CodecError> {
    Ok(match codec::encode(event)? {
        Frame::Text(text) => Message::text(text),
        Frame::Binary(bytes) => Message::binary(bytes),
    })
}

#[cfg(test)]
mod tests {
    use roulette_server::domain::ChatMessage;

    use super::*;

    #[test]
    fn test_image_is_encoded_as_binary_message() {
        // テスト項目: 画像イベントはバイナリメッセージになる
        // given (前提条件):
        let event = ChatEvent::Message(ChatMessage::Image(vec![1, 2, 3]));

        // when (操作):
        let message = encode_message(&event).unwrap();

        // then (期待する結果):
        assert!(message.is_binary());
        assert_eq!(message.into_data().to_vec(), vec![1, 2, 3]);
    }

    #[test]
    fn test_decode_text_message() {
        // テスト項目: JSON テキストメッセージはイベントにデコードされる
        // given (前提条件):
        let message = Message::text(r#"{"type":"user-count","count":7}"#);

        // when (操作):
        let event = decode_message(message).unwrap().unwrap();

        // then (期待する結果):
        assert_eq!(event, ChatEvent::UserCount(7));
    }

    #[test]
    fn test_decode_ignores_control_messages() {
        // テスト項目: ping などの制御メッセージはイベントとして扱われない
        // given (前提条件):
        let message = Message::Ping(Default::default());

        // when (操作):
        let event = decode_message(message);

        // then (期待する結果):
        assert!(event.is_none());
    }
}
