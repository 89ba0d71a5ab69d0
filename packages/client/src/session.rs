//! WebSocket client session management.

use futures_util::{
    SinkExt, StreamExt,
    stream::{SplitSink, SplitStream},
};
use roulette_server::domain::{ChatEvent, ChatMessage};
use roulette_shared::time::get_timestamp;
use tokio::{net::TcpStream, sync::mpsc::UnboundedReceiver};
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async,
    tungstenite::{self, Message},
};

use crate::{
    domain::{Input, UserCountTracker, parse_input},
    error::ClientError,
    formatter::MessageFormatter,
    wire::{decode_message, encode_message},
};

use super::ui::print_and_redisplay;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Run one WebSocket client session.
///
/// Returns `Ok(())` when the user ends the input, and an error when the
/// connection could not be established or was lost.
pub async fn run_client_session(
    url: &str,
    input: &mut UnboundedReceiver<String>,
) -> Result<(), ClientError> {
    let (ws_stream, _) = connect_async(url).await.map_err(|e| match e {
        tungstenite::Error::Url(_) => ClientError::InvalidUrl(url.to_string()),
        e => ClientError::ConnectionError(e.to_string()),
    })?;

    tracing::info!("Connected to chat server!");
    println!(
        "\nType messages and press Enter to send. \
         Use /image <path> to send a picture and /typing on|off to show typing.\n\
         Press Ctrl+C to exit.\n"
    );

    let (mut write, read) = ws_stream.split();
    let mut read_task = tokio::spawn(read_loop(read));

    loop {
        tokio::select! {
            _ = &mut read_task => {
                return Err(ClientError::ConnectionError("Connection lost".to_string()));
            }
            line = input.recv() => {
                let Some(line) = line else {
                    read_task.abort();
                    let _ = write.close().await;
                    return Ok(());
                };
                if let Err(e) = handle_input(&mut write, &line).await {
                    read_task.abort();
                    return Err(e);
                }
            }
        }
    }
}

/// Print everything the server sends until the connection closes.
async fn read_loop(mut read: SplitStream<WsStream>) {
    let mut user_count = UserCountTracker::default();

    while let Some(message) = read.next().await {
        let message = match message {
            Ok(message) => message,
            Err(e) => {
                tracing::warn!("WebSocket read error: {}", e);
                break;
            }
        };
        if message.is_close() {
            tracing::info!("Server closed the connection");
            break;
        }

        match decode_message(message) {
            Some(Ok(event)) => {
                if let Some(output) = render_event(&event, &mut user_count) {
                    print_and_redisplay(&output);
                }
            }
            Some(Err(e)) => tracing::warn!("Undecodable message from server: {}", e),
            None => {}
        }
    }
}

/// Format a server event for display, or `None` if nothing should be shown.
fn render_event(event: &ChatEvent, user_count: &mut UserCountTracker) -> Option<String> {
    match event {
        ChatEvent::UserCount(count) => user_count
            .update(*count)
            .then(|| MessageFormatter::format_user_count(*count)),
        ChatEvent::UserId(id) => Some(MessageFormatter::format_user_id(*id)),
        ChatEvent::Hello(peer) => Some(MessageFormatter::format_hello(peer)),
        ChatEvent::Disconnected => Some(MessageFormatter::format_disconnected()),
        ChatEvent::IsTyping(typing) => Some(MessageFormatter::format_peer_typing(*typing)),
        ChatEvent::Message(ChatMessage::Text(text)) => {
            Some(MessageFormatter::format_text_message(text))
        }
        ChatEvent::Message(ChatMessage::Image(bytes)) => {
            Some(MessageFormatter::format_image_message(bytes.len()))
        }
    }
}

/// Send whatever the user typed.
///
/// Local problems (unreadable file, bad command) are reported to the user and
/// do not end the session.
async fn handle_input(
    write: &mut SplitSink<WsStream, Message>,
    line: &str,
) -> Result<(), ClientError> {
    let event = match parse_input(line) {
        Input::Text(text) => ChatEvent::Message(ChatMessage::Text(text)),
        Input::Typing(typing) => ChatEvent::IsTyping(typing),
        Input::Image(path) => match tokio::fs::read(&path).await {
            Ok(bytes) => ChatEvent::Message(ChatMessage::Image(bytes)),
            Err(e) => {
                print_and_redisplay(&format!("\nCannot read {}: {}\n", path.display(), e));
                return Ok(());
            }
        },
        Input::Invalid(usage) => {
            print_and_redisplay(&format!("\n{}\n", usage));
            return Ok(());
        }
    };

    let message = match encode_message(&event) {
        Ok(message) => message,
        Err(e) => {
            tracing::error!("Failed to encode {}: {}", event.kind(), e);
            return Ok(());
        }
    };
    write
        .send(message)
        .await
        .map_err(|e| ClientError::ConnectionError(e.to_string()))?;

    if matches!(event, ChatEvent::Message(_)) {
        print_and_redisplay(&MessageFormatter::format_sent_confirmation(get_timestamp()));
    }
    Ok(())
}
