//! WebSocket connection handlers.
//!
//! Bridges an axum WebSocket to the transport-neutral frame channels consumed
//! by `usecase::Chat`:
//!
//! - reader task: WebSocket → `incoming` channel
//! - pusher task: `outgoing` channel → WebSocket, plus keep-alive pings
//!
//! Either task ending closes its channel, which `Chat` observes as the client
//! being gone.

use std::{sync::Arc, time::Duration};

use axum::{
    body::Bytes,
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use futures_util::{
    sink::SinkExt,
    stream::{SplitSink, SplitStream, StreamExt},
};
use tokio::{
    sync::mpsc::{self, UnboundedReceiver, UnboundedSender},
    task::JoinHandle,
    time::{Instant, interval_at},
};

use crate::{domain::UserId, infrastructure::codec::Frame, ui::state::AppState, usecase::Chat};

/// Time given to the pusher to flush queued frames after the chat ended.
const FLUSH_TIMEOUT: Duration = Duration::from_secs(1);

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let user = state.user_factory.create();
    let user_id = user.id;
    let (sender, receiver) = socket.split();

    let (incoming_tx, incoming_rx) = mpsc::unbounded_channel();
    let (outgoing_tx, outgoing_rx) = mpsc::unbounded_channel();

    let recv_task = reader_loop(receiver, incoming_tx, user_id);
    let mut send_task = pusher_loop(outgoing_rx, sender, state.ping_interval);

    let chat = Chat::new(
        user,
        incoming_rx,
        outgoing_tx,
        state.registry.clone(),
        state.active_users.clone(),
        state.chat_config.clone(),
    );
    if let Err(e) = chat.run().await {
        tracing::error!("Connection of user {} failed: {}", user_id, e);
    }

    // The chat dropped its outgoing sender, so the pusher drains and closes.
    recv_task.abort();
    if tokio::time::timeout(FLUSH_TIMEOUT, &mut send_task)
        .await
        .is_err()
    {
        tracing::warn!("WebSocket of user {} did not close in time", user_id);
        send_task.abort();
    }
}

/// What a received WebSocket message means for the chat.
#[derive(Debug, PartialEq, Eq)]
enum Inbound {
    Frame(Frame),
    /// Ping/pong is handled by the WebSocket protocol itself
    Control,
    Close,
}

fn classify(message: Message) -> Inbound {
    match message {
        Message::Text(text) => Inbound::Frame(Frame::Text(text.as_str().to_owned())),
        Message::Binary(bytes) => Inbound::Frame(Frame::Binary(bytes.to_vec())),
        Message::Ping(_) | Message::Pong(_) => Inbound::Control,
        Message::Close(_) => Inbound::Close,
    }
}

fn into_message(frame: Frame) -> Message {
    match frame {
        Frame::Text(text) => Message::Text(text.into()),
        Frame::Binary(bytes) => Message::Binary(bytes.into()),
    }
}

/// Spawns a task that forwards frames received from the client to `incoming`.
fn reader_loop(
    mut receiver: SplitStream<WebSocket>,
    incoming: UnboundedSender<Frame>,
    user_id: UserId,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(message) = receiver.next().await {
            let message = match message {
                Ok(message) => message,
                Err(e) => {
                    tracing::warn!("WebSocket error for user {}: {}", user_id, e);
                    break;
                }
            };

            match classify(message) {
                Inbound::Frame(frame) => {
                    if incoming.send(frame).is_err() {
                        break;
                    }
                }
                Inbound::Control => tracing::debug!("Received ping/pong from user {}", user_id),
                Inbound::Close => {
                    tracing::info!("User {} requested close", user_id);
                    break;
                }
            }
        }
    })
}

/// Spawns a task that writes frames from `outgoing` to the client and pings
/// it every `ping_interval`.
fn pusher_loop(
    mut outgoing: UnboundedReceiver<Frame>,
    mut sender: SplitSink<WebSocket, Message>,
    ping_interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ping = interval_at(Instant::now() + ping_interval, ping_interval);
        loop {
            let message = tokio::select! {
                frame = outgoing.recv() => match frame {
                    Some(frame) => into_message(frame),
                    None => break,
                },
                _ = ping.tick() => Message::Ping(Bytes::new()),
            };
            if sender.send(message).await.is_err() {
                break;
            }
        }
        let _ = sender.close().await;
    })
}
