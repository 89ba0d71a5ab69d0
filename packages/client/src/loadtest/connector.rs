//! Ways for simulated users to reach a chat server.
//!
//! Both targets hand out the same `Connection`: a pair of frame channels.
//! `Remote` pumps them over a real WebSocket; `Local` wires them straight
//! into an in-process `Chat`, so the matchmaking core can be loaded without
//! any network in between.

use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use roulette_server::{
    config::ChatConfig,
    domain::{ActiveUsers, PeerRegistry, UserFactory},
    infrastructure::codec::Frame,
    usecase::{Chat, MatchMaker, MatchMakerError},
};
use tokio::{
    sync::mpsc::{self, UnboundedReceiver, UnboundedSender},
    task::JoinHandle,
};
use tokio_tungstenite::{connect_async, tungstenite::Message};

use crate::error::ClientError;

/// One open connection to the server, seen as frames.
///
/// Dropping it closes the connection.
#[derive(Debug)]
pub struct Connection {
    /// Frames from the server
    pub incoming: UnboundedReceiver<Frame>,
    /// Frames to the server
    pub outgoing: UnboundedSender<Frame>,
}

pub enum Connector {
    Remote { url: String },
    Local(LocalServer),
}

impl Connector {
    pub async fn connect(&self) -> Result<Connection, ClientError> {
        match self {
            Connector::Remote { url } => connect_remote(url).await,
            Connector::Local(server) => Ok(server.connect()),
        }
    }
}

async fn connect_remote(url: &str) -> Result<Connection, ClientError> {
    let (ws_stream, _) = connect_async(url)
        .await
        .map_err(|e| ClientError::ConnectionError(e.to_string()))?;
    let (mut write, mut read) = ws_stream.split();

    let (incoming_tx, incoming_rx) = mpsc::unbounded_channel();
    let (outgoing_tx, mut outgoing_rx) = mpsc::unbounded_channel::<Frame>();

    tokio::spawn(async move {
        while let Some(Ok(message)) = read.next().await {
            let frame = match message {
                Message::Text(text) => Frame::Text(text.as_str().to_owned()),
                Message::Binary(bytes) => Frame::Binary(bytes.to_vec()),
                Message::Close(_) => break,
                _ => continue,
            };
            if incoming_tx.send(frame).is_err() {
                break;
            }
        }
    });

    tokio::spawn(async move {
        while let Some(frame) = outgoing_rx.recv().await {
            let message = match frame {
                Frame::Text(text) => Message::text(text),
                Frame::Binary(bytes) => Message::binary(bytes),
            };
            if write.send(message).await.is_err() {
                break;
            }
        }
        let _ = write.close().await;
    });

    Ok(Connection {
        incoming: incoming_rx,
        outgoing: outgoing_tx,
    })
}

/// An in-process chat server without transport.
pub struct LocalServer {
    registry: Arc<dyn PeerRegistry>,
    active_users: Arc<ActiveUsers>,
    user_factory: UserFactory,
    chat_config: ChatConfig,
    match_maker: JoinHandle<Result<(), MatchMakerError>>,
}

impl LocalServer {
    /// Start a match maker on the current runtime.
    pub fn start(chat_config: ChatConfig) -> Self {
        let (registry, match_maker) = MatchMaker::spawn();
        Self {
            registry: Arc::new(registry),
            active_users: Arc::new(ActiveUsers::new()),
            user_factory: UserFactory::default(),
            chat_config,
            match_maker,
        }
    }

    pub fn active_users(&self) -> u64 {
        self.active_users.count()
    }

    fn connect(&self) -> Connection {
        let (to_chat_tx, to_chat_rx) = mpsc::unbounded_channel();
        let (from_chat_tx, from_chat_rx) = mpsc::unbounded_channel();

        let user = self.user_factory.create();
        let user_id = user.id;
        let chat = Chat::new(
            user,
            to_chat_rx,
            from_chat_tx,
            self.registry.clone(),
            self.active_users.clone(),
            self.chat_config.clone(),
        );
        tokio::spawn(async move {
            if let Err(e) = chat.run().await {
                tracing::error!("Local chat of user {} failed: {}", user_id, e);
            }
        });

        Connection {
            incoming: from_chat_rx,
            outgoing: to_chat_tx,
        }
    }
}

impl Drop for LocalServer {
    fn drop(&mut self) {
        self.match_maker.abort();
    }
}
