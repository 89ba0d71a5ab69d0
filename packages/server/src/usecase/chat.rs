//! UseCase: 接続ごとのチャット状態機械
//!
//! ```text
//! Init → (Unmatched ⇄ Connected)* → Terminated
//! ```
//!
//! - Init: ユーザー ID をクライアントに通知し、ステータス送信とマッチングループを並行実行する
//! - Unmatched: マッチメイカーにリクエストを登録し、待機中のクライアントからのフレームは破棄する
//! - Connected: Hello を交換した後、クライアントとピアの間でイベントを中継する
//!
//! ピア側が切断した場合はクライアントに `Disconnected` を送って Unmatched に戻り、
//! クライアント側が切断した場合はこの接続自体を終了します。

use std::{sync::Arc, time::Duration};

use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

use crate::{
    config::ChatConfig,
    domain::{
        ActiveUsers, ChatEvent, PeerChannel, PeerRegistry, PeerRequest, RegistryClosed, User,
        UserId,
    },
    infrastructure::codec::{self, Frame},
};

use super::error::ChatError;

/// Outcome of waiting for a peer.
enum Waiting {
    ClientLeft,
    Matched(PeerChannel),
}

/// How a session with a peer ended.
#[derive(Debug, PartialEq, Eq)]
enum SessionEnd {
    ClientLeft,
    PeerLeft,
}

/// One step of the relay loop.
enum Relay {
    FromClient(Option<Frame>),
    FromPeer(Option<ChatEvent>),
}

/// The client's outbound stream is gone.
struct ClientGone;

/// State machine of one connected client.
pub struct Chat {
    user: User,
    /// Frames received from the client. `None` once the client is gone.
    incoming: UnboundedReceiver<Frame>,
    /// Frames to be written to the client.
    outgoing: UnboundedSender<Frame>,
    registry: Arc<dyn PeerRegistry>,
    active_users: Arc<ActiveUsers>,
    config: ChatConfig,
}

impl Chat {
    pub fn new(
        user: User,
        incoming: UnboundedReceiver<Frame>,
        outgoing: UnboundedSender<Frame>,
        registry: Arc<dyn PeerRegistry>,
        active_users: Arc<ActiveUsers>,
        config: ChatConfig,
    ) -> Self {
        Self {
            user,
            incoming,
            outgoing,
            registry,
            active_users,
            config,
        }
    }

    /// Serve the client until it disconnects.
    ///
    /// Errors are fatal to this connection only.
    pub async fn run(mut self) -> Result<(), ChatError> {
        let user_id = self.user.id;
        let _presence = self.active_users.enter();
        tracing::info!("New user {}", user_id);

        let result = self.serve().await;

        tracing::info!("User {} left", user_id);
        result
    }

    async fn serve(&mut self) -> Result<(), ChatError> {
        let user_id = self.user.id;
        if self.send_to_client(&ChatEvent::UserId(user_id)).is_err() {
            return Ok(());
        }

        let status = broadcast_status(
            self.outgoing.clone(),
            self.active_users.clone(),
            self.config.status_interval,
        );

        tokio::select! {
            _ = status => {
                tracing::info!(
                    "Status broadcaster of user {} exited, cancelling matching loop",
                    user_id
                );
                Ok(())
            }
            result = self.matching_loop() => {
                tracing::info!(
                    "Matching loop of user {} exited, cancelling status broadcaster",
                    user_id
                );
                result
            }
        }
    }

    /// Alternate between waiting for a peer and chatting with it until the
    /// client is gone.
    async fn matching_loop(&mut self) -> Result<(), ChatError> {
        loop {
            let peer = match self.wait_for_peer().await? {
                Waiting::ClientLeft => return Ok(()),
                Waiting::Matched(peer) => peer,
            };
            match self.connected(peer).await? {
                SessionEnd::ClientLeft => return Ok(()),
                SessionEnd::PeerLeft => continue,
            }
        }
    }

    /// Register with the match maker and discard client frames until a peer
    /// is assigned.
    ///
    /// Returning drops the reply slot, which withdraws the request.
    async fn wait_for_peer(&mut self) -> Result<Waiting, ChatError> {
        let user_id = self.user.id;
        let (request, reply) = PeerRequest::new(user_id);
        self.registry.register(request).await?;
        tracing::info!("User {} is waiting for a peer", user_id);

        tokio::select! {
            _ = discard_frames(&mut self.incoming, user_id) => Ok(Waiting::ClientLeft),
            channel = reply => channel
                .map(Waiting::Matched)
                .map_err(|_| ChatError::MatchMakerUnavailable(RegistryClosed)),
        }
    }

    /// Hello handshake followed by the relay loop.
    async fn connected(&mut self, mut peer: PeerChannel) -> Result<SessionEnd, ChatError> {
        let user_id = self.user.id;
        tracing::info!("User {} got a new connection to a peer", user_id);

        if peer.send(ChatEvent::Hello(self.user.clone())).is_err() {
            return self.attribute_disconnect(&peer);
        }
        let hello = match peer.recv().await {
            Some(ChatEvent::Hello(user)) => user,
            Some(other) => {
                tracing::error!(
                    "First event from the peer of user {} was '{}', not hello",
                    user_id,
                    other.kind()
                );
                return Err(ChatError::ProtocolViolation {
                    user: user_id,
                    kind: other.kind(),
                });
            }
            None => return self.attribute_disconnect(&peer),
        };

        tracing::info!("User {} is chatting with user {}", user_id, hello.id);
        if self.send_to_client(&ChatEvent::Hello(hello)).is_err() {
            return self.attribute_disconnect(&peer);
        }

        self.relay(&mut peer).await;
        self.attribute_disconnect(&peer)
    }

    /// Forward events in both directions until one of the channels is unusable.
    async fn relay(&mut self, peer: &mut PeerChannel) {
        loop {
            let next = tokio::select! {
                frame = self.incoming.recv() => Relay::FromClient(frame),
                event = peer.recv() => Relay::FromPeer(event),
            };
            match next {
                Relay::FromClient(Some(frame)) => {
                    if let Some(event) = self.decode_client_frame(frame)
                        && peer.send(event).is_err()
                    {
                        return;
                    }
                }
                Relay::FromPeer(Some(event)) => {
                    if self.send_to_client(&event).is_err() {
                        return;
                    }
                }
                Relay::FromClient(None) | Relay::FromPeer(None) => return,
            }
        }
    }

    /// Decode a client frame into an event that may be relayed to the peer.
    fn decode_client_frame(&self, frame: Frame) -> Option<ChatEvent> {
        let description = frame.to_string();
        match codec::decode(frame) {
            Ok(event) if event.is_client_originated() => {
                tracing::debug!("Relaying {} from user {}", event.kind(), self.user.id);
                Some(event)
            }
            Ok(event) => {
                tracing::warn!(
                    "Dropping server-only event '{}' sent by user {}",
                    event.kind(),
                    self.user.id
                );
                None
            }
            Err(e) => {
                tracing::warn!(
                    "Dropping undecodable {} from user {}: {}",
                    description,
                    self.user.id,
                    e
                );
                None
            }
        }
    }

    /// Decide which side closed after a channel became unusable.
    fn attribute_disconnect(&self, peer: &PeerChannel) -> Result<SessionEnd, ChatError> {
        let user_id = self.user.id;
        if self.outgoing.is_closed() || self.incoming.is_closed() {
            tracing::info!("Client of user {} closed while connected to a peer", user_id);
            Ok(SessionEnd::ClientLeft)
        } else if peer.is_closed() {
            tracing::info!("Peer of user {} disconnected", user_id);
            match self.send_to_client(&ChatEvent::Disconnected) {
                Ok(()) => Ok(SessionEnd::PeerLeft),
                Err(ClientGone) => Ok(SessionEnd::ClientLeft),
            }
        } else {
            tracing::error!("Unattributable disconnect for user {}", user_id);
            Err(ChatError::UnattributedDisconnect(user_id))
        }
    }

    fn send_to_client(&self, event: &ChatEvent) -> Result<(), ClientGone> {
        send_event(&self.outgoing, event)
    }
}

/// Encode and send an event to the client.
///
/// Encoding failures are logged and the event is skipped; only a closed
/// stream is reported.
fn send_event(outgoing: &UnboundedSender<Frame>, event: &ChatEvent) -> Result<(), ClientGone> {
    let frame = match codec::encode(event) {
        Ok(frame) => frame,
        Err(e) => {
            tracing::error!("Failed to encode '{}': {}", event.kind(), e);
            return Ok(());
        }
    };
    outgoing.send(frame).map_err(|_| ClientGone)
}

/// Send the active user count every `interval` until the client is gone.
async fn broadcast_status(
    outgoing: UnboundedSender<Frame>,
    active_users: Arc<ActiveUsers>,
    interval: Duration,
) {
    let mut ticker = tokio::time::interval(interval);
    loop {
        ticker.tick().await;
        if send_event(&outgoing, &ChatEvent::UserCount(active_users.count())).is_err() {
            return;
        }
    }
}

/// Drain client frames while there is no peer to relay them to.
async fn discard_frames(incoming: &mut UnboundedReceiver<Frame>, user_id: UserId) {
    while let Some(frame) = incoming.recv().await {
        tracing::debug!(
            "Ignoring {} from user {} while not connected to a peer",
            frame,
            user_id
        );
    }
    tracing::info!("Client of user {} closed while not connected to a peer", user_id);
}
