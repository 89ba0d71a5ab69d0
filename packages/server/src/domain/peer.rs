//! ピア接続のドメインモデル
//!
//! - `PeerChannel`: マッチした 2 人のユーザー間の双方向チャンネル
//! - `PeerRequest`: マッチング待ちのリクエスト（単発の返信スロットを持つ）
//! - `PeerRegistry`: マッチングへの登録を抽象化する trait
//!
//! `PeerRegistry` の具体的な実装は `usecase::matchmaker::MatchMakerHandle` が提供します。

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::{
    mpsc::{self, UnboundedReceiver, UnboundedSender, error::SendError},
    oneshot,
};

use super::{event::ChatEvent, user::UserId};

/// One side of a duplex event channel between two paired users.
///
/// Each side reads what the other side writes. Dropping a side closes both
/// of its directions, which the other side observes as the peer leaving.
#[derive(Debug)]
pub struct PeerChannel {
    inbox: UnboundedReceiver<ChatEvent>,
    outbox: UnboundedSender<ChatEvent>,
}

impl PeerChannel {
    /// Create both sides of a fresh duplex channel.
    ///
    /// The first side receives on direction X and sends on direction Y, the
    /// second side the opposite way round.
    pub fn pair() -> (PeerChannel, PeerChannel) {
        let (dir_x_tx, dir_x_rx) = mpsc::unbounded_channel();
        let (dir_y_tx, dir_y_rx) = mpsc::unbounded_channel();
        (
            PeerChannel {
                inbox: dir_x_rx,
                outbox: dir_y_tx,
            },
            PeerChannel {
                inbox: dir_y_rx,
                outbox: dir_x_tx,
            },
        )
    }

    pub fn send(&self, event: ChatEvent) -> Result<(), SendError<ChatEvent>> {
        self.outbox.send(event)
    }

    /// Receive the next event from the peer. `None` once the peer is gone.
    pub async fn recv(&mut self) -> Option<ChatEvent> {
        self.inbox.recv().await
    }

    /// Whether either direction has been closed by the other side.
    pub fn is_closed(&self) -> bool {
        self.outbox.is_closed() || self.inbox.is_closed()
    }

    /// Completes once the other side has dropped its end.
    pub async fn closed(&self) {
        self.outbox.closed().await
    }
}

/// A pending request to be paired with another user.
#[derive(Debug)]
pub struct PeerRequest {
    user_id: UserId,
    reply: oneshot::Sender<PeerChannel>,
}

impl PeerRequest {
    /// Create a request and the receiver on which the assigned channel arrives.
    ///
    /// Dropping the receiver withdraws the request.
    pub fn new(user_id: UserId) -> (Self, oneshot::Receiver<PeerChannel>) {
        let (reply, rx) = oneshot::channel();
        (Self { user_id, reply }, rx)
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// The requester is gone and can no longer accept a channel.
    pub fn is_vanished(&self) -> bool {
        self.reply.is_closed()
    }

    /// Completes once the requester is gone.
    pub async fn vanished(&mut self) {
        self.reply.closed().await
    }

    /// Hand the channel to the requester, returning it if the requester is gone.
    pub fn accept(self, channel: PeerChannel) -> Result<(), PeerChannel> {
        self.reply.send(channel)
    }
}

/// The match maker no longer accepts registrations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("match maker is not accepting registrations")]
pub struct RegistryClosed;

/// Registration point for users that wait for a peer.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PeerRegistry: Send + Sync {
    /// Submit a request. The assigned channel is delivered through the
    /// request's reply slot.
    async fn register(&self, request: PeerRequest) -> Result<(), RegistryClosed>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ChatMessage;

    #[tokio::test]
    async fn test_pair_sides_read_what_the_other_writes() {
        // テスト項目: ペアの各側は相手側が書き込んだイベントを読み取る
        // given (前提条件):
        let (mut side_a, mut side_b) = PeerChannel::pair();

        // when (操作):
        side_a
            .send(ChatEvent::Message(ChatMessage::Text("from a".to_string())))
            .unwrap();
        side_b
            .send(ChatEvent::Message(ChatMessage::Text("from b".to_string())))
            .unwrap();

        // then (期待する結果):
        assert_eq!(
            side_b.recv().await,
            Some(ChatEvent::Message(ChatMessage::Text("from a".to_string())))
        );
        assert_eq!(
            side_a.recv().await,
            Some(ChatEvent::Message(ChatMessage::Text("from b".to_string())))
        );
    }

    #[tokio::test]
    async fn test_dropping_a_side_closes_the_channel_for_the_other() {
        // テスト項目: 片側を破棄すると、もう片側からはチャンネルが閉じて見える
        // given (前提条件):
        let (side_a, mut side_b) = PeerChannel::pair();
        assert!(!side_b.is_closed());

        // when (操作):
        drop(side_a);

        // then (期待する結果):
        assert!(side_b.is_closed());
        assert!(side_b.send(ChatEvent::IsTyping(true)).is_err());
        assert_eq!(side_b.recv().await, None);
        side_b.closed().await;
    }

    #[test]
    fn test_request_is_vanished_after_receiver_dropped() {
        // テスト項目: 返信スロットの受信側を破棄するとリクエストは消失扱いになる
        // given (前提条件):
        let (request, reply) = PeerRequest::new(UserId::new(7));
        assert!(!request.is_vanished());

        // when (操作):
        drop(reply);

        // then (期待する結果):
        assert!(request.is_vanished());
        let (channel, _other) = PeerChannel::pair();
        assert!(request.accept(channel).is_err());
    }
}
