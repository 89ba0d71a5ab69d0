//! UseCase: マッチメイキング
//!
//! 待機中のリクエストをプールで管理し、2 人ずつペアにして双方向チャンネルを渡します。
//!
//! ## アルゴリズム
//!
//! 1 回のマッチングは 2 段階で行われます。
//!
//! - `Stage::Initiate`: プールに 2 人以上いる場合のみ、チャンネルの片側（side A）を
//!   いずれかの待機者に渡す
//! - `Stage::Complete`: side A が確定しているため人数の下限なしで、反対側（side B）を
//!   残りの待機者に渡す
//!
//! 1 段目で 2 人以上を要求することで、1 人しかいない待機者が自分自身と
//! マッチすることを防ぎます。どちらの段階でも新規リクエストの受付と、
//! 消えた待機者の除去は常に行われます。

use async_trait::async_trait;
use futures_util::future::select_all;
use tokio::{
    sync::mpsc::{self, UnboundedReceiver, UnboundedSender},
    task::JoinHandle,
};

use crate::domain::{PeerChannel, PeerRegistry, PeerRequest, RegistryClosed};

use super::error::MatchMakerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Initiate,
    Complete,
}

impl Stage {
    /// Pool size required before a channel half may be offered.
    fn min_pending(self) -> usize {
        match self {
            Stage::Initiate => 2,
            Stage::Complete => 1,
        }
    }
}

/// What the match maker has to do next.
enum Step {
    NewRequest(PeerRequest),
    UserLeft,
    Offer,
    Closed,
}

/// Single task owning the pool of pending requests.
pub struct MatchMaker {
    intake: UnboundedReceiver<PeerRequest>,
    pending: Vec<PeerRequest>,
}

/// Cloneable handle used by connections to register with the match maker.
///
/// The match maker shuts down once every handle has been dropped.
#[derive(Debug, Clone)]
pub struct MatchMakerHandle {
    intake: UnboundedSender<PeerRequest>,
}

impl MatchMaker {
    pub fn new() -> (Self, MatchMakerHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                intake: rx,
                pending: Vec::new(),
            },
            MatchMakerHandle { intake: tx },
        )
    }

    /// Create a match maker and run it on its own task.
    pub fn spawn() -> (MatchMakerHandle, JoinHandle<Result<(), MatchMakerError>>) {
        let (match_maker, handle) = Self::new();
        (handle, tokio::spawn(match_maker.run()))
    }

    /// Pair requests until the intake is closed.
    ///
    /// Requests still pending at shutdown are dropped unanswered.
    pub async fn run(mut self) -> Result<(), MatchMakerError> {
        tracing::info!("Match maker started");
        while self.single_match().await? {}
        tracing::info!(
            "Match maker intake closed, dropping {} pending request(s)",
            self.pending.len()
        );
        Ok(())
    }

    /// Complete one pairing. Returns `false` once the intake is closed.
    async fn single_match(&mut self) -> Result<bool, MatchMakerError> {
        let (side_a, side_b) = PeerChannel::pair();
        if !self.initiate_match(side_a).await? {
            return Ok(false);
        }
        self.complete_match(side_b).await
    }

    /// Hand side A to a waiter once at least two requests are pending.
    ///
    /// Returns `false` once the intake is closed.
    async fn initiate_match(&mut self, mut offer: PeerChannel) -> Result<bool, MatchMakerError> {
        loop {
            tracing::debug!("Making match ({:?}), backlog={}", Stage::Initiate, self.pending.len());
            match self.next_step(Stage::Initiate).await {
                Step::Closed => return Ok(false),
                Step::NewRequest(request) => self.enqueue(request),
                Step::UserLeft => self.purge_vanished()?,
                Step::Offer => match self.offer(offer) {
                    Ok(()) => return Ok(true),
                    Err(unclaimed) => offer = unclaimed,
                },
            }
        }
    }

    /// Hand side B to any waiter.
    ///
    /// The pairing is abandoned if side A leaves first. Returns `false` once
    /// the intake is closed.
    async fn complete_match(&mut self, mut offer: PeerChannel) -> Result<bool, MatchMakerError> {
        loop {
            tracing::debug!("Making match ({:?}), backlog={}", Stage::Complete, self.pending.len());
            let step = tokio::select! {
                _ = offer.closed() => {
                    tracing::info!("First side of a pairing left before it was completed");
                    return Ok(true);
                }
                step = self.next_step(Stage::Complete) => step,
            };
            match step {
                Step::Closed => return Ok(false),
                Step::NewRequest(request) => self.enqueue(request),
                Step::UserLeft => self.purge_vanished()?,
                Step::Offer => match self.offer(offer) {
                    Ok(()) => return Ok(true),
                    Err(unclaimed) => offer = unclaimed,
                },
            }
        }
    }

    /// Wait for whichever of the enabled events happens first.
    async fn next_step(&mut self, stage: Stage) -> Step {
        let can_offer = self.pending.len() >= stage.min_pending();
        let has_pending = !self.pending.is_empty();
        let intake = &mut self.intake;
        let pending = &mut self.pending;

        tokio::select! {
            request = intake.recv() => request.map_or(Step::Closed, Step::NewRequest),
            _ = any_vanished(pending), if has_pending => Step::UserLeft,
            _ = std::future::ready(()), if can_offer => Step::Offer,
        }
    }

    fn enqueue(&mut self, request: PeerRequest) {
        tracing::info!("New peer request from user {}", request.user_id());
        self.pending.push(request);
    }

    /// Hand a channel half to the longest-waiting request.
    ///
    /// Returns the half when that requester turned out to be gone; it has been
    /// removed from the pool either way.
    fn offer(&mut self, channel: PeerChannel) -> Result<(), PeerChannel> {
        let request = self.pending.remove(0);
        let user_id = request.user_id();
        match request.accept(channel) {
            Ok(()) => {
                tracing::info!("Peer found: user {}", user_id);
                Ok(())
            }
            Err(channel) => {
                tracing::info!("User {} vanished before accepting a peer", user_id);
                Err(channel)
            }
        }
    }

    /// Remove every request whose owner has gone away.
    ///
    /// Only called after a request was observed vanishing, so the pool must
    /// shrink.
    fn purge_vanished(&mut self) -> Result<(), MatchMakerError> {
        let before = self.pending.len();
        self.pending.retain(|request| !request.is_vanished());
        let after = self.pending.len();
        if after >= before {
            tracing::error!("Pending pool did not shrink on purge ({} -> {})", before, after);
            return Err(MatchMakerError::PoolInvariant { before, after });
        }
        tracing::info!("{} user(s) vanished while waiting", before - after);
        Ok(())
    }
}

/// Completes once any of the requests has been withdrawn.
async fn any_vanished(pending: &mut [PeerRequest]) {
    select_all(pending.iter_mut().map(|request| Box::pin(request.vanished()))).await;
}

#[async_trait]
impl PeerRegistry for MatchMakerHandle {
    async fn register(&self, request: PeerRequest) -> Result<(), RegistryClosed> {
        self.intake.send(request).map_err(|_| RegistryClosed)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::{sync::oneshot, time::timeout};

    use super::*;
    use crate::domain::{ChatEvent, ChatMessage, UserId};

    // ========================================
    // テスト作業記録
    // ========================================
    // 【何をテストするか】
    // - 待機中のリクエストが 2 人ずつペアになること
    // - ペアの双方が互いに逆向きのチャンネルを受け取ること
    // - 待機中に消えたユーザーがプールから除去されること
    // - 1 人だけの待機者はマッチしないこと
    // ========================================

    const WAIT: Duration = Duration::from_secs(2);

    async fn register(handle: &MatchMakerHandle, id: u64) -> oneshot::Receiver<PeerChannel> {
        let (request, reply) = PeerRequest::new(UserId::new(id));
        handle.register(request).await.unwrap();
        reply
    }

    /// Assert that each side receives what the other side sends.
    async fn assert_paired(a: &mut PeerChannel, b: &mut PeerChannel) {
        let ping = ChatEvent::Message(ChatMessage::Text("ping".to_string()));
        let pong = ChatEvent::Message(ChatMessage::Text("pong".to_string()));
        a.send(ping.clone()).unwrap();
        b.send(pong.clone()).unwrap();
        assert_eq!(timeout(WAIT, b.recv()).await.unwrap(), Some(ping));
        assert_eq!(timeout(WAIT, a.recv()).await.unwrap(), Some(pong));
    }

    #[tokio::test]
    async fn test_make_match_pairs_all_requests() {
        // テスト項目: 6 件のリクエストが自分自身を含まない 3 組の対称なペアになる
        // given (前提条件):
        let (handle, _task) = MatchMaker::spawn();
        let mut replies = Vec::new();
        for id in 0..6 {
            replies.push(register(&handle, id).await);
        }

        // when (操作):
        let mut channels = Vec::new();
        for reply in replies {
            channels.push(timeout(WAIT, reply).await.unwrap().unwrap());
        }
        for (index, channel) in channels.iter().enumerate() {
            channel
                .send(ChatEvent::Message(ChatMessage::Text(index.to_string())))
                .unwrap();
        }

        // then (期待する結果):
        let mut partner_of = Vec::new();
        for channel in channels.iter_mut() {
            match timeout(WAIT, channel.recv()).await.unwrap() {
                Some(ChatEvent::Message(ChatMessage::Text(text))) => {
                    partner_of.push(text.parse::<usize>().unwrap())
                }
                other => panic!("unexpected event: {:?}", other),
            }
        }
        for (index, &partner) in partner_of.iter().enumerate() {
            assert_ne!(index, partner, "channel {} is paired with itself", index);
            assert_eq!(partner_of[partner], index);
        }
    }

    #[tokio::test]
    async fn test_user_vanishes_before_match() {
        // テスト項目: 待機中に消えたユーザーはマッチ対象にならず、残りのユーザーはペアになる
        // given (前提条件):
        let (handle, _task) = MatchMaker::spawn();
        let vanished = register(&handle, 0).await;
        drop(vanished);

        // when (操作):
        let alice = register(&handle, 1).await;
        let bob = register(&handle, 2).await;

        // then (期待する結果):
        let mut alice = timeout(WAIT, alice).await.unwrap().unwrap();
        let mut bob = timeout(WAIT, bob).await.unwrap().unwrap();
        assert_paired(&mut alice, &mut bob).await;
    }

    #[tokio::test]
    async fn test_single_user_not_serviced() {
        // テスト項目: 待機者が 1 人だけの場合はマッチしない（エラーにもならない）
        // given (前提条件):
        let (handle, _task) = MatchMaker::spawn();
        let mut lone = register(&handle, 0).await;

        // when (操作):
        let result = timeout(Duration::from_millis(100), &mut lone).await;

        // then (期待する結果):
        assert!(result.is_err(), "lone waiter must not be matched");

        // a second waiter completes the pairing
        let second = register(&handle, 1).await;
        let mut lone = timeout(WAIT, lone).await.unwrap().unwrap();
        let mut second = timeout(WAIT, second).await.unwrap().unwrap();
        assert_paired(&mut lone, &mut second).await;
    }

    #[tokio::test]
    async fn test_pairing_abandoned_when_first_side_leaves() {
        // テスト項目: side A 確定後に side A が消えた場合、そのペアリングは破棄され、
        //             後から来た 2 人は消えた相手ではなく互いにペアになる
        // given (前提条件):
        let (mut match_maker, handle) = MatchMaker::new();
        let (side_a, side_b) = PeerChannel::pair();
        drop(side_a);

        // when (操作):
        let result = timeout(WAIT, match_maker.complete_match(side_b)).await.unwrap();
        let _task = tokio::spawn(match_maker.run());
        let carol = register(&handle, 3).await;
        let dave = register(&handle, 4).await;

        // then (期待する結果):
        assert_eq!(result, Ok(true));
        let mut carol = timeout(WAIT, carol).await.unwrap().unwrap();
        let mut dave = timeout(WAIT, dave).await.unwrap().unwrap();
        assert!(!carol.is_closed());
        assert!(!dave.is_closed());
        assert_paired(&mut carol, &mut dave).await;
    }

    #[tokio::test]
    async fn test_pairing_completes_while_first_side_is_alive() {
        // テスト項目: side A が生きている間は、後から来た待機者に side B が渡される
        // given (前提条件):
        let (mut match_maker, handle) = MatchMaker::new();
        let (mut side_a, side_b) = PeerChannel::pair();
        let bob = register(&handle, 2).await;

        // when (操作):
        let result = timeout(WAIT, match_maker.complete_match(side_b)).await.unwrap();

        // then (期待する結果):
        assert_eq!(result, Ok(true));
        let mut bob = timeout(WAIT, bob).await.unwrap().unwrap();
        assert_paired(&mut side_a, &mut bob).await;
    }

    #[tokio::test]
    async fn test_purge_shrinks_pool() {
        // テスト項目: 消えたリクエストの除去でプールのサイズが必ず減る
        // given (前提条件):
        let (mut match_maker, _handle) = MatchMaker::new();
        let (alive, _alive_reply) = PeerRequest::new(UserId::new(1));
        let (gone, gone_reply) = PeerRequest::new(UserId::new(2));
        match_maker.pending.push(alive);
        match_maker.pending.push(gone);
        drop(gone_reply);

        // when (操作):
        let result = match_maker.purge_vanished();

        // then (期待する結果):
        assert_eq!(result, Ok(()));
        assert_eq!(match_maker.pending.len(), 1);
        assert_eq!(match_maker.pending[0].user_id(), UserId::new(1));
    }

    #[tokio::test]
    async fn test_purge_without_vanished_request_violates_invariant() {
        // テスト項目: 何も除去されない purge は不変条件違反としてエラーになる
        // given (前提条件):
        let (mut match_maker, _handle) = MatchMaker::new();
        let (alive, _alive_reply) = PeerRequest::new(UserId::new(1));
        match_maker.pending.push(alive);

        // when (操作):
        let result = match_maker.purge_vanished();

        // then (期待する結果):
        assert_eq!(
            result,
            Err(MatchMakerError::PoolInvariant {
                before: 1,
                after: 1
            })
        );
    }

    #[tokio::test]
    async fn test_run_exits_when_intake_closed() {
        // テスト項目: 全てのハンドルが破棄されるとマッチメイカーは待機中のリクエストを残して終了する
        // given (前提条件):
        let (handle, task) = MatchMaker::spawn();
        let pending = register(&handle, 0).await;

        // when (操作):
        drop(handle);

        // then (期待する結果):
        let result = timeout(WAIT, task).await.unwrap().unwrap();
        assert_eq!(result, Ok(()));
        assert!(pending.await.is_err());
    }

    #[tokio::test]
    async fn test_register_fails_after_shutdown() {
        // テスト項目: マッチメイカー停止後の登録は RegistryClosed を返す
        // given (前提条件):
        let (match_maker, handle) = MatchMaker::new();
        drop(match_maker);

        // when (操作):
        let (request, _reply) = PeerRequest::new(UserId::new(0));
        let result = handle.register(request).await;

        // then (期待する結果):
        assert_eq!(result, Err(RegistryClosed));
    }
}
