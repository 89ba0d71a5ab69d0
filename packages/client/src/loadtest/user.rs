//! A simulated chat user.
//!
//! Each user connects, waits for its id, sends a fixed number of numbered
//! messages at its own pace and checks everything it receives:
//!
//! - a message only arrives while matched, and always from the current peer
//! - sequence numbers from one peer are consecutive
//! - the announced total never changes within one pairing
//!
//! After the last message the user disconnects and starts over.

use std::{fmt, str::FromStr, sync::Arc, time::Duration};

use roulette_server::{
    domain::{ChatEvent, ChatMessage, UserId},
    infrastructure::codec::{self, Frame},
};
use thiserror::Error;
use tokio::{
    sync::mpsc::UnboundedSender,
    time::{Instant, Interval, MissedTickBehavior, interval_at},
};

use super::{
    config::LoadTestConfig,
    connector::{Connection, Connector},
    stats::Status,
};

/// Pause before retrying after a failed connect attempt.
const CONNECT_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Why a simulated session ended early.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("channel closed")]
    BrokenChannel,
    #[error("protocol error: {0}")]
    Protocol(String),
}

/// Text body of a load test message: `"<sender> <seq> <total> <sent_micros>"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Payload {
    pub sender: u64,
    pub seq: u32,
    pub total: u32,
    /// Send time in microseconds since the start of the load test
    pub sent_micros: u64,
}

impl fmt::Display for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {}",
            self.sender, self.seq, self.total, self.sent_micros
        )
    }
}

impl FromStr for Payload {
    type Err = SessionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || SessionError::Protocol(format!("malformed message '{}'", s));
        let mut fields = s.split(' ');
        let mut next = || fields.next().ok_or_else(malformed);

        let payload = Payload {
            sender: next()?.parse().map_err(|_| malformed())?,
            seq: next()?.parse().map_err(|_| malformed())?,
            total: next()?.parse().map_err(|_| malformed())?,
            sent_micros: next()?.parse().map_err(|_| malformed())?,
        };
        if fields.next().is_some() {
            return Err(malformed());
        }
        Ok(payload)
    }
}

/// Run one user forever, reconnecting after every session.
pub async fn single_user(
    connector: Arc<Connector>,
    config: Arc<LoadTestConfig>,
    status: UnboundedSender<Status>,
    epoch: Instant,
) {
    loop {
        let _ = status.send(Status::Connect);
        match connector.connect().await {
            Ok(connection) => {
                let client = LoadTestClient::new(connection, status.clone(), epoch);
                let delay = config.random_delay();
                match client.run(config.messages_per_connection, delay).await {
                    Ok(()) => {}
                    Err(SessionError::BrokenChannel) => {
                        let _ = status.send(Status::BrokenChannel);
                    }
                    Err(e) => {
                        tracing::warn!("{}", e);
                        let _ = status.send(Status::ProtocolError);
                    }
                }
            }
            Err(e) => {
                tracing::debug!("Connect failed: {}", e);
                let _ = status.send(Status::BrokenChannel);
                tokio::time::sleep(CONNECT_RETRY_DELAY).await;
            }
        }
        let _ = status.send(Status::Disconnect);
    }
}

enum Step {
    Received(Option<Frame>),
    Send,
}

/// State of one simulated session.
pub struct LoadTestClient {
    connection: Connection,
    status: UnboundedSender<Status>,
    epoch: Instant,
    user_id: Option<UserId>,
    peer_id: Option<UserId>,
    last_seq: Option<u32>,
    total: Option<u32>,
}

impl LoadTestClient {
    pub fn new(connection: Connection, status: UnboundedSender<Status>, epoch: Instant) -> Self {
        Self {
            connection,
            status,
            epoch,
            user_id: None,
            peer_id: None,
            last_seq: None,
            total: None,
        }
    }

    /// Send `count` messages, one every `delay`, handling incoming frames in
    /// between. Consumes the client; the connection closes on return.
    pub async fn run(mut self, count: u32, delay: Duration) -> Result<(), SessionError> {
        let mut ticker = interval_at(Instant::now() + delay, delay);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        for seq in 1..=count {
            self.send_one(&mut ticker, seq, count).await?;
        }
        Ok(())
    }

    async fn send_one(
        &mut self,
        ticker: &mut Interval,
        seq: u32,
        total: u32,
    ) -> Result<(), SessionError> {
        loop {
            // Nothing is sent before the server assigned an id.
            let can_send = self.user_id.is_some();
            let step = tokio::select! {
                frame = self.connection.incoming.recv() => Step::Received(frame),
                _ = ticker.tick(), if can_send => Step::Send,
            };

            match step {
                Step::Received(None) => return Err(SessionError::BrokenChannel),
                Step::Received(Some(frame)) => self.handle_frame(frame)?,
                Step::Send => {
                    let Some(sender) = self.user_id else {
                        continue;
                    };
                    let payload = Payload {
                        sender: sender.value(),
                        seq,
                        total,
                        sent_micros: self.now_micros(),
                    };
                    let event = ChatEvent::Message(ChatMessage::Text(payload.to_string()));
                    let frame = codec::encode(&event)
                        .map_err(|e| SessionError::Protocol(e.to_string()))?;
                    self.connection
                        .outgoing
                        .send(frame)
                        .map_err(|_| SessionError::BrokenChannel)?;
                    let _ = self.status.send(Status::MessageSent);
                    return Ok(());
                }
            }
        }
    }

    fn handle_frame(&mut self, frame: Frame) -> Result<(), SessionError> {
        let event = codec::decode(frame).map_err(|e| SessionError::Protocol(e.to_string()))?;
        match event {
            ChatEvent::UserId(id) => {
                if let Some(previous) = self.user_id {
                    return Err(SessionError::Protocol(format!(
                        "user {} got a second id {}",
                        previous, id
                    )));
                }
                self.user_id = Some(id);
            }
            ChatEvent::Hello(peer) => {
                let Some(user_id) = self.user_id else {
                    return Err(SessionError::Protocol("hello before user id".to_string()));
                };
                if let Some(current) = self.peer_id {
                    return Err(SessionError::Protocol(format!(
                        "user {} already connected to {} got hello from {}",
                        user_id, current, peer.id
                    )));
                }
                self.peer_id = Some(peer.id);
                self.last_seq = None;
                self.total = None;
            }
            ChatEvent::Disconnected => {
                self.peer_id = None;
                self.last_seq = None;
                self.total = None;
            }
            ChatEvent::Message(ChatMessage::Text(text)) => {
                let _ = self.status.send(Status::MessageReceived);
                self.handle_message(&text)?;
            }
            ChatEvent::UserCount(_) | ChatEvent::IsTyping(_) | ChatEvent::Message(_) => {}
        }
        Ok(())
    }

    fn handle_message(&mut self, text: &str) -> Result<(), SessionError> {
        let (Some(user_id), Some(peer_id)) = (self.user_id, self.peer_id) else {
            return Err(SessionError::Protocol(format!(
                "message '{}' received while not connected",
                text
            )));
        };
        let payload: Payload = text.parse()?;

        if payload.sender != peer_id.value() {
            return Err(SessionError::Protocol(format!(
                "user {} received message from {}, but is connected to {}",
                user_id, payload.sender, peer_id
            )));
        }
        if let Some(last) = self.last_seq
            && last.checked_add(1) != Some(payload.seq)
        {
            return Err(SessionError::Protocol(format!(
                "last message was {}, current message is {}",
                last, payload.seq
            )));
        }
        if let Some(total) = self.total
            && total != payload.total
        {
            return Err(SessionError::Protocol(format!(
                "message total changed from {} to {}",
                total, payload.total
            )));
        }

        self.last_seq = Some(payload.seq);
        self.total = Some(payload.total);
        let delay = self.now_micros().saturating_sub(payload.sent_micros);
        let _ = self.status.send(Status::Delay(Duration::from_micros(delay)));
        Ok(())
    }

    fn now_micros(&self) -> u64 {
        self.epoch.elapsed().as_micros() as u64
    }
}
