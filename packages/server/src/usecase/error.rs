//! UseCase 層のエラー型

use thiserror::Error;

use crate::domain::{RegistryClosed, UserId};

/// Fatal errors of the match maker task.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MatchMakerError {
    /// A purge of vanished requests removed nothing. The pending pool
    /// bookkeeping is inconsistent.
    #[error("pending pool did not shrink on purge (before: {before}, after: {after})")]
    PoolInvariant { before: usize, after: usize },
}

/// Errors that end a single connection.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("user {user}: first event from peer was '{kind}', expected 'hello'")]
    ProtocolViolation { user: UserId, kind: &'static str },

    #[error("match maker unavailable: {0}")]
    MatchMakerUnavailable(#[from] RegistryClosed),

    #[error("user {0}: channel closed but neither the client nor the peer side is closed")]
    UnattributedDisconnect(UserId),
}
