//! User entity and its factory.

use std::{
    fmt,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use roulette_shared::time::{Clock, SystemClock};

/// User identifier assigned by the server on connect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UserId(u64);

impl UserId {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unix timestamp in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Timestamp(i64);

impl Timestamp {
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

/// An anonymous chat user. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub created_at: Timestamp,
}

impl User {
    pub fn new(id: UserId, created_at: Timestamp) -> Self {
        Self { id, created_at }
    }
}

/// Creates users with ids from a monotonically increasing counter.
///
/// One factory is shared by every connection of the process, so ids are
/// unique for the lifetime of the server.
pub struct UserFactory {
    next_id: AtomicU64,
    clock: Arc<dyn Clock>,
}

impl UserFactory {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            next_id: AtomicU64::new(0),
            clock,
        }
    }

    pub fn create(&self) -> User {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        User::new(UserId::new(id), Timestamp::new(self.clock.now_millis()))
    }
}

impl Default for UserFactory {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}
