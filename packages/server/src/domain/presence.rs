//! Active user accounting.

use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

/// Number of users currently connected to the server.
#[derive(Debug, Default)]
pub struct ActiveUsers {
    count: AtomicU64,
}

impl ActiveUsers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count a user as active until the returned guard is dropped.
    pub fn enter(self: &Arc<Self>) -> PresenceGuard {
        self.count.fetch_add(1, Ordering::Relaxed);
        PresenceGuard {
            users: Arc::clone(self),
        }
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }
}

/// Decrements the active user count on drop, including when the owning
/// connection task is aborted.
#[derive(Debug)]
pub struct PresenceGuard {
    users: Arc<ActiveUsers>,
}

impl Drop for PresenceGuard {
    fn drop(&mut self) {
        self.users.count.fetch_sub(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_tracks_active_users() {
        // テスト項目: ガードの生存期間中だけアクティブユーザーとして数えられる
        // given (前提条件):
        let users = Arc::new(ActiveUsers::new());

        // when (操作):
        let alice = users.enter();
        let bob = users.enter();

        // then (期待する結果):
        assert_eq!(users.count(), 2);
        drop(alice);
        assert_eq!(users.count(), 1);
        drop(bob);
        assert_eq!(users.count(), 0);
    }
}
