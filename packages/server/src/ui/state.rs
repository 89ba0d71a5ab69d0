//! Server state shared by all handlers.

use std::sync::Arc;

use crate::{
    config::ChatConfig,
    domain::{ActiveUsers, PeerRegistry, UserFactory},
};

/// Shared application state
pub struct AppState {
    /// PeerRegistry（マッチメイカーへの登録口）
    pub registry: Arc<dyn PeerRegistry>,
    /// 接続中のユーザー数
    pub active_users: Arc<ActiveUsers>,
    /// ユーザー ID の払い出し
    pub user_factory: UserFactory,
    pub chat_config: ChatConfig,
    /// Interval between keep-alive pings on each WebSocket
    pub ping_interval: std::time::Duration,
}
