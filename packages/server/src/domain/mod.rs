//! ドメイン層
//!
//! ユーザー、チャットイベント、ピア接続といったドメインモデルを定義します。
//! このモジュールはトランスポート（WebSocket）やシリアライズ形式に依存しません。

pub mod event;
pub mod peer;
pub mod presence;
pub mod user;

pub use event::{ChatEvent, ChatMessage};
#[cfg(test)]
pub use peer::MockPeerRegistry;
pub use peer::{PeerChannel, PeerRegistry, PeerRequest, RegistryClosed};
pub use presence::{ActiveUsers, PresenceGuard};
pub use user::{Timestamp, User, UserFactory, UserId};
