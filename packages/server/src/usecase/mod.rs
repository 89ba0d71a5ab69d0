//! UseCase 層
//!
//! - `matchmaker`: 待機中のユーザーを 2 人ずつマッチングする単一タスク
//! - `chat`: 接続ごとの状態機械（待機 ⇄ 接続中）

pub mod chat;
pub mod error;
pub mod matchmaker;

pub use chat::Chat;
pub use error::{ChatError, MatchMakerError};
pub use matchmaker::{MatchMaker, MatchMakerHandle};
