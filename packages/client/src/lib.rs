//! Roulette chat clients.
//!
//! - `run_client`: 対話型 CLI クライアント（再接続あり）
//! - `loadtest`: 多数の模擬ユーザーでサーバーに負荷をかける

pub mod domain;
pub mod error;
pub mod formatter;
pub mod loadtest;
mod runner;
mod session;
mod ui;
pub mod wire;

pub use runner::run_client;
