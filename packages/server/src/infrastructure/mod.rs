//! Infrastructure 層
//!
//! - `dto`: WebSocket 上の JSON 表現（DTO）とドメインモデルとの変換
//! - `codec`: `ChatEvent` とトランスポートのフレーム（テキスト / バイナリ）の相互変換

pub mod codec;
pub mod dto;
