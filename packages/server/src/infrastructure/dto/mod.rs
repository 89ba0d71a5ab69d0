//! Data Transfer Objects (DTOs) for the chat protocol.
//!
//! DTOs are organized by protocol:
//! - `websocket`: JSON text frame DTOs
//! - `http`: HTTP API response DTOs

pub mod conversion;
pub mod http;
pub mod websocket;
