//! Utilities shared by the Roulette server, client and load test.

pub mod logger;
pub mod time;
