//! Chat roulette server library.
//!
//! Pairs anonymously connected clients two at a time and relays chat events
//! between the members of each pair until one of them leaves.

// layers
pub mod domain;
pub mod infrastructure;
pub mod ui;
pub mod usecase;

pub mod config;
