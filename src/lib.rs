//! Soundcase: an in-memory lobby server for a social soundboard game.
//!
//! Users gather in lobbies, play the sounds they own and unlock new ones
//! from loot cases. The [`lobby`] module keeps connections, lobbies and
//! membership consistent under one lock; [`rewards`] applies cooldowns
//! and drop chances on top; [`server`] exposes both over WebSocket and
//! HTTP.

pub mod accounts;
pub mod cli;
pub mod clock;
pub mod config;
pub mod error;
pub mod lobby;
pub mod model;
pub mod notify;
pub mod protocol;
pub mod rewards;
pub mod server;
pub mod store;
