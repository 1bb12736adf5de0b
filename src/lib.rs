//! Troop Battle Server - authoritative two-player battle backend
//!
//! Pairs players over a matchmaking WebSocket, runs every battle in
//! its own room at a fixed tick, and broadcasts the full unit state
//! to the room's subscribers after each tick.

pub mod app;
pub mod config;
pub mod game;
pub mod http;
pub mod matchmaking;
pub mod rooms;
pub mod util;
pub mod ws;
