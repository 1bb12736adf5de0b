//! WebSocket handling

pub mod handler;
pub mod protocol;
