//! Player pairing

pub mod queue;
pub mod service;

pub use queue::{MatchQueue, WaitingPlayer};
pub use service::{MatchmakingService, PlayerConn};
