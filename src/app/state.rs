//! Application state shared across routes

use std::sync::Arc;

use crate::config::Config;
use crate::matchmaking::MatchmakingService;
use crate::rooms::RoomManager;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub rooms: Arc<RoomManager>,
    pub matchmaking: MatchmakingService,
}

impl AppState {
    /// Wire up the room manager, its reaper and the pairing loop
    ///
    /// Spawns the background tasks, so this must run inside the
    /// runtime.
    pub fn new(config: Config) -> Self {
        let config = Arc::new(config);

        let (rooms, end_rx) = RoomManager::new(config.arena_width, config.arena_height);
        tokio::spawn(rooms.clone().run_reaper(end_rx));

        let (matchmaking, arrivals_rx) = MatchmakingService::new();
        tokio::spawn(matchmaking.clone().run(arrivals_rx, rooms.clone()));

        Self {
            config,
            rooms,
            matchmaking,
        }
    }
}
