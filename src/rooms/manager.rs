//! Room registry and lifecycle

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::info;
use uuid::Uuid;

use crate::game::battle::{Battle, EndOfGame};
use crate::game::units::UnitCatalog;
use crate::util::time::TEARDOWN_GRACE;

use super::hub::{Hub, HubHandle};

/// Registry of live rooms
///
/// Owns the shared unit catalog and the end-of-game channel the
/// battles report into.
pub struct RoomManager {
    rooms: DashMap<Uuid, HubHandle>,
    catalog: Arc<UnitCatalog>,
    arena_width: i32,
    arena_height: i32,
    end_tx: mpsc::UnboundedSender<Uuid>,
}

impl RoomManager {
    /// Create the manager along with the receiver that feeds the reaper
    pub fn new(arena_width: i32, arena_height: i32) -> (Arc<Self>, mpsc::UnboundedReceiver<Uuid>) {
        let (end_tx, end_rx) = mpsc::unbounded_channel();
        let manager = Arc::new(Self {
            rooms: DashMap::new(),
            catalog: Arc::new(UnitCatalog::standard()),
            arena_width,
            arena_height,
            end_tx,
        });
        (manager, end_rx)
    }

    /// Create a room and start its tick loop
    pub fn create_room(&self) -> HubHandle {
        let room_id = Uuid::new_v4();
        let end_signal = EndOfGame::new(room_id, self.end_tx.clone());
        let battle = Battle::new(
            self.arena_width,
            self.arena_height,
            self.catalog.clone(),
            Some(end_signal),
        );
        let (hub, handle) = Hub::new(room_id, battle);

        self.rooms.insert(room_id, handle.clone());
        tokio::spawn(hub.run());

        info!(room_id = %room_id, "Room created");
        handle
    }

    pub fn get_room(&self, id: &Uuid) -> Option<HubHandle> {
        self.rooms.get(id).map(|r| r.value().clone())
    }

    /// Remove a room from the registry and stop its loop
    pub fn delete_room(&self, id: &Uuid) {
        if let Some((_, handle)) = self.rooms.remove(id) {
            handle.stop();
            info!(room_id = %id, "Room deleted");
        }
    }

    pub fn active_rooms(&self) -> usize {
        self.rooms.len()
    }

    /// Tear down finished rooms after a grace period
    ///
    /// Each report gets its own delayed task so a burst of finishes
    /// does not serialize the waits. Clients keep receiving frames
    /// during the grace window.
    pub async fn run_reaper(self: Arc<Self>, mut end_rx: mpsc::UnboundedReceiver<Uuid>) {
        while let Some(room_id) = end_rx.recv().await {
            info!(room_id = %room_id, "Battle finished, scheduling teardown");
            let manager = self.clone();
            tokio::spawn(async move {
                tokio::time::sleep(TEARDOWN_GRACE).await;
                manager.delete_room(&room_id);
            });
        }
    }
}
