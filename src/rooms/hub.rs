//! Room hub: authoritative tick loop and frame fan-out

use tokio::sync::{broadcast, mpsc, watch};
use tokio::time::interval;
use tracing::{info, warn};
use uuid::Uuid;

use crate::game::battle::Battle;
use crate::game::grid::Position;
use crate::game::snapshot::build_frame;
use crate::game::units::Team;
use crate::util::time::TICK_INTERVAL;
use crate::ws::protocol::{BroadcastFrame, SpawnCommand};

/// Handle to a running room hub
///
/// Cheap to clone; every clone talks to the same loop.
#[derive(Clone)]
pub struct HubHandle {
    pub room_id: Uuid,
    pub spawn_tx: mpsc::Sender<SpawnCommand>,
    frame_tx: broadcast::Sender<BroadcastFrame>,
    stop_tx: watch::Sender<bool>,
}

impl HubHandle {
    /// Subscribe to the per-tick frame broadcast
    pub fn subscribe(&self) -> broadcast::Receiver<BroadcastFrame> {
        self.frame_tx.subscribe()
    }

    /// Ask the hub loop to shut down
    pub fn stop(&self) {
        let _ = self.stop_tx.send(true);
    }
}

/// The authoritative room loop: owns the battle and drives the fixed tick
pub struct Hub {
    room_id: Uuid,
    battle: Battle,
    spawn_rx: mpsc::Receiver<SpawnCommand>,
    frame_tx: broadcast::Sender<BroadcastFrame>,
    stop_rx: watch::Receiver<bool>,
}

impl Hub {
    pub fn new(room_id: Uuid, battle: Battle) -> (Self, HubHandle) {
        let (spawn_tx, spawn_rx) = mpsc::channel(256);
        let (frame_tx, _) = broadcast::channel(64);
        let (stop_tx, stop_rx) = watch::channel(false);

        let handle = HubHandle {
            room_id,
            spawn_tx,
            frame_tx: frame_tx.clone(),
            stop_tx,
        };

        let hub = Self {
            room_id,
            battle,
            spawn_rx,
            frame_tx,
            stop_rx,
        };

        (hub, handle)
    }

    /// Run the tick loop until stopped
    ///
    /// Each tick drains queued spawn requests, advances the battle one
    /// step and broadcasts the resulting frame. The loop keeps ticking
    /// after the battle has ended so late frames still reach clients;
    /// the room manager stops it when the room is torn down.
    pub async fn run(mut self) {
        info!(room_id = %self.room_id, "Room loop started");

        let mut tick_interval = interval(TICK_INTERVAL);
        tick_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = tick_interval.tick() => {}
                _ = self.stop_rx.changed() => break,
            }

            self.process_spawns();
            self.battle.tick();

            let _ = self.frame_tx.send(build_frame(&self.battle));
        }

        info!(room_id = %self.room_id, "Room loop stopped");
    }

    /// Drain spawn requests queued since the previous tick
    ///
    /// Rejected spawns are logged and dropped; the client sees the
    /// result through the next frame either way.
    fn process_spawns(&mut self) {
        while let Ok(cmd) = self.spawn_rx.try_recv() {
            let team = Team::parse(&cmd.team);
            let position = Position::cell(cmd.x, cmd.y);
            if let Err(err) = self.battle.spawn_troop(team, position, &cmd.troop_type) {
                warn!(
                    room_id = %self.room_id,
                    troop_type = %cmd.troop_type,
                    error = %err,
                    "Spawn rejected"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use tokio::time::timeout;

    use super::*;
    use crate::game::units::UnitCatalog;

    fn new_hub() -> (Hub, HubHandle) {
        let battle = Battle::new(32, 32, Arc::new(UnitCatalog::standard()), None);
        Hub::new(Uuid::new_v4(), battle)
    }

    #[tokio::test(start_paused = true)]
    async fn broadcasts_a_frame_every_tick() {
        let (hub, handle) = new_hub();
        let mut frames = handle.subscribe();
        tokio::spawn(hub.run());

        let first = timeout(Duration::from_secs(5), frames.recv())
            .await
            .unwrap()
            .unwrap();
        let second = timeout(Duration::from_secs(5), frames.recv())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(second.tick, first.tick + 1);
        assert_eq!(first.troops.len(), 6);

        handle.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn spawn_commands_show_up_in_frames() {
        let (hub, handle) = new_hub();
        let mut frames = handle.subscribe();
        tokio::spawn(hub.run());

        handle
            .spawn_tx
            .send(SpawnCommand {
                troop_type: "Knight".to_string(),
                team: "red".to_string(),
                x: 4,
                y: 10,
            })
            .await
            .unwrap();

        let mut saw_knight = false;
        for _ in 0..5 {
            let frame = timeout(Duration::from_secs(5), frames.recv())
                .await
                .unwrap()
                .unwrap();
            if frame.troops.iter().any(|t| t.kind == "Knight") {
                saw_knight = true;
                break;
            }
        }
        assert!(saw_knight);

        handle.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn stop_terminates_the_loop() {
        let (hub, handle) = new_hub();
        let task = tokio::spawn(hub.run());

        handle.stop();
        timeout(Duration::from_secs(5), task).await.unwrap().unwrap();

        // Once the loop and every handle are gone the channel closes
        let mut frames = handle.subscribe();
        drop(handle);
        assert!(matches!(
            frames.recv().await,
            Err(broadcast::error::RecvError::Closed)
        ));
    }
}
