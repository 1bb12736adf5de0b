//! Room lifecycle integration tests
//!
//! Drive rooms end to end through the public surface: create rooms,
//! queue spawn commands, watch the broadcast frames and let the reaper
//! collect finished battles. Time is virtual throughout.

use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time::timeout;
use tokio_test::assert_ok;

use troop_battle_server::game::units::Team;
use troop_battle_server::rooms::RoomManager;
use troop_battle_server::ws::protocol::{BroadcastFrame, SpawnCommand};

const RECV_BUDGET: Duration = Duration::from_secs(60);

async fn next_frame(frames: &mut broadcast::Receiver<BroadcastFrame>) -> BroadcastFrame {
    loop {
        match timeout(RECV_BUDGET, frames.recv()).await {
            Ok(Ok(frame)) => return frame,
            Ok(Err(broadcast::error::RecvError::Lagged(_))) => continue,
            Ok(Err(broadcast::error::RecvError::Closed)) => panic!("room stopped broadcasting"),
            Err(_) => panic!("no frame within {RECV_BUDGET:?}"),
        }
    }
}

fn knight_spawn(team: &str, x: i32, y: i32) -> SpawnCommand {
    SpawnCommand {
        troop_type: "Knight".to_string(),
        team: team.to_string(),
        x,
        y,
    }
}

#[tokio::test(start_paused = true)]
async fn rooms_tick_independently() {
    let (manager, _end_rx) = RoomManager::new(32, 32);

    let room_a = manager.create_room();
    let room_b = manager.create_room();
    assert_eq!(manager.active_rooms(), 2);
    assert_ne!(room_a.room_id, room_b.room_id);

    let mut frames_a = room_a.subscribe();
    let mut frames_b = room_b.subscribe();

    assert_ok!(room_a.spawn_tx.send(knight_spawn("red", 4, 10)).await);

    // Room A picks up the spawn on one of its next ticks
    let mut saw_knight = false;
    for _ in 0..5 {
        let frame = next_frame(&mut frames_a).await;
        if frame.troops.iter().any(|t| t.kind == "Knight") {
            saw_knight = true;
            break;
        }
    }
    assert!(saw_knight);

    // Room B only ever has its six towers
    let frame_b = next_frame(&mut frames_b).await;
    assert_eq!(frame_b.troops.len(), 6);
    assert!(frame_b.troops.iter().all(|t| t.kind != "Knight"));

    room_a.stop();
    room_b.stop();
}

#[tokio::test(start_paused = true)]
async fn spawned_troops_carry_catalog_stats() {
    let (manager, _end_rx) = RoomManager::new(32, 32);
    let room = manager.create_room();
    let mut frames = room.subscribe();

    assert_ok!(room.spawn_tx.send(knight_spawn("blue", 20, 20)).await);

    let knight = loop {
        let frame = next_frame(&mut frames).await;
        if let Some(view) = frame.troops.iter().find(|t| t.kind == "Knight") {
            break view.clone();
        }
        assert!(frame.tick < 50, "spawn never showed up in a frame");
    };

    assert_eq!(knight.team, Team::Blue);
    assert_eq!(knight.health, 250);
    assert_eq!(knight.damage, 50);
    assert_eq!(knight.range, 1);
    assert!((knight.speed - 1.0).abs() < f64::EPSILON);

    room.stop();
}

#[tokio::test(start_paused = true)]
async fn king_death_tears_the_room_down_after_grace() {
    let (manager, end_rx) = RoomManager::new(32, 32);
    tokio::spawn(manager.clone().run_reaper(end_rx));

    let room = manager.create_room();
    let room_id = room.room_id;
    let mut frames = room.subscribe();

    // A blue knight marching on the red king from midfield
    assert_ok!(room.spawn_tx.send(knight_spawn("blue", 16, 16)).await);
    drop(room);

    let mut last_tick = 0;
    let king_dead_at = loop {
        let frame = next_frame(&mut frames).await;
        assert!(frame.tick > last_tick, "ticks must be monotonic");
        last_tick = frame.tick;

        let red_king_alive = frame
            .troops
            .iter()
            .any(|t| t.kind == "KingTower" && t.team == Team::Red);
        if !red_king_alive {
            break frame.tick;
        }
        assert!(
            frame.tick < 500,
            "the knight should reach the king within a few dozen ticks"
        );
    };

    // Frames keep flowing through the teardown grace window
    let frame = next_frame(&mut frames).await;
    assert!(frame.tick > king_dead_at);
    assert!(frame.troops.iter().any(|t| t.kind == "Knight"));

    // After the grace period the room is gone and the channel closes
    assert_ok!(
        timeout(RECV_BUDGET, async {
            loop {
                match frames.recv().await {
                    Ok(_) => continue,
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
        .await
    );

    assert_eq!(manager.active_rooms(), 0);
    assert!(manager.get_room(&room_id).is_none());
}
