//! Matchmaking service: pairs waiting players into rooms

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::game::units::Team;
use crate::rooms::RoomManager;
use crate::ws::protocol::MatchedMessage;

use super::queue::{MatchQueue, WaitingPlayer};

/// An authenticated connection admitted to the pairing queue
pub type PlayerConn = WaitingPlayer<WebSocket>;

/// Front door of the pairing loop
///
/// Handlers submit authenticated connections here; the loop itself
/// owns the queue, so no lock is shared with the handlers.
#[derive(Clone)]
pub struct MatchmakingService {
    arrivals_tx: mpsc::Sender<PlayerConn>,
    waiting: Arc<AtomicUsize>,
}

impl MatchmakingService {
    pub fn new() -> (Self, mpsc::Receiver<PlayerConn>) {
        let (arrivals_tx, arrivals_rx) = mpsc::channel(100);
        let service = Self {
            arrivals_tx,
            waiting: Arc::new(AtomicUsize::new(0)),
        };
        (service, arrivals_rx)
    }

    /// Hand an authenticated connection to the pairing loop
    ///
    /// The connection comes back as the error if the loop has shut
    /// down, so the caller can close it.
    pub async fn submit(&self, player: PlayerConn) -> Result<(), PlayerConn> {
        self.arrivals_tx.send(player).await.map_err(|err| err.0)
    }

    /// Players currently waiting for an opponent
    pub fn queue_size(&self) -> usize {
        self.waiting.load(Ordering::Relaxed)
    }

    /// Run the pairing loop
    ///
    /// The earlier arrival of a pair plays red, the later one blue.
    /// Matchmaking sockets are closed once the room assignment has
    /// been delivered; from then on the clients talk to the room.
    pub async fn run(self, mut arrivals: mpsc::Receiver<PlayerConn>, rooms: Arc<RoomManager>) {
        let mut queue: MatchQueue<WebSocket> = MatchQueue::new();

        while let Some(player) = arrivals.recv().await {
            info!(
                user_id = %player.user_id,
                display_name = %player.display_name,
                queue_size = queue.len() + 1,
                "Player queued for matchmaking"
            );
            queue.push(player);
            self.pair_ready(&mut queue, &rooms).await;
            self.waiting.store(queue.len(), Ordering::Relaxed);
        }
    }

    /// Pair players while the queue allows it
    ///
    /// A room is created per pair before delivery. If the assignment
    /// cannot be delivered to one side, that side is dropped from the
    /// queue, the fresh room is torn down and pairing is retried; the
    /// other side keeps its place.
    async fn pair_ready(&self, queue: &mut MatchQueue<WebSocket>, rooms: &RoomManager) {
        while let Some(index) = queue.eligible_pair() {
            let handle = rooms.create_room();
            let room_id = handle.room_id;

            let red = MatchedMessage::new(room_id, Team::Red);
            let Some(first) = queue.get_mut(index) else {
                break;
            };
            if let Err(err) = deliver(first, &red).await {
                warn!(user_id = %first.user_id, error = %err, "Dropping unreachable player");
                if let Some(player) = queue.remove(index) {
                    close(player.conn).await;
                }
                rooms.delete_room(&room_id);
                continue;
            }

            let blue = MatchedMessage::new(room_id, Team::Blue);
            let Some(second) = queue.get_mut(index + 1) else {
                break;
            };
            if let Err(err) = deliver(second, &blue).await {
                warn!(user_id = %second.user_id, error = %err, "Dropping unreachable player");
                if let Some(player) = queue.remove(index + 1) {
                    close(player.conn).await;
                }
                rooms.delete_room(&room_id);
                continue;
            }

            let Some((first, second)) = queue.take_pair(index) else {
                break;
            };
            info!(
                room_id = %room_id,
                red = %first.user_id,
                blue = %second.user_id,
                "Players matched"
            );
            close(first.conn).await;
            close(second.conn).await;
        }
    }
}

/// Send the room assignment over a waiting socket
async fn deliver(player: &mut PlayerConn, msg: &MatchedMessage) -> Result<(), String> {
    let json = serde_json::to_string(msg).map_err(|e| e.to_string())?;
    player
        .conn
        .send(Message::Text(json))
        .await
        .map_err(|e| e.to_string())
}

/// Close a matchmaking socket once its job is done
async fn close(mut conn: WebSocket) {
    let _ = conn.send(Message::Close(None)).await;
}
