//! WebSocket protocol message definitions
//! These are the wire types for client-server communication

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::game::grid::Position;
use crate::game::units::Team;

/// Spawn request sent by a client on a room socket
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpawnCommand {
    /// Archetype name, matched case-sensitively against the catalog
    #[serde(rename = "troopType")]
    pub troop_type: String,
    /// "red" or "blue"; anything else counts as red
    pub team: String,
    pub x: i32,
    pub y: i32,
}

/// One unit as it appears in a broadcast frame
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TroopView {
    pub id: u32,
    #[serde(rename = "type")]
    pub kind: String,
    pub health: i32,
    /// 0 = red, 1 = blue
    pub team: Team,
    pub position: Position,
    pub damage: i32,
    pub speed: f64,
    pub range: i32,
}

/// Full battle state pushed to every room subscriber each tick
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BroadcastFrame {
    pub tick: u64,
    pub troops: Vec<TroopView>,
}

/// First message a client must send on the matchmaking socket
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthMessage {
    /// Always "auth"
    #[serde(rename = "type")]
    pub kind: String,
    /// JWT issued at login
    pub token: String,
}

/// Pairing result delivered over the matchmaking socket
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchedMessage {
    /// Always "matched"
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(rename = "roomID")]
    pub room_id: String,
    /// Side the recipient plays, "red" or "blue"
    pub team: String,
}

impl MatchedMessage {
    pub fn new(room_id: Uuid, team: Team) -> Self {
        Self {
            kind: "matched".to_string(),
            room_id: room_id.to_string(),
            team: team.as_str().to_string(),
        }
    }
}
