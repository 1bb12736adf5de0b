//! Broadcast frame construction

use crate::ws::protocol::{BroadcastFrame, TroopView};

use super::battle::Battle;

/// Builds the per-tick broadcast frame from the current battle state.
///
/// Every unit still in the index is included, towers and troops alike.
pub fn build_frame(battle: &Battle) -> BroadcastFrame {
    let troops: Vec<TroopView> = battle
        .units()
        .map(|unit| TroopView {
            id: unit.id,
            kind: unit.kind.to_string(),
            health: unit.health,
            team: unit.team,
            position: unit.position,
            damage: unit.damage,
            speed: unit.speed,
            range: unit.range,
        })
        .collect();

    BroadcastFrame {
        tick: battle.tick_count(),
        troops,
    }
}
