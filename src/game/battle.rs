//! Battle state and the authoritative tick sequence

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::info;
use uuid::Uuid;

use crate::util::time::MAX_TICKS;

use super::arena::Arena;
use super::grid::Position;
use super::units::{
    Team, Unit, UnitCatalog, UnitId, UnitIndex, UnitRole, CASTLE_TYPE, KING_CASTLE_TYPE,
};

/// Towers per team, including the king tower
pub const TOWERS_PER_TEAM: usize = 3;

/// Slot holding the king tower (the middle one)
pub const KING_SLOT: usize = TOWERS_PER_TEAM / 2;

/// Why a spawn request was rejected
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SpawnError {
    #[error("battle is over")]
    BattleEnded,

    #[error("position out of arena bounds")]
    OutOfBounds,

    #[error("cannot spawn troop in enemy territory")]
    WrongTerritory,

    #[error("failed to create troop of type {0}")]
    UnknownType(String),
}

/// Notifies the room manager that this battle has finished
///
/// Sent at most once, when the battle transitions out of its running
/// state; the manager owns the grace delay and the actual teardown.
#[derive(Debug, Clone)]
pub struct EndOfGame {
    room_id: Uuid,
    tx: mpsc::UnboundedSender<Uuid>,
}

impl EndOfGame {
    pub fn new(room_id: Uuid, tx: mpsc::UnboundedSender<Uuid>) -> Self {
        Self { room_id, tx }
    }

    fn notify(&self) {
        // The manager may already be shutting down; nothing to do then
        let _ = self.tx.send(self.room_id);
    }
}

/// Per-team tower survival flags, indexed by slot
#[derive(Debug, Clone, Default)]
struct TowerStatus {
    flags: [[bool; TOWERS_PER_TEAM]; 2],
}

impl TowerStatus {
    fn set(&mut self, team: Team, slot: usize, alive: bool) {
        if slot < TOWERS_PER_TEAM {
            self.flags[team.index()][slot] = alive;
        }
    }

    fn clear_team(&mut self, team: Team) {
        self.flags[team.index()] = [false; TOWERS_PER_TEAM];
    }

    fn alive(&self, team: Team) -> [bool; TOWERS_PER_TEAM] {
        self.flags[team.index()]
    }
}

/// One battle: the arena, its units, and the tick counter
///
/// Single-owner state; the room loop drives it and nothing else touches
/// it. Every mutation happens inside [`Battle::tick`] or
/// [`Battle::spawn_troop`].
pub struct Battle {
    tick_count: u64,
    next_id: UnitId,
    arena: Arena,
    units: UnitIndex,
    tower_status: TowerStatus,
    enabled: bool,
    catalog: Arc<UnitCatalog>,
    end_signal: Option<EndOfGame>,
}

impl Battle {
    /// Create a battle with both teams' towers already placed
    pub fn new(
        width: i32,
        height: i32,
        catalog: Arc<UnitCatalog>,
        end_signal: Option<EndOfGame>,
    ) -> Self {
        let mut battle = Self {
            tick_count: 0,
            next_id: 1,
            arena: Arena::new(width, height),
            units: UnitIndex::new(),
            tower_status: TowerStatus::default(),
            enabled: true,
            catalog,
            end_signal,
        };
        battle.place_team_towers(Team::Red);
        battle.place_team_towers(Team::Blue);
        battle
    }

    /// Lay out one team's tower line: three evenly spaced towers, with
    /// the king tower in the middle slot set back from the front
    fn place_team_towers(&mut self, team: Team) {
        let (front_y, king_offset) = match team {
            Team::Red => (6, -2),
            Team::Blue => (self.arena.height() - 7, 2),
        };

        for slot in 0..TOWERS_PER_TEAM {
            let x = (self.arena.width() / 4) * (slot as i32 + 1);
            let mut y = front_y;

            let is_king = slot == KING_SLOT;
            if is_king {
                y += king_offset;
            }

            let (kind, stats, role) = if is_king {
                (
                    KING_CASTLE_TYPE,
                    self.catalog.king_castle(),
                    UnitRole::KingCastle { slot },
                )
            } else {
                (CASTLE_TYPE, self.catalog.castle(), UnitRole::Castle { slot })
            };

            let id = self.allocate_id();
            let unit = Unit::new(id, kind, team, Position::cell(x, y), stats, role);

            self.tower_status.set(team, slot, true);
            self.arena.add_unit(x, y, id);
            self.units.insert(id, unit);
        }
    }

    fn allocate_id(&mut self) -> UnitId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Spawn a troop for `team` at `pos`
    ///
    /// Validation order: battle still running, position inside the
    /// arena, position inside the team's own half, then archetype
    /// lookup. A failed spawn leaves the battle untouched.
    pub fn spawn_troop(
        &mut self,
        team: Team,
        pos: Position,
        troop_type: &str,
    ) -> Result<UnitId, SpawnError> {
        if !self.enabled {
            return Err(SpawnError::BattleEnded);
        }
        if !self.arena.in_bounds(pos) {
            return Err(SpawnError::OutOfBounds);
        }
        if !self.in_own_territory(team, pos) {
            return Err(SpawnError::WrongTerritory);
        }
        let Some((kind, stats)) = self.catalog.lookup(troop_type) else {
            return Err(SpawnError::UnknownType(troop_type.to_string()));
        };

        let id = self.allocate_id();
        let unit = Unit::new(id, kind, team, pos, stats, UnitRole::Troop);

        let (x, y) = pos.rounded();
        self.arena.add_unit(x, y, id);
        self.units.insert(id, unit);
        Ok(id)
    }

    /// Red owns the top half of the arena, blue the bottom half
    fn in_own_territory(&self, team: Team, pos: Position) -> bool {
        let midline = f64::from(self.arena.height()) / 2.0;
        match team {
            Team::Red => pos.y < midline,
            Team::Blue => pos.y >= midline,
        }
    }

    /// Advance the simulation by one tick
    ///
    /// The counter always moves, even after the battle has ended; the
    /// simulation phases only run while the battle is live. Phase order
    /// is fixed: decisions are computed against a frozen view, then
    /// movement, then attacks, then removal of the dead.
    pub fn tick(&mut self) {
        self.tick_count += 1;
        if !self.enabled {
            return;
        }

        let actions = self.calculate_actions();
        self.apply_movement(&actions);
        self.apply_attacks(&actions);
        self.remove_dead();

        if self.tick_count >= MAX_TICKS {
            self.end_game();
        }
    }

    /// Phase 1: every unit decides against the same pre-tick state
    fn calculate_actions(&self) -> Vec<super::units::Action> {
        self.units
            .values()
            .map(|unit| unit.decide(&self.arena, &self.units))
            .collect()
    }

    /// Phase 2: relocate units to their requested cells
    fn apply_movement(&mut self, actions: &[super::units::Action]) {
        for action in actions {
            let Some(unit) = self.units.get(&action.unit) else {
                continue;
            };
            let (old_x, old_y) = unit.position.rounded();
            let (new_x, new_y) = action.next_position.rounded();

            // Requests leading off the grid are dropped
            if !self.arena.cell_in_bounds(new_x, new_y) {
                continue;
            }

            self.arena.remove_unit(old_x, old_y, action.unit);
            self.arena.add_unit(new_x, new_y, action.unit);
            if let Some(unit) = self.units.get_mut(&action.unit) {
                unit.position = Position::cell(new_x, new_y);
            }
        }
    }

    /// Phase 3: deal all declared damage
    ///
    /// Damage lands even if the target was hit by someone else first
    /// this tick; removal is deferred to the cleanup phase.
    fn apply_attacks(&mut self, actions: &[super::units::Action]) {
        for action in actions {
            let Some(target) = action.target else {
                continue;
            };
            if let Some(unit) = self.units.get_mut(&target) {
                unit.health -= action.damage;
            }
        }
    }

    /// Phase 4: drop every unit at zero or less health, updating tiles
    /// and tower flags
    fn remove_dead(&mut self) {
        let dead: Vec<UnitId> = self
            .units
            .values()
            .filter(|unit| unit.health <= 0)
            .map(|unit| unit.id)
            .collect();

        for id in dead {
            let Some(unit) = self.units.remove(&id) else {
                continue;
            };
            let (x, y) = unit.position.rounded();
            self.arena.remove_unit(x, y, id);

            match unit.role {
                UnitRole::Troop => {}
                UnitRole::Castle { slot } => {
                    self.tower_status.set(unit.team, slot, false);
                }
                UnitRole::KingCastle { .. } => {
                    info!(team = unit.team.as_str(), "king tower destroyed");
                    self.tower_status.clear_team(unit.team);
                    self.end_game();
                }
            }
        }
    }

    /// Stop the simulation and report the result once
    fn end_game(&mut self) {
        if !self.enabled {
            return;
        }
        self.enabled = false;
        if let Some(signal) = &self.end_signal {
            signal.notify();
        }
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn arena(&self) -> &Arena {
        &self.arena
    }

    pub fn unit(&self, id: UnitId) -> Option<&Unit> {
        self.units.get(&id)
    }

    /// Live units in id order
    pub fn units(&self) -> impl Iterator<Item = &Unit> {
        self.units.values()
    }

    /// Survival flags for one team's tower slots
    pub fn towers_alive(&self, team: Team) -> [bool; TOWERS_PER_TEAM] {
        self.tower_status.alive(team)
    }
}
