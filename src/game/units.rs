//! Unit archetypes, stats, and per-tick decision logic

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use super::arena::Arena;
use super::grid::{distance, Position};

/// One of the two sides of a battle
///
/// Serialized as `0` (red) or `1` (blue) in broadcast frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub enum Team {
    Red,
    Blue,
}

impl Team {
    /// Parse the client-facing team name; unknown values fall back to red
    pub fn parse(name: &str) -> Self {
        match name {
            "blue" => Team::Blue,
            _ => Team::Red,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Team::Red => "red",
            Team::Blue => "blue",
        }
    }

    pub fn opponent(&self) -> Self {
        match self {
            Team::Red => Team::Blue,
            Team::Blue => Team::Red,
        }
    }

    /// Index into per-team arrays
    pub fn index(&self) -> usize {
        *self as usize
    }
}

impl From<u8> for Team {
    fn from(value: u8) -> Self {
        match value {
            1 => Team::Blue,
            _ => Team::Red,
        }
    }
}

impl From<Team> for u8 {
    fn from(team: Team) -> Self {
        team as u8
    }
}

/// Stable handle for a unit within one battle
pub type UnitId = u32;

/// All live units of a battle, keyed by id
///
/// A BTreeMap so every per-tick iteration walks units in id order,
/// keeping the simulation deterministic.
pub type UnitIndex = BTreeMap<UnitId, Unit>;

/// How a unit behaves each tick, plus its tower slot when stationary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitRole {
    /// Mobile troop spawned by a player
    Troop,
    /// Regular tower occupying one of the per-team slots
    Castle { slot: usize },
    /// The tower whose destruction ends the battle
    KingCastle { slot: usize },
}

impl UnitRole {
    pub fn is_tower(&self) -> bool {
        matches!(self, UnitRole::Castle { .. } | UnitRole::KingCastle { .. })
    }
}

/// Static combat stats for one archetype
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnitStats {
    /// Hit points at spawn
    pub health: i32,
    /// Damage dealt per attack tick
    pub damage: i32,
    /// Cosmetic movement speed reported to clients
    pub speed: f64,
    /// Attack range in tiles (Euclidean)
    pub range: i32,
}

impl UnitStats {
    pub const fn new(health: i32, damage: i32, speed: f64, range: i32) -> Self {
        Self {
            health,
            damage,
            speed,
            range,
        }
    }
}

/// Type tag for regular towers
pub const CASTLE_TYPE: &str = "Castle";
/// Type tag for king towers
pub const KING_CASTLE_TYPE: &str = "KingTower";

/// Spawnable archetypes and their stats
const TROOP_TYPES: [(&str, UnitStats); 17] = [
    ("SwordsmanOne", UnitStats::new(16, 4, 1.0, 1)),
    ("SwordsmanTwo", UnitStats::new(22, 5, 1.0, 1)),
    ("SwordsmanThree", UnitStats::new(28, 5, 1.0, 1)),
    ("SwordsmanFour", UnitStats::new(34, 6, 1.0, 1)),
    ("ArcherOne", UnitStats::new(20, 4, 1.2, 7)),
    ("ArcherTwo", UnitStats::new(12, 4, 1.0, 1)),
    ("ArcherThree", UnitStats::new(24, 5, 1.2, 7)),
    ("ArcherFour", UnitStats::new(28, 5, 1.2, 8)),
    ("SpearmanOne", UnitStats::new(14, 5, 1.0, 1)),
    ("SpearmanTwo", UnitStats::new(24, 5, 1.0, 2)),
    ("SpearmanThree", UnitStats::new(32, 6, 1.0, 2)),
    ("SpearmanFour", UnitStats::new(40, 6, 1.0, 2)),
    ("CavalryOne", UnitStats::new(28, 10, 1.5, 1)),
    ("CavalryTwo", UnitStats::new(16, 5, 1.0, 1)),
    ("CavalryThree", UnitStats::new(22, 6, 1.5, 1)),
    ("CavalryFour", UnitStats::new(20, 6, 1.0, 1)),
    ("Knight", UnitStats::new(250, 50, 1.0, 1)),
];

/// Immutable archetype table, built once at startup and shared by all battles
#[derive(Debug)]
pub struct UnitCatalog {
    troops: HashMap<&'static str, UnitStats>,
    castle: UnitStats,
    king_castle: UnitStats,
}

impl UnitCatalog {
    /// The standard catalog: all spawnable troop types plus tower stats
    pub fn standard() -> Self {
        Self {
            troops: HashMap::from(TROOP_TYPES),
            castle: UnitStats::new(200, 1, 0.0, 10),
            king_castle: UnitStats::new(300, 1, 0.0, 10),
        }
    }

    /// Look up an archetype by its exact name
    ///
    /// Returns the canonical name so units can share the static string
    /// instead of owning a copy.
    pub fn lookup(&self, name: &str) -> Option<(&'static str, UnitStats)> {
        self.troops.get_key_value(name).map(|(k, v)| (*k, *v))
    }

    pub fn castle(&self) -> UnitStats {
        self.castle
    }

    pub fn king_castle(&self) -> UnitStats {
        self.king_castle
    }

    /// All spawnable type names, sorted for stable output
    pub fn spawnable_types(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self.troops.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

impl Default for UnitCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

/// A live unit in one battle
#[derive(Debug, Clone)]
pub struct Unit {
    pub id: UnitId,
    pub kind: &'static str,
    pub team: Team,
    pub position: Position,
    pub health: i32,
    pub damage: i32,
    pub speed: f64,
    pub range: i32,
    pub role: UnitRole,
}

impl Unit {
    pub fn new(
        id: UnitId,
        kind: &'static str,
        team: Team,
        position: Position,
        stats: UnitStats,
        role: UnitRole,
    ) -> Self {
        Self {
            id,
            kind,
            team,
            position,
            health: stats.health,
            damage: stats.damage,
            speed: stats.speed,
            range: stats.range,
            role,
        }
    }

    /// Compute this unit's intent for the current tick
    ///
    /// Reads the arena and the unit index but never mutates them; the
    /// battle applies all actions in later phases.
    pub fn decide(&self, arena: &Arena, units: &UnitIndex) -> Action {
        if self.role.is_tower() {
            decide_tower(self, arena, units)
        } else {
            decide_mobile(self, arena, units)
        }
    }
}

/// A unit's intent for one tick
#[derive(Debug, Clone)]
pub struct Action {
    /// The acting unit
    pub unit: UnitId,
    /// Where the unit wants to stand after the movement phase
    pub next_position: Position,
    /// Who to attack, if anyone
    pub target: Option<UnitId>,
    /// Damage dealt to the target
    pub damage: i32,
}

impl Action {
    /// Stand still and do nothing
    fn hold(unit: &Unit) -> Self {
        Self {
            unit: unit.id,
            next_position: unit.position,
            target: None,
            damage: 0,
        }
    }
}

/// Mobile troops chase the nearest enemy and attack once in range
fn decide_mobile(unit: &Unit, arena: &Arena, units: &UnitIndex) -> Action {
    let mut action = Action::hold(unit);

    let Some((enemy, path)) = arena.find_nearest_enemy(unit, units) else {
        return action;
    };

    // Same tile, or close enough to hit
    if path.len() == 1 || distance(unit.position, enemy.position) <= f64::from(unit.range) {
        action.target = Some(enemy.id);
        action.damage = unit.damage;
        return action;
    }

    if let Some(step) = path.get(1) {
        action.next_position = *step;
    }
    action
}

/// Towers never move; they attack the nearest enemy when it is in range
fn decide_tower(unit: &Unit, arena: &Arena, units: &UnitIndex) -> Action {
    let mut action = Action::hold(unit);

    let Some((enemy, _path)) = arena.find_nearest_enemy(unit, units) else {
        return action;
    };

    if distance(unit.position, enemy.position) <= f64::from(unit.range) {
        action.target = Some(enemy.id);
        action.damage = unit.damage;
    }
    action
}
