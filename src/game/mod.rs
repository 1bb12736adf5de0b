//! Game simulation modules

pub mod arena;
pub mod battle;
pub mod grid;
pub mod snapshot;
pub mod units;

pub use battle::{Battle, EndOfGame, SpawnError};
pub use grid::Position;
pub use units::{Team, UnitCatalog};
