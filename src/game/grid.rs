//! Grid geometry primitives

use serde::{Deserialize, Serialize};

/// A position on the battlefield
///
/// Positions are continuous, but the simulation snaps units to whole
/// tiles after every movement phase, so in practice both coordinates
/// hold integral values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Position at the center of a grid cell
    pub fn cell(x: i32, y: i32) -> Self {
        Self {
            x: f64::from(x),
            y: f64::from(y),
        }
    }

    /// Nearest grid cell (rounds half away from zero)
    pub fn rounded(&self) -> (i32, i32) {
        (self.x.round() as i32, self.y.round() as i32)
    }
}

/// Euclidean distance between two positions
pub fn distance(a: Position, b: Position) -> f64 {
    (b.x - a.x).hypot(b.y - a.y)
}
