use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One of the four traversal directions a location can offer.
///
/// The declaration order doubles as the hit-test priority: when two zones
/// overlap, the direction declared first wins.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Front,
    Behind,
    Left,
    Right,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown direction '{0}' (expected front, behind, left or right)")]
pub struct UnknownDirection(pub String);

impl Direction {
    /// All directions in priority order.
    pub const ALL: [Direction; 4] = [
        Direction::Front,
        Direction::Behind,
        Direction::Left,
        Direction::Right,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Direction::Front => "front",
            Direction::Behind => "behind",
            Direction::Left => "left",
            Direction::Right => "right",
        }
    }

    /// Unit offset in world space (+Y up, viewer starts on -Z looking at +Z).
    ///
    /// `Left` points along +X because the default camera faces +Z, which puts
    /// +X on the left side of the screen.
    pub fn offset(self) -> [f32; 3] {
        match self {
            Direction::Front => [0.0, 0.0, 1.0],
            Direction::Behind => [0.0, 0.0, -1.0],
            Direction::Left => [1.0, 0.0, 0.0],
            Direction::Right => [-1.0, 0.0, 0.0],
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Direction {
    type Err = UnknownDirection;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "front" | "forward" => Ok(Direction::Front),
            "behind" | "back" => Ok(Direction::Behind),
            "left" => Ok(Direction::Left),
            "right" => Ok(Direction::Right),
            _ => Err(UnknownDirection(value.to_string())),
        }
    }
}
