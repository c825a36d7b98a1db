//! Grid primitives: positions, directions and the pure helpers the
//! simulation step is built from.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A cell on the grid. `(0, 0)` is the top-left corner; `y` grows downward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// The neighbouring cell one step in `dir`. May lie off-grid.
    pub fn step(self, dir: Direction) -> Self {
        let (dx, dy) = dir.unit_vector();
        Self::new(self.x + dx, self.y + dy)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// A heading on the grid.
///
/// Serialized in upper case (`"UP"`, `"LEFT"`, ...) to match the wire
/// format browser clients already speak.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] = [Self::Up, Self::Down, Self::Left, Self::Right];

    /// The reverse heading. An involution with no fixed points.
    pub fn opposite(self) -> Self {
        match self {
            Self::Up => Self::Down,
            Self::Down => Self::Up,
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }

    /// `true` if `other` is the exact reverse of `self`.
    pub fn is_opposite(self, other: Direction) -> bool {
        self.opposite() == other
    }

    /// `(dx, dy)` for one step.
    pub fn unit_vector(self) -> (i32, i32) {
        match self {
            Self::Up => (0, -1),
            Self::Down => (0, 1),
            Self::Left => (-1, 0),
            Self::Right => (1, 0),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Up => "UP",
            Self::Down => "DOWN",
            Self::Left => "LEFT",
            Self::Right => "RIGHT",
        };
        f.write_str(name)
    }
}

/// `true` if `pos` lies inside `[0, width) × [0, height)`.
pub fn in_bounds(pos: Position, width: u32, height: u32) -> bool {
    pos.x >= 0 && pos.y >= 0 && (pos.x as i64) < width as i64 && (pos.y as i64) < height as i64
}

/// Where the head lands after one step in `dir`.
pub fn next_head(head: Position, dir: Direction) -> Position {
    head.step(dir)
}
