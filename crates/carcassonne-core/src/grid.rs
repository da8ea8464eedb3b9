//! Square grid coordinate system.
//!
//! This module provides the foundational coordinate types for the tile grid:
//! - `Position`: Identifies a cell on the unbounded board
//! - `Direction`: One of the four sides of a cell (and of the tile on it)
//! - `Orientation`: The clockwise rotation of a tile relative to its canonical layout
//!
//! The grid uses screen-style coordinates: `x` grows to the right and `y` grows
//! downward, so the `Top` neighbor of a cell is at `y - 1`.

use serde::{Deserialize, Serialize};

/// One of the four sides of a square cell, in clockwise order from the top
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Direction {
    Top,
    Right,
    Bottom,
    Left,
}

impl Direction {
    /// All directions in clockwise order starting from Top.
    /// The index of a direction in this array is its edge slot.
    pub const ALL: [Direction; 4] = [
        Direction::Top,
        Direction::Right,
        Direction::Bottom,
        Direction::Left,
    ];

    /// Edge slot of this direction (top=0, right=1, bottom=2, left=3)
    pub const fn index(self) -> usize {
        match self {
            Direction::Top => 0,
            Direction::Right => 1,
            Direction::Bottom => 2,
            Direction::Left => 3,
        }
    }

    /// Direction for an edge slot, wrapping around
    pub const fn from_index(index: usize) -> Self {
        Self::ALL[index % 4]
    }

    /// The facing side of the neighboring cell
    pub const fn opposite(self) -> Self {
        match self {
            Direction::Top => Direction::Bottom,
            Direction::Right => Direction::Left,
            Direction::Bottom => Direction::Top,
            Direction::Left => Direction::Right,
        }
    }

    /// Where this canonical side ends up once the tile is turned to `orientation`
    pub const fn rotated(self, orientation: Orientation) -> Self {
        Self::from_index(self.index() + orientation.quarter_turns())
    }

    /// Grid offset of the neighbor across this side
    pub const fn offset(self) -> (i32, i32) {
        match self {
            Direction::Top => (0, -1),
            Direction::Right => (1, 0),
            Direction::Bottom => (0, 1),
            Direction::Left => (-1, 0),
        }
    }
}

/// Clockwise rotation of a tile.
///
/// `Top` is the canonical layout; `Right`, `Bottom` and `Left` are 90°, 180°
/// and 270° clockwise turns respectively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Orientation {
    #[default]
    Top,
    Right,
    Bottom,
    Left,
}

impl Orientation {
    /// All orientations in rotation order
    pub const ALL: [Orientation; 4] = [
        Orientation::Top,
        Orientation::Right,
        Orientation::Bottom,
        Orientation::Left,
    ];

    /// Number of 90° clockwise turns away from canonical
    pub const fn quarter_turns(self) -> usize {
        match self {
            Orientation::Top => 0,
            Orientation::Right => 1,
            Orientation::Bottom => 2,
            Orientation::Left => 3,
        }
    }

    /// The orientation after one more 90° clockwise turn
    pub const fn next(self) -> Self {
        match self {
            Orientation::Top => Orientation::Right,
            Orientation::Right => Orientation::Bottom,
            Orientation::Bottom => Orientation::Left,
            Orientation::Left => Orientation::Top,
        }
    }
}

/// A cell on the board.
///
/// The start tile sits at the origin; the board grows in every direction.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    /// The cell holding the start tile
    pub const ORIGIN: Position = Position::new(0, 0);

    /// Create a new position
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// The neighbor across the given side
    pub const fn neighbor(&self, direction: Direction) -> Position {
        let (dx, dy) = direction.offset();
        Position::new(self.x + dx, self.y + dy)
    }

    /// The four orthogonal neighbors in clockwise order starting from Top
    pub fn neighbors(&self) -> [Position; 4] {
        Direction::ALL.map(|direction| self.neighbor(direction))
    }

    /// The eight surrounding cells, diagonals included, row by row
    pub fn surrounding(&self) -> [Position; 8] {
        [
            Position::new(self.x - 1, self.y - 1),
            Position::new(self.x, self.y - 1),
            Position::new(self.x + 1, self.y - 1),
            Position::new(self.x - 1, self.y),
            Position::new(self.x + 1, self.y),
            Position::new(self.x - 1, self.y + 1),
            Position::new(self.x, self.y + 1),
            Position::new(self.x + 1, self.y + 1),
        ]
    }

    /// Manhattan distance to another cell
    pub fn distance_to(&self, other: &Position) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }

    /// Side of `self` that faces an orthogonally adjacent `other`
    pub fn direction_to(&self, other: &Position) -> Option<Direction> {
        Direction::ALL
            .into_iter()
            .find(|direction| self.neighbor(*direction) == *other)
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}
