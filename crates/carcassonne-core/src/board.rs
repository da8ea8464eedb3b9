//! The board: placed tiles indexed by grid cell.
//!
//! This module contains:
//! - The append-only board structure
//! - Edge-matching placement validation
//! - Query methods used by the feature walker and the turn state machine
//!
//! Feature traversal over the board lives in [`crate::features`].

use crate::grid::Position;
use crate::tile::{EntityId, PlacedTile, Tile, TileEntity};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Check whether `candidate` may lie at `candidate_pos` next to `existing`.
///
/// The two cells must be orthogonally adjacent and the sides facing each
/// other must carry the same edge type. Each tile's own orientation is
/// applied before comparing.
pub fn is_valid_placement(
    existing_pos: Position,
    existing: &Tile,
    candidate_pos: Position,
    candidate: &Tile,
) -> bool {
    if existing_pos.distance_to(&candidate_pos) != 1 {
        return false;
    }
    let Some(side) = existing_pos.direction_to(&candidate_pos) else {
        return false;
    };
    existing.edge(side) == candidate.edge(side.opposite())
}

/// The placed tiles of one game.
///
/// Serialized as the list of placed tiles in placement order, since JSON map
/// keys cannot be cells.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(into = "Vec<PlacedTile>", from = "Vec<PlacedTile>")]
pub struct Board {
    /// All placed tiles indexed by cell
    tiles: HashMap<Position, Tile>,
    /// Cells in placement order
    order: Vec<Position>,
}

impl Board {
    /// Create an empty board
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a board with the start tile at the origin
    pub fn with_start_tile(start: Tile) -> Self {
        let mut board = Self::new();
        board.place(Position::ORIGIN, start);
        board
    }

    // ==================== Query Methods ====================

    /// Get the tile at a cell
    pub fn get(&self, pos: &Position) -> Option<&Tile> {
        self.tiles.get(pos)
    }

    pub fn is_occupied(&self, pos: &Position) -> bool {
        self.tiles.contains_key(pos)
    }

    /// Number of placed tiles
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// Snapshot of all placed tiles in placement order
    pub fn placed_tiles(&self) -> Vec<PlacedTile> {
        self.order
            .iter()
            .filter_map(|pos| {
                self.tiles.get(pos).map(|tile| PlacedTile {
                    position: *pos,
                    tile: tile.clone(),
                })
            })
            .collect()
    }

    /// Iterate over placed tiles in no particular order
    pub fn iter(&self) -> impl Iterator<Item = (&Position, &Tile)> {
        self.tiles.iter()
    }

    /// Find an entity anywhere on the board
    pub fn find_entity(&self, id: EntityId) -> Option<(Position, &TileEntity)> {
        self.tiles
            .iter()
            .find_map(|(pos, tile)| tile.entity(id).map(|entity| (*pos, entity)))
    }

    /// Placed orthogonal neighbors of a cell
    pub fn neighbors_of(&self, pos: &Position) -> Vec<(Position, &Tile)> {
        pos.neighbors()
            .into_iter()
            .filter_map(|n| self.tiles.get(&n).map(|tile| (n, tile)))
            .collect()
    }

    /// Whether all eight cells around `pos` hold a tile
    pub fn is_surrounded(&self, pos: &Position) -> bool {
        pos.surrounding().iter().all(|cell| self.is_occupied(cell))
    }

    // ==================== Validation Methods ====================

    /// Whether `tile`, as currently oriented, fits at `pos`
    pub fn fits(&self, pos: &Position, tile: &Tile) -> bool {
        if self.is_occupied(pos) {
            return false;
        }
        let neighbors = self.neighbors_of(pos);
        if neighbors.is_empty() {
            return self.is_empty() && *pos == Position::ORIGIN;
        }
        neighbors
            .iter()
            .all(|(n, existing)| is_valid_placement(*n, existing, *pos, tile))
    }

    /// Every free cell where `tile`, as currently oriented, fits.
    ///
    /// An empty board accepts only the origin.
    pub fn valid_positions(&self, tile: &Tile) -> Vec<Position> {
        if self.is_empty() {
            return vec![Position::ORIGIN];
        }

        let mut seen = HashSet::new();
        let mut positions = Vec::new();

        for placed in &self.order {
            for candidate in placed.neighbors() {
                if self.is_occupied(&candidate) || !seen.insert(candidate) {
                    continue;
                }
                if self.fits(&candidate, tile) {
                    positions.push(candidate);
                }
            }
        }

        positions
    }

    // ==================== Mutation Methods ====================

    /// Place a tile (assumes validation already done)
    pub fn place(&mut self, pos: Position, tile: Tile) {
        if self.tiles.insert(pos, tile).is_none() {
            self.order.push(pos);
        }
    }

    /// Get a mutable tile at a cell
    pub(crate) fn get_mut(&mut self, pos: &Position) -> Option<&mut Tile> {
        self.tiles.get_mut(pos)
    }
}

impl From<Board> for Vec<PlacedTile> {
    fn from(board: Board) -> Self {
        board.placed_tiles()
    }
}

impl From<Vec<PlacedTile>> for Board {
    fn from(placed: Vec<PlacedTile>) -> Self {
        let mut board = Board::new();
        for PlacedTile { position, tile } in placed {
            board.place(position, tile);
        }
        board
    }
}
