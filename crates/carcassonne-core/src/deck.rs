//! The draw pile.
//!
//! The head of the deck is the tile currently offered to the active player.
//! Tiles leave the deck only by being drawn for placement; a tile that fits
//! nowhere is requeued at a random index instead of being discarded.

use crate::grid::Orientation;
use crate::tile::Tile;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Ordered sequence of tiles not yet placed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deck {
    tiles: Vec<Tile>,
}

impl Deck {
    /// Create a deck keeping the given order (head first)
    pub fn new(tiles: Vec<Tile>) -> Self {
        Self { tiles }
    }

    /// Create a deck in uniformly random order
    pub fn shuffled<R: Rng + ?Sized>(mut tiles: Vec<Tile>, rng: &mut R) -> Self {
        tiles.shuffle(rng);
        Self { tiles }
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// The tile on offer
    pub fn current(&self) -> Option<&Tile> {
        self.tiles.first()
    }

    /// Turn the tile on offer 90° clockwise. Returns false if the deck is empty.
    pub fn rotate_current(&mut self) -> bool {
        match self.tiles.first_mut() {
            Some(tile) => {
                tile.rotate();
                true
            }
            None => false,
        }
    }

    /// Remove and return the tile on offer
    pub fn draw(&mut self) -> Option<Tile> {
        if self.tiles.is_empty() {
            None
        } else {
            Some(self.tiles.remove(0))
        }
    }

    /// Put a tile back at a uniformly random index among the remaining cards,
    /// reset to its canonical orientation.
    pub fn requeue<R: Rng + ?Sized>(&mut self, mut tile: Tile, rng: &mut R) {
        tile.orientation = Orientation::Top;
        let index = rng.gen_range(0..=self.tiles.len());
        self.tiles.insert(index, tile);
    }

    /// Move the tile on offer back into the deck. Returns false if the deck is empty.
    pub fn requeue_current<R: Rng + ?Sized>(&mut self, rng: &mut R) -> bool {
        match self.draw() {
            Some(tile) => {
                self.requeue(tile, rng);
                true
            }
            None => false,
        }
    }

    /// Iterate in draw order
    pub fn iter(&self) -> impl Iterator<Item = &Tile> {
        self.tiles.iter()
    }
}
