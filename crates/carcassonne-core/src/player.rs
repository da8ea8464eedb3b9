//! Player state and the join-order registry.
//!
//! This module contains:
//! - Player struct with meeple supply and score
//! - PlayerColor assigned first-come-first-served
//! - The registry that admits players up to the table size

use crate::game::GameError;
use serde::{Deserialize, Serialize};

/// Player index in join order (0-4)
pub type PlayerId = u8;

/// Minimum table size
pub const MIN_PLAYERS: u8 = 2;

/// Maximum table size
pub const MAX_PLAYERS: u8 = 5;

/// Meeples each player starts with
pub const STARTING_MEEPLES: u32 = 7;

/// Player color for UI rendering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlayerColor {
    Red,
    Blue,
    Green,
    Yellow,
    Black,
}

impl PlayerColor {
    /// Colors in the order they are handed out
    pub const ALL: [PlayerColor; 5] = [
        PlayerColor::Red,
        PlayerColor::Blue,
        PlayerColor::Green,
        PlayerColor::Yellow,
        PlayerColor::Black,
    ];

    /// Get color for a player index
    pub fn for_player(id: PlayerId) -> Self {
        Self::ALL[id as usize % Self::ALL.len()]
    }
}

/// A single player's state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    /// Join order index
    pub id: PlayerId,
    /// Display name
    pub name: String,
    /// Player color
    pub color: PlayerColor,
    /// Meeples still in the player's supply
    pub meeples_remaining: u32,
    /// Points scored so far
    pub score: u32,
    /// The first player to join hosts the table
    pub is_host: bool,
}

impl Player {
    /// Create a new player
    pub fn new(id: PlayerId, name: String) -> Self {
        Self {
            id,
            name,
            color: PlayerColor::for_player(id),
            meeples_remaining: STARTING_MEEPLES,
            score: 0,
            is_host: id == 0,
        }
    }

    pub fn has_meeples(&self) -> bool {
        self.meeples_remaining > 0
    }

    /// Take a meeple from the supply. Returns false if none are left.
    pub fn take_meeple(&mut self) -> bool {
        if self.meeples_remaining == 0 {
            return false;
        }
        self.meeples_remaining -= 1;
        true
    }

    /// Return meeples to the supply
    pub fn return_meeples(&mut self, count: u32) {
        self.meeples_remaining += count;
    }
}

/// Players of one table, in join order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerRegistry {
    players: Vec<Player>,
    capacity: u8,
}

impl PlayerRegistry {
    /// Create an empty table for `capacity` players
    pub fn new(capacity: u8) -> Result<Self, GameError> {
        if !(MIN_PLAYERS..=MAX_PLAYERS).contains(&capacity) {
            return Err(GameError::InvalidPlayerCount(capacity));
        }
        Ok(Self {
            players: Vec::with_capacity(capacity as usize),
            capacity,
        })
    }

    /// Admit a player. Names are compared case-insensitively.
    pub fn join(&mut self, name: &str) -> Result<Player, GameError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(GameError::InvalidName);
        }
        if self.is_full() {
            return Err(GameError::GameFull);
        }
        if self.is_name_taken(name) {
            return Err(GameError::NameTaken(name.to_string()));
        }

        let player = Player::new(self.players.len() as PlayerId, name.to_string());
        self.players.push(player.clone());
        Ok(player)
    }

    pub fn is_name_taken(&self, name: &str) -> bool {
        let lowered = name.trim().to_lowercase();
        self.players.iter().any(|p| p.name.to_lowercase() == lowered)
    }

    /// Number of joined players
    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// Table size chosen at construction
    pub fn capacity(&self) -> u8 {
        self.capacity
    }

    /// Whether every seat is taken
    pub fn is_full(&self) -> bool {
        self.players.len() >= self.capacity as usize
    }

    /// Get a player by ID
    pub fn get(&self, id: PlayerId) -> Option<&Player> {
        self.players.get(id as usize)
    }

    /// Get a mutable player by ID
    pub fn get_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        self.players.get_mut(id as usize)
    }

    /// The seat after `id`, wrapping round the joined players
    pub fn next_after(&self, id: PlayerId) -> PlayerId {
        if self.players.is_empty() {
            return 0;
        }
        ((id as usize + 1) % self.players.len()) as PlayerId
    }

    pub fn iter(&self) -> impl Iterator<Item = &Player> {
        self.players.iter()
    }

    /// Owned copies of all players
    pub fn to_vec(&self) -> Vec<Player> {
        self.players.clone()
    }
}
