//! Carcassonne - a tile-and-feature game engine
//!
//! This crate provides the core game logic, including:
//! - Square grid coordinates and tile orientation
//! - The base-game tile catalog and a shuffled draw pile
//! - Edge-matching placement on an unbounded board
//! - Road, city and monastery completion with majority scoring
//! - Turn state machine with player registry
//!
//! # Architecture
//!
//! The game engine is designed to be platform-agnostic. It can be compiled to:
//! - Native Rust for server-side game hosting
//! - WebAssembly for client-side hotseat play
//!
//! # Modules
//!
//! - [`grid`]: Cells, sides and orientations
//! - [`tile`]: Tile instances, entities and edge layouts
//! - [`catalog`]: Tile archetypes and deck composition
//! - [`deck`]: The draw pile
//! - [`board`]: Placed tiles and placement validation
//! - [`features`]: Feature traversal, completion and claims
//! - [`player`]: Player state and registry
//! - [`game`]: Game state machine

pub mod actions;
pub mod board;
pub mod catalog;
pub mod deck;
pub mod features;
pub mod game;
pub mod grid;
pub mod player;
pub mod tile;
#[cfg(feature = "wasm")]
pub mod wasm;

// Re-export commonly used types
pub use actions::{GameAction, GameEvent};
pub use board::Board;
pub use catalog::{TileFactory, TileType};
pub use deck::Deck;
pub use features::{CompletedFeature, FeatureKind, FeatureSummary};
pub use game::{GameError, GameSnapshot, GameState, TurnState};
pub use grid::{Direction, Orientation, Position};
pub use player::{Player, PlayerColor, PlayerId, PlayerRegistry};
pub use tile::{EdgeType, EntityId, EntityKind, PlacedTile, RoadEnd, Tile, TileEntity, TileId};
