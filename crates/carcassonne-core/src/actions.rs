//! Game actions that players can take.
//!
//! This module defines all possible actions in the game and the events
//! that result from those actions.

use crate::catalog::TileType;
use crate::features::CompletedFeature;
use crate::grid::{Orientation, Position};
use crate::player::{PlayerColor, PlayerId};
use crate::tile::{EntityId, TileId};
use serde::{Deserialize, Serialize};

/// All possible actions on a game
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameAction {
    // ==================== Table ====================
    /// Take a seat under the given display name
    AddPlayer(String),

    // ==================== Tile Phase ====================
    /// Turn the tile on offer 90° clockwise
    RotateTile,
    /// Place the tile on offer at a cell
    PlaceTile(Position),

    // ==================== Meeple Phase ====================
    /// Claim an entity of the tile just placed and end the turn
    PlaceMeeple(EntityId),
    /// End the turn without claiming anything
    SkipMeeplePlacement,
}

impl GameAction {
    /// Whether only the current player may take this action
    pub fn is_turn_action(&self) -> bool {
        !matches!(self, GameAction::AddPlayer(_))
    }
}

/// Events that occur as a result of actions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameEvent {
    /// A player took a seat
    PlayerJoined {
        player: PlayerId,
        name: String,
        color: PlayerColor,
    },

    /// The tile on offer was turned
    TileRotated {
        tile: TileId,
        orientation: Orientation,
    },

    /// A tile was placed on the board
    TilePlaced {
        player: PlayerId,
        tile: TileId,
        tile_type: TileType,
        orientation: Orientation,
        position: Position,
    },

    /// A tile that fits nowhere went back into the deck
    TileRequeued { tile: TileId },

    /// A meeple was put on an entity
    MeeplePlaced {
        player: PlayerId,
        position: Position,
        entity: EntityId,
    },

    /// The player passed on placing a meeple
    MeeplePlacementSkipped { player: PlayerId },

    /// A feature was closed and scored
    FeatureCompleted { feature: CompletedFeature },

    /// Turn ended
    TurnEnded {
        player: PlayerId,
        next_player: PlayerId,
    },

    /// No more tiles can be played
    GameFinished {
        scores: Vec<(PlayerId, u32)>,
        /// Ended because the remaining tiles fit nowhere
        stalled: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_json_shape() {
        let json = serde_json::to_string(&GameAction::PlaceTile(Position::new(1, -2))).unwrap();
        assert_eq!(json, r#"{"PlaceTile":{"x":1,"y":-2}}"#);

        let parsed: GameAction = serde_json::from_str(r#""SkipMeeplePlacement""#).unwrap();
        assert_eq!(parsed, GameAction::SkipMeeplePlacement);

        let parsed: GameAction = serde_json::from_str(r#"{"PlaceMeeple":12}"#).unwrap();
        assert_eq!(parsed, GameAction::PlaceMeeple(12));
    }

    #[test]
    fn test_only_seating_is_open_to_everyone() {
        assert!(!GameAction::AddPlayer("Ada".to_string()).is_turn_action());
        assert!(GameAction::RotateTile.is_turn_action());
        assert!(GameAction::SkipMeeplePlacement.is_turn_action());
    }
}
