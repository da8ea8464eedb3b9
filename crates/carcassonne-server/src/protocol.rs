//! WebSocket protocol messages for Carcassonne multiplayer.

use carcassonne_core::{EntityId, GameEvent, GameSnapshot, PlayerColor, PlayerId, Position};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Messages sent from client to server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum ClientMessage {
    /// Open a new game and take its first seat
    CreateGame {
        player_name: String,
        players_count: u8,
        #[serde(default)]
        seed: Option<u64>,
    },

    /// Take a seat in a waiting game
    JoinGame { game_id: Uuid, player_name: String },

    /// Leave current game
    LeaveGame,

    /// Submit a game action
    GameAction { action: serde_json::Value },

    /// Ask which entities of a placed tile can be claimed
    GetValidMeeplePositions { position: Position },

    /// Request the list of joinable games
    ListGames,

    /// Ping for keepalive
    Ping,
}

/// Messages sent from server to client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum ServerMessage {
    /// Connection established, here's your connection ID
    Welcome { player_id: Uuid },

    /// Game created successfully
    GameCreated { game_id: Uuid },

    /// Seated in a game
    JoinedGame {
        game: GameInfo,
        player_index: PlayerId,
        color: PlayerColor,
    },

    /// Left the game
    LeftGame,

    /// Seating or connection status changed
    GameUpdated { game: GameInfo },

    /// Full engine snapshot
    GameState { state: GameSnapshot },

    /// Result of a game action
    ActionResult {
        success: bool,
        events: Vec<GameEvent>,
        error: Option<String>,
    },

    /// Claimable entities on the tile at `position`
    ValidMeeplePositions {
        position: Position,
        entity_ids: Vec<EntityId>,
    },

    /// It's now this player's turn
    TurnChanged { player_index: PlayerId },

    /// List of joinable games
    GameList { games: Vec<GameInfo> },

    /// Error message
    Error { message: String },

    /// Pong response
    Pong,

    /// Game finished with final scores
    GameOver { scores: Vec<(PlayerId, u32)> },
}

/// Information about a hosted game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameInfo {
    pub id: Uuid,
    pub name: String,
    pub players: Vec<PlayerInfo>,
    pub players_count: u8,
    pub host_id: Uuid,
    pub status: GameStatus,
    pub deck_size: usize,
}

/// A seated player as seen by every client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerInfo {
    pub id: Uuid,
    pub name: String,
    pub player_index: PlayerId,
    pub color: PlayerColor,
    pub score: u32,
    pub meeples_remaining: u32,
    pub connected: bool,
}

/// Game lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameStatus {
    /// Seats still open
    Waiting,
    /// Every seat taken, turns in progress
    InGame,
    Finished,
}
