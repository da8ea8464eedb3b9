//! Hosted game management.

use carcassonne_core::{
    EntityId, GameAction, GameError, GameEvent, GameSnapshot, GameState, PlayerColor, PlayerId,
    Position,
};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::protocol::{GameInfo, GameStatus, PlayerInfo};

#[derive(Debug, Error)]
pub enum RoomError {
    #[error("Player not in game")]
    PlayerNotInGame,

    #[error("Game already started")]
    GameAlreadyStarted,

    #[error("Game not started")]
    GameNotStarted,

    #[error("Invalid action: {0}")]
    InvalidAction(String),

    #[error(transparent)]
    Game(#[from] GameError),
}

/// A connection seated in a game.
#[derive(Debug, Clone)]
pub struct RoomPlayer {
    pub id: Uuid,
    pub name: String,
    pub connected: bool,
    /// Seat in the engine, in join order
    pub player_index: PlayerId,
    pub color: PlayerColor,
}

/// One hosted game: the engine plus the connections seated at it.
pub struct GameRoom {
    pub id: Uuid,
    pub name: String,
    pub host_id: Uuid,
    pub status: GameStatus,
    pub players: HashMap<Uuid, RoomPlayer>,
    /// Connections in seat order
    pub player_order: Vec<Uuid>,
    pub game: GameState,
    players_count: u8,
    seed: Option<u64>,
    last_activity: Instant,
}

fn new_game(players_count: u8, seed: Option<u64>) -> Result<GameState, GameError> {
    match seed {
        Some(seed) => GameState::with_seed(players_count, seed),
        None => GameState::new(players_count),
    }
}

impl GameRoom {
    /// Open a game for `players_count` players with the host in the first seat
    pub fn new(
        id: Uuid,
        host_id: Uuid,
        host_name: &str,
        players_count: u8,
        seed: Option<u64>,
    ) -> Result<Self, RoomError> {
        let mut room = Self {
            id,
            name: format!("{}'s Game", host_name.trim()),
            host_id,
            status: GameStatus::Waiting,
            players: HashMap::new(),
            player_order: Vec::new(),
            game: new_game(players_count, seed)?,
            players_count,
            seed,
            last_activity: Instant::now(),
        };
        room.add_player(host_id, host_name)?;
        Ok(room)
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn is_full(&self) -> bool {
        self.game.is_ready()
    }

    pub fn player(&self, player_id: Uuid) -> Option<&RoomPlayer> {
        self.players.get(&player_id)
    }

    /// Seat a connection. The game starts once every seat is taken.
    pub fn add_player(&mut self, player_id: Uuid, name: &str) -> Result<RoomPlayer, RoomError> {
        if self.status != GameStatus::Waiting {
            return Err(RoomError::GameAlreadyStarted);
        }

        let seated = self.game.add_player(name)?;
        let player = RoomPlayer {
            id: player_id,
            name: seated.name,
            connected: true,
            player_index: seated.id,
            color: seated.color,
        };
        self.players.insert(player_id, player.clone());
        self.player_order.push(player_id);

        if self.game.is_ready() {
            self.status = GameStatus::InGame;
            debug!(game = %self.id, "all seats taken, game started");
        }
        self.touch();
        Ok(player)
    }

    /// Unseat a connection from a waiting game. Returns true if the game is
    /// now empty.
    pub fn remove_player(&mut self, player_id: Uuid) -> Result<bool, RoomError> {
        if !self.players.contains_key(&player_id) {
            return Err(RoomError::PlayerNotInGame);
        }
        if self.status != GameStatus::Waiting {
            return Err(RoomError::GameAlreadyStarted);
        }

        self.players.remove(&player_id);
        self.player_order.retain(|&id| id != player_id);

        // If host left, assign new host
        if player_id == self.host_id {
            if let Some(&next) = self.player_order.first() {
                self.host_id = next;
            }
        }

        self.reseat()?;
        self.touch();
        Ok(self.players.is_empty())
    }

    /// Rebuild the engine's table from the remaining connections so seats stay
    /// contiguous
    fn reseat(&mut self) -> Result<(), RoomError> {
        let mut game = new_game(self.players_count, self.seed)?;
        for id in &self.player_order {
            if let Some(player) = self.players.get_mut(id) {
                let seated = game.add_player(&player.name)?;
                player.player_index = seated.id;
                player.color = seated.color;
            }
        }
        self.game = game;
        Ok(())
    }

    pub fn set_player_connected(&mut self, player_id: Uuid, connected: bool) {
        if let Some(player) = self.players.get_mut(&player_id) {
            player.connected = connected;
        }
    }

    /// Apply a JSON-encoded `GameAction` on behalf of a seated connection
    pub fn apply_action(
        &mut self,
        player_id: Uuid,
        action: serde_json::Value,
    ) -> Result<Vec<GameEvent>, RoomError> {
        if self.status == GameStatus::Waiting {
            return Err(RoomError::GameNotStarted);
        }

        let player_index = self
            .players
            .get(&player_id)
            .map(|p| p.player_index)
            .ok_or(RoomError::PlayerNotInGame)?;

        let action: GameAction = serde_json::from_value(action)
            .map_err(|e| RoomError::InvalidAction(e.to_string()))?;
        if !action.is_turn_action() {
            return Err(RoomError::InvalidAction(
                "players are seated through JoinGame".to_string(),
            ));
        }

        let events = self.game.apply_player_action(player_index, action)?;
        self.touch();

        if self.game.is_finished() {
            self.status = GameStatus::Finished;
        }

        Ok(events)
    }

    pub fn valid_meeple_positions(&self, position: Position) -> Vec<EntityId> {
        self.game.valid_meeple_positions(position)
    }

    pub fn get_game_state(&self) -> GameSnapshot {
        self.game.snapshot()
    }

    pub fn get_current_player(&self) -> PlayerId {
        self.game.current_player_id()
    }

    /// Final scores once the game is over
    pub fn final_scores(&self) -> Option<Vec<(PlayerId, u32)>> {
        (self.status == GameStatus::Finished).then(|| self.game.scores())
    }

    fn touch(&mut self) {
        self.last_activity = Instant::now();
    }

    /// Whether the game should be dropped by an eviction sweep at `now`
    pub fn is_stale(&self, now: Instant, idle_timeout: Duration) -> bool {
        self.status == GameStatus::Finished
            || now.saturating_duration_since(self.last_activity) >= idle_timeout
    }

    pub fn to_info(&self) -> GameInfo {
        let seats = self.game.players();
        GameInfo {
            id: self.id,
            name: self.name.clone(),
            players: self
                .player_order
                .iter()
                .filter_map(|id| self.players.get(id))
                .map(|p| {
                    let seat = seats.iter().find(|s| s.id == p.player_index);
                    PlayerInfo {
                        id: p.id,
                        name: p.name.clone(),
                        player_index: p.player_index,
                        color: p.color,
                        score: seat.map_or(0, |s| s.score),
                        meeples_remaining: seat.map_or(0, |s| s.meeples_remaining),
                        connected: p.connected,
                    }
                })
                .collect(),
            players_count: self.players_count,
            host_id: self.host_id,
            status: self.status,
            deck_size: self.game.deck_size(),
        }
    }
}
