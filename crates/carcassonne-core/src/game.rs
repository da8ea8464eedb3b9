//! Core game state machine.
//!
//! This module contains the main `GameState` struct and all turn logic:
//! - Table setup and player admission
//! - Tile placement with automatic resolution of unplaceable tiles
//! - Meeple placement, feature completion and majority scoring

use crate::actions::{GameAction, GameEvent};
use crate::board::Board;
use crate::catalog::TileFactory;
use crate::deck::Deck;
use crate::features::{CompletedFeature, FeatureKind};
use crate::grid::Position;
use crate::player::{Player, PlayerId, PlayerRegistry};
use crate::tile::{EntityId, PlacedTile, Tile, TileId};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;
use tracing::debug;

/// Extra quarter turns tried on a tile that fits nowhere before requeueing it
const RESOLVE_ROTATIONS: usize = 3;

/// What the current player has to do next
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TurnState {
    /// Place the tile on offer
    PlaceTile,
    /// Claim a feature on the tile just placed, or pass
    PlaceMeepleOrEnd,
}

/// Errors that can occur when applying actions
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum GameError {
    #[error("Player count must be between 2 and 5, got {0}")]
    InvalidPlayerCount(u8),

    #[error("Player name must not be empty")]
    InvalidName,

    #[error("Player name '{0}' is already taken")]
    NameTaken(String),

    #[error("Game is full")]
    GameFull,

    #[error("Waiting for players to join")]
    WaitingForPlayers,

    #[error("Not your turn")]
    NotYourTurn,

    #[error("Invalid action for current turn state")]
    InvalidPhase,

    #[error("No tiles left in the deck")]
    EmptyDeck,

    #[error("Tile cannot be placed at {0}")]
    InvalidPlacement(Position),

    #[error("Entity {0} is not on the tile just placed")]
    InvalidEntity(EntityId),

    #[error("No meeples remaining")]
    NoMeeplesRemaining,

    #[error("Feature is already claimed")]
    FeatureClaimed,

    #[error("Game is over")]
    GameOver,
}

/// Serializable view of a game, as sent to clients after every change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSnapshot {
    pub current_tile: Option<Tile>,
    pub placed_tiles: Vec<PlacedTile>,
    pub deck_size: usize,
    pub current_rotations: u32,
    pub valid_positions: Vec<Position>,
    pub current_player: Option<Player>,
    pub players: Vec<Player>,
    pub players_count: u8,
    pub turn_state: TurnState,
    pub last_placed: Option<Position>,
    pub completed_features: Vec<CompletedFeature>,
    pub is_finished: bool,
    pub is_stalled: bool,
}

/// What a successful tile placement did besides placing the tile
struct Placement {
    tile: Tile,
    preview: Vec<CompletedFeature>,
    requeued: Vec<TileId>,
}

/// The complete state of one game
#[derive(Debug, Clone)]
pub struct GameState {
    /// Placed tiles
    board: Board,
    /// Tiles still to come; the head is on offer
    deck: Deck,
    /// Joined players in turn order
    players: PlayerRegistry,
    /// Whose turn it is
    current_player: PlayerId,
    turn_state: TurnState,
    /// The tile placed this turn, until the turn ends
    last_placed: Option<Position>,
    /// Quarter turns applied to the tile on offer
    rotations: u32,
    /// Tiles found unplaceable in every orientation since the board last changed
    unplaceable: HashSet<TileId>,
    /// Every remaining tile is unplaceable
    stalled: bool,
    /// Features scored so far, in completion order
    completed: Vec<CompletedFeature>,
    rng: StdRng,
}

impl GameState {
    /// Create a new game with a shuffled standard deck
    pub fn new(players_count: u8) -> Result<Self, GameError> {
        Self::with_rng(players_count, StdRng::from_entropy())
    }

    /// Create a new game whose shuffles are fixed by `seed`
    pub fn with_seed(players_count: u8, seed: u64) -> Result<Self, GameError> {
        Self::with_rng(players_count, StdRng::seed_from_u64(seed))
    }

    fn with_rng(players_count: u8, mut rng: StdRng) -> Result<Self, GameError> {
        let mut factory = TileFactory::new();
        let start = factory.start_tile();
        let deck = Deck::shuffled(factory.standard_deck(), &mut rng);
        Self::from_parts(players_count, start, deck, rng)
    }

    /// Create a game from an explicit start tile and deck, kept in the given
    /// order. `seed` drives requeue positions only.
    pub fn with_tiles(
        players_count: u8,
        start: Tile,
        tiles: Vec<Tile>,
        seed: u64,
    ) -> Result<Self, GameError> {
        Self::from_parts(
            players_count,
            start,
            Deck::new(tiles),
            StdRng::seed_from_u64(seed),
        )
    }

    fn from_parts(
        players_count: u8,
        start: Tile,
        deck: Deck,
        rng: StdRng,
    ) -> Result<Self, GameError> {
        let players = PlayerRegistry::new(players_count)?;
        let mut state = Self {
            board: Board::with_start_tile(start),
            deck,
            players,
            current_player: 0,
            turn_state: TurnState::PlaceTile,
            last_placed: None,
            rotations: 0,
            unplaceable: HashSet::new(),
            stalled: false,
            completed: Vec::new(),
            rng,
        };
        state.resolve_current_tile();
        Ok(state)
    }

    // ==================== Players ====================

    /// Seat a new player. Names are unique regardless of case.
    pub fn add_player(&mut self, name: &str) -> Result<Player, GameError> {
        let player = self.players.join(name)?;
        debug!(player = player.id, name = %player.name, "player joined");
        Ok(player)
    }

    /// Whether every seat is taken and turns may be played
    pub fn is_ready(&self) -> bool {
        self.players.is_full()
    }

    /// Table size chosen at construction
    pub fn players_count(&self) -> u8 {
        self.players.capacity()
    }

    pub fn current_player_id(&self) -> PlayerId {
        self.current_player
    }

    /// The player whose turn it is, once anyone has joined
    pub fn current_player(&self) -> Option<Player> {
        self.players.get(self.current_player).cloned()
    }

    pub fn players(&self) -> Vec<Player> {
        self.players.to_vec()
    }

    pub fn get_player(&self, id: PlayerId) -> Option<Player> {
        self.players.get(id).cloned()
    }

    /// Score of every player in join order
    pub fn scores(&self) -> Vec<(PlayerId, u32)> {
        self.players.iter().map(|p| (p.id, p.score)).collect()
    }

    // ==================== Read-only State ====================

    pub fn current_tile(&self) -> Option<Tile> {
        self.deck.current().cloned()
    }

    pub fn placed_tiles(&self) -> Vec<PlacedTile> {
        self.board.placed_tiles()
    }

    pub fn deck_size(&self) -> usize {
        self.deck.len()
    }

    pub fn turn_state(&self) -> TurnState {
        self.turn_state
    }

    /// Quarter turns applied to the tile on offer since it came up
    pub fn current_rotations(&self) -> u32 {
        self.rotations
    }

    pub fn last_placed(&self) -> Option<Position> {
        self.last_placed
    }

    /// Every feature scored so far, in completion order
    pub fn completed_features(&self) -> Vec<CompletedFeature> {
        self.completed.clone()
    }

    /// Scored features of one kind, in completion order
    pub fn completed_of(&self, kind: FeatureKind) -> Vec<CompletedFeature> {
        self.completed
            .iter()
            .filter(|feature| feature.kind == kind)
            .cloned()
            .collect()
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    /// Every remaining tile failed to fit in every orientation
    pub fn is_stalled(&self) -> bool {
        self.stalled
    }

    /// Check if the game is finished
    pub fn is_finished(&self) -> bool {
        self.turn_state == TurnState::PlaceTile && (self.deck.is_empty() || self.stalled)
    }

    /// Cells where the tile on offer fits as currently oriented
    pub fn valid_positions(&self) -> Vec<Position> {
        match self.deck.current() {
            Some(tile) => self.board.valid_positions(tile),
            None => Vec::new(),
        }
    }

    /// Entities on the tile just placed that the current player may claim
    pub fn valid_meeple_positions(&self, pos: Position) -> Vec<EntityId> {
        if self.turn_state != TurnState::PlaceMeepleOrEnd || self.last_placed != Some(pos) {
            return Vec::new();
        }
        let has_meeples = self
            .players
            .get(self.current_player)
            .is_some_and(|p| p.has_meeples());
        if !has_meeples {
            return Vec::new();
        }

        match self.board.get(&pos) {
            Some(tile) => tile
                .entities
                .iter()
                .filter(|entity| !self.board.is_claimed(pos, entity.id))
                .map(|entity| entity.id)
                .collect(),
            None => Vec::new(),
        }
    }

    /// Serializable view of the whole game
    pub fn snapshot(&self) -> GameSnapshot {
        GameSnapshot {
            current_tile: self.current_tile(),
            placed_tiles: self.placed_tiles(),
            deck_size: self.deck_size(),
            current_rotations: self.rotations,
            valid_positions: self.valid_positions(),
            current_player: self.current_player(),
            players: self.players(),
            players_count: self.players_count(),
            turn_state: self.turn_state,
            last_placed: self.last_placed,
            completed_features: self.completed_features(),
            is_finished: self.is_finished(),
            is_stalled: self.stalled,
        }
    }

    // ==================== Turn Operations ====================

    /// Turn the tile on offer 90° clockwise. Returns false if there is none.
    pub fn rotate_tile(&mut self) -> bool {
        if !self.is_ready() || !self.deck.rotate_current() {
            return false;
        }
        self.rotations += 1;
        true
    }

    /// Place the tile on offer at `pos`.
    ///
    /// Returns the features this tile closes. They are scored when the turn
    /// ends, after the player has had the chance to claim one of them.
    pub fn place_tile(&mut self, pos: Position) -> Result<Vec<CompletedFeature>, GameError> {
        self.commit_tile(pos).map(|placement| placement.preview)
    }

    /// Put a meeple from the current player's supply on an entity of the
    /// tile just placed, then end the turn.
    pub fn place_meeple(&mut self, entity_id: EntityId) -> Result<Vec<CompletedFeature>, GameError> {
        let pos = self.claimable(entity_id)?;

        let player = self.current_player;
        let took = self
            .players
            .get_mut(player)
            .is_some_and(|p| p.take_meeple());
        if !took {
            return Err(GameError::NoMeeplesRemaining);
        }
        if !self.board.put_meeple(pos, entity_id, player) {
            if let Some(p) = self.players.get_mut(player) {
                p.return_meeples(1);
            }
            return Err(GameError::FeatureClaimed);
        }
        debug!(player, entity = entity_id, "meeple placed at {}", pos);

        Ok(self.end_turn())
    }

    /// End the turn without placing a meeple
    pub fn skip_meeple_placement(&mut self) -> Result<Vec<CompletedFeature>, GameError> {
        self.ensure_ready()?;
        if self.turn_state != TurnState::PlaceMeepleOrEnd {
            return Err(GameError::InvalidPhase);
        }
        Ok(self.end_turn())
    }

    /// Apply an action to the game state
    pub fn apply_action(&mut self, action: GameAction) -> Result<Vec<GameEvent>, GameError> {
        let mut events = Vec::new();

        match action {
            GameAction::AddPlayer(name) => {
                let player = self.add_player(&name)?;
                events.push(GameEvent::PlayerJoined {
                    player: player.id,
                    name: player.name,
                    color: player.color,
                });
            }

            GameAction::RotateTile => {
                if self.is_finished() {
                    return Err(GameError::GameOver);
                }
                self.ensure_ready()?;
                if !self.rotate_tile() {
                    return Err(GameError::EmptyDeck);
                }
                if let Some(tile) = self.deck.current() {
                    events.push(GameEvent::TileRotated {
                        tile: tile.id,
                        orientation: tile.orientation,
                    });
                }
            }

            GameAction::PlaceTile(position) => {
                let player = self.current_player;
                let placement = self.commit_tile(position)?;
                events.push(GameEvent::TilePlaced {
                    player,
                    tile: placement.tile.id,
                    tile_type: placement.tile.tile_type,
                    orientation: placement.tile.orientation,
                    position,
                });
                events.extend(
                    placement
                        .requeued
                        .into_iter()
                        .map(|tile| GameEvent::TileRequeued { tile }),
                );
            }

            GameAction::PlaceMeeple(entity_id) => {
                let player = self.current_player;
                let position = self.claimable(entity_id)?;
                let completed = self.place_meeple(entity_id)?;
                events.push(GameEvent::MeeplePlaced {
                    player,
                    position,
                    entity: entity_id,
                });
                self.push_turn_end_events(player, completed, &mut events);
            }

            GameAction::SkipMeeplePlacement => {
                let player = self.current_player;
                let completed = self.skip_meeple_placement()?;
                events.push(GameEvent::MeeplePlacementSkipped { player });
                self.push_turn_end_events(player, completed, &mut events);
            }
        }

        Ok(events)
    }

    /// Apply an action on behalf of a seated player, rejecting turn actions
    /// from anyone but the current player
    pub fn apply_player_action(
        &mut self,
        player: PlayerId,
        action: GameAction,
    ) -> Result<Vec<GameEvent>, GameError> {
        if action.is_turn_action() && player != self.current_player {
            return Err(GameError::NotYourTurn);
        }
        self.apply_action(action)
    }

    // ==================== Internals ====================

    fn ensure_ready(&self) -> Result<(), GameError> {
        if self.is_ready() {
            Ok(())
        } else {
            Err(GameError::WaitingForPlayers)
        }
    }

    fn commit_tile(&mut self, pos: Position) -> Result<Placement, GameError> {
        self.ensure_ready()?;
        if self.is_finished() {
            return Err(GameError::GameOver);
        }
        if self.turn_state != TurnState::PlaceTile {
            return Err(GameError::InvalidPhase);
        }

        let fits = match self.deck.current() {
            Some(tile) => self.board.fits(&pos, tile),
            None => return Err(GameError::EmptyDeck),
        };
        if !fits {
            return Err(GameError::InvalidPlacement(pos));
        }

        let tile = self.deck.draw().ok_or(GameError::EmptyDeck)?;
        debug!(
            player = self.current_player,
            tile = tile.id,
            tile_type = ?tile.tile_type,
            orientation = ?tile.orientation,
            "tile placed at {}",
            pos
        );
        self.board.place(pos, tile.clone());
        self.rotations = 0;
        self.last_placed = Some(pos);
        self.turn_state = TurnState::PlaceMeepleOrEnd;
        self.unplaceable.clear();

        let preview = self.board.completed_features_at(pos);
        let requeued = self.resolve_current_tile();

        Ok(Placement {
            tile,
            preview,
            requeued,
        })
    }

    /// Check that the current player may claim `entity_id`, returning the
    /// cell it lies on
    fn claimable(&self, entity_id: EntityId) -> Result<Position, GameError> {
        self.ensure_ready()?;
        if self.turn_state != TurnState::PlaceMeepleOrEnd {
            return Err(GameError::InvalidPhase);
        }
        let pos = self.last_placed.ok_or(GameError::InvalidPhase)?;

        let on_tile = self
            .board
            .get(&pos)
            .is_some_and(|tile| tile.entity(entity_id).is_some());
        if !on_tile {
            return Err(GameError::InvalidEntity(entity_id));
        }

        let has_meeples = self
            .players
            .get(self.current_player)
            .is_some_and(|p| p.has_meeples());
        if !has_meeples {
            return Err(GameError::NoMeeplesRemaining);
        }

        if self.board.is_claimed(pos, entity_id) {
            return Err(GameError::FeatureClaimed);
        }

        Ok(pos)
    }

    /// Make sure the tile on offer fits somewhere.
    ///
    /// The head is tried as it lies, then turned up to three more times; if
    /// it still fits nowhere it goes back into the deck at a random index
    /// and the new head is tried. Once every remaining tile has failed
    /// without the board changing, the game is stalled.
    fn resolve_current_tile(&mut self) -> Vec<TileId> {
        let mut requeued = Vec::new();

        while !self.stalled {
            let Some(head) = self.deck.current() else {
                break;
            };
            let head_id = head.id;

            if !self.unplaceable.contains(&head_id) {
                if !self.valid_positions().is_empty() {
                    break;
                }
                let mut fitted = false;
                for _ in 0..RESOLVE_ROTATIONS {
                    self.deck.rotate_current();
                    self.rotations += 1;
                    if !self.valid_positions().is_empty() {
                        fitted = true;
                        break;
                    }
                }
                if fitted {
                    break;
                }
            }

            self.deck.requeue_current(&mut self.rng);
            self.rotations = 0;
            self.unplaceable.insert(head_id);
            requeued.push(head_id);
            debug!(tile = head_id, deck = self.deck.len(), "tile fits nowhere, requeued");

            if self.deck.iter().all(|tile| self.unplaceable.contains(&tile.id)) {
                self.stalled = true;
                debug!(deck = self.deck.len(), "no remaining tile fits, game stalled");
            }
        }

        requeued
    }

    /// Score the features closed by the tile just placed and pass the turn
    fn end_turn(&mut self) -> Vec<CompletedFeature> {
        let completed = match self.last_placed.take() {
            Some(pos) => self.board.completed_features_at(pos),
            None => Vec::new(),
        };
        for feature in &completed {
            self.award_points(feature);
        }
        self.completed.extend(completed.iter().cloned());

        self.turn_state = TurnState::PlaceTile;
        self.current_player = self.players.next_after(self.current_player);
        debug!(next = self.current_player, completed = completed.len(), "turn ended");
        completed
    }

    /// Pay the feature's score to every winner, return their meeples, and
    /// clear the feature. Meeples of other players on it are lost.
    fn award_points(&mut self, feature: &CompletedFeature) {
        for winner in &feature.winners {
            if let Some(player) = self.players.get_mut(*winner) {
                player.score += feature.score;
            }
        }

        for (owner, count) in self.board.strip_meeples(feature) {
            if feature.is_won_by(owner) {
                if let Some(player) = self.players.get_mut(owner) {
                    player.return_meeples(count);
                }
            }
        }
    }

    fn push_turn_end_events(
        &self,
        player: PlayerId,
        completed: Vec<CompletedFeature>,
        events: &mut Vec<GameEvent>,
    ) {
        events.extend(
            completed
                .into_iter()
                .map(|feature| GameEvent::FeatureCompleted { feature }),
        );
        events.push(GameEvent::TurnEnded {
            player,
            next_player: self.current_player,
        });
        if self.is_finished() {
            events.push(GameEvent::GameFinished {
                scores: self.scores(),
                stalled: self.stalled,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::TileType;
    use crate::grid::{Direction, Orientation};
    use crate::player::STARTING_MEEPLES;
    use pretty_assertions::assert_eq;

    fn full_game(players: u8, seed: u64) -> GameState {
        let mut game = GameState::with_seed(players, seed).unwrap();
        for i in 0..players {
            game.add_player(&format!("Player {}", i + 1)).unwrap();
        }
        game
    }

    fn scripted(players: u8, tiles: &[TileType]) -> GameState {
        let mut factory = TileFactory::new();
        let start = factory.start_tile();
        let deck = tiles.iter().map(|t| factory.stamp(*t)).collect();
        let mut game = GameState::with_tiles(players, start, deck, 0).unwrap();
        for i in 0..players {
            game.add_player(&format!("Player {}", i + 1)).unwrap();
        }
        game
    }

    fn rotate_to(game: &mut GameState, orientation: Orientation) {
        for _ in 0..4 {
            if game.current_tile().unwrap().orientation == orientation {
                return;
            }
            game.rotate_tile();
        }
        panic!("tile never reached {:?}", orientation);
    }

    #[test]
    fn test_player_count_bounds() {
        assert_eq!(
            GameState::new(1).err(),
            Some(GameError::InvalidPlayerCount(1))
        );
        assert_eq!(
            GameState::new(6).err(),
            Some(GameError::InvalidPlayerCount(6))
        );
        assert!(GameState::new(2).is_ok());
        assert!(GameState::new(5).is_ok());
    }

    #[test]
    fn test_new_game_state() {
        let game = full_game(2, 42);

        assert_eq!(game.deck_size(), 71);
        assert_eq!(game.placed_tiles().len(), 1);
        assert_eq!(game.placed_tiles()[0].position, Position::ORIGIN);
        assert_eq!(game.placed_tiles()[0].tile.tile_type, TileType::Start);
        assert_eq!(game.turn_state(), TurnState::PlaceTile);
        assert_eq!(game.current_player_id(), 0);
        assert!(!game.valid_positions().is_empty());
        assert!(!game.is_finished());
    }

    #[test]
    fn test_turn_operations_wait_for_full_table() {
        let mut game = GameState::with_seed(3, 1).unwrap();
        game.add_player("Ada").unwrap();
        game.add_player("Bob").unwrap();

        let pos = game.valid_positions()[0];
        assert_eq!(game.place_tile(pos), Err(GameError::WaitingForPlayers));
        assert_eq!(game.skip_meeple_placement(), Err(GameError::WaitingForPlayers));
        assert!(!game.rotate_tile());

        game.add_player("Cy").unwrap();
        assert!(game.place_tile(pos).is_ok());
        assert_eq!(game.add_player("Dee"), Err(GameError::GameFull));
    }

    #[test]
    fn test_invalid_placement_leaves_state_untouched() {
        let mut game = full_game(2, 7);
        let before = game.snapshot();

        assert_eq!(
            game.place_tile(Position::ORIGIN),
            Err(GameError::InvalidPlacement(Position::ORIGIN))
        );
        assert_eq!(
            game.place_tile(Position::new(9, 9)),
            Err(GameError::InvalidPlacement(Position::new(9, 9)))
        );
        assert_eq!(game.snapshot(), before);
    }

    #[test]
    fn test_turn_cycle_is_round_robin() {
        let mut game = full_game(3, 11);

        for expected in [0, 1, 2, 0] {
            assert_eq!(game.current_player_id(), expected);
            let pos = game.valid_positions()[0];
            game.place_tile(pos).unwrap();
            assert_eq!(game.turn_state(), TurnState::PlaceMeepleOrEnd);
            assert_eq!(game.place_tile(pos), Err(GameError::InvalidPhase));
            game.skip_meeple_placement().unwrap();
            assert_eq!(game.turn_state(), TurnState::PlaceTile);
        }

        assert_eq!(game.skip_meeple_placement(), Err(GameError::InvalidPhase));
        assert_eq!(game.placed_tiles().len(), 5);
        assert_eq!(game.deck_size(), 67);
    }

    #[test]
    fn test_rotation_counter() {
        let mut game = full_game(2, 3);
        let start = game.current_rotations();
        let orientation = game.current_tile().unwrap().orientation;

        assert!(game.rotate_tile());
        assert_eq!(game.current_rotations(), start + 1);
        assert_eq!(game.current_tile().unwrap().orientation, orientation.next());

        // Keep turning until it fits somewhere, then place it
        while game.valid_positions().is_empty() {
            game.rotate_tile();
        }
        let pos = game.valid_positions()[0];
        game.place_tile(pos).unwrap();

        // The counter restarts with the next tile, which may have been turned to fit
        let next = game.current_tile().unwrap();
        assert_eq!(
            game.current_rotations() as usize,
            next.orientation.quarter_turns()
        );
    }

    #[test]
    fn test_meeple_scores_closed_city() {
        let mut game = scripted(2, &[TileType::CityOne, TileType::RoadStraight]);
        rotate_to(&mut game, Orientation::Bottom);

        let above = Position::new(0, -1);
        let preview = game.place_tile(above).unwrap();
        assert_eq!(preview.len(), 1, "Placing the cap closes the start city");
        assert!(preview[0].winners.is_empty(), "Nobody has claimed it yet");
        assert_eq!(game.scores(), vec![(0, 0), (1, 0)]);

        let city = game
            .board()
            .get(&above)
            .unwrap()
            .city_through(Direction::Bottom)
            .unwrap()
            .id;
        assert_eq!(game.valid_meeple_positions(above), vec![city]);

        let completed = game.place_meeple(city).unwrap();
        assert_eq!(completed.len(), 1);
        assert_eq!(completed[0].winners, vec![0]);
        assert_eq!(game.scores(), vec![(0, 4), (1, 0)]);

        let ada = game.get_player(0).unwrap();
        assert_eq!(ada.meeples_remaining, STARTING_MEEPLES);
        assert!(!game.board().get(&above).unwrap().has_meeple());
        assert_eq!(game.current_player_id(), 1);
    }

    #[test]
    fn test_place_meeple_errors() {
        let mut game = scripted(2, &[TileType::RoadStraight, TileType::RoadStraight]);
        assert_eq!(game.place_meeple(0), Err(GameError::InvalidPhase));

        rotate_to(&mut game, Orientation::Right);
        let east = Position::new(1, 0);
        game.place_tile(east).unwrap();

        let start_city = game.board().get(&Position::ORIGIN).unwrap().entities[0].id;
        assert_eq!(
            game.place_meeple(start_city),
            Err(GameError::InvalidEntity(start_city))
        );

        let road = game.board().get(&east).unwrap().entities[0].id;
        game.place_meeple(road).unwrap();

        // Player 2 extends the same road and may not claim it
        rotate_to(&mut game, Orientation::Right);
        let west = Position::new(-1, 0);
        game.place_tile(west).unwrap();
        let west_road = game.board().get(&west).unwrap().entities[0].id;
        assert!(game.valid_meeple_positions(west).is_empty());
        assert_eq!(game.place_meeple(west_road), Err(GameError::FeatureClaimed));
        assert!(game.skip_meeple_placement().is_ok());
    }

    #[test]
    fn test_out_of_meeples() {
        let mut game = scripted(2, &[TileType::Monastery, TileType::Monastery]);
        game.players.get_mut(0).unwrap().meeples_remaining = 0;

        let below = Position::new(0, 1);
        game.place_tile(below).unwrap();
        let monastery = game.board().get(&below).unwrap().entities[0].id;

        assert!(game.valid_meeple_positions(below).is_empty());
        assert_eq!(
            game.place_meeple(monastery),
            Err(GameError::NoMeeplesRemaining)
        );
    }

    #[test]
    fn test_majority_award_with_ties() {
        let mut game = scripted(3, &[TileType::RoadStraight]);
        let mut factory = TileFactory::new();
        let mut board = Board::new();

        board.place(Position::new(0, 0), factory.stamp(TileType::RoadFourCrossroad));
        for x in 1..=5 {
            let mut straight = factory.stamp(TileType::RoadStraight);
            straight.orientation = Orientation::Right;
            board.place(Position::new(x, 0), straight);
        }
        board.place(Position::new(6, 0), factory.stamp(TileType::RoadFourCrossroad));

        let owners: [PlayerId; 5] = [0, 0, 1, 1, 2];
        for (x, owner) in (1..=5).zip(owners) {
            let id = board.get(&Position::new(x, 0)).unwrap().entities[0].id;
            assert!(board.put_meeple(Position::new(x, 0), id, owner));
            game.players.get_mut(owner).unwrap().take_meeple();
        }
        game.board = board;

        let start = game.board.get(&Position::new(1, 0)).unwrap().entities[0].id;
        let road = game.board.completed_road(Position::new(1, 0), start).unwrap();
        assert_eq!(road.score, 7);
        assert_eq!(road.winners, vec![0, 1]);

        game.award_points(&road);

        assert_eq!(game.scores(), vec![(0, 7), (1, 7), (2, 0)]);
        let meeples: Vec<u32> = game.players().iter().map(|p| p.meeples_remaining).collect();
        assert_eq!(
            meeples,
            vec![STARTING_MEEPLES, STARTING_MEEPLES, STARTING_MEEPLES - 1]
        );
        assert!(!game.board.is_road_claimed(Position::new(1, 0), start));
    }

    #[test]
    fn test_zero_winner_feature_scores_nothing() {
        let mut game = scripted(2, &[TileType::CityOne, TileType::RoadStraight]);
        rotate_to(&mut game, Orientation::Bottom);
        game.place_tile(Position::new(0, -1)).unwrap();

        let completed = game.skip_meeple_placement().unwrap();
        assert_eq!(completed.len(), 1);
        assert!(completed[0].winners.is_empty());
        assert_eq!(game.scores(), vec![(0, 0), (1, 0)]);
    }

    #[test]
    fn test_game_finishes_when_deck_runs_out() {
        let mut game = scripted(2, &[TileType::Monastery]);
        game.place_tile(Position::new(0, 1)).unwrap();
        assert!(!game.is_finished(), "The last turn still has its meeple phase");

        let events = game.apply_action(GameAction::SkipMeeplePlacement).unwrap();
        assert!(game.is_finished());
        assert!(matches!(
            events.last(),
            Some(GameEvent::GameFinished { stalled: false, .. })
        ));
        assert_eq!(
            game.place_tile(Position::new(0, 2)),
            Err(GameError::GameOver)
        );
    }

    #[test]
    fn test_apply_player_action_checks_turn() {
        let mut game = full_game(2, 5);
        let pos = game.valid_positions()[0];

        assert_eq!(
            game.apply_player_action(1, GameAction::PlaceTile(pos)),
            Err(GameError::NotYourTurn)
        );
        let events = game
            .apply_player_action(0, GameAction::PlaceTile(pos))
            .unwrap();
        assert!(matches!(events[0], GameEvent::TilePlaced { player: 0, .. }));
    }

    #[test]
    fn test_snapshot_serializes() {
        let game = full_game(2, 9);
        let json = serde_json::to_string(&game.snapshot()).unwrap();
        assert!(json.contains("\"placed_tiles\""));
        assert!(json.contains("\"turn_state\":\"PlaceTile\""));

        let back: GameSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, game.snapshot());
    }

    #[test]
    fn test_majority_award_with_ties_on_city() {
        let mut game = scripted(3, &[TileType::RoadStraight]);
        let mut factory = TileFactory::new();
        let mut board = Board::new();

        let mut west_cap = factory.stamp(TileType::CityOne);
        west_cap.orientation = Orientation::Right;
        board.place(Position::new(0, 0), west_cap);
        for x in 1..=3 {
            board.place(Position::new(x, 0), factory.stamp(TileType::CityTwo));
        }
        let mut east_cap = factory.stamp(TileType::CityOne);
        east_cap.orientation = Orientation::Left;
        board.place(Position::new(4, 0), east_cap);

        let owners: [PlayerId; 5] = [0, 0, 1, 1, 2];
        for (x, owner) in (0..=4).zip(owners) {
            let id = board.get(&Position::new(x, 0)).unwrap().entities[0].id;
            assert!(board.put_meeple(Position::new(x, 0), id, owner));
            game.players.get_mut(owner).unwrap().take_meeple();
        }
        game.board = board;

        let start = game.board.get(&Position::new(2, 0)).unwrap().entities[0].id;
        let city = game.board.completed_city(Position::new(2, 0), start).unwrap();
        assert_eq!(city.entity_ids.len(), 5);
        assert_eq!(city.score, 10);
        assert_eq!(city.winners, vec![0, 1]);

        game.award_points(&city);

        assert_eq!(game.scores(), vec![(0, 10), (1, 10), (2, 0)]);
        let meeples: Vec<u32> = game.players().iter().map(|p| p.meeples_remaining).collect();
        assert_eq!(
            meeples,
            vec![STARTING_MEEPLES, STARTING_MEEPLES, STARTING_MEEPLES - 1]
        );
        assert!(!game.board.is_city_claimed(Position::new(2, 0), start));
    }

    #[test]
    fn test_rejected_claim_keeps_supply_and_board() {
        let mut game = scripted(2, &[TileType::RoadStraight, TileType::RoadStraight]);
        rotate_to(&mut game, Orientation::Right);
        game.place_tile(Position::new(1, 0)).unwrap();
        let road = game.board().get(&Position::new(1, 0)).unwrap().entities[0].id;
        game.place_meeple(road).unwrap();

        rotate_to(&mut game, Orientation::Right);
        let west = Position::new(-1, 0);
        game.place_tile(west).unwrap();
        let west_road = game.board().get(&west).unwrap().entities[0].id;
        let before = game.snapshot();

        assert_eq!(game.place_meeple(west_road), Err(GameError::FeatureClaimed));
        assert_eq!(game.snapshot(), before);
        assert_eq!(
            game.get_player(1).unwrap().meeples_remaining,
            STARTING_MEEPLES
        );
        assert!(!game.board().get(&west).unwrap().has_meeple());
    }

    #[test]
    fn test_completed_features_are_logged() {
        let mut game = scripted(2, &[TileType::CityOne, TileType::Monastery, TileType::Monastery]);
        assert!(game.completed_features().is_empty());

        rotate_to(&mut game, Orientation::Bottom);
        let above = Position::new(0, -1);
        game.place_tile(above).unwrap();
        assert!(
            game.completed_features().is_empty(),
            "Nothing is scored before the turn ends"
        );

        let city = game.board().get(&above).unwrap().entities[0].id;
        let scored = game.place_meeple(city).unwrap();

        assert_eq!(game.completed_features(), scored);
        assert_eq!(game.completed_of(FeatureKind::City).len(), 1);
        assert!(game.completed_of(FeatureKind::Road).is_empty());
        assert_eq!(game.snapshot().completed_features, scored);
    }
}
