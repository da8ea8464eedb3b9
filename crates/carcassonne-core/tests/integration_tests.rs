//! Integration tests for the Carcassonne game engine.
//!
//! These tests verify complete game flows from setup through to the last tile.

use carcassonne_core::board::is_valid_placement;
use carcassonne_core::catalog::TOTAL_TILE_COUNT;
use carcassonne_core::features::MONASTERY_SCORE;
use carcassonne_core::player::STARTING_MEEPLES;
use carcassonne_core::tile::rotate_edges;
use carcassonne_core::*;
use pretty_assertions::assert_eq;
use std::collections::HashSet;

/// Create a game with every seat taken
fn seated_game(players: u8, seed: u64) -> GameState {
    let mut game = GameState::with_seed(players, seed).expect("valid player count");
    for i in 0..players {
        game.add_player(&format!("Player {}", i + 1)).unwrap();
    }
    game
}

/// Start tile with a single road running from the left edge to a dead end
fn dead_end_start() -> Tile {
    Tile {
        id: 10_000,
        tile_type: TileType::Start,
        entities: vec![TileEntity::new(
            10_000,
            EntityKind::Road {
                from: RoadEnd::Edge(Direction::Left),
                to: RoadEnd::DeadEnd,
            },
        )],
        orientation: Orientation::Top,
    }
}

fn scripted_game(start: Tile, tiles: &[TileType], seed: u64) -> GameState {
    let mut factory = TileFactory::new();
    let deck = tiles.iter().map(|t| factory.stamp(*t)).collect();
    let mut game = GameState::with_tiles(2, start, deck, seed).unwrap();
    game.add_player("Ada").unwrap();
    game.add_player("Bob").unwrap();
    game
}

fn rotate_to(game: &mut GameState, orientation: Orientation) {
    for _ in 0..4 {
        if game.current_tile().map(|t| t.orientation) == Some(orientation) {
            return;
        }
        game.rotate_tile();
    }
    panic!("Tile never reached {:?}", orientation);
}

fn meeples_on_board(game: &GameState, player: PlayerId) -> u32 {
    game.placed_tiles()
        .iter()
        .flat_map(|placed| placed.tile.entities.iter())
        .filter(|entity| entity.meeple == Some(player))
        .count() as u32
}

#[test]
fn test_deck_conservation_through_a_whole_game() {
    let mut game = seated_game(3, 2024);
    let mut previous_scores = game.scores();
    let mut turns = 0;

    while !game.is_finished() {
        assert_eq!(
            game.deck_size() + game.placed_tiles().len(),
            TOTAL_TILE_COUNT,
            "Tile count drifted on turn {}",
            turns
        );

        let pos = *game
            .valid_positions()
            .first()
            .expect("The tile on offer always fits somewhere");
        game.place_tile(pos).unwrap();

        match game.valid_meeple_positions(pos).first() {
            Some(entity) => game.place_meeple(*entity).unwrap(),
            None => game.skip_meeple_placement().unwrap(),
        };

        for player in game.players() {
            assert!(
                player.meeples_remaining + meeples_on_board(&game, player.id) <= STARTING_MEEPLES,
                "Player {} has more meeples than they started with",
                player.id
            );
        }

        let scores = game.scores();
        for ((_, before), (_, after)) in previous_scores.iter().zip(scores.iter()) {
            assert!(after >= before, "Scores never go down");
        }
        previous_scores = scores;

        turns += 1;
        assert!(turns <= 80, "Game should end once the deck is used up");
    }

    let placed = game.placed_tiles();
    let ids: HashSet<_> = placed.iter().map(|p| p.tile.id).collect();
    assert_eq!(ids.len(), placed.len(), "No tile is placed twice");
    assert_eq!(game.deck_size() + placed.len(), TOTAL_TILE_COUNT);
    if !game.is_stalled() {
        assert_eq!(game.deck_size(), 0);
    }
}

#[test]
fn test_edge_rotation_by_orientation() {
    use EdgeType::{City, Grass, Road};
    let edges = [Grass, Road, City, Grass];

    assert_eq!(rotate_edges(edges, Orientation::Right), [Grass, Grass, Road, City]);
    assert_eq!(rotate_edges(edges, Orientation::Left), [Road, City, Grass, Grass]);

    let mut tile = TileFactory::new().stamp(TileType::CityOneRoadBentRight);
    let canonical = tile.edges();
    for _ in 0..4 {
        tile.rotate();
    }
    assert_eq!(tile.edges(), canonical);
}

#[test]
fn test_placement_symmetry_in_every_direction() {
    let mut factory = TileFactory::new();
    let tiles: Vec<Tile> = TileType::DECK.iter().map(|t| factory.stamp(*t)).collect();

    for a in &tiles {
        for b in &tiles {
            for orientation in Orientation::ALL {
                let mut b = b.clone();
                b.orientation = orientation;
                for direction in Direction::ALL {
                    let a_pos = Position::ORIGIN;
                    let b_pos = a_pos.neighbor(direction);

                    let forward = is_valid_placement(a_pos, a, b_pos, &b);
                    let backward = is_valid_placement(b_pos, &b, a_pos, a);
                    assert_eq!(forward, backward);
                    assert_eq!(
                        forward,
                        a.edge(direction) == b.edge(direction.opposite())
                    );
                }
            }
        }
    }
}

#[test]
fn test_straight_road_completes_only_when_capped() {
    let mut game = scripted_game(
        TileFactory::new().start_tile(),
        &[
            TileType::RoadStraight,
            TileType::RoadThreeCrossroad,
            TileType::RoadThreeCrossroad,
            TileType::Monastery,
        ],
        1,
    );

    // Extend the start road to the east; both ends stay open
    rotate_to(&mut game, Orientation::Right);
    assert!(game.place_tile(Position::new(1, 0)).unwrap().is_empty());
    assert!(game.skip_meeple_placement().unwrap().is_empty());

    // Cap the east end; the west end is still open
    rotate_to(&mut game, Orientation::Top);
    assert!(game.place_tile(Position::new(2, 0)).unwrap().is_empty());
    game.skip_meeple_placement().unwrap();

    // Cap the west end
    rotate_to(&mut game, Orientation::Top);
    let preview = game.place_tile(Position::new(-1, 0)).unwrap();
    assert_eq!(preview.len(), 1);
    assert_eq!(preview[0].kind, FeatureKind::Road);
    assert_eq!(preview[0].score, 4);
}

#[test]
fn test_monastery_completion_fires_once() {
    let mut factory = TileFactory::new();
    let mut board = Board::with_start_tile(factory.stamp(TileType::Monastery));
    let ring = Position::ORIGIN.surrounding();

    for cell in &ring[..7] {
        board.place(*cell, factory.stamp(TileType::Monastery));
        assert!(board.completed_monastery(Position::ORIGIN).is_none());
    }

    board.place(ring[7], factory.stamp(TileType::Monastery));
    let completed = board.completed_features_at(ring[7]);
    assert_eq!(completed.len(), 1);
    assert_eq!(completed[0].kind, FeatureKind::Monastery);
    assert_eq!(completed[0].score, MONASTERY_SCORE);
    assert_eq!(completed[0].positions, vec![Position::ORIGIN]);
    assert!(completed[0].winners.is_empty());

    // Later tiles further out never see the center monastery again
    for pos in [Position::new(2, 0), Position::new(2, 1), Position::new(-2, -1)] {
        board.place(pos, factory.stamp(TileType::Monastery));
        assert!(board
            .completed_features_at(pos)
            .iter()
            .all(|f| f.positions != vec![Position::ORIGIN]));
    }
}

#[test]
fn test_two_player_road_without_owner() {
    let mut game = scripted_game(
        dead_end_start(),
        &[
            TileType::RoadStraight,
            TileType::RoadThreeCrossroad,
            TileType::Monastery,
        ],
        3,
    );

    // Player 1 connects a straight road to the start road and passes
    assert_eq!(game.current_player_id(), 0);
    rotate_to(&mut game, Orientation::Right);
    assert!(game.place_tile(Position::new(-1, 0)).unwrap().is_empty());
    game.skip_meeple_placement().unwrap();

    // Player 2 caps the open end and passes as well
    assert_eq!(game.current_player_id(), 1);
    rotate_to(&mut game, Orientation::Top);
    game.place_tile(Position::new(-2, 0)).unwrap();
    let events = game.apply_action(GameAction::SkipMeeplePlacement).unwrap();

    let completed: Vec<&CompletedFeature> = events
        .iter()
        .filter_map(|e| match e {
            GameEvent::FeatureCompleted { feature } => Some(feature),
            _ => None,
        })
        .collect();
    assert_eq!(completed.len(), 1);
    assert_eq!(completed[0].kind, FeatureKind::Road);
    assert_eq!(completed[0].positions.len(), 3);
    assert!(completed[0].winners.is_empty());
    assert_eq!(game.scores(), vec![(0, 0), (1, 0)]);
    assert_eq!(game.current_player_id(), 0);
}

#[test]
fn test_two_player_road_of_length_two_claimed() {
    let mut game = scripted_game(
        dead_end_start(),
        &[
            TileType::RoadStraight,
            TileType::RoadThreeCrossroad,
            TileType::Monastery,
        ],
        3,
    );

    // Player 1 plays elsewhere, away from the start road
    rotate_to(&mut game, Orientation::Top);
    game.place_tile(Position::new(1, 0)).unwrap();
    game.skip_meeple_placement().unwrap();

    // Player 2 caps the start road directly and claims it
    rotate_to(&mut game, Orientation::Top);
    let cap = Position::new(-1, 0);
    let preview = game.place_tile(cap).unwrap();
    assert_eq!(preview.len(), 1);
    assert_eq!(preview[0].positions.len(), 2);

    let road = game
        .board()
        .get(&cap)
        .and_then(|tile| tile.road_through(Direction::Right))
        .map(|entity| entity.id)
        .unwrap();
    assert!(game.valid_meeple_positions(cap).contains(&road));

    let events = game.apply_action(GameAction::PlaceMeeple(road)).unwrap();
    assert!(matches!(
        events[0],
        GameEvent::MeeplePlaced { player: 1, .. }
    ));
    assert!(events.iter().any(|e| matches!(
        e,
        GameEvent::FeatureCompleted { feature } if feature.score == 2 && feature.winners == vec![1]
    )));

    assert_eq!(game.scores(), vec![(0, 0), (1, 2)]);
    let bob = game.get_player(1).unwrap();
    assert_eq!(bob.meeples_remaining, STARTING_MEEPLES);
}

#[test]
fn test_unplaceable_tile_is_requeued() {
    let mut factory = TileFactory::new();
    let start = factory.stamp(TileType::Monastery);
    let deck = vec![
        factory.stamp(TileType::Monastery),
        factory.stamp(TileType::CityFull),
        factory.stamp(TileType::Monastery),
    ];
    let city_id = deck[1].id;
    let mut game = GameState::with_tiles(2, start, deck, 99).unwrap();
    game.add_player("Ada").unwrap();
    game.add_player("Bob").unwrap();

    let events = game
        .apply_action(GameAction::PlaceTile(Position::new(0, 1)))
        .unwrap();

    assert!(events.contains(&GameEvent::TileRequeued { tile: city_id }));
    assert_eq!(game.deck_size(), 2, "Requeueing keeps the deck length");

    let current = game.current_tile().unwrap();
    assert_eq!(current.tile_type, TileType::Monastery);
    assert!(!game.valid_positions().is_empty());
    assert!(!game.is_stalled());
}

#[test]
fn test_deck_of_unplaceable_tiles_stalls() {
    let mut factory = TileFactory::new();
    let start = factory.stamp(TileType::Monastery);
    let deck = vec![factory.stamp(TileType::CityFull)];
    let mut game = GameState::with_tiles(2, start, deck, 5).unwrap();
    game.add_player("Ada").unwrap();
    game.add_player("Bob").unwrap();

    assert!(game.is_stalled());
    assert!(game.is_finished());
    assert_eq!(game.deck_size(), 1);
    assert_eq!(
        game.current_tile().unwrap().orientation,
        Orientation::Top,
        "A requeued tile is reset to its canonical orientation"
    );
    assert_eq!(
        game.place_tile(Position::new(0, 1)),
        Err(GameError::GameOver)
    );
}

#[test]
fn test_snapshot_tracks_game() {
    let mut game = seated_game(2, 77);
    let snapshot = game.snapshot();
    assert_eq!(snapshot.players.len(), 2);
    assert_eq!(snapshot.players_count, 2);
    assert_eq!(snapshot.deck_size, 71);
    assert_eq!(snapshot.valid_positions, game.valid_positions());
    assert_eq!(snapshot.current_player.map(|p| p.name), Some("Player 1".to_string()));

    let pos = snapshot.valid_positions[0];
    game.place_tile(pos).unwrap();
    let snapshot = game.snapshot();
    assert_eq!(snapshot.turn_state, TurnState::PlaceMeepleOrEnd);
    assert_eq!(snapshot.last_placed, Some(pos));
    assert_eq!(snapshot.placed_tiles.len(), 2);
}

#[test]
fn test_duplicate_names_rejected() {
    let mut game = GameState::with_seed(3, 1).unwrap();
    game.add_player("Ada").unwrap();

    assert_eq!(
        game.add_player("ada"),
        Err(GameError::NameTaken("ada".to_string()))
    );
    assert_eq!(game.players().len(), 1);
}
