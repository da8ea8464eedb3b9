//! Tile archetypes and the base-game deck composition.
//!
//! Every archetype describes its entities in the canonical (`Top`) layout.
//! Instances are stamped from archetypes by a [`TileFactory`], which hands out
//! tile and entity ids that are unique for the lifetime of one game.

use crate::grid::{Direction, Orientation};
use crate::tile::{EntityId, EntityKind, RoadEnd, Tile, TileEntity, TileId};
use serde::{Deserialize, Serialize};

use Direction::{Bottom, Left, Right, Top};

/// Number of tiles in the canonical deck (start tile excluded)
pub const STANDARD_DECK_SIZE: usize = 71;

/// Number of tiles in a canonical game (deck + start tile)
pub const TOTAL_TILE_COUNT: usize = STANDARD_DECK_SIZE + 1;

/// Tile archetypes of the base game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TileType {
    Start,
    MonasteryRoad,
    Monastery,
    CityFull,
    CityOneRoad,
    CityOne,
    CityTwoFortified,
    CityTwo,
    CityTwoOpposite,
    CityTwoAdjacent,
    CityOneRoadBentRight,
    CityOneRoadBentLeft,
    CityOneCrossroad,
    CityCornerFortified,
    CityCorner,
    CityCornerRoadFortified,
    CityCornerRoad,
    CityThreeFortified,
    CityThree,
    CityThreeRoadFortified,
    CityThreeRoad,
    RoadStraight,
    RoadCurved,
    RoadThreeCrossroad,
    RoadFourCrossroad,
}

fn road(from: Direction, to: Direction) -> EntityKind {
    EntityKind::Road {
        from: RoadEnd::Edge(from),
        to: RoadEnd::Edge(to),
    }
}

fn dead_end(from: Direction) -> EntityKind {
    EntityKind::Road {
        from: RoadEnd::Edge(from),
        to: RoadEnd::DeadEnd,
    }
}

fn city(edges: &[Direction]) -> EntityKind {
    EntityKind::City {
        edges: edges.to_vec(),
        fortified: false,
    }
}

fn fortified(edges: &[Direction]) -> EntityKind {
    EntityKind::City {
        edges: edges.to_vec(),
        fortified: true,
    }
}

impl TileType {
    /// Every archetype that appears in the shuffled deck
    pub const DECK: [TileType; 24] = [
        TileType::MonasteryRoad,
        TileType::Monastery,
        TileType::CityFull,
        TileType::CityOneRoad,
        TileType::CityOne,
        TileType::CityTwoFortified,
        TileType::CityTwo,
        TileType::CityTwoOpposite,
        TileType::CityTwoAdjacent,
        TileType::CityOneRoadBentRight,
        TileType::CityOneRoadBentLeft,
        TileType::CityOneCrossroad,
        TileType::CityCornerFortified,
        TileType::CityCorner,
        TileType::CityCornerRoadFortified,
        TileType::CityCornerRoad,
        TileType::CityThreeFortified,
        TileType::CityThree,
        TileType::CityThreeRoadFortified,
        TileType::CityThreeRoad,
        TileType::RoadStraight,
        TileType::RoadCurved,
        TileType::RoadThreeCrossroad,
        TileType::RoadFourCrossroad,
    ];

    /// How many copies of this archetype the deck holds
    pub fn deck_count(&self) -> usize {
        match self {
            TileType::Start => 0,
            TileType::MonasteryRoad => 2,
            TileType::Monastery => 4,
            TileType::CityFull => 1,
            TileType::CityOneRoad => 4,
            TileType::CityOne => 5,
            TileType::CityTwoFortified => 2,
            TileType::CityTwo => 1,
            TileType::CityTwoOpposite => 3,
            TileType::CityTwoAdjacent => 2,
            TileType::CityOneRoadBentRight => 3,
            TileType::CityOneRoadBentLeft => 3,
            TileType::CityOneCrossroad => 3,
            TileType::CityCornerFortified => 2,
            TileType::CityCorner => 3,
            TileType::CityCornerRoadFortified => 2,
            TileType::CityCornerRoad => 3,
            TileType::CityThreeFortified => 1,
            TileType::CityThree => 3,
            TileType::CityThreeRoadFortified => 2,
            TileType::CityThreeRoad => 1,
            TileType::RoadStraight => 8,
            TileType::RoadCurved => 9,
            TileType::RoadThreeCrossroad => 3,
            TileType::RoadFourCrossroad => 1,
        }
    }

    /// Entity templates in canonical layout
    pub fn entities(&self) -> Vec<EntityKind> {
        match self {
            TileType::Start | TileType::CityOneRoad => vec![city(&[Top]), road(Left, Right)],
            TileType::MonasteryRoad => vec![EntityKind::Monastery, dead_end(Bottom)],
            TileType::Monastery => vec![EntityKind::Monastery],
            TileType::CityFull => vec![fortified(&[Top, Right, Bottom, Left])],
            TileType::CityOne => vec![city(&[Top])],
            TileType::CityTwoFortified => vec![fortified(&[Left, Right])],
            TileType::CityTwo => vec![city(&[Left, Right])],
            TileType::CityTwoOpposite => vec![city(&[Top]), city(&[Bottom])],
            TileType::CityTwoAdjacent => vec![city(&[Top]), city(&[Left])],
            TileType::CityOneRoadBentRight => vec![city(&[Top]), road(Right, Bottom)],
            TileType::CityOneRoadBentLeft => vec![city(&[Top]), road(Left, Bottom)],
            TileType::CityOneCrossroad => vec![
                city(&[Top]),
                dead_end(Left),
                dead_end(Right),
                dead_end(Bottom),
            ],
            TileType::CityCornerFortified => vec![fortified(&[Top, Right])],
            TileType::CityCorner => vec![city(&[Top, Right])],
            TileType::CityCornerRoadFortified => {
                vec![fortified(&[Top, Left]), road(Right, Bottom)]
            }
            TileType::CityCornerRoad => vec![city(&[Top, Left]), road(Right, Bottom)],
            TileType::CityThreeFortified => vec![fortified(&[Top, Left, Right])],
            TileType::CityThree => vec![city(&[Top, Left, Right])],
            TileType::CityThreeRoadFortified => {
                vec![fortified(&[Top, Left, Right]), dead_end(Bottom)]
            }
            TileType::CityThreeRoad => vec![city(&[Top, Left, Right]), dead_end(Bottom)],
            TileType::RoadStraight => vec![road(Top, Bottom)],
            TileType::RoadCurved => vec![road(Left, Bottom)],
            TileType::RoadThreeCrossroad => {
                vec![dead_end(Left), dead_end(Right), dead_end(Bottom)]
            }
            TileType::RoadFourCrossroad => vec![
                dead_end(Top),
                dead_end(Right),
                dead_end(Bottom),
                dead_end(Left),
            ],
        }
    }
}

/// Stamps tile instances from archetypes, allocating unique ids.
#[derive(Debug, Clone, Default)]
pub struct TileFactory {
    next_tile_id: TileId,
    next_entity_id: EntityId,
}

impl TileFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a fresh instance of an archetype in canonical orientation
    pub fn stamp(&mut self, tile_type: TileType) -> Tile {
        let entities = tile_type
            .entities()
            .into_iter()
            .map(|kind| {
                let id = self.next_entity_id;
                self.next_entity_id += 1;
                TileEntity::new(id, kind)
            })
            .collect();

        let id = self.next_tile_id;
        self.next_tile_id += 1;

        Tile {
            id,
            tile_type,
            entities,
            orientation: Orientation::Top,
        }
    }

    /// The start tile pre-placed at the origin
    pub fn start_tile(&mut self) -> Tile {
        self.stamp(TileType::Start)
    }

    /// The full base-game deck, unshuffled, grouped by archetype
    pub fn standard_deck(&mut self) -> Vec<Tile> {
        let mut deck = Vec::with_capacity(STANDARD_DECK_SIZE);
        for tile_type in TileType::DECK {
            for _ in 0..tile_type.deck_count() {
                deck.push(self.stamp(tile_type));
            }
        }
        deck
    }
}
