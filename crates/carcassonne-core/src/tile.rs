//! Tile instances and the entities printed on them.
//!
//! This module contains:
//! - Edge classification (grass, road, city) and rotation of edge layouts
//! - Entity types (road segments, city segments, monasteries)
//! - Tile instances stamped from catalog archetypes
//!
//! Entities are always stored in the tile's canonical layout; the tile's
//! `orientation` is applied when asking which world side an entity touches.

use crate::catalog::TileType;
use crate::grid::{Direction, Orientation, Position};
use crate::player::PlayerId;
use serde::{Deserialize, Serialize};

/// Unique tile instance identifier within a game
pub type TileId = u32;

/// Unique entity identifier within a game
pub type EntityId = u32;

/// Classification of one side of a tile for edge matching
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EdgeType {
    Grass,
    Road,
    City,
}

/// Rotate a canonical edge layout clockwise to the given orientation.
///
/// Each quarter turn moves every edge one slot clockwise, so the last slot
/// wraps around to the front: `[a, b, c, d]` turned `Right` is `[d, a, b, c]`.
pub fn rotate_edges(edges: [EdgeType; 4], orientation: Orientation) -> [EdgeType; 4] {
    let mut rotated = edges;
    rotated.rotate_right(orientation.quarter_turns());
    rotated
}

/// One end of a road segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RoadEnd {
    /// Leaves the tile through this side
    Edge(Direction),
    /// Stops at the tile center (village, monastery, crossroad, city gate)
    DeadEnd,
}

impl RoadEnd {
    /// This end in world directions for a tile turned to `orientation`
    pub fn rotated(self, orientation: Orientation) -> Self {
        match self {
            RoadEnd::Edge(direction) => RoadEnd::Edge(direction.rotated(orientation)),
            RoadEnd::DeadEnd => RoadEnd::DeadEnd,
        }
    }
}

/// What an entity is
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum EntityKind {
    /// A road segment connecting two ends
    Road { from: RoadEnd, to: RoadEnd },
    /// A city segment spanning one to four sides
    City {
        edges: Vec<Direction>,
        fortified: bool,
    },
    /// A monastery in the middle of the tile
    Monastery,
}

impl EntityKind {
    pub fn is_road(&self) -> bool {
        matches!(self, EntityKind::Road { .. })
    }

    pub fn is_city(&self) -> bool {
        matches!(self, EntityKind::City { .. })
    }

    pub fn is_monastery(&self) -> bool {
        matches!(self, EntityKind::Monastery)
    }
}

/// An entity on a specific tile instance, optionally claimed by a meeple
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileEntity {
    pub id: EntityId,
    #[serde(flatten)]
    pub kind: EntityKind,
    /// Owner of the meeple standing on this entity
    pub meeple: Option<PlayerId>,
}

impl TileEntity {
    pub fn new(id: EntityId, kind: EntityKind) -> Self {
        Self {
            id,
            kind,
            meeple: None,
        }
    }

    /// Road ends in world directions, or `None` for non-road entities
    pub fn road_ends(&self, orientation: Orientation) -> Option<(RoadEnd, RoadEnd)> {
        match &self.kind {
            EntityKind::Road { from, to } => {
                Some((from.rotated(orientation), to.rotated(orientation)))
            }
            _ => None,
        }
    }

    /// City sides in world directions (empty for non-city entities)
    pub fn city_edges(&self, orientation: Orientation) -> Vec<Direction> {
        match &self.kind {
            EntityKind::City { edges, .. } => {
                edges.iter().map(|edge| edge.rotated(orientation)).collect()
            }
            _ => Vec::new(),
        }
    }

    pub fn is_fortified(&self) -> bool {
        matches!(self.kind, EntityKind::City { fortified: true, .. })
    }
}

/// A tile instance: an archetype snapshot with its own id and orientation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tile {
    pub id: TileId,
    pub tile_type: TileType,
    pub entities: Vec<TileEntity>,
    pub orientation: Orientation,
}

impl Tile {
    /// Edge layout before rotation, derived from the entities
    pub fn canonical_edges(&self) -> [EdgeType; 4] {
        compute_edges(&self.entities)
    }

    /// Edge layout as the tile currently lies
    pub fn edges(&self) -> [EdgeType; 4] {
        rotate_edges(self.canonical_edges(), self.orientation)
    }

    /// Edge type on one world side
    pub fn edge(&self, direction: Direction) -> EdgeType {
        self.edges()[direction.index()]
    }

    /// Turn the tile 90° clockwise
    pub fn rotate(&mut self) {
        self.orientation = self.orientation.next();
    }

    /// Get an entity by id
    pub fn entity(&self, id: EntityId) -> Option<&TileEntity> {
        self.entities.iter().find(|e| e.id == id)
    }

    /// Get a mutable entity by id
    pub fn entity_mut(&mut self, id: EntityId) -> Option<&mut TileEntity> {
        self.entities.iter_mut().find(|e| e.id == id)
    }

    /// The monastery entity, if this tile has one
    pub fn monastery(&self) -> Option<&TileEntity> {
        self.entities.iter().find(|e| e.kind.is_monastery())
    }

    /// The road entity with an end on the given world side
    pub fn road_through(&self, side: Direction) -> Option<&TileEntity> {
        self.entities.iter().find(|entity| {
            entity
                .road_ends(self.orientation)
                .is_some_and(|(from, to)| from == RoadEnd::Edge(side) || to == RoadEnd::Edge(side))
        })
    }

    /// The city entity covering the given world side
    pub fn city_through(&self, side: Direction) -> Option<&TileEntity> {
        self.entities
            .iter()
            .find(|entity| entity.city_edges(self.orientation).contains(&side))
    }

    /// Whether any entity on this tile carries a meeple
    pub fn has_meeple(&self) -> bool {
        self.entities.iter().any(|e| e.meeple.is_some())
    }
}

/// Derive the grass/road/city layout of the four sides from a set of entities.
///
/// Sides not touched by any road or city are grass; dead ends and monasteries
/// do not touch a side.
pub fn compute_edges(entities: &[TileEntity]) -> [EdgeType; 4] {
    let mut edges = [EdgeType::Grass; 4];

    for entity in entities {
        match &entity.kind {
            EntityKind::City { edges: sides, .. } => {
                for side in sides {
                    edges[side.index()] = EdgeType::City;
                }
            }
            EntityKind::Road { from, to } => {
                for end in [from, to] {
                    if let RoadEnd::Edge(side) = end {
                        edges[side.index()] = EdgeType::Road;
                    }
                }
            }
            EntityKind::Monastery => {}
        }
    }

    edges
}

/// A tile on the board together with its cell
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacedTile {
    pub position: Position,
    #[serde(flatten)]
    pub tile: Tile,
}
