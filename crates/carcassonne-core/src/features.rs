//! Feature detection across the board.
//!
//! A feature is a maximal connected set of same-kind entities: a road, a city
//! or a single monastery with its neighborhood. Features are never stored;
//! they are recomputed from the board by walking entity connections with an
//! explicit stack.
//!
//! This module contains:
//! - Road and city traversal keyed by composite (cell, entity, side) nodes
//! - Completion detection for the tile just placed
//! - Claim checks used to validate meeple placement
//! - Majority resolution among the meeples standing on a feature

use crate::board::Board;
use crate::grid::Position;
use crate::player::PlayerId;
use crate::tile::{EntityId, EntityKind, RoadEnd, TileEntity};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use tracing::trace;

/// Points for a completed monastery
pub const MONASTERY_SCORE: u32 = 9;

/// Points per tile of a completed city
pub const CITY_TILE_SCORE: u32 = 2;

/// Points per fortified tile of a completed city
pub const FORTIFIED_CITY_TILE_SCORE: u32 = 4;

/// Kind of feature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FeatureKind {
    Road,
    City,
    Monastery,
}

impl FeatureKind {
    /// The feature an entity belongs to
    pub fn of(kind: &EntityKind) -> Self {
        match kind {
            EntityKind::Road { .. } => FeatureKind::Road,
            EntityKind::City { .. } => FeatureKind::City,
            EntityKind::Monastery => FeatureKind::Monastery,
        }
    }
}

/// Current extent of a feature, complete or not
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSummary {
    pub kind: FeatureKind,
    /// Participating entities, ascending
    pub entity_ids: Vec<EntityId>,
    /// Cells holding those entities, ascending
    pub positions: Vec<Position>,
    /// Meeples per player, ascending by player
    pub meeples: Vec<(PlayerId, u32)>,
    pub is_complete: bool,
    /// What the feature is worth if it were scored now
    pub score: u32,
}

/// A feature closed by a placement, with the players who take its points
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletedFeature {
    pub kind: FeatureKind,
    pub entity_ids: Vec<EntityId>,
    pub positions: Vec<Position>,
    pub meeples: Vec<(PlayerId, u32)>,
    pub score: u32,
    /// Players tied for the most meeples; empty when nobody claimed it
    pub winners: Vec<PlayerId>,
}

impl CompletedFeature {
    fn from_summary(summary: FeatureSummary) -> Self {
        let winners = majority_winners(&summary.meeples);
        Self {
            kind: summary.kind,
            entity_ids: summary.entity_ids,
            positions: summary.positions,
            meeples: summary.meeples,
            score: summary.score,
            winners,
        }
    }

    /// Meeples a player has on this feature
    pub fn meeples_of(&self, player: PlayerId) -> u32 {
        self.meeples
            .iter()
            .find(|(p, _)| *p == player)
            .map(|(_, count)| *count)
            .unwrap_or(0)
    }

    pub fn is_won_by(&self, player: PlayerId) -> bool {
        self.winners.contains(&player)
    }
}

/// Every player tied for the highest meeple count. A feature without meeples
/// has no winners.
pub fn majority_winners(meeples: &[(PlayerId, u32)]) -> Vec<PlayerId> {
    let max = meeples.iter().map(|(_, count)| *count).max().unwrap_or(0);
    if max == 0 {
        return Vec::new();
    }
    meeples
        .iter()
        .filter(|(_, count)| *count == max)
        .map(|(player, _)| *player)
        .collect()
}

/// When a walk may give up early
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stop {
    Never,
    AtOpenEdge,
    AtMeeple,
}

/// Accumulated state of one walk
#[derive(Debug, Default)]
struct Traversal {
    entities: BTreeSet<EntityId>,
    positions: BTreeSet<Position>,
    /// Per cell: whether any participating city entity there is fortified
    fortified: BTreeMap<Position, bool>,
    meeples: BTreeMap<PlayerId, u32>,
    dead_ends: u32,
    circular: bool,
    open: bool,
}

impl Traversal {
    /// Record an entity the first time it is reached. Returns true if a
    /// meeple stands on it.
    fn visit(&mut self, pos: Position, entity: &TileEntity) -> bool {
        if !self.entities.insert(entity.id) {
            return false;
        }
        self.positions.insert(pos);
        if entity.kind.is_city() {
            let fortified = self.fortified.entry(pos).or_insert(false);
            *fortified |= entity.is_fortified();
        }
        match entity.meeple {
            Some(owner) => {
                *self.meeples.entry(owner).or_insert(0) += 1;
                true
            }
            None => false,
        }
    }

    fn is_claimed(&self) -> bool {
        !self.meeples.is_empty()
    }

    fn road_complete(&self) -> bool {
        self.dead_ends == 2 || self.circular
    }

    fn city_score(&self) -> u32 {
        self.fortified
            .values()
            .map(|fortified| {
                if *fortified {
                    FORTIFIED_CITY_TILE_SCORE
                } else {
                    CITY_TILE_SCORE
                }
            })
            .sum()
    }

    fn into_summary(self, kind: FeatureKind, is_complete: bool, score: u32) -> FeatureSummary {
        FeatureSummary {
            kind,
            entity_ids: self.entities.into_iter().collect(),
            positions: self.positions.into_iter().collect(),
            meeples: self.meeples.into_iter().collect(),
            is_complete,
            score,
        }
    }
}

impl Board {
    // ==================== Traversal ====================

    fn walk_road(&self, start: Position, entity_id: EntityId, stop: Stop) -> Option<Traversal> {
        let tile = self.get(&start)?;
        let (a, b) = tile.entity(entity_id)?.road_ends(tile.orientation)?;

        let mut walk = Traversal::default();
        let mut visited: HashSet<(Position, EntityId, RoadEnd)> = HashSet::new();
        let mut stack = vec![(start, entity_id, a), (start, entity_id, b)];

        while let Some((pos, id, end)) = stack.pop() {
            if !visited.insert((pos, id, end)) {
                if visited.len() > 1 {
                    walk.circular = true;
                }
                continue;
            }

            let Some(tile) = self.get(&pos) else {
                continue;
            };
            let Some(entity) = tile.entity(id) else {
                continue;
            };
            if walk.visit(pos, entity) && stop == Stop::AtMeeple {
                return Some(walk);
            }

            let side = match end {
                RoadEnd::DeadEnd => {
                    walk.dead_ends += 1;
                    continue;
                }
                RoadEnd::Edge(side) => side,
            };

            let next_pos = pos.neighbor(side);
            let entering = side.opposite();
            let next = self.get(&next_pos).and_then(|next_tile| {
                next_tile
                    .road_through(entering)
                    .and_then(|road| road.road_ends(next_tile.orientation).map(|ends| (road.id, ends)))
            });

            match next {
                Some((next_id, (from, to))) => {
                    let exit = if from == RoadEnd::Edge(entering) { to } else { from };
                    stack.push((next_pos, next_id, exit));
                }
                None => walk.open = true,
            }
        }

        Some(walk)
    }

    fn walk_city(&self, start: Position, entity_id: EntityId, stop: Stop) -> Option<Traversal> {
        if !self.get(&start)?.entity(entity_id)?.kind.is_city() {
            return None;
        }

        let mut walk = Traversal::default();
        let mut visited: HashSet<(Position, EntityId)> = HashSet::new();
        let mut stack = vec![(start, entity_id)];

        while let Some((pos, id)) = stack.pop() {
            if !visited.insert((pos, id)) {
                continue;
            }

            let Some(tile) = self.get(&pos) else {
                continue;
            };
            let Some(entity) = tile.entity(id) else {
                continue;
            };
            if walk.visit(pos, entity) && stop == Stop::AtMeeple {
                return Some(walk);
            }

            for side in entity.city_edges(tile.orientation) {
                let next_pos = pos.neighbor(side);
                let next = self
                    .get(&next_pos)
                    .and_then(|next_tile| next_tile.city_through(side.opposite()));

                match next {
                    Some(next) => stack.push((next_pos, next.id)),
                    None => {
                        walk.open = true;
                        if stop == Stop::AtOpenEdge {
                            return Some(walk);
                        }
                    }
                }
            }
        }

        Some(walk)
    }

    /// Occupied cells in the 3x3 block centered on `pos`, center included
    fn occupied_block(&self, pos: &Position) -> u32 {
        let around = pos
            .surrounding()
            .iter()
            .filter(|cell| self.is_occupied(cell))
            .count() as u32;
        around + u32::from(self.is_occupied(pos))
    }

    fn monastery_summary(&self, pos: Position) -> Option<FeatureSummary> {
        let monastery = self.get(&pos)?.monastery()?;
        let is_complete = self.is_surrounded(&pos);
        let score = if is_complete {
            MONASTERY_SCORE
        } else {
            self.occupied_block(&pos)
        };

        Some(FeatureSummary {
            kind: FeatureKind::Monastery,
            entity_ids: vec![monastery.id],
            positions: vec![pos],
            meeples: monastery.meeple.map(|owner| (owner, 1)).into_iter().collect(),
            is_complete,
            score,
        })
    }

    // ==================== Summaries ====================

    /// The whole feature an entity belongs to, whether complete or not
    pub fn feature(&self, pos: Position, entity_id: EntityId) -> Option<FeatureSummary> {
        let entity = self.get(&pos)?.entity(entity_id)?;
        match FeatureKind::of(&entity.kind) {
            FeatureKind::Road => {
                let walk = self.walk_road(pos, entity_id, Stop::Never)?;
                let complete = walk.road_complete();
                let score = walk.positions.len() as u32;
                Some(walk.into_summary(FeatureKind::Road, complete, score))
            }
            FeatureKind::City => {
                let walk = self.walk_city(pos, entity_id, Stop::Never)?;
                let complete = !walk.open;
                let score = walk.city_score();
                Some(walk.into_summary(FeatureKind::City, complete, score))
            }
            FeatureKind::Monastery => self.monastery_summary(pos),
        }
    }

    // ==================== Completion ====================

    /// The road through `entity_id` if both its ends are closed
    pub fn completed_road(&self, pos: Position, entity_id: EntityId) -> Option<CompletedFeature> {
        let walk = self.walk_road(pos, entity_id, Stop::Never)?;
        if !walk.road_complete() {
            return None;
        }
        let score = walk.positions.len() as u32;
        Some(CompletedFeature::from_summary(
            walk.into_summary(FeatureKind::Road, true, score),
        ))
    }

    /// The city through `entity_id` if it has no open edge
    pub fn completed_city(&self, pos: Position, entity_id: EntityId) -> Option<CompletedFeature> {
        let walk = self.walk_city(pos, entity_id, Stop::AtOpenEdge)?;
        if walk.open {
            return None;
        }
        let score = walk.city_score();
        Some(CompletedFeature::from_summary(
            walk.into_summary(FeatureKind::City, true, score),
        ))
    }

    /// The monastery at `pos` if all eight cells around it are filled
    pub fn completed_monastery(&self, pos: Position) -> Option<CompletedFeature> {
        self.monastery_summary(pos)
            .filter(|summary| summary.is_complete)
            .map(CompletedFeature::from_summary)
    }

    /// Every feature the tile at `pos` takes part in that is now complete.
    ///
    /// Roads and cities are walked from each entity on the tile; monasteries
    /// are checked in the 3x3 block around it. A feature reached through more
    /// than one entity is reported once.
    pub fn completed_features_at(&self, pos: Position) -> Vec<CompletedFeature> {
        let Some(tile) = self.get(&pos) else {
            return Vec::new();
        };

        let mut seen: HashSet<Vec<EntityId>> = HashSet::new();
        let mut completed = Vec::new();

        for entity in &tile.entities {
            let feature = match &entity.kind {
                EntityKind::Road { .. } => self.completed_road(pos, entity.id),
                EntityKind::City { .. } => self.completed_city(pos, entity.id),
                EntityKind::Monastery => None,
            };
            if let Some(feature) = feature {
                if seen.insert(feature.entity_ids.clone()) {
                    completed.push(feature);
                }
            }
        }

        for cell in std::iter::once(pos).chain(pos.surrounding()) {
            if let Some(feature) = self.completed_monastery(cell) {
                if seen.insert(feature.entity_ids.clone()) {
                    completed.push(feature);
                }
            }
        }

        for feature in &completed {
            trace!(
                kind = ?feature.kind,
                score = feature.score,
                tiles = feature.positions.len(),
                "feature completed at {}",
                pos
            );
        }

        completed
    }

    // ==================== Claims ====================

    /// Whether any meeple stands anywhere on the road through `entity_id`
    pub fn is_road_claimed(&self, pos: Position, entity_id: EntityId) -> bool {
        self.walk_road(pos, entity_id, Stop::AtMeeple)
            .is_some_and(|walk| walk.is_claimed())
    }

    /// Whether any meeple stands anywhere in the city through `entity_id`
    pub fn is_city_claimed(&self, pos: Position, entity_id: EntityId) -> bool {
        self.walk_city(pos, entity_id, Stop::AtMeeple)
            .is_some_and(|walk| walk.is_claimed())
    }

    /// Whether the monastery entity carries a meeple
    pub fn is_monastery_claimed(&self, pos: Position, entity_id: EntityId) -> bool {
        self.get(&pos)
            .and_then(|tile| tile.entity(entity_id))
            .is_some_and(|entity| entity.kind.is_monastery() && entity.meeple.is_some())
    }

    /// Claim check for any entity kind. Unknown entities count as claimed.
    pub fn is_claimed(&self, pos: Position, entity_id: EntityId) -> bool {
        let Some(entity) = self.get(&pos).and_then(|tile| tile.entity(entity_id)) else {
            return true;
        };
        match FeatureKind::of(&entity.kind) {
            FeatureKind::Road => self.is_road_claimed(pos, entity_id),
            FeatureKind::City => self.is_city_claimed(pos, entity_id),
            FeatureKind::Monastery => self.is_monastery_claimed(pos, entity_id),
        }
    }

    // ==================== Meeples ====================

    /// Stand a meeple on an entity. Returns false if the entity is missing or
    /// already occupied.
    pub(crate) fn put_meeple(&mut self, pos: Position, entity_id: EntityId, owner: PlayerId) -> bool {
        match self
            .get_mut(&pos)
            .and_then(|tile| tile.entity_mut(entity_id))
        {
            Some(entity) if entity.meeple.is_none() => {
                entity.meeple = Some(owner);
                true
            }
            _ => false,
        }
    }

    /// Remove every meeple from a feature's entities, returning how many each
    /// player lost
    pub(crate) fn strip_meeples(&mut self, feature: &CompletedFeature) -> BTreeMap<PlayerId, u32> {
        let mut removed = BTreeMap::new();
        for pos in &feature.positions {
            let Some(tile) = self.get_mut(pos) else {
                continue;
            };
            for entity in tile.entities.iter_mut() {
                if !feature.entity_ids.contains(&entity.id) {
                    continue;
                }
                if let Some(owner) = entity.meeple.take() {
                    *removed.entry(owner).or_insert(0) += 1;
                }
            }
        }
        removed
    }
}
