//! Spatial Grid
//!
//! Uniform-cell broad-phase index over the world. Each cell records the
//! ids whose bounding rectangle overlaps it; a side table from id to
//! occupied cells makes removal proportional to the cells the entity
//! actually touched. Queries return candidate ids only; exact
//! geometric filtering is the caller's job.
//!
//! Uses BTreeMap/BTreeSet for deterministic iteration order.

use std::collections::{BTreeMap, BTreeSet};

use crate::core::hitbox::Hitbox;
use crate::core::vec2::Vec2;
use crate::protocol::EntityId;

/// World units per grid cell, tuned so typical entities span 1-4 cells.
pub const CELL_SIZE: f32 = 16.0;

/// Uniform spatial grid keyed by cell coordinate.
#[derive(Debug, Clone)]
pub struct Grid {
    /// Highest valid cell x.
    max_x: u16,
    /// Highest valid cell y.
    max_y: u16,
    cells: BTreeMap<(u16, u16), BTreeSet<EntityId>>,
    /// id -> cells it currently occupies.
    occupied: BTreeMap<EntityId, Vec<(u16, u16)>>,
}

impl Grid {
    /// Create a grid covering a `width` x `height` world.
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            max_x: (width / CELL_SIZE).ceil() as u16,
            max_y: (height / CELL_SIZE).ceil() as u16,
            cells: BTreeMap::new(),
            occupied: BTreeMap::new(),
        }
    }

    /// Cell coordinate for a position, clamped into the valid range.
    fn cell_of(&self, pos: Vec2) -> (u16, u16) {
        let x = (pos.x / CELL_SIZE).floor().max(0.0) as u16;
        let y = (pos.y / CELL_SIZE).floor().max(0.0) as u16;
        (x.min(self.max_x), y.min(self.max_y))
    }

    /// Record `id` against every cell its bounds overlap.
    ///
    /// Bounds outside the world clamp into the outermost cells.
    pub fn insert(&mut self, id: EntityId, min: Vec2, max: Vec2) {
        debug_assert!(
            !self.occupied.contains_key(&id),
            "entity {id} inserted twice"
        );
        let (min_x, min_y) = self.cell_of(min);
        let (max_x, max_y) = self.cell_of(max);

        let mut cells = Vec::with_capacity(
            (max_x - min_x + 1) as usize * (max_y - min_y + 1) as usize,
        );
        for x in min_x..=max_x {
            for y in min_y..=max_y {
                self.cells.entry((x, y)).or_default().insert(id);
                cells.push((x, y));
            }
        }
        self.occupied.insert(id, cells);
    }

    /// Re-index `id` under new bounds. Must run after every position
    /// mutation, before the next query.
    pub fn update(&mut self, id: EntityId, min: Vec2, max: Vec2) {
        self.remove(id);
        self.insert(id, min, max);
    }

    /// Drop `id` from every cell it occupies.
    pub fn remove(&mut self, id: EntityId) {
        let Some(cells) = self.occupied.remove(&id) else {
            return;
        };
        for coord in cells {
            if let Some(set) = self.cells.get_mut(&coord) {
                set.remove(&id);
                if set.is_empty() {
                    self.cells.remove(&coord);
                }
            }
        }
    }

    /// Whether `id` is currently indexed.
    pub fn contains(&self, id: EntityId) -> bool {
        self.occupied.contains_key(&id)
    }

    /// Candidate ids whose recorded cells overlap the rectangle.
    pub fn query_rect(&self, min: Vec2, max: Vec2) -> BTreeSet<EntityId> {
        let (min_x, min_y) = self.cell_of(min);
        let (max_x, max_y) = self.cell_of(max);

        let mut out = BTreeSet::new();
        for x in min_x..=max_x {
            for y in min_y..=max_y {
                if let Some(set) = self.cells.get(&(x, y)) {
                    out.extend(set.iter().copied());
                }
            }
        }
        out
    }

    /// Candidate ids near a hitbox, via its bounding rectangle.
    pub fn query_hitbox(&self, hitbox: &Hitbox) -> BTreeSet<EntityId> {
        let (min, max) = hitbox.to_rect();
        self.query_rect(min, max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> Grid {
        Grid::new(128.0, 128.0)
    }

    #[test]
    fn test_query_full_bounds_returns_all_inserted() {
        let mut g = grid();
        g.insert(EntityId(1), Vec2::new(2.0, 2.0), Vec2::new(4.0, 4.0));
        g.insert(EntityId(2), Vec2::new(100.0, 100.0), Vec2::new(104.0, 104.0));
        g.insert(EntityId(3), Vec2::new(60.0, 10.0), Vec2::new(62.0, 12.0));
        g.remove(EntityId(3));

        let all = g.query_rect(Vec2::ZERO, Vec2::new(128.0, 128.0));
        assert_eq!(
            all.into_iter().collect::<Vec<_>>(),
            vec![EntityId(1), EntityId(2)]
        );
    }

    #[test]
    fn test_update_moves_entity_between_cells() {
        let mut g = grid();
        g.insert(EntityId(1), Vec2::new(2.0, 2.0), Vec2::new(4.0, 4.0));
        assert!(g.query_rect(Vec2::ZERO, Vec2::new(8.0, 8.0)).contains(&EntityId(1)));

        g.update(EntityId(1), Vec2::new(100.0, 100.0), Vec2::new(104.0, 104.0));
        assert!(!g.query_rect(Vec2::ZERO, Vec2::new(8.0, 8.0)).contains(&EntityId(1)));
        assert!(g
            .query_rect(Vec2::new(96.0, 96.0), Vec2::new(112.0, 112.0))
            .contains(&EntityId(1)));
    }

    #[test]
    fn test_spanning_entity_found_from_every_overlapped_cell() {
        let mut g = grid();
        // Straddles the cell boundary at x = 16.
        g.insert(EntityId(5), Vec2::new(14.0, 2.0), Vec2::new(18.0, 4.0));

        assert!(g.query_rect(Vec2::ZERO, Vec2::new(15.0, 15.0)).contains(&EntityId(5)));
        assert!(g
            .query_rect(Vec2::new(17.0, 0.0), Vec2::new(30.0, 15.0))
            .contains(&EntityId(5)));
    }

    #[test]
    fn test_out_of_world_bounds_clamp_to_edge_cells() {
        let mut g = grid();
        g.insert(
            EntityId(1),
            Vec2::new(-50.0, -50.0),
            Vec2::new(-40.0, -40.0),
        );
        g.insert(EntityId(2), Vec2::new(500.0, 500.0), Vec2::new(600.0, 600.0));

        assert!(g.query_rect(Vec2::ZERO, Vec2::new(1.0, 1.0)).contains(&EntityId(1)));
        assert!(g
            .query_rect(Vec2::new(127.0, 127.0), Vec2::new(128.0, 128.0))
            .contains(&EntityId(2)));
    }

    #[test]
    fn test_remove_is_idempotent() {
        let mut g = grid();
        g.insert(EntityId(9), Vec2::new(1.0, 1.0), Vec2::new(2.0, 2.0));
        g.remove(EntityId(9));
        g.remove(EntityId(9));
        assert!(g.query_rect(Vec2::ZERO, Vec2::new(128.0, 128.0)).is_empty());
    }

    #[test]
    fn test_query_hitbox_uses_bounding_rect() {
        let mut g = grid();
        g.insert(EntityId(1), Vec2::new(30.0, 30.0), Vec2::new(34.0, 34.0));
        let probe = Hitbox::circle(Vec2::new(32.0, 32.0), 4.0);
        assert!(g.query_hitbox(&probe).contains(&EntityId(1)));
    }
}
