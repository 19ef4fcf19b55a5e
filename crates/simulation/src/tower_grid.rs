use std::collections::HashMap;

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::{
    FLOOR_HEIGHT, GROUND_LEVEL_Y, MAX_FLOORS, MAX_HALF_WIDTH_SEGMENTS, SEGMENT_WIDTH,
};

/// Key for one occupied cell of the tower: a (segment, floor) pair.
///
/// Segments are signed and centered on 0; floors are 0-indexed with 0 = ground.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridCell {
    pub segment: i32,
    pub floor: i32,
}

/// Authoritative map from grid cells to the structure entity occupying them.
///
/// A cell maps to at most one structure. The grid validates placement
/// legality (`can_place`) but never re-validates on `register` — callers must
/// gate every `register` behind a `can_place` check. Mutations happen only at
/// construction/demolition time, so the O(cells) scans in `unregister` and
/// the floor queries are acceptable.
#[derive(Resource, Debug, Default)]
pub struct TowerGrid {
    cells: HashMap<GridCell, Entity>,
}

impl TowerGrid {
    /// Columns spanned by a structure of `width` segments centered on
    /// `center`. Width 9 centered on 0 spans -4..=4; even widths bias one
    /// segment left of center.
    pub fn footprint_columns(center: i32, width: i32) -> std::ops::Range<i32> {
        let start = center - width / 2;
        start..start + width
    }

    /// Placement legality check. Fails closed and has no side effects.
    ///
    /// A placement is legal when the floor range fits `0..MAX_FLOORS`, every
    /// spanned segment is within the configured half-width, every target cell
    /// is free, and (for floor > 0) every spanned column has an occupied cell
    /// directly below the base row. Floor 0 is always supported (ground).
    pub fn can_place(&self, center_segment: i32, floor: i32, width: i32, height: i32) -> bool {
        if floor < 0 || floor + height > MAX_FLOORS {
            return false;
        }
        let columns = Self::footprint_columns(center_segment, width);
        if columns.start < -MAX_HALF_WIDTH_SEGMENTS || columns.end - 1 > MAX_HALF_WIDTH_SEGMENTS {
            return false;
        }
        for segment in columns.clone() {
            // No partial support, no overhang: every column of the base row
            // must sit on an occupied cell one floor down.
            if floor > 0 && !self.is_occupied(segment, floor - 1) {
                return false;
            }
            for row in floor..floor + height {
                if self.is_occupied(segment, row) {
                    return false;
                }
            }
        }
        true
    }

    /// Writes one cell entry per (column, row) of the footprint.
    ///
    /// Does not re-validate — `can_place` is the caller's responsibility.
    pub fn register(
        &mut self,
        structure: Entity,
        center_segment: i32,
        floor: i32,
        width: i32,
        height: i32,
    ) {
        for segment in Self::footprint_columns(center_segment, width) {
            for row in floor..floor + height {
                self.cells.insert(GridCell { segment, floor: row }, structure);
            }
        }
    }

    /// Removes every cell pointing at `structure`. Idempotent: unknown
    /// entities are a no-op, not an error.
    pub fn unregister(&mut self, structure: Entity) {
        self.cells.retain(|_, owner| *owner != structure);
    }

    pub fn is_occupied(&self, segment: i32, floor: i32) -> bool {
        self.cells.contains_key(&GridCell { segment, floor })
    }

    pub fn structure_at(&self, segment: i32, floor: i32) -> Option<Entity> {
        self.cells.get(&GridCell { segment, floor }).copied()
    }

    pub fn highest_occupied_floor(&self) -> Option<i32> {
        self.cells.keys().map(|c| c.floor).max()
    }

    pub fn has_structures_on_floor(&self, floor: i32) -> bool {
        self.cells.keys().any(|c| c.floor == floor)
    }

    pub fn occupied_cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Occupied horizontal extent as (min_segment, max_segment), if any.
    pub fn horizontal_extent(&self) -> Option<(i32, i32)> {
        let min = self.cells.keys().map(|c| c.segment).min()?;
        let max = self.cells.keys().map(|c| c.segment).max()?;
        Some((min, max))
    }

    /// World position of a cell center. Pure function of the configured
    /// segment width / floor height / ground level.
    pub fn grid_to_world(cell: GridCell) -> Vec2 {
        Vec2::new(
            cell.segment as f32 * SEGMENT_WIDTH,
            GROUND_LEVEL_Y + cell.floor as f32 * FLOOR_HEIGHT,
        )
    }

    /// Inverse of `grid_to_world`, rounding to the nearest cell.
    pub fn world_to_grid(position: Vec2) -> GridCell {
        GridCell {
            segment: (position.x / SEGMENT_WIDTH).round() as i32,
            floor: ((position.y - GROUND_LEVEL_Y) / FLOOR_HEIGHT).round() as i32,
        }
    }

    /// Floor index of a world-space height, rounded to the nearest floor.
    pub fn floor_at_y(y: f32) -> i32 {
        ((y - GROUND_LEVEL_Y) / FLOOR_HEIGHT).round() as i32
    }

    /// World-space height of a floor.
    pub fn floor_to_y(floor: i32) -> f32 {
        GROUND_LEVEL_Y + floor as f32 * FLOOR_HEIGHT
    }
}

pub struct TowerGridPlugin;

impl Plugin for TowerGridPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<TowerGrid>();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ent(index: u32) -> Entity {
        Entity::from_raw(index)
    }

    #[test]
    fn test_ground_floor_always_placeable() {
        let grid = TowerGrid::default();
        assert!(grid.can_place(0, 0, 9, 1));
        assert!(grid.can_place(-10, 0, 3, 2));
    }

    #[test]
    fn test_bounds_fail_closed() {
        let grid = TowerGrid::default();
        assert!(!grid.can_place(0, -1, 1, 1));
        assert!(!grid.can_place(0, MAX_FLOORS, 1, 1));
        assert!(!grid.can_place(0, MAX_FLOORS - 1, 1, 2));
        assert!(!grid.can_place(MAX_HALF_WIDTH_SEGMENTS + 1, 0, 1, 1));
        assert!(!grid.can_place(-MAX_HALF_WIDTH_SEGMENTS - 1, 0, 1, 1));
        // Wide footprint poking past the half-width limit.
        assert!(!grid.can_place(MAX_HALF_WIDTH_SEGMENTS, 0, 3, 1));
    }

    #[test]
    fn test_support_invariant() {
        let mut grid = TowerGrid::default();
        // 9-wide office centered at 0 on floor 1 with nothing below: no support.
        assert!(!grid.can_place(0, 1, 9, 1));

        // Matching-width floor-0 structure makes it legal.
        grid.register(ent(1), 0, 0, 9, 1);
        assert!(grid.can_place(0, 1, 9, 1));
    }

    #[test]
    fn test_partial_support_rejected() {
        let mut grid = TowerGrid::default();
        // Floor 0 support covers segments -2..=2 only.
        grid.register(ent(1), 0, 0, 5, 1);
        // Width 9 spans -4..=4: segments -4,-3,3,4 are unsupported overhang.
        assert!(!grid.can_place(0, 1, 9, 1));
        assert!(grid.can_place(0, 1, 5, 1));
    }

    #[test]
    fn test_collision_invariant() {
        let mut grid = TowerGrid::default();
        grid.register(ent(1), 0, 0, 5, 1);
        assert!(!grid.can_place(0, 0, 1, 1));
        assert!(!grid.can_place(2, 0, 3, 1)); // overlaps segment 2
        assert!(grid.can_place(4, 0, 3, 1)); // 3..=5, clear of -2..=2
    }

    #[test]
    fn test_register_unregister_round_trip() {
        let mut grid = TowerGrid::default();
        grid.register(ent(1), 0, 0, 9, 1);
        let baseline = grid.occupied_cell_count();

        grid.register(ent(2), 0, 1, 9, 1);
        assert_eq!(grid.occupied_cell_count(), baseline + 9);
        grid.unregister(ent(2));
        assert_eq!(grid.occupied_cell_count(), baseline);
        assert!(grid.can_place(0, 1, 9, 1));

        // Unregistering something never registered is a no-op.
        grid.unregister(ent(99));
        assert_eq!(grid.occupied_cell_count(), baseline);
    }

    #[test]
    fn test_support_holds_after_interleavings() {
        let mut grid = TowerGrid::default();
        grid.register(ent(1), 0, 0, 9, 1);
        grid.register(ent(2), 0, 1, 9, 1);
        assert!(grid.can_place(0, 2, 9, 1));

        // Pulling the middle floor out removes support for floor 2.
        grid.unregister(ent(2));
        assert!(!grid.can_place(0, 2, 9, 1));

        grid.register(ent(3), 0, 1, 9, 1);
        assert!(grid.can_place(0, 2, 9, 1));
    }

    #[test]
    fn test_multi_floor_structure_supports_itself() {
        let mut grid = TowerGrid::default();
        grid.register(ent(1), 0, 0, 3, 1);
        // Height 2 starting at floor 1: only the base row needs support below;
        // the structure's own cells carry floor 2.
        assert!(grid.can_place(0, 1, 3, 2));
        grid.register(ent(2), 0, 1, 3, 2);
        assert!(grid.can_place(0, 3, 3, 1));
    }

    #[test]
    fn test_floor_queries() {
        let mut grid = TowerGrid::default();
        assert_eq!(grid.highest_occupied_floor(), None);
        assert!(!grid.has_structures_on_floor(0));

        grid.register(ent(1), 0, 0, 5, 1);
        grid.register(ent(2), 0, 1, 3, 1);
        assert_eq!(grid.highest_occupied_floor(), Some(1));
        assert!(grid.has_structures_on_floor(1));
        assert!(!grid.has_structures_on_floor(2));
        assert_eq!(grid.horizontal_extent(), Some((-2, 2)));
    }

    #[test]
    fn test_coord_round_trip() {
        for segment in [-16, -3, 0, 7, 16] {
            for floor in [0, 1, 12, 63] {
                let cell = GridCell { segment, floor };
                let world = TowerGrid::grid_to_world(cell);
                assert_eq!(TowerGrid::world_to_grid(world), cell);
                assert_eq!(TowerGrid::floor_at_y(world.y), floor);
            }
        }
    }

    #[test]
    fn test_footprint_columns() {
        let columns: Vec<i32> = TowerGrid::footprint_columns(0, 9).collect();
        assert_eq!(columns, vec![-4, -3, -2, -1, 0, 1, 2, 3, 4]);
        let even: Vec<i32> = TowerGrid::footprint_columns(0, 2).collect();
        assert_eq!(even, vec![-1, 0]);
    }
}
