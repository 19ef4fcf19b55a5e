//! Plain-text tower rendering for logs and debugging.
//!
//! Crops to the occupied extent of the grid, top floor first. Structure cells
//! draw as `#`, elevator shafts as `|`, a car at its (rounded) floor as `E`,
//! empty air as `.`, with a ground line underneath.

use crate::elevator::ElevatorBank;
use crate::tower_grid::TowerGrid;

pub fn render_tower(grid: &TowerGrid, bank: &ElevatorBank) -> String {
    let Some((mut min_seg, mut max_seg)) = grid.horizontal_extent() else {
        return String::from("(empty tower)\n");
    };
    let mut top_floor = grid.highest_occupied_floor().unwrap_or(0);
    for car in &bank.cars {
        min_seg = min_seg.min(car.segment);
        max_seg = max_seg.max(car.segment);
        top_floor = top_floor.max(car.top_floor);
    }

    let mut out = String::new();
    for floor in (0..=top_floor).rev() {
        for segment in min_seg..=max_seg {
            let car_here = bank.cars.iter().any(|c| {
                c.segment == segment && c.current_floor.round() as i32 == floor
            });
            let glyph = if car_here {
                'E'
            } else if bank
                .cars
                .iter()
                .any(|c| c.segment == segment && floor <= c.top_floor)
            {
                '|'
            } else if grid.is_occupied(segment, floor) {
                '#'
            } else {
                '.'
            };
            out.push(glyph);
        }
        out.push('\n');
    }
    for _ in min_seg..=max_seg {
        out.push('=');
    }
    out.push('\n');
    out
}
