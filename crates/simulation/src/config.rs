//! Tower geometry and timing constants.
//!
//! The grid is segment-indexed horizontally (signed, centered on segment 0 so
//! the tower grows symmetrically) and floor-indexed vertically (0 = ground).
//! All constants here are read-only configuration; validation of build
//! requests against them lives in `tower_grid`.

/// Highest buildable floor count. Floors are 0-indexed, so valid floors are
/// `0..MAX_FLOORS`.
pub const MAX_FLOORS: i32 = 64;

/// Horizontal build limit: legal segments are
/// `-MAX_HALF_WIDTH_SEGMENTS..=MAX_HALF_WIDTH_SEGMENTS`.
pub const MAX_HALF_WIDTH_SEGMENTS: i32 = 16;

/// World-space width of one segment.
pub const SEGMENT_WIDTH: f32 = 8.0;

/// World-space height of one floor.
pub const FLOOR_HEIGHT: f32 = 12.0;

/// World-space Y of floor 0.
pub const GROUND_LEVEL_Y: f32 = 0.0;

/// Walking speed of occupants in world units per second.
pub const OCCUPANT_SPEED: f32 = 24.0;

/// Maximum passengers per elevator car.
pub const ELEVATOR_CAPACITY: usize = 8;

/// Ticks a car holds its doors open before closing.
pub const ELEVATOR_DWELL_TICKS: u32 = 20;

/// Car travel speed in floors per tick (0.25 -> 0.4s per floor at 10 Hz).
pub const ELEVATOR_SPEED_FLOORS_PER_TICK: f32 = 0.25;

/// Seconds an occupant waits for a car before the timeout policy kicks in.
pub const WAIT_TIMEOUT_SECS: f32 = 30.0;

/// Ticks an occupant spends at the office before heading home.
pub const WORK_DURATION_TICKS: u32 = 600;

/// Ticks an occupant rests at home before commuting again.
pub const REST_DURATION_TICKS: u32 = 300;
