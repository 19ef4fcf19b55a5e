use bevy::prelude::*;

use crate::elevator::ElevatorBank;
use crate::occupant::{Occupant, OccupantState, OccupantStateComp};
use crate::simulation_sets::SimulationSet;

/// Monotonic lifecycle event counters, bumped by the occupant state machine
/// as things happen. Cheap enough to keep exact.
#[derive(Resource, Debug, Clone, Copy, Default)]
pub struct LifecycleCounters {
    /// Successful `request_board` calls by occupants.
    pub boardings: u64,
    /// Up-waits abandoned after the timeout (occupant went home instead).
    pub up_wait_timeouts: u64,
    /// Down-waits on upper floors that re-issued their call after a timeout
    /// window (upper floors never give up).
    pub down_wait_rerecalls: u64,
    /// Mid-ride stale-car fallbacks (teleport recovery).
    pub stale_car_recoveries: u64,
    /// Completed home-to-home lifecycle loops.
    pub completed_cycles: u64,
    /// Occupants despawned after their office vanished.
    pub recycled_occupants: u64,
}

/// Per-tick population snapshot, rebuilt in `PostSim`.
#[derive(Resource, Debug, Clone, Copy, Default)]
pub struct TowerStats {
    pub population: usize,
    pub at_home: usize,
    pub commuting: usize,
    pub waiting_for_elevator: usize,
    pub riding: usize,
    pub working: usize,
    pub passengers_in_cars: usize,
}

pub fn collect_tower_stats(
    occupants: Query<&OccupantStateComp, With<Occupant>>,
    bank: Res<ElevatorBank>,
    mut stats: ResMut<TowerStats>,
) {
    let mut next = TowerStats {
        passengers_in_cars: bank.total_passengers(),
        ..Default::default()
    };
    for state in &occupants {
        next.population += 1;
        match state.0 {
            OccupantState::AtHome => next.at_home += 1,
            OccupantState::Working => next.working += 1,
            s if s.is_in_elevator() => next.riding += 1,
            s if s.is_waiting_for_elevator() => next.waiting_for_elevator += 1,
            _ => next.commuting += 1,
        }
    }
    *stats = next;
}

pub struct StatsPlugin;

impl Plugin for StatsPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<LifecycleCounters>()
            .init_resource::<TowerStats>()
            .add_systems(
                FixedUpdate,
                collect_tower_stats.in_set(SimulationSet::PostSim),
            );
    }
}
