//! Headless tower simulation.
//!
//! Runs entirely on Bevy's `FixedUpdate` schedule at 10 Hz. Each tick is
//! sequenced `PreSim` (clock, construction, staffing) then `Simulation`
//! (elevators, movement, occupant state machines) then `PostSim` (stats).
//! Everything mutable flows through resources and components; there is no
//! rendering and no global state outside the ECS.

use bevy::prelude::*;

pub mod ascii;
pub mod config;
pub mod construction;
pub mod elevator;
pub mod fsm;
pub mod movement;
pub mod occupant;
pub mod occupant_states;
pub mod sim_clock;
pub mod simulation_sets;
pub mod spawner;
pub mod stats;
pub mod structures;
pub mod tower_grid;

#[cfg(test)]
pub mod test_harness;

use simulation_sets::SimulationSet;

/// Raw count of fixed-update ticks since startup, independent of the sim
/// clock (it keeps counting while the sim is paused).
#[derive(Resource, Default)]
pub struct TickCounter(pub u64);

/// Fires every `INTERVAL` ticks for low-frequency work like progress logs.
#[derive(Resource, Default)]
pub struct SlowTickTimer {
    ticks: u64,
    fired: bool,
}

impl SlowTickTimer {
    pub const INTERVAL: u64 = 100;

    pub fn just_fired(&self) -> bool {
        self.fired
    }
}

fn advance_tick_counters(mut counter: ResMut<TickCounter>, mut slow: ResMut<SlowTickTimer>) {
    counter.0 += 1;
    slow.ticks += 1;
    slow.fired = slow.ticks % SlowTickTimer::INTERVAL == 0;
}

pub struct SimulationPlugin;

impl Plugin for SimulationPlugin {
    fn build(&self, app: &mut App) {
        app.configure_sets(
            FixedUpdate,
            (
                SimulationSet::PreSim,
                SimulationSet::Simulation,
                SimulationSet::PostSim,
            )
                .chain(),
        )
        .init_resource::<TickCounter>()
        .init_resource::<SlowTickTimer>()
        .add_systems(
            FixedUpdate,
            advance_tick_counters.in_set(SimulationSet::PreSim),
        )
        .add_plugins((
            sim_clock::SimClockPlugin,
            tower_grid::TowerGridPlugin,
            construction::ConstructionPlugin,
            spawner::SpawnerPlugin,
            elevator::ElevatorPlugin,
            movement::MovementPlugin,
            occupant_states::OccupantPlugin,
            stats::StatsPlugin,
        ));
    }
}
