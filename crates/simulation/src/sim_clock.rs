use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::simulation_sets::SimulationSet;

/// Simulation clock advanced once per `FixedUpdate` tick.
///
/// Day/hour semantics are deliberately absent — the core only needs elapsed
/// sim time and a pause flag. Speed is applied by scaling the fixed timestep
/// (`sync_fixed_timestep`), so a tick always advances the same sim duration.
#[derive(Resource, Debug, Clone, Serialize, Deserialize)]
pub struct SimClock {
    pub tick: u64,
    pub elapsed_seconds: f64,
    pub speed: f32,
    pub paused: bool,
}

impl Default for SimClock {
    fn default() -> Self {
        Self {
            tick: 0,
            elapsed_seconds: 0.0,
            speed: 1.0,
            paused: false,
        }
    }
}

impl SimClock {
    /// Sim seconds per tick at 1x speed (10 Hz).
    pub const SECONDS_PER_TICK: f32 = 0.1;

    pub fn tick(&mut self) {
        if self.paused {
            return;
        }
        self.tick += 1;
        self.elapsed_seconds += f64::from(Self::SECONDS_PER_TICK);
    }

    pub fn formatted(&self) -> String {
        format!("t={} ({:.1}s)", self.tick, self.elapsed_seconds)
    }
}

pub fn tick_sim_clock(mut clock: ResMut<SimClock>) {
    clock.tick();
}

/// Scales the `FixedUpdate` timestep based on clock speed. Base rate is
/// 10 Hz (100 ms). At 2x speed the timestep becomes 50 ms, and so on.
pub fn sync_fixed_timestep(clock: Res<SimClock>, mut time: ResMut<Time<Fixed>>) {
    let base = std::time::Duration::from_millis(100);
    let effective = if clock.paused || clock.speed <= 0.0 {
        base
    } else {
        base.div_f64(f64::from(clock.speed.clamp(0.25, 16.0)))
    };
    time.set_timestep(effective);
}

pub struct SimClockPlugin;

impl Plugin for SimClockPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<SimClock>()
            .add_systems(FixedUpdate, tick_sim_clock.in_set(SimulationSet::PreSim))
            .add_systems(Update, sync_fixed_timestep);
    }
}
