//! Headless tower simulation runner.
//!
//! Builds a small demo tower at startup and logs a progress report (stats
//! plus an ASCII rendering) every slow-tick cycle. Set `TOWERWORKS_SEED` to
//! reproduce a specific run.

use std::time::Duration;

use bevy::app::ScheduleRunnerPlugin;
use bevy::log::LogPlugin;
use bevy::prelude::*;

use simulation::ascii::render_tower;
use simulation::config::ELEVATOR_CAPACITY;
use simulation::construction::PlaceStructure;
use simulation::elevator::ElevatorBank;
use simulation::sim_clock::SimClock;
use simulation::simulation_sets::SimulationSet;
use simulation::spawner::SimRng;
use simulation::stats::{LifecycleCounters, TowerStats};
use simulation::structures::StructureKind;
use simulation::tower_grid::TowerGrid;
use simulation::SimulationPlugin;
use simulation::SlowTickTimer;

fn main() {
    let mut app = App::new();

    app.add_plugins(
        MinimalPlugins.set(ScheduleRunnerPlugin::run_loop(Duration::from_millis(10))),
    )
    .add_plugins(LogPlugin::default())
    .add_plugins(SimulationPlugin);

    if let Some(seed) = std::env::var("TOWERWORKS_SEED")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
    {
        info!("seeding simulation rng with {seed}");
        app.insert_resource(SimRng::from_seed(seed));
    }

    app.add_systems(Startup, build_demo_tower).add_systems(
        FixedUpdate,
        log_progress
            .in_set(SimulationSet::PostSim)
            .after(simulation::stats::collect_tower_stats),
    );

    app.run();
}

/// A lobby, three office floors above it, and two elevator shafts. Requests
/// are queued in dependency order so each floor finds its support in place.
fn build_demo_tower(
    mut requests: EventWriter<PlaceStructure>,
    mut elevators: ResMut<ElevatorBank>,
) {
    requests.send(PlaceStructure {
        kind: StructureKind::Lobby,
        center_segment: 0,
        floor: 0,
        width: 9,
        height: 1,
    });
    for floor in 1..=3 {
        requests.send(PlaceStructure {
            kind: StructureKind::Office { capacity: 6 },
            center_segment: 0,
            floor,
            width: 9,
            height: 1,
        });
    }
    elevators.add_car(6, 3, ELEVATOR_CAPACITY);
    elevators.add_car(7, 3, ELEVATOR_CAPACITY);
    info!("demo tower queued: lobby + 3 office floors, 2 cars");
}

fn log_progress(
    slow: Res<SlowTickTimer>,
    clock: Res<SimClock>,
    stats: Res<TowerStats>,
    counters: Res<LifecycleCounters>,
    grid: Res<TowerGrid>,
    elevators: Res<ElevatorBank>,
) {
    if !slow.just_fired() {
        return;
    }
    info!(
        "{} pop={} home={} commuting={} waiting={} riding={} working={} in_cars={}",
        clock.formatted(),
        stats.population,
        stats.at_home,
        stats.commuting,
        stats.waiting_for_elevator,
        stats.riding,
        stats.working,
        stats.passengers_in_cars,
    );
    info!(
        "cycles={} boardings={} up_timeouts={} down_rerecalls={} stale_recoveries={}",
        counters.completed_cycles,
        counters.boardings,
        counters.up_wait_timeouts,
        counters.down_wait_rerecalls,
        counters.stale_car_recoveries,
    );
    info!("\n{}", render_tower(&grid, &elevators));
}
