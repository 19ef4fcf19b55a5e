//! # TestTower — headless integration test harness
//!
//! Wraps `bevy::app::App` + `SimulationPlugin` in a fluent builder so
//! integration tests can set up a tower, run fixed-update ticks, and assert
//! on the resulting ECS state without a window or renderer.

use bevy::app::App;
use bevy::prelude::*;
use bevy::time::TimeUpdateStrategy;

use crate::config::ELEVATOR_CAPACITY;
use crate::elevator::{CarId, ElevatorBank};
use crate::occupant::{
    ActivityTicks, ElevatorTrip, HomePosition, Occupant, OccupantState, OccupantStateComp,
    OccupantVisibility, Position, WaitTimer, Workplace,
};
use crate::stats::{LifecycleCounters, TowerStats};
use crate::structures::{Lobby, Office, Structure, StructureKind};
use crate::tower_grid::TowerGrid;
use crate::SimulationPlugin;
use crate::SlowTickTimer;

/// A headless Bevy App wrapping `SimulationPlugin` for integration testing.
pub struct TestTower {
    app: App,
}

impl TestTower {
    /// Create an empty tower: bare grid, no cars, no structures.
    pub fn new() -> Self {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins);
        app.add_plugins(SimulationPlugin);
        // One update so Startup systems and resource init run.
        app.update();
        // Drive time manually from here on: every `app.update()` advances
        // real (and thus virtual) time by exactly one 100 ms timestep, so
        // `FixedUpdate` runs once per update regardless of wall clock.
        app.insert_resource(TimeUpdateStrategy::ManualDuration(
            std::time::Duration::from_millis(100),
        ));
        Self { app }
    }

    // -----------------------------------------------------------------------
    // World setup (builder pattern — consumes and returns Self)
    // -----------------------------------------------------------------------

    /// Place a structure directly, bypassing the event queue. Panics if the
    /// placement is illegal — tests should build legal towers explicitly.
    pub fn with_structure(
        mut self,
        kind: StructureKind,
        center_segment: i32,
        floor: i32,
        width: i32,
        height: i32,
    ) -> Self {
        let world = self.app.world_mut();
        assert!(
            world
                .resource::<TowerGrid>()
                .can_place(center_segment, floor, width, height),
            "illegal test placement: {kind:?} at segment {center_segment} floor {floor}"
        );
        let structure = Structure {
            kind,
            center_segment,
            floor,
            width,
            height,
        };
        let mut entity = world.spawn(structure);
        match kind {
            StructureKind::Lobby => {
                entity.insert(Lobby);
            }
            StructureKind::Office { capacity } => {
                entity.insert(Office { capacity });
            }
            StructureKind::FloorSlab => {}
        }
        let id = entity.id();
        world
            .resource_mut::<TowerGrid>()
            .register(id, center_segment, floor, width, height);
        self
    }

    /// Install an elevator car at `segment` serving floors `0..=top_floor`.
    pub fn with_car(mut self, segment: i32, top_floor: i32) -> Self {
        self.app
            .world_mut()
            .resource_mut::<ElevatorBank>()
            .add_car(segment, top_floor, ELEVATOR_CAPACITY);
        self
    }

    /// Spawn one occupant in an arbitrary state at an arbitrary position,
    /// assigned to the office entity at the given grid cell.
    pub fn with_worker(
        mut self,
        state: OccupantState,
        position: Vec2,
        office_segment: i32,
        office_floor: i32,
    ) -> Self {
        let office = self
            .grid()
            .structure_at(office_segment, office_floor)
            .expect("office must be placed before spawning its worker");
        self.app.world_mut().spawn((
            Occupant,
            OccupantStateComp(state),
            Position {
                x: position.x,
                y: position.y,
            },
            HomePosition(Vec2::new(-200.0, 0.0)),
            Workplace { office },
            ElevatorTrip::default(),
            WaitTimer::default(),
            ActivityTicks::default(),
            OccupantVisibility(state != OccupantState::AtHome),
        ));
        self
    }

    // -----------------------------------------------------------------------
    // Simulation
    // -----------------------------------------------------------------------

    /// Run N updates. With the manual time strategy each update advances
    /// time by one 100 ms timestep, which at 1x speed is one fixed tick.
    pub fn tick(&mut self, n: u64) {
        for _ in 0..n {
            self.app.update();
        }
    }

    /// Run until the SlowTickTimer fires at least once (~100 ticks).
    pub fn tick_slow_cycle(&mut self) {
        self.tick(SlowTickTimer::INTERVAL);
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn world_mut(&mut self) -> &mut World {
        self.app.world_mut()
    }

    pub fn grid(&self) -> &TowerGrid {
        self.app.world().resource::<TowerGrid>()
    }

    pub fn elevators(&self) -> &ElevatorBank {
        self.app.world().resource::<ElevatorBank>()
    }

    pub fn elevators_mut(&mut self) -> Mut<'_, ElevatorBank> {
        self.app.world_mut().resource_mut::<ElevatorBank>()
    }

    pub fn counters(&self) -> &LifecycleCounters {
        self.app.world().resource::<LifecycleCounters>()
    }

    pub fn stats(&self) -> &TowerStats {
        self.app.world().resource::<TowerStats>()
    }

    pub fn resource<T: Resource>(&self) -> &T {
        self.app.world().resource::<T>()
    }

    /// Count all occupant entities.
    pub fn occupant_count(&mut self) -> usize {
        let world = self.app.world_mut();
        world
            .query_filtered::<Entity, With<Occupant>>()
            .iter(world)
            .count()
    }

    /// Count occupants in a specific state.
    pub fn occupants_in_state(&mut self, state: OccupantState) -> usize {
        let world = self.app.world_mut();
        world
            .query::<&OccupantStateComp>()
            .iter(world)
            .filter(|s| s.0 == state)
            .count()
    }

    /// States of every occupant, in spawn order.
    pub fn occupant_states(&mut self) -> Vec<OccupantState> {
        let world = self.app.world_mut();
        world
            .query::<&OccupantStateComp>()
            .iter(world)
            .map(|s| s.0)
            .collect()
    }

    /// The single car's id, for single-car tests.
    pub fn only_car(&self) -> CarId {
        let bank = self.elevators();
        assert_eq!(bank.cars.len(), 1, "expected exactly one car");
        bank.cars[0].id
    }
}
