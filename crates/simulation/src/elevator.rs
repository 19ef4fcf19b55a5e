//! Elevator cars and call dispatch.
//!
//! ## Data model
//! - `ElevatorCar`: per-car state machine (idle / moving / doors open),
//!   fractional current floor, passenger manifest, ordered stop list
//! - `ElevatorBank`: top-level resource owning all cars and the queue of
//!   calls no car could take yet
//!
//! Occupants hold `CarId` handles rather than references; a removed car makes
//! `car(id)` return `None`, so a stale handle is detectable instead of
//! dangling. Ids are never reused.
//!
//! ## Dispatch policy
//! `recall_car` prefers the idle car nearest the call floor; failing that, a
//! moving car whose travel direction matches the call and whose remaining
//! path covers the floor (it stops on the way instead of wasting a trip).
//! All ties break toward the lowest car id, which keeps dispatch
//! deterministic for tests.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::{ELEVATOR_DWELL_TICKS, ELEVATOR_SPEED_FLOORS_PER_TICK};
use crate::sim_clock::SimClock;
use crate::simulation_sets::SimulationSet;

/// Stable identifier for an elevator car. Never reused within a run.
pub type CarId = u32;

/// Cars snap to a floor when within this fraction of it.
const FLOOR_EPSILON: f32 = 0.001;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Up,
    Down,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CarState {
    Idle,
    MovingToFloor,
    DoorsOpen,
}

/// A pending stop on a car's route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stop {
    pub floor: i32,
    pub direction: Direction,
}

/// A call for service at a floor that no car has taken yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElevatorCall {
    pub floor: i32,
    pub direction: Direction,
}

/// One elevator car. The shaft sits at `segment`; the car serves floors
/// `0..=top_floor`.
#[derive(Debug, Clone)]
pub struct ElevatorCar {
    pub id: CarId,
    pub segment: i32,
    pub top_floor: i32,
    pub current_floor: f32,
    pub target_floor: i32,
    pub state: CarState,
    pub dwell_ticks: u32,
    pub capacity: usize,
    pub passengers: Vec<Entity>,
    pub stops: Vec<Stop>,
}

impl ElevatorCar {
    /// Stationary means the doors can open for boarding: idle or doors open,
    /// exactly at a floor.
    pub fn is_stationary_at(&self, floor: i32) -> bool {
        matches!(self.state, CarState::Idle | CarState::DoorsOpen)
            && (self.current_floor - floor as f32).abs() < FLOOR_EPSILON
    }

    pub fn is_full(&self) -> bool {
        self.passengers.len() >= self.capacity
    }

    /// Travel direction while moving, derived from target vs. position.
    pub fn travel_direction(&self) -> Option<Direction> {
        if self.state != CarState::MovingToFloor {
            return None;
        }
        if (self.target_floor as f32) > self.current_floor {
            Some(Direction::Up)
        } else {
            Some(Direction::Down)
        }
    }

    /// Whether `floor` lies on the car's remaining path toward its target.
    pub fn path_covers(&self, floor: i32) -> bool {
        match self.travel_direction() {
            Some(Direction::Up) => {
                floor as f32 >= self.current_floor && floor <= self.target_floor
            }
            Some(Direction::Down) => {
                floor as f32 <= self.current_floor && floor >= self.target_floor
            }
            None => false,
        }
    }

    fn push_stop(&mut self, floor: i32, direction: Direction) {
        let stop = Stop { floor, direction };
        if !self.stops.contains(&stop) {
            self.stops.push(stop);
        }
    }

    /// Nearest queued stop lying between the car and its current target in
    /// the travel direction. Falls back to the target itself, so the
    /// original trip always completes.
    fn next_floor_en_route(&self) -> i32 {
        let dir = (self.target_floor as f32 - self.current_floor).signum();
        self.stops
            .iter()
            .map(|s| s.floor)
            .filter(|&f| {
                (f as f32 - self.current_floor) * dir >= 0.0
                    && (f - self.target_floor) as f32 * dir <= 0.0
            })
            .min_by(|a, b| {
                let da = (*a as f32 - self.current_floor).abs();
                let db = (*b as f32 - self.current_floor).abs();
                da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
            })
            .unwrap_or(self.target_floor)
    }

    /// Next stop when idle: the nearest pending floor, lower floor on ties.
    fn next_stop(&self) -> Option<Stop> {
        self.stops.iter().copied().min_by(|a, b| {
            let da = (a.floor as f32 - self.current_floor).abs();
            let db = (b.floor as f32 - self.current_floor).abs();
            da.partial_cmp(&db)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.floor.cmp(&b.floor))
        })
    }

    /// Drops passengers that fail the liveness predicate, returning how many
    /// were removed. Runs on door-open cycles so a destroyed occupant can
    /// never wedge the manifest.
    pub fn prune_passengers(&mut self, alive: impl Fn(Entity) -> bool) -> usize {
        let before = self.passengers.len();
        self.passengers.retain(|&p| alive(p));
        before - self.passengers.len()
    }

    /// Advances the car by one tick: pick up the next stop when idle, travel
    /// toward the target, open doors on arrival, close them after the dwell.
    fn step(&mut self) {
        match self.state {
            CarState::Idle => {
                if let Some(stop) = self.next_stop() {
                    if self.is_stationary_at(stop.floor) {
                        // Already there: open doors instead of moving.
                        self.stops.retain(|s| s.floor != stop.floor);
                        self.state = CarState::DoorsOpen;
                        self.dwell_ticks = ELEVATOR_DWELL_TICKS;
                    } else {
                        self.target_floor = stop.floor;
                        self.state = CarState::MovingToFloor;
                    }
                }
            }
            CarState::MovingToFloor => {
                // Calls accepted while moving are served on the way, not
                // after the original trip.
                let next = self.next_floor_en_route();
                let delta = next as f32 - self.current_floor;
                if delta.abs() <= ELEVATOR_SPEED_FLOORS_PER_TICK {
                    self.current_floor = next as f32;
                    self.stops.retain(|s| s.floor != next);
                    self.state = CarState::DoorsOpen;
                    self.dwell_ticks = ELEVATOR_DWELL_TICKS;
                } else {
                    self.current_floor += ELEVATOR_SPEED_FLOORS_PER_TICK * delta.signum();
                }
            }
            CarState::DoorsOpen => {
                if self.dwell_ticks > 0 {
                    self.dwell_ticks -= 1;
                } else {
                    self.state = CarState::Idle;
                }
            }
        }
    }
}

/// Top-level resource for the elevator system: all cars plus calls waiting
/// for assignment.
#[derive(Resource, Debug, Default)]
pub struct ElevatorBank {
    pub cars: Vec<ElevatorCar>,
    pub pending_calls: Vec<ElevatorCall>,
    next_car_id: CarId,
}

impl ElevatorBank {
    /// Installs a car at `segment` serving floors `0..=top_floor`, parked at
    /// ground. Returns its id.
    pub fn add_car(&mut self, segment: i32, top_floor: i32, capacity: usize) -> CarId {
        let id = self.next_car_id;
        self.next_car_id += 1;
        self.cars.push(ElevatorCar {
            id,
            segment,
            top_floor,
            current_floor: 0.0,
            target_floor: 0,
            state: CarState::Idle,
            dwell_ticks: 0,
            capacity,
            passengers: Vec::new(),
            stops: Vec::new(),
        });
        id
    }

    /// Removes a car. Handles held by riders go stale and are detected by
    /// their owners (`car(id)` returns `None`).
    pub fn remove_car(&mut self, id: CarId) {
        self.cars.retain(|c| c.id != id);
    }

    pub fn car(&self, id: CarId) -> Option<&ElevatorCar> {
        self.cars.iter().find(|c| c.id == id)
    }

    pub fn car_mut(&mut self, id: CarId) -> Option<&mut ElevatorCar> {
        self.cars.iter_mut().find(|c| c.id == id)
    }

    /// A car that is at `floor`, stationary, and not at capacity. Lowest id
    /// wins. Never blocks.
    pub fn available_car_at_floor(&self, floor: i32) -> Option<CarId> {
        self.cars
            .iter()
            .filter(|c| c.is_stationary_at(floor) && !c.is_full() && floor <= c.top_floor)
            .map(|c| c.id)
            .min()
    }

    /// Boards `occupant` onto a car. Fails if the car is missing or full, or
    /// is not open/idle at the occupant's current floor. On success the
    /// passenger joins the manifest and the destination becomes a stop —
    /// check and insert happen in this one call, so capacity can never be
    /// raced by another boarder in the same tick.
    pub fn request_board(
        &mut self,
        car_id: CarId,
        occupant: Entity,
        occupant_floor: i32,
        destination_floor: i32,
    ) -> bool {
        let Some(car) = self.car_mut(car_id) else {
            return false;
        };
        if car.is_full()
            || !car.is_stationary_at(occupant_floor)
            || destination_floor > car.top_floor
            || car.passengers.contains(&occupant)
        {
            return false;
        }
        let direction = if destination_floor > occupant_floor {
            Direction::Up
        } else {
            Direction::Down
        };
        car.passengers.push(occupant);
        car.push_stop(destination_floor, direction);
        // Boarding holds the doors open for another dwell cycle.
        if car.state == CarState::DoorsOpen {
            car.dwell_ticks = ELEVATOR_DWELL_TICKS;
        }
        true
    }

    /// Removes a passenger from a car's manifest. No-op for stale handles.
    pub fn remove_passenger(&mut self, car_id: CarId, occupant: Entity) {
        if let Some(car) = self.car_mut(car_id) {
            car.passengers.retain(|&p| p != occupant);
        }
    }

    /// Issues a call for service. If no car qualifies right now the call is
    /// queued and retried every tick by `assign_pending_calls`.
    pub fn recall_car(&mut self, floor: i32, direction: Direction) {
        if self.try_assign(floor, direction).is_none() {
            let call = ElevatorCall { floor, direction };
            if !self.pending_calls.contains(&call) {
                self.pending_calls.push(call);
            }
        }
    }

    /// Dispatch policy: nearest idle car, else a moving car already covering
    /// the floor in the call's direction. Ties break by lowest id.
    fn try_assign(&mut self, floor: i32, direction: Direction) -> Option<CarId> {
        let nearest_idle = self
            .cars
            .iter()
            .filter(|c| c.state == CarState::Idle && floor <= c.top_floor)
            .min_by(|a, b| {
                let da = (a.current_floor - floor as f32).abs();
                let db = (b.current_floor - floor as f32).abs();
                da.partial_cmp(&db)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then(a.id.cmp(&b.id))
            })
            .map(|c| c.id);

        let chosen = nearest_idle.or_else(|| {
            self.cars
                .iter()
                .filter(|c| c.travel_direction() == Some(direction) && c.path_covers(floor))
                .map(|c| c.id)
                .min()
        })?;

        if let Some(car) = self.car_mut(chosen) {
            car.push_stop(floor, direction);
        }
        Some(chosen)
    }

    /// True exactly when the car is stationary (idle or doors open) at the
    /// passenger's stored destination floor.
    pub fn should_passenger_exit(&self, car_id: CarId, destination_floor: i32) -> bool {
        self.car(car_id)
            .is_some_and(|c| c.is_stationary_at(destination_floor))
    }

    /// World position where occupants wait for and board cars at `floor`:
    /// the lowest-id shaft serving that floor.
    pub fn boarding_position(&self, floor: i32) -> Option<Vec2> {
        self.cars
            .iter()
            .filter(|c| floor <= c.top_floor)
            .min_by_key(|c| c.id)
            .map(|c| {
                Vec2::new(
                    c.segment as f32 * crate::config::SEGMENT_WIDTH,
                    crate::tower_grid::TowerGrid::floor_to_y(floor),
                )
            })
    }

    pub fn total_passengers(&self) -> usize {
        self.cars.iter().map(|c| c.passengers.len()).sum()
    }
}

/// System: retries queued calls each tick until a car takes them.
pub fn assign_pending_calls(clock: Res<SimClock>, mut bank: ResMut<ElevatorBank>) {
    if clock.paused || bank.pending_calls.is_empty() {
        return;
    }
    let calls = std::mem::take(&mut bank.pending_calls);
    for call in calls {
        // Re-queues itself if still unassignable.
        bank.recall_car(call.floor, call.direction);
    }
}

/// System: advances every car by one step. Runs before occupant updates so
/// occupants observe car state from the current tick.
pub fn update_cars(clock: Res<SimClock>, mut bank: ResMut<ElevatorBank>) {
    if clock.paused {
        return;
    }
    for car in &mut bank.cars {
        car.step();
    }
}

/// System: on door-open cycles, drops passenger entries whose occupant
/// entity no longer exists. A despawned rider must never crash dispatch.
pub fn prune_stale_passengers(
    mut bank: ResMut<ElevatorBank>,
    occupants: Query<(), With<crate::occupant::Occupant>>,
) {
    for car in &mut bank.cars {
        if car.state != CarState::DoorsOpen {
            continue;
        }
        let dropped = car.prune_passengers(|e| occupants.get(e).is_ok());
        if dropped > 0 {
            warn!("car {}: dropped {} stale passenger(s)", car.id, dropped);
        }
    }
}

pub struct ElevatorPlugin;

impl Plugin for ElevatorPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<ElevatorBank>().add_systems(
            FixedUpdate,
            (assign_pending_calls, update_cars, prune_stale_passengers)
                .chain()
                .in_set(SimulationSet::Simulation),
        );
    }
}
