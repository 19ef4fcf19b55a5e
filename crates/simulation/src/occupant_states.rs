//! The occupant lifecycle state machine.
//!
//! Twelve handler types, one per [`OccupantState`] variant, registered in the
//! [`OccupantStates`] lookup and driven by the generic engine in [`crate::fsm`].
//! Handlers see one occupant at a time through [`OccupantCtx`], which snapshots
//! the workplace boundary data and exposes the elevator bank plus movement
//! commands. The Bevy system wrapping all of this lives at the bottom.
//!
//! Failure policy (all recoveries are local, nothing panics the tick):
//! - no car within 30 s on the way up: give up, go home
//! - no car within 30 s on the way down: give up only if already at ground;
//!   on an upper floor re-issue the call and keep waiting
//! - car handle gone mid-ride: teleport to safety and carry on

use bevy::prelude::*;
use std::collections::HashSet;

use crate::config::{REST_DURATION_TICKS, WAIT_TIMEOUT_SECS, WORK_DURATION_TICKS};
use crate::elevator::{Direction, ElevatorBank};
use crate::fsm::{deliver_destination_reached, run_update, AgentState, StateLookup};
use crate::movement::{DestinationReached, MoveOrder};
use crate::occupant::{
    ActivityTicks, ElevatorTrip, HomePosition, Occupant, OccupantState, OccupantStateComp,
    OccupantVisibility, Position, WaitTimer, Workplace,
};
use crate::sim_clock::SimClock;
use crate::simulation_sets::SimulationSet;
use crate::stats::LifecycleCounters;
use crate::structures::{Lobby, Office, Structure, WorkplaceInfo};
use crate::tower_grid::TowerGrid;

// ---------------------------------------------------------------------------
// Context
// ---------------------------------------------------------------------------

/// Movement commands collected during a handler call and applied by the
/// system afterwards. A teleport cancels any in-flight move order.
#[derive(Debug, Default, Clone, Copy)]
pub struct MoverCommands {
    pending_move: Option<Vec2>,
    pending_teleport: Option<Vec2>,
}

impl MoverCommands {
    pub fn move_to(&mut self, target: Vec2) {
        self.pending_move = Some(target);
    }

    pub fn teleport_to(&mut self, target: Vec2) {
        self.pending_teleport = Some(target);
        self.pending_move = None;
    }

    pub fn take(self) -> (Option<Vec2>, Option<Vec2>) {
        (self.pending_teleport, self.pending_move)
    }
}

/// Everything one occupant's handlers may read or mutate during a step.
pub struct OccupantCtx<'a> {
    pub entity: Entity,
    pub position: &'a mut Position,
    pub home: Vec2,
    /// Workplace snapshot; `None` when the office has been demolished.
    pub work: Option<WorkplaceInfo>,
    pub trip: &'a mut ElevatorTrip,
    pub wait: &'a mut WaitTimer,
    pub activity: &'a mut ActivityTicks,
    pub visibility: &'a mut OccupantVisibility,
    pub elevators: &'a mut ElevatorBank,
    pub counters: &'a mut LifecycleCounters,
    /// Ground-level lobby entrance (tower center if no lobby is built).
    pub lobby: Vec2,
    pub mover: MoverCommands,
}

impl OccupantCtx<'_> {
    /// Floor the occupant is currently standing on.
    pub fn current_floor(&self) -> i32 {
        TowerGrid::floor_at_y(self.position.y)
    }

    /// Where to stand while waiting for a car at `floor`.
    fn waiting_spot(&self, floor: i32) -> Vec2 {
        self.elevators.boarding_position(floor).unwrap_or(self.lobby)
    }

    /// Follow the ridden car's position while inside it.
    fn ride_along(&mut self, car_id: u32) {
        if let Some(car) = self.elevators.car(car_id) {
            self.position.x = car.segment as f32 * crate::config::SEGMENT_WIDTH;
            self.position.y = TowerGrid::floor_to_y(0) + car.current_floor * crate::config::FLOOR_HEIGHT;
        }
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

struct AtHome;
impl<'w> AgentState<OccupantState, OccupantCtx<'w>> for AtHome {
    fn enter(&self, ctx: &mut OccupantCtx) -> Option<OccupantState> {
        // The only presentation side effect in the lifecycle, timed exactly
        // at the state boundary.
        ctx.visibility.0 = false;
        ctx.activity.0 = 0;
        ctx.trip.car = None;
        ctx.counters.completed_cycles += 1;
        None
    }

    fn update(&self, ctx: &mut OccupantCtx, _dt: f32) -> Option<OccupantState> {
        // Orphaned occupants rest here until the recycler despawns them.
        ctx.work?;
        ctx.activity.0 += 1;
        (ctx.activity.0 >= REST_DURATION_TICKS).then_some(OccupantState::CommutingToWork)
    }

    fn exit(&self, ctx: &mut OccupantCtx) {
        ctx.visibility.0 = true;
    }
}

struct CommutingToWork;
impl<'w> AgentState<OccupantState, OccupantCtx<'w>> for CommutingToWork {
    fn enter(&self, ctx: &mut OccupantCtx) -> Option<OccupantState> {
        let Some(work) = ctx.work else {
            return Some(OccupantState::CommutingHome);
        };
        let home = ctx.home;
        ctx.mover.teleport_to(home);
        if work.is_ground_floor {
            ctx.mover.move_to(work.entrance);
        } else {
            // Upper-floor work routes through the lobby first.
            let lobby = ctx.lobby;
            ctx.mover.move_to(lobby);
        }
        None
    }

    fn on_destination_reached(&self, ctx: &mut OccupantCtx) -> Option<OccupantState> {
        match ctx.work {
            None => Some(OccupantState::CommutingHome),
            Some(work) if work.is_ground_floor => Some(OccupantState::EnteringBuilding),
            Some(_) => Some(OccupantState::WaitingForElevator),
        }
    }
}

struct WaitingForElevator;
impl<'w> AgentState<OccupantState, OccupantCtx<'w>> for WaitingForElevator {
    fn enter(&self, ctx: &mut OccupantCtx) -> Option<OccupantState> {
        ctx.wait.0 = 0.0;
        let spot = ctx.waiting_spot(0);
        ctx.mover.move_to(spot);
        ctx.elevators.recall_car(0, Direction::Up);
        None
    }

    fn update(&self, ctx: &mut OccupantCtx, dt: f32) -> Option<OccupantState> {
        let Some(work) = ctx.work else {
            return Some(OccupantState::CommutingHome);
        };
        if let Some(car_id) = ctx.elevators.available_car_at_floor(0) {
            if ctx
                .elevators
                .request_board(car_id, ctx.entity, 0, work.floor)
            {
                ctx.trip.target_floor = work.floor;
                ctx.trip.car = Some(car_id);
                ctx.counters.boardings += 1;
                return Some(OccupantState::RidingElevatorUp);
            }
        }
        ctx.wait.0 += dt;
        if ctx.wait.0 > WAIT_TIMEOUT_SECS {
            // Give up: the upper floor is temporarily unreachable. Better
            // than blocking the lobby forever.
            ctx.counters.up_wait_timeouts += 1;
            debug!("occupant {:?} gave up waiting for a car up", ctx.entity);
            return Some(OccupantState::CommutingHome);
        }
        None
    }
}

struct RidingElevatorUp;
impl<'w> AgentState<OccupantState, OccupantCtx<'w>> for RidingElevatorUp {
    fn update(&self, ctx: &mut OccupantCtx, _dt: f32) -> Option<OccupantState> {
        let car_id = ctx.trip.car.filter(|&id| ctx.elevators.car(id).is_some());
        let Some(car_id) = car_id else {
            // The car vanished mid-ride. Fail safe: appear at the
            // destination and carry on, never crash the tick.
            ctx.counters.stale_car_recoveries += 1;
            warn!("occupant {:?} lost its car mid-ride up", ctx.entity);
            return match ctx.work {
                Some(work) => {
                    ctx.mover.teleport_to(work.interior);
                    Some(OccupantState::EnteringBuilding)
                }
                None => {
                    let lobby = ctx.lobby;
                    ctx.mover.teleport_to(lobby);
                    Some(OccupantState::CommutingHome)
                }
            };
        };
        ctx.ride_along(car_id);
        if ctx
            .elevators
            .should_passenger_exit(car_id, ctx.trip.target_floor)
        {
            return Some(OccupantState::ExitingElevator);
        }
        None
    }

    fn exit(&self, ctx: &mut OccupantCtx) {
        if let Some(car_id) = ctx.trip.car.take() {
            ctx.elevators.remove_passenger(car_id, ctx.entity);
        }
    }
}

struct ExitingElevator;
impl<'w> AgentState<OccupantState, OccupantCtx<'w>> for ExitingElevator {
    fn enter(&self, ctx: &mut OccupantCtx) -> Option<OccupantState> {
        let Some(work) = ctx.work else {
            return Some(OccupantState::CommutingHome);
        };
        ctx.mover.move_to(work.entrance);
        None
    }

    fn on_destination_reached(&self, _ctx: &mut OccupantCtx) -> Option<OccupantState> {
        Some(OccupantState::EnteringBuilding)
    }
}

struct EnteringBuilding;
impl<'w> AgentState<OccupantState, OccupantCtx<'w>> for EnteringBuilding {
    fn enter(&self, ctx: &mut OccupantCtx) -> Option<OccupantState> {
        let Some(work) = ctx.work else {
            return Some(OccupantState::CommutingHome);
        };
        ctx.mover.move_to(work.interior);
        None
    }

    fn on_destination_reached(&self, _ctx: &mut OccupantCtx) -> Option<OccupantState> {
        Some(OccupantState::Working)
    }
}

struct Working;
impl<'w> AgentState<OccupantState, OccupantCtx<'w>> for Working {
    fn enter(&self, ctx: &mut OccupantCtx) -> Option<OccupantState> {
        ctx.activity.0 = 0;
        None
    }

    fn update(&self, ctx: &mut OccupantCtx, _dt: f32) -> Option<OccupantState> {
        if ctx.work.is_none() {
            // Office demolished mid-shift: leave now.
            return Some(OccupantState::LeavingBuilding);
        }
        ctx.activity.0 += 1;
        (ctx.activity.0 >= WORK_DURATION_TICKS).then_some(OccupantState::LeavingBuilding)
    }
}

struct LeavingBuilding;
impl<'w> AgentState<OccupantState, OccupantCtx<'w>> for LeavingBuilding {
    fn enter(&self, ctx: &mut OccupantCtx) -> Option<OccupantState> {
        // Floor is taken from where the occupant stands, not from the
        // workplace: it stays correct even if the office just vanished.
        let floor = ctx.current_floor();
        if floor == 0 {
            return Some(OccupantState::CommutingHome);
        }
        let spot = ctx.waiting_spot(floor);
        ctx.mover.move_to(spot);
        None
    }

    fn on_destination_reached(&self, _ctx: &mut OccupantCtx) -> Option<OccupantState> {
        Some(OccupantState::WaitingForElevatorDown)
    }
}

struct WaitingForElevatorDown;
impl<'w> AgentState<OccupantState, OccupantCtx<'w>> for WaitingForElevatorDown {
    fn enter(&self, ctx: &mut OccupantCtx) -> Option<OccupantState> {
        ctx.wait.0 = 0.0;
        let floor = ctx.current_floor();
        ctx.elevators.recall_car(floor, Direction::Down);
        None
    }

    fn update(&self, ctx: &mut OccupantCtx, dt: f32) -> Option<OccupantState> {
        let floor = ctx.current_floor();
        if let Some(car_id) = ctx.elevators.available_car_at_floor(floor) {
            if ctx.elevators.request_board(car_id, ctx.entity, floor, 0) {
                ctx.trip.target_floor = 0;
                ctx.trip.car = Some(car_id);
                ctx.counters.boardings += 1;
                return Some(OccupantState::RidingElevatorDown);
            }
        }
        ctx.wait.0 += dt;
        if ctx.wait.0 > WAIT_TIMEOUT_SECS {
            if floor == 0 {
                // Already at ground: the timeout converts to a walk home.
                return Some(OccupantState::CommutingHome);
            }
            // Stuck on an upper floor: walking down is not an option, so
            // giving up would strand the occupant. Reset the window and
            // call again until a car shows up.
            ctx.wait.0 = 0.0;
            ctx.counters.down_wait_rerecalls += 1;
            ctx.elevators.recall_car(floor, Direction::Down);
        }
        None
    }
}

struct RidingElevatorDown;
impl<'w> AgentState<OccupantState, OccupantCtx<'w>> for RidingElevatorDown {
    fn update(&self, ctx: &mut OccupantCtx, _dt: f32) -> Option<OccupantState> {
        let car_id = ctx.trip.car.filter(|&id| ctx.elevators.car(id).is_some());
        let Some(car_id) = car_id else {
            ctx.counters.stale_car_recoveries += 1;
            warn!("occupant {:?} lost its car mid-ride down", ctx.entity);
            let lobby = ctx.lobby;
            ctx.mover.teleport_to(lobby);
            return Some(OccupantState::CommutingHome);
        };
        ctx.ride_along(car_id);
        if ctx
            .elevators
            .should_passenger_exit(car_id, ctx.trip.target_floor)
        {
            return Some(OccupantState::ExitingElevatorDown);
        }
        None
    }

    fn exit(&self, ctx: &mut OccupantCtx) {
        if let Some(car_id) = ctx.trip.car.take() {
            ctx.elevators.remove_passenger(car_id, ctx.entity);
        }
    }
}

struct ExitingElevatorDown;
impl<'w> AgentState<OccupantState, OccupantCtx<'w>> for ExitingElevatorDown {
    fn enter(&self, ctx: &mut OccupantCtx) -> Option<OccupantState> {
        let lobby = ctx.lobby;
        ctx.mover.move_to(lobby);
        None
    }

    fn on_destination_reached(&self, _ctx: &mut OccupantCtx) -> Option<OccupantState> {
        Some(OccupantState::CommutingHome)
    }
}

struct CommutingHome;
impl<'w> AgentState<OccupantState, OccupantCtx<'w>> for CommutingHome {
    fn enter(&self, ctx: &mut OccupantCtx) -> Option<OccupantState> {
        let home = ctx.home;
        ctx.mover.move_to(home);
        None
    }

    fn on_destination_reached(&self, _ctx: &mut OccupantCtx) -> Option<OccupantState> {
        Some(OccupantState::AtHome)
    }
}

// ---------------------------------------------------------------------------
// Lookup table
// ---------------------------------------------------------------------------

/// One registration per state, keyed by the enum.
pub struct OccupantStates;

impl<'w> StateLookup<OccupantState, OccupantCtx<'w>> for OccupantStates {
    fn handler(&self, key: OccupantState) -> &dyn AgentState<OccupantState, OccupantCtx<'w>> {
        match key {
            OccupantState::AtHome => &AtHome,
            OccupantState::CommutingToWork => &CommutingToWork,
            OccupantState::WaitingForElevator => &WaitingForElevator,
            OccupantState::RidingElevatorUp => &RidingElevatorUp,
            OccupantState::ExitingElevator => &ExitingElevator,
            OccupantState::EnteringBuilding => &EnteringBuilding,
            OccupantState::Working => &Working,
            OccupantState::LeavingBuilding => &LeavingBuilding,
            OccupantState::WaitingForElevatorDown => &WaitingForElevatorDown,
            OccupantState::RidingElevatorDown => &RidingElevatorDown,
            OccupantState::ExitingElevatorDown => &ExitingElevatorDown,
            OccupantState::CommutingHome => &CommutingHome,
        }
    }
}

// ---------------------------------------------------------------------------
// System
// ---------------------------------------------------------------------------

/// Drives every occupant's state machine once per tick: arrival signals
/// first, then the per-tick update. Runs after `update_cars`, so occupants
/// observe car state from the current tick (documented ordering).
#[allow(clippy::too_many_arguments, clippy::type_complexity)]
pub fn run_occupant_state_machines(
    clock: Res<SimClock>,
    mut arrivals: EventReader<DestinationReached>,
    mut elevators: ResMut<ElevatorBank>,
    mut counters: ResMut<LifecycleCounters>,
    lobbies: Query<&Structure, With<Lobby>>,
    offices: Query<&Structure, With<Office>>,
    mut occupants: Query<
        (
            Entity,
            &mut OccupantStateComp,
            &mut Position,
            &HomePosition,
            &Workplace,
            &mut ElevatorTrip,
            &mut WaitTimer,
            &mut ActivityTicks,
            &mut OccupantVisibility,
        ),
        With<Occupant>,
    >,
    mut commands: Commands,
) {
    if clock.paused {
        return;
    }
    // Sim time, not wall time: a tick always advances the same duration, so
    // wait timeouts are invariant under clock speed scaling.
    let dt = SimClock::SECONDS_PER_TICK;
    let arrived: HashSet<Entity> = arrivals.read().map(|r| r.entity).collect();
    let lobby = lobbies
        .iter()
        .next()
        .map(Structure::entrance_position)
        .unwrap_or(Vec2::new(0.0, crate::config::GROUND_LEVEL_Y));

    for (
        entity,
        mut state,
        mut position,
        home,
        workplace,
        mut trip,
        mut wait,
        mut activity,
        mut visibility,
    ) in &mut occupants
    {
        let work = offices
            .get(workplace.office)
            .ok()
            .map(|s| WorkplaceInfo::from_structure(workplace.office, s));

        let mut ctx = OccupantCtx {
            entity,
            position: &mut position,
            home: home.0,
            work,
            trip: &mut trip,
            wait: &mut wait,
            activity: &mut activity,
            visibility: &mut visibility,
            elevators: &mut elevators,
            counters: &mut counters,
            lobby,
            mover: MoverCommands::default(),
        };

        if arrived.contains(&entity) {
            deliver_destination_reached(&OccupantStates, &mut state.0, &mut ctx);
        }
        run_update(&OccupantStates, &mut state.0, &mut ctx, dt);

        let (teleport, move_target) = ctx.mover.take();
        if let Some(target) = teleport {
            position.set(target);
            commands.entity(entity).remove::<MoveOrder>();
        }
        if let Some(target) = move_target {
            commands.entity(entity).insert(MoveOrder { target });
        }
    }
}

pub struct OccupantPlugin;

impl Plugin for OccupantPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            FixedUpdate,
            run_occupant_state_machines
                .in_set(SimulationSet::Simulation)
                .after(crate::elevator::update_cars)
                .after(crate::movement::advance_move_orders),
        );
    }
}
