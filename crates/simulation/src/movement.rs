//! Destination-directed movement collaborator.
//!
//! The state machine issues `move_to` / `teleport_to` commands; this module
//! walks `Position` straight toward the target (no pathfinding, no obstacle
//! avoidance) and fires `DestinationReached` exactly once per completed move
//! — the order component is removed in the same tick the event is sent.

use bevy::prelude::*;

use crate::config::OCCUPANT_SPEED;
use crate::occupant::Position;
use crate::sim_clock::SimClock;
use crate::simulation_sets::SimulationSet;

/// An in-flight move order. Inserted by the occupant state machine, removed
/// on arrival.
#[derive(Component, Debug, Clone, Copy)]
pub struct MoveOrder {
    pub target: Vec2,
}

/// Fired once when an entity's move order completes.
#[derive(Event, Debug, Clone, Copy)]
pub struct DestinationReached {
    pub entity: Entity,
}

pub fn advance_move_orders(
    clock: Res<SimClock>,
    mut movers: Query<(Entity, &mut Position, &MoveOrder)>,
    mut reached: EventWriter<DestinationReached>,
    mut commands: Commands,
) {
    if clock.paused {
        return;
    }
    // Fixed sim-time step per tick, invariant under clock speed scaling.
    let step = OCCUPANT_SPEED * SimClock::SECONDS_PER_TICK;
    for (entity, mut position, order) in &mut movers {
        let delta = order.target - position.to_vec2();
        let distance = delta.length();
        if distance <= step {
            position.set(order.target);
            commands.entity(entity).remove::<MoveOrder>();
            reached.send(DestinationReached { entity });
        } else {
            let advance = delta / distance * step;
            position.x += advance.x;
            position.y += advance.y;
        }
    }
}

pub struct MovementPlugin;

impl Plugin for MovementPlugin {
    fn build(&self, app: &mut App) {
        app.add_event::<DestinationReached>().add_systems(
            FixedUpdate,
            advance_move_orders.in_set(SimulationSet::Simulation),
        );
    }
}
