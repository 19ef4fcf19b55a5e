//! Build/demolish command queue.
//!
//! Placement requests arrive as typed events and are drained once per tick in
//! `PreSim`, which serializes all grid mutations on the single sim thread:
//! requests published during a tick take effect at the next drain, and two
//! requests for overlapping footprints in the same drain are resolved in
//! queue order (the second fails `can_place`).

use bevy::prelude::*;

use crate::simulation_sets::SimulationSet;
use crate::structures::{Lobby, Office, Structure, StructureKind};
use crate::tower_grid::TowerGrid;

/// Request to place a structure. Width/height ≥ 1 is the publisher's
/// responsibility (config validation happens at the command layer, not in
/// the grid).
#[derive(Event, Debug, Clone, Copy)]
pub struct PlaceStructure {
    pub kind: StructureKind,
    pub center_segment: i32,
    pub floor: i32,
    pub width: i32,
    pub height: i32,
}

/// Emitted when a placement request fails `can_place`. Carries the rejected
/// request so callers can decide how to surface it.
#[derive(Event, Debug, Clone, Copy)]
pub struct PlacementRejected {
    pub request: PlaceStructure,
}

/// Request to demolish a placed structure. Idempotent: unknown or already
/// demolished entities are a no-op.
#[derive(Event, Debug, Clone, Copy)]
pub struct Demolish {
    pub structure: Entity,
}

/// Drains placement requests: validates against the grid, spawns the
/// structure entity, and registers its footprint. Registration immediately
/// follows validation, so later requests in the same drain see the new cells.
pub fn process_place_requests(
    mut requests: EventReader<PlaceStructure>,
    mut rejections: EventWriter<PlacementRejected>,
    mut grid: ResMut<TowerGrid>,
    mut commands: Commands,
) {
    for request in requests.read() {
        if !grid.can_place(
            request.center_segment,
            request.floor,
            request.width,
            request.height,
        ) {
            warn!(
                "placement rejected: {:?} at segment {} floor {} ({}x{})",
                request.kind, request.center_segment, request.floor, request.width, request.height
            );
            rejections.send(PlacementRejected { request: *request });
            continue;
        }

        let structure = Structure {
            kind: request.kind,
            center_segment: request.center_segment,
            floor: request.floor,
            width: request.width,
            height: request.height,
        };
        let mut entity = commands.spawn(structure);
        match request.kind {
            StructureKind::Lobby => {
                entity.insert(Lobby);
            }
            StructureKind::Office { capacity } => {
                entity.insert(Office { capacity });
            }
            StructureKind::FloorSlab => {}
        }
        let id = entity.id();
        grid.register(
            id,
            request.center_segment,
            request.floor,
            request.width,
            request.height,
        );
        info!(
            "placed {:?} at segment {} floor {}",
            request.kind, request.center_segment, request.floor
        );
    }
}

/// Drains demolition requests: unregisters footprint cells and despawns the
/// entity. Occupants assigned to a demolished office recover through the
/// stale-reference fallbacks in their state machine.
pub fn process_demolish_requests(
    mut requests: EventReader<Demolish>,
    mut grid: ResMut<TowerGrid>,
    mut commands: Commands,
) {
    for request in requests.read() {
        grid.unregister(request.structure);
        if let Some(mut entity) = commands.get_entity(request.structure) {
            entity.despawn();
        }
    }
}

pub struct ConstructionPlugin;

impl Plugin for ConstructionPlugin {
    fn build(&self, app: &mut App) {
        app.add_event::<PlaceStructure>()
            .add_event::<PlacementRejected>()
            .add_event::<Demolish>()
            .add_systems(
                FixedUpdate,
                (process_place_requests, process_demolish_requests)
                    .chain()
                    .in_set(SimulationSet::PreSim),
            );
    }
}
