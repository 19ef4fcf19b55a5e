use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::tower_grid::{GridCell, TowerGrid};

/// What a placed structure is. `Office` carries the number of workers the
/// tenant employs; the spawner staffs it on placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StructureKind {
    /// Ground-level entrance hall. Upper-floor commutes route through it.
    Lobby,
    /// Plain floor area: provides support for the floor above.
    FloorSlab,
    /// A tenant office employing `capacity` occupants.
    Office { capacity: u32 },
}

impl StructureKind {
    pub fn is_office(self) -> bool {
        matches!(self, Self::Office { .. })
    }
}

/// Grid footprint of a placed structure. The cell map in [`TowerGrid`] holds
/// one entry per footprint cell pointing back at this entity.
#[derive(Component, Debug, Clone, Serialize, Deserialize)]
pub struct Structure {
    pub kind: StructureKind,
    pub center_segment: i32,
    pub floor: i32,
    pub width: i32,
    pub height: i32,
}

impl Structure {
    pub fn is_ground_floor(&self) -> bool {
        self.floor == 0
    }

    /// World position of the structure's entrance: the leftmost footprint
    /// cell at base-floor level.
    pub fn entrance_position(&self) -> Vec2 {
        let leftmost = TowerGrid::footprint_columns(self.center_segment, self.width).start;
        TowerGrid::grid_to_world(GridCell {
            segment: leftmost,
            floor: self.floor,
        })
    }

    /// World position of the structure's interior center, where occupants
    /// stand while working.
    pub fn interior_position(&self) -> Vec2 {
        TowerGrid::grid_to_world(GridCell {
            segment: self.center_segment,
            floor: self.floor,
        })
    }
}

/// Marker for the lobby structure, the routing target of every upper-floor
/// commute.
#[derive(Component, Debug, Clone, Copy)]
pub struct Lobby;

/// Workplace data of one tenant office.
#[derive(Component, Debug, Clone, Serialize, Deserialize)]
pub struct Office {
    pub capacity: u32,
}

/// Boundary snapshot of an occupant's assigned workplace, taken fresh each
/// tick from the office entity's [`Structure`]. Exposes exactly what the
/// occupant lifecycle needs: floor, ground-floor flag, and positions.
#[derive(Debug, Clone, Copy)]
pub struct WorkplaceInfo {
    pub office: Entity,
    pub floor: i32,
    pub is_ground_floor: bool,
    pub entrance: Vec2,
    pub interior: Vec2,
}

impl WorkplaceInfo {
    pub fn from_structure(office: Entity, structure: &Structure) -> Self {
        Self {
            office,
            floor: structure.floor,
            is_ground_floor: structure.is_ground_floor(),
            entrance: structure.entrance_position(),
            interior: structure.interior_position(),
        }
    }
}
