use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::elevator::CarId;

/// Marker for building occupants (tenant workers).
#[derive(Component)]
pub struct Occupant;

/// The occupant lifecycle. Terminal-free: every path cycles back to
/// `AtHome`. Ground-floor assignments skip both elevator sub-paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OccupantState {
    AtHome,
    CommutingToWork,
    WaitingForElevator,
    RidingElevatorUp,
    ExitingElevator,
    EnteringBuilding,
    Working,
    LeavingBuilding,
    WaitingForElevatorDown,
    RidingElevatorDown,
    ExitingElevatorDown,
    CommutingHome,
}

impl OccupantState {
    pub fn is_in_elevator(self) -> bool {
        matches!(self, Self::RidingElevatorUp | Self::RidingElevatorDown)
    }

    pub fn is_waiting_for_elevator(self) -> bool {
        matches!(self, Self::WaitingForElevator | Self::WaitingForElevatorDown)
    }

    pub fn is_commuting(self) -> bool {
        matches!(self, Self::CommutingToWork | Self::CommutingHome)
    }
}

#[derive(Component, Debug, Clone, Copy)]
pub struct OccupantStateComp(pub OccupantState);

/// World position. The tower is a vertical cross-section: x runs along the
/// segment axis, y is height.
#[derive(Component, Debug, Clone, Copy)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub fn to_vec2(self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    pub fn set(&mut self, v: Vec2) {
        self.x = v.x;
        self.y = v.y;
    }
}

/// Where the occupant lives (off-tower, at ground level).
#[derive(Component, Debug, Clone, Copy)]
pub struct HomePosition(pub Vec2);

/// Non-owning reference to the assigned office entity. The office's
/// `Structure` is looked up fresh each tick; a demolished office turns the
/// lookup into `None` and the lifecycle falls back toward home.
#[derive(Component, Debug, Clone, Copy)]
pub struct Workplace {
    pub office: Entity,
}

/// Elevator trip bookkeeping: the stored destination floor and the car
/// currently ridden, if any. `car` is a handle, never ownership — a removed
/// car is detected on lookup.
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct ElevatorTrip {
    pub target_floor: i32,
    pub car: Option<CarId>,
}

/// Seconds accumulated while waiting for a car.
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct WaitTimer(pub f32);

/// Ticks spent in the current dwelling activity (resting at home, working).
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct ActivityTicks(pub u32);

/// Presentation flag toggled exactly at the `AtHome` state boundary: hidden
/// while at home, visible everywhere else.
#[derive(Component, Debug, Clone, Copy)]
pub struct OccupantVisibility(pub bool);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_classes() {
        assert!(OccupantState::RidingElevatorUp.is_in_elevator());
        assert!(OccupantState::WaitingForElevatorDown.is_waiting_for_elevator());
        assert!(OccupantState::CommutingHome.is_commuting());
        assert!(!OccupantState::Working.is_in_elevator());
        assert!(!OccupantState::AtHome.is_commuting());
    }

    #[test]
    fn test_lifecycle_cycle_is_closed() {
        // The canonical upper-floor path returns to its starting state.
        let path = [
            OccupantState::AtHome,
            OccupantState::CommutingToWork,
            OccupantState::WaitingForElevator,
            OccupantState::RidingElevatorUp,
            OccupantState::ExitingElevator,
            OccupantState::EnteringBuilding,
            OccupantState::Working,
            OccupantState::LeavingBuilding,
            OccupantState::WaitingForElevatorDown,
            OccupantState::RidingElevatorDown,
            OccupantState::ExitingElevatorDown,
            OccupantState::CommutingHome,
            OccupantState::AtHome,
        ];
        assert_eq!(path.first(), path.last());
        for w in path.windows(2) {
            assert_ne!(w[0], w[1]);
        }
    }
}
