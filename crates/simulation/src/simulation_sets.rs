//! Deterministic simulation ordering via `SystemSet` phases.
//!
//! Every system in `FixedUpdate` belongs to one of these sets, configured as
//! a chain: `PreSim` → `Simulation` → `PostSim`. Within `Simulation`, elevator
//! cars are stepped **before** occupant state machines
//! (`run_occupant_state_machines` is ordered `.after(update_cars)`), so an
//! occupant always observes car state as updated earlier in the *current*
//! tick. Tests depend on this ordering.

use bevy::prelude::*;

/// Ordered phases for systems running in the `FixedUpdate` schedule.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub enum SimulationSet {
    /// Tick counters, sim clock, construction event drain, office staffing.
    PreSim,
    /// Elevator dispatch and stepping, movement, occupant state machines.
    Simulation,
    /// Aggregation and reporting: stats snapshots. Read-only over sim state.
    PostSim,
}
