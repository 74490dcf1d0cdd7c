//! Hybrid trajectory simulation.
//!
//! Provides:
//! - Flow fields over flat state vectors, one per automaton mode
//! - Adaptive Dormand–Prince, RK4 and forward Euler integrators
//! - Grid-resampled integration (`t = k·Δt`)
//! - Nearest-sample jump detection for guard crossings and input events
//! - Single-run simulator producing a [`Trajectory`]

pub mod error;
pub mod events;
pub mod integrator;
pub mod model;
pub mod sim;
pub mod trajectory;

// Re-exports for public API
pub use error::{SimError, SimResult};
pub use events::{Detection, InputQueue, Scan, input_step, scan_instant, scan_interval};
pub use integrator::{
    DormandPrince, ForwardEuler, GridSpan, Integrator, IntegratorKind, IntegratorOptions, Rk4,
    integrate_on_grid, step_on_grid,
};
pub use model::{FlowField, ModeFlow};
pub use sim::{Horizon, SimOptions, Simulator, run_sim};
pub use trajectory::{
    IntegrationFailure, Termination, TerminationReason, Trajectory, TrajectorySample,
};
