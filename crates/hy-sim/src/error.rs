//! Error types for simulation operations.

use hy_automaton::ConfigurationError;
use hy_core::{CoreError, Real};
use thiserror::Error;

/// Errors encountered while simulating a hybrid trajectory.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimError {
    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    /// The integrator could not advance the continuous state.
    #[error("Convergence failed: {what}")]
    ConvergenceFailed { what: String },

    /// A run stopped abnormally inside a mode.
    #[error("Integration failed in mode {mode} at t={time}: {reason}")]
    Integration {
        mode: String,
        time: Real,
        reason: String,
    },

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Core(#[from] CoreError),
}

pub type SimResult<T> = Result<T, SimError>;
