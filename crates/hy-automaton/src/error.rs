//! Error types for automaton construction and consistency checks.

use hy_core::CoreError;
use thiserror::Error;

pub type ConfigResult<T> = Result<T, ConfigurationError>;

/// A malformed hybrid automaton.
///
/// These are design errors in the model, never runtime conditions to recover
/// from.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigurationError {
    #[error("Automaton has no modes")]
    EmptyModel,

    #[error("State dimension must be positive")]
    ZeroDimension,

    #[error("Mode {mode} declared twice")]
    DuplicateMode { mode: String },

    #[error("Unknown mode {mode} referenced by {what}")]
    UnknownMode { mode: String, what: String },

    #[error(
        "Transitions '{first}' and '{second}' out of mode {mode} share priority rank {rank}"
    )]
    RankTie {
        mode: String,
        rank: u32,
        first: String,
        second: String,
    },

    #[error("Terminal mode {mode} has outgoing transition '{transition}'")]
    TerminalHasTransitions { mode: String, transition: String },

    #[error("Reset of '{transition}' leaves its guard satisfied in mode {mode} at t={time}")]
    SelfRetrigger {
        transition: String,
        mode: String,
        time: f64,
    },

    #[error("State dimension mismatch for {what}: expected {expected}, got {actual}")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Invalid parameter: {what}")]
    InvalidParameter { what: &'static str },

    #[error(transparent)]
    Core(#[from] CoreError),
}
