//! Error types for reachability analysis.

use hy_automaton::ConfigurationError;
use hy_core::CoreError;
use hy_sim::SimError;
use thiserror::Error;

/// Errors that abort a reachability batch.
///
/// Individual runs that fail to integrate are skipped and counted; they never
/// surface here.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ReachError {
    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    #[error(transparent)]
    Sim(#[from] SimError),

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Core(#[from] CoreError),
}

pub type ReachResult<T> = Result<T, ReachError>;
