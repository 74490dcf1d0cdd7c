//! Trajectory record of one simulated run.

use core::fmt;

use hy_automaton::{ContinuousState, HybridState, Mode};
use hy_core::Real;

use crate::error::SimError;

/// One recorded sample.
///
/// Samples are ordered by hybrid time `(step, jumps)`: a jump keeps the step
/// and increments the jump count.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TrajectorySample<M> {
    /// Grid step; the sample time is `step · Δt`
    pub step: u64,
    /// Jumps taken so far in the run
    pub jumps: usize,
    /// True for the post-reset state of a jump
    pub jump: bool,
    pub state: HybridState<M>,
}

impl<M: Mode> TrajectorySample<M> {
    pub fn time(&self) -> Real {
        self.state.time()
    }
}

/// Details of a run that stopped because the integrator failed.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct IntegrationFailure {
    /// Name of the mode being integrated
    pub mode: String,
    /// Grid step of the last valid sample
    pub step: u64,
    pub time: Real,
    pub reason: String,
    pub last_valid: ContinuousState,
}

impl From<IntegrationFailure> for SimError {
    fn from(f: IntegrationFailure) -> Self {
        SimError::Integration {
            mode: f.mode,
            time: f.time,
            reason: f.reason,
        }
    }
}

/// Why a run ended.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TerminationReason {
    /// The last grid step was reached
    HorizonReached,
    /// A terminal mode was entered
    Collision,
    /// The jump budget ran out
    JumpLimit,
    IntegrationFailure(IntegrationFailure),
}

impl TerminationReason {
    /// Short label, stable across runs, used to tally outcomes.
    pub fn label(&self) -> &'static str {
        match self {
            TerminationReason::HorizonReached => "horizon",
            TerminationReason::Collision => "collision",
            TerminationReason::JumpLimit => "jump limit",
            TerminationReason::IntegrationFailure(_) => "integration failure",
        }
    }
}

impl fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TerminationReason::IntegrationFailure(fail) => write!(
                f,
                "integration failure in mode {} at t={}: {}",
                fail.mode, fail.time, fail.reason
            ),
            other => f.write_str(other.label()),
        }
    }
}

/// Where and why a run ended.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Termination {
    pub reason: TerminationReason,
    pub step: u64,
    pub time: Real,
}

/// Ordered record of one run.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Trajectory<M> {
    /// Sample interval Δt (s)
    pub sample_rate: Real,
    pub samples: Vec<TrajectorySample<M>>,
    pub termination: Termination,
}

impl<M: Mode> Trajectory<M> {
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn first(&self) -> Option<&TrajectorySample<M>> {
        self.samples.first()
    }

    pub fn last(&self) -> Option<&TrajectorySample<M>> {
        self.samples.last()
    }

    /// Post-reset samples, in order.
    pub fn jumps(&self) -> impl Iterator<Item = &TrajectorySample<M>> {
        self.samples.iter().filter(|s| s.jump)
    }

    pub fn jump_count(&self) -> usize {
        self.last().map(|s| s.jumps).unwrap_or(0)
    }

    /// Sample times, one per sample (jump samples repeat their step's time).
    pub fn times(&self) -> Vec<Real> {
        self.samples.iter().map(|s| s.time()).collect()
    }

    /// Last sample at `step`, i.e. the state after every jump taken there.
    pub fn at_step(&self, step: u64) -> Option<&TrajectorySample<M>> {
        self.samples.iter().rev().find(|s| s.step == step)
    }

    /// Every sample at `step`, pre-jump first.
    pub fn samples_at_step(&self, step: u64) -> impl Iterator<Item = &TrajectorySample<M>> {
        self.samples.iter().filter(move |s| s.step == step)
    }

    pub fn integration_failure(&self) -> Option<&IntegrationFailure> {
        match &self.termination.reason {
            TerminationReason::IntegrationFailure(f) => Some(f),
            _ => None,
        }
    }
}
