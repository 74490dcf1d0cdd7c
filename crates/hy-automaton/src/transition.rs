//! Transitions: guard, reset map, and priority rank.

use core::fmt;
use std::sync::Arc;

use hy_core::Real;
use nalgebra::DVector;

use crate::input::Payload;
use crate::state::{ContinuousState, HybridState, Mode};

/// Mode-specific acceleration d(velocity)/dt.
pub type AccelerationFn = Arc<dyn Fn(&ContinuousState) -> DVector<Real> + Send + Sync>;

/// Guard metric. The guard holds when the value is `>= 0`; its magnitude is
/// the distance used to attribute a sign change to the nearer sample.
pub type GuardFn<M> = Arc<dyn Fn(&HybridState<M>, Option<&Payload>) -> Real + Send + Sync>;

/// Reset map producing the post-jump continuous state.
pub type ResetFn<M> = Arc<dyn Fn(&HybridState<M>, Option<&Payload>) -> ContinuousState + Send + Sync>;

/// Index of a transition inside its automaton.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TransitionId(pub(crate) u32);

impl TransitionId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for TransitionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What makes a transition eligible.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Trigger {
    /// An input event is pending and the guard accepts its payload
    Input,
    /// The guard metric changes sign along the flow
    Crossing,
}

/// A candidate discrete jump.
#[derive(Clone)]
pub struct Transition<M> {
    pub id: TransitionId,
    pub name: String,
    pub source: M,
    pub target: M,
    /// Lower rank wins when several transitions are eligible
    pub rank: u32,
    pub trigger: Trigger,
    pub(crate) guard: GuardFn<M>,
    pub(crate) reset: ResetFn<M>,
}

impl<M: Mode> Transition<M> {
    /// Evaluate the guard metric.
    ///
    /// Input-triggered guards are never satisfied without a payload.
    pub fn guard_value(&self, state: &HybridState<M>, payload: Option<&Payload>) -> Real {
        if self.trigger == Trigger::Input && payload.is_none() {
            return Real::NEG_INFINITY;
        }
        (self.guard)(state, payload)
    }

    pub fn holds(&self, state: &HybridState<M>, payload: Option<&Payload>) -> bool {
        self.guard_value(state, payload) >= 0.0
    }

    /// Apply the reset map. The result is in the target mode at the same time.
    pub fn apply_reset(&self, state: &HybridState<M>, payload: Option<&Payload>) -> HybridState<M> {
        let mut continuous = (self.reset)(state, payload);
        continuous.time = state.continuous.time;
        HybridState::new(self.target, continuous)
    }
}

impl<M: Mode> fmt::Debug for Transition<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transition")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("source", &self.source)
            .field("target", &self.target)
            .field("rank", &self.rank)
            .field("trigger", &self.trigger)
            .finish_non_exhaustive()
    }
}
