//! Immutable hybrid automaton: a flat table of modes and transitions.

use std::collections::HashMap;

use hy_core::Real;
use nalgebra::DVector;

use crate::error::{ConfigResult, ConfigurationError};
use crate::input::Payload;
use crate::state::{ContinuousState, Derivative, HybridState, Mode};
use crate::transition::{AccelerationFn, Transition, TransitionId, Trigger};

/// One discrete mode: its dynamics and outgoing transitions.
#[derive(Clone)]
pub struct ModeSpec<M> {
    pub mode: M,
    pub name: String,
    /// Entering this mode ends the run (e.g. "game over")
    pub terminal: bool,
    pub(crate) acceleration: AccelerationFn,
    /// Outgoing transitions sorted by rank
    pub(crate) transitions: Vec<TransitionId>,
}

/// Hybrid automaton.
///
/// Built once through [`crate::AutomatonBuilder`] and shared read-only by
/// every simulation run.
#[derive(Clone)]
pub struct Automaton<M> {
    pub(crate) dims: usize,
    pub(crate) modes: Vec<ModeSpec<M>>,
    pub(crate) mode_index: HashMap<M, usize>,
    pub(crate) transitions: Vec<Transition<M>>,
}

impl<M: Mode> Automaton<M> {
    /// Spatial dimension of the continuous state.
    pub fn dims(&self) -> usize {
        self.dims
    }

    pub fn modes(&self) -> &[ModeSpec<M>] {
        &self.modes
    }

    pub fn transitions(&self) -> &[Transition<M>] {
        &self.transitions
    }

    pub fn mode_spec(&self, mode: M) -> ConfigResult<&ModeSpec<M>> {
        self.mode_index
            .get(&mode)
            .map(|&i| &self.modes[i])
            .ok_or_else(|| ConfigurationError::UnknownMode {
                mode: format!("{mode:?}"),
                what: "automaton lookup".to_string(),
            })
    }

    pub fn mode_name(&self, mode: M) -> String {
        match self.mode_spec(mode) {
            Ok(spec) => spec.name.clone(),
            Err(_) => format!("{mode:?}"),
        }
    }

    pub fn is_terminal(&self, mode: M) -> bool {
        self.mode_spec(mode).map(|s| s.terminal).unwrap_or(false)
    }

    pub fn transition(&self, id: TransitionId) -> &Transition<M> {
        &self.transitions[id.index()]
    }

    /// Outgoing transitions of `mode`, lowest rank first.
    pub fn transitions_from(&self, mode: M) -> impl Iterator<Item = &Transition<M>> {
        let ids: &[TransitionId] = match self.mode_spec(mode) {
            Ok(spec) => &spec.transitions,
            Err(_) => &[],
        };
        ids.iter().map(|id| &self.transitions[id.index()])
    }

    /// Mode-specific acceleration at `x`.
    pub fn acceleration(&self, mode: M, x: &ContinuousState) -> ConfigResult<DVector<Real>> {
        let spec = self.mode_spec(mode)?;
        let acc = (spec.acceleration)(x);
        if acc.len() != self.dims {
            return Err(ConfigurationError::DimensionMismatch {
                what: "acceleration",
                expected: self.dims,
                actual: acc.len(),
            });
        }
        Ok(acc)
    }

    /// Flow map: d(position)/dt = velocity, d(velocity)/dt = mode acceleration.
    pub fn dynamics(&self, mode: M, x: &ContinuousState) -> ConfigResult<Derivative> {
        Ok(Derivative {
            d_position: x.velocity.clone(),
            d_velocity: self.acceleration(mode, x)?,
        })
    }

    /// Transitions out of the state's mode whose guard holds, lowest rank first.
    ///
    /// `pending` is the input payload available at this instant, if any.
    pub fn guards(&self, state: &HybridState<M>, pending: Option<&Payload>) -> Vec<&Transition<M>> {
        self.transitions_from(state.mode)
            .filter(|t| match t.trigger {
                Trigger::Input => t.holds(state, pending),
                Trigger::Crossing => t.holds(state, None),
            })
            .collect()
    }

    /// Apply a transition's reset map and check it does not re-arm itself.
    ///
    /// A crossing transition that loops back into its own source mode must
    /// leave its guard unsatisfied; otherwise the model would jump forever at
    /// the same instant.
    pub fn reset(
        &self,
        id: TransitionId,
        state: &HybridState<M>,
        payload: Option<&Payload>,
    ) -> ConfigResult<HybridState<M>> {
        let transition = self.transition(id);
        let post = transition.apply_reset(state, payload);

        if post.continuous.dims() != self.dims {
            return Err(ConfigurationError::DimensionMismatch {
                what: "reset output",
                expected: self.dims,
                actual: post.continuous.dims(),
            });
        }

        if transition.trigger == Trigger::Crossing
            && post.mode == transition.source
            && transition.holds(&post, None)
        {
            return Err(ConfigurationError::SelfRetrigger {
                transition: transition.name.clone(),
                mode: self.mode_name(post.mode),
                time: post.continuous.time,
            });
        }

        Ok(post)
    }
}
