//! FlowField trait: the right-hand side the integrators advance.

use hy_automaton::{Automaton, ContinuousState, Mode};
use hy_core::Real;
use nalgebra::DVector;

use crate::error::SimResult;

/// A continuous vector field `x_dot = f(t, x)` over a flat state vector.
///
/// Integrators only see flat vectors; the layout is `[position..., velocity...]`.
pub trait FlowField {
    /// Length of the flat state vector.
    fn dim(&self) -> usize;

    /// Compute the state derivative.
    fn rhs(&self, t: Real, x: &DVector<Real>) -> SimResult<DVector<Real>>;
}

/// Flow of one automaton mode.
pub struct ModeFlow<'a, M> {
    automaton: &'a Automaton<M>,
    mode: M,
}

impl<'a, M: Mode> ModeFlow<'a, M> {
    pub fn new(automaton: &'a Automaton<M>, mode: M) -> Self {
        Self { automaton, mode }
    }
}

impl<M: Mode> FlowField for ModeFlow<'_, M> {
    fn dim(&self) -> usize {
        2 * self.automaton.dims()
    }

    fn rhs(&self, t: Real, x: &DVector<Real>) -> SimResult<DVector<Real>> {
        let state = ContinuousState::from_flat(t, x);
        Ok(self.automaton.dynamics(self.mode, &state)?.to_flat())
    }
}
