//! Incremental automaton builder.

use std::collections::HashMap;
use std::sync::Arc;

use hy_core::Real;
use nalgebra::DVector;

use crate::automaton::{Automaton, ModeSpec};
use crate::error::ConfigResult;
use crate::input::Payload;
use crate::state::{ContinuousState, HybridState, Mode};
use crate::transition::{Transition, TransitionId, Trigger};
use crate::validate;

/// Builder for constructing an automaton incrementally.
///
/// Use `add_mode`, `add_crossing` and `add_input` to describe the model,
/// then call `build()` to validate and freeze it into an immutable
/// [`Automaton`].
pub struct AutomatonBuilder<M> {
    dims: usize,
    modes: Vec<ModeSpec<M>>,
    transitions: Vec<Transition<M>>,
    next_transition_id: u32,
}

impl<M: Mode> AutomatonBuilder<M> {
    /// Create a builder for states with `dims` spatial dimensions.
    pub fn new(dims: usize) -> Self {
        Self {
            dims,
            modes: Vec::new(),
            transitions: Vec::new(),
            next_transition_id: 0,
        }
    }

    /// Add a flowing mode with its acceleration law.
    pub fn add_mode<F>(&mut self, mode: M, name: impl Into<String>, acceleration: F) -> &mut Self
    where
        F: Fn(&ContinuousState) -> DVector<Real> + Send + Sync + 'static,
    {
        self.modes.push(ModeSpec {
            mode,
            name: name.into(),
            terminal: false,
            acceleration: Arc::new(acceleration),
            transitions: Vec::new(),
        });
        self
    }

    /// Add an absorbing mode; entering it ends the run.
    pub fn add_terminal_mode(&mut self, mode: M, name: impl Into<String>) -> &mut Self {
        let dims = self.dims;
        self.modes.push(ModeSpec {
            mode,
            name: name.into(),
            terminal: true,
            acceleration: Arc::new(move |_x: &ContinuousState| DVector::zeros(dims)),
            transitions: Vec::new(),
        });
        self
    }

    /// Add a transition fired by a guard sign change along the flow.
    pub fn add_crossing<G, R>(
        &mut self,
        name: impl Into<String>,
        source: M,
        target: M,
        rank: u32,
        guard: G,
        reset: R,
    ) -> TransitionId
    where
        G: Fn(&HybridState<M>, Option<&Payload>) -> Real + Send + Sync + 'static,
        R: Fn(&HybridState<M>, Option<&Payload>) -> ContinuousState + Send + Sync + 'static,
    {
        self.push_transition(name.into(), source, target, rank, Trigger::Crossing, guard, reset)
    }

    /// Add a transition fired by a pending input event the guard accepts.
    pub fn add_input<G, R>(
        &mut self,
        name: impl Into<String>,
        source: M,
        target: M,
        rank: u32,
        guard: G,
        reset: R,
    ) -> TransitionId
    where
        G: Fn(&HybridState<M>, Option<&Payload>) -> Real + Send + Sync + 'static,
        R: Fn(&HybridState<M>, Option<&Payload>) -> ContinuousState + Send + Sync + 'static,
    {
        self.push_transition(name.into(), source, target, rank, Trigger::Input, guard, reset)
    }

    #[allow(clippy::too_many_arguments)]
    fn push_transition<G, R>(
        &mut self,
        name: String,
        source: M,
        target: M,
        rank: u32,
        trigger: Trigger,
        guard: G,
        reset: R,
    ) -> TransitionId
    where
        G: Fn(&HybridState<M>, Option<&Payload>) -> Real + Send + Sync + 'static,
        R: Fn(&HybridState<M>, Option<&Payload>) -> ContinuousState + Send + Sync + 'static,
    {
        let id = TransitionId(self.next_transition_id);
        self.next_transition_id += 1;
        self.transitions.push(Transition {
            id,
            name,
            source,
            target,
            rank,
            trigger,
            guard: Arc::new(guard),
            reset: Arc::new(reset),
        });
        id
    }

    /// Build and validate the automaton.
    pub fn build(mut self) -> ConfigResult<Automaton<M>> {
        validate::validate_modes(self.dims, &self.modes)?;

        let mut mode_index = HashMap::with_capacity(self.modes.len());
        for (i, spec) in self.modes.iter().enumerate() {
            mode_index.insert(spec.mode, i);
        }

        validate::validate_transitions(&self.modes, &mode_index, &self.transitions)?;

        // Attach outgoing transitions to their source modes in rank order
        for transition in &self.transitions {
            let i = mode_index[&transition.source];
            self.modes[i].transitions.push(transition.id);
        }
        let transitions = &self.transitions;
        for spec in &mut self.modes {
            spec.transitions
                .sort_by_key(|id| transitions[id.index()].rank);
        }

        Ok(Automaton {
            dims: self.dims,
            modes: self.modes,
            mode_index,
            transitions: self.transitions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConfigurationError;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
    enum Toy {
        A,
        B,
    }

    fn zero(_x: &ContinuousState) -> DVector<Real> {
        DVector::zeros(1)
    }

    #[test]
    fn builder_assigns_sequential_ids() {
        let mut b = AutomatonBuilder::new(1);
        b.add_mode(Toy::A, "a", zero).add_mode(Toy::B, "b", zero);
        let t0 = b.add_crossing("t0", Toy::A, Toy::B, 0, |_, _| -1.0, |s, _| s.continuous.clone());
        let t1 = b.add_crossing("t1", Toy::B, Toy::A, 0, |_, _| -1.0, |s, _| s.continuous.clone());
        assert_eq!(t0.index(), 0);
        assert_eq!(t1.index(), 1);
        let a = b.build().unwrap();
        assert_eq!(a.transitions().len(), 2);
    }

    #[test]
    fn build_orders_transitions_by_rank() {
        let mut b = AutomatonBuilder::new(1);
        b.add_mode(Toy::A, "a", zero).add_mode(Toy::B, "b", zero);
        b.add_crossing("late", Toy::A, Toy::B, 5, |_, _| 1.0, |s, _| s.continuous.clone());
        b.add_crossing("early", Toy::A, Toy::B, 2, |_, _| 1.0, |s, _| s.continuous.clone());
        let a = b.build().unwrap();
        let names: Vec<&str> = a.transitions_from(Toy::A).map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["early", "late"]);
    }

    #[test]
    fn build_rejects_rank_tie() {
        let mut b = AutomatonBuilder::new(1);
        b.add_mode(Toy::A, "a", zero).add_mode(Toy::B, "b", zero);
        b.add_crossing("x", Toy::A, Toy::B, 1, |_, _| 1.0, |s, _| s.continuous.clone());
        b.add_input("y", Toy::A, Toy::B, 1, |_, _| 1.0, |s, _| s.continuous.clone());
        let err = b.build().err().unwrap();
        assert!(matches!(err, ConfigurationError::RankTie { rank: 1, .. }));
    }
}
