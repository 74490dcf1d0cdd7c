//! Automaton validation logic.

use std::collections::{HashMap, HashSet};

use crate::automaton::ModeSpec;
use crate::error::{ConfigResult, ConfigurationError};
use crate::state::Mode;
use crate::transition::Transition;

/// Validate the mode table: non-empty, positive dimension, no duplicates.
pub(crate) fn validate_modes<M: Mode>(dims: usize, modes: &[ModeSpec<M>]) -> ConfigResult<()> {
    if dims == 0 {
        return Err(ConfigurationError::ZeroDimension);
    }
    if modes.is_empty() {
        return Err(ConfigurationError::EmptyModel);
    }

    let mut seen: HashSet<M> = HashSet::new();
    for spec in modes {
        if !seen.insert(spec.mode) {
            return Err(ConfigurationError::DuplicateMode {
                mode: spec.name.clone(),
            });
        }
    }

    Ok(())
}

/// Validate transitions against the mode table.
///
/// - source and target must be declared modes
/// - terminal modes have no outgoing transitions
/// - ranks are unique per source mode, so simultaneous eligibility always
///   resolves deterministically
pub(crate) fn validate_transitions<M: Mode>(
    modes: &[ModeSpec<M>],
    mode_index: &HashMap<M, usize>,
    transitions: &[Transition<M>],
) -> ConfigResult<()> {
    for t in transitions {
        for (mode, role) in [(t.source, "source"), (t.target, "target")] {
            if !mode_index.contains_key(&mode) {
                return Err(ConfigurationError::UnknownMode {
                    mode: format!("{mode:?}"),
                    what: format!("{role} of transition '{}'", t.name),
                });
            }
        }

        let source = &modes[mode_index[&t.source]];
        if source.terminal {
            return Err(ConfigurationError::TerminalHasTransitions {
                mode: source.name.clone(),
                transition: t.name.clone(),
            });
        }
    }

    // Check that no two transitions out of the same mode share a rank
    let mut ranks: HashMap<(M, u32), &Transition<M>> = HashMap::new();
    for t in transitions {
        if let Some(first) = ranks.insert((t.source, t.rank), t) {
            return Err(ConfigurationError::RankTie {
                mode: modes[mode_index[&t.source]].name.clone(),
                rank: t.rank,
                first: first.name.clone(),
                second: t.name.clone(),
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::AutomatonBuilder;
    use crate::state::ContinuousState;
    use nalgebra::DVector;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
    enum Toy {
        A,
        B,
        End,
    }

    fn zero(_x: &ContinuousState) -> DVector<f64> {
        DVector::zeros(1)
    }

    #[test]
    fn validate_empty_model() {
        let b: AutomatonBuilder<Toy> = AutomatonBuilder::new(1);
        assert_eq!(b.build().err(), Some(ConfigurationError::EmptyModel));
    }

    #[test]
    fn validate_zero_dimension() {
        let mut b = AutomatonBuilder::new(0);
        b.add_mode(Toy::A, "a", zero);
        assert_eq!(b.build().err(), Some(ConfigurationError::ZeroDimension));
    }

    #[test]
    fn validate_duplicate_mode() {
        let mut b = AutomatonBuilder::new(1);
        b.add_mode(Toy::A, "a", zero).add_mode(Toy::A, "again", zero);
        assert!(matches!(
            b.build().err(),
            Some(ConfigurationError::DuplicateMode { .. })
        ));
    }

    #[test]
    fn validate_unknown_target() {
        let mut b = AutomatonBuilder::new(1);
        b.add_mode(Toy::A, "a", zero);
        b.add_crossing("t", Toy::A, Toy::B, 0, |_, _| 1.0, |s, _| s.continuous.clone());
        assert!(matches!(
            b.build().err(),
            Some(ConfigurationError::UnknownMode { .. })
        ));
    }

    #[test]
    fn validate_terminal_without_transitions() {
        let mut b = AutomatonBuilder::new(1);
        b.add_mode(Toy::A, "a", zero).add_terminal_mode(Toy::End, "end");
        b.add_crossing("out", Toy::End, Toy::A, 0, |_, _| 1.0, |s, _| s.continuous.clone());
        assert!(matches!(
            b.build().err(),
            Some(ConfigurationError::TerminalHasTransitions { .. })
        ));
    }

    #[test]
    fn same_rank_in_different_modes_is_fine() {
        let mut b = AutomatonBuilder::new(1);
        b.add_mode(Toy::A, "a", zero).add_mode(Toy::B, "b", zero);
        b.add_crossing("ab", Toy::A, Toy::B, 0, |_, _| -1.0, |s, _| s.continuous.clone());
        b.add_crossing("ba", Toy::B, Toy::A, 0, |_, _| -1.0, |s, _| s.continuous.clone());
        assert!(b.build().is_ok());
    }
}
