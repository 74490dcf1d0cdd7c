//! Bouncing ball: one flying mode and a bounce jump at the ground.

use hy_automaton::{
    Automaton, AutomatonBuilder, ConfigResult, ConfigurationError, ContinuousState, HybridState,
};
use hy_core::{Real, ensure_finite};
use nalgebra::DVector;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BallMode {
    Flying,
}

#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BallParams {
    /// Magnitude of downward acceleration (m/s²)
    pub gravity: Real,
    /// Fraction of speed kept by a bounce, in [0, 1]
    pub restitution: Real,
}

impl Default for BallParams {
    fn default() -> Self {
        Self {
            gravity: 9.81,
            restitution: 0.5,
        }
    }
}

impl BallParams {
    pub fn validate(&self) -> ConfigResult<()> {
        ensure_finite(self.gravity, "gravity")?;
        ensure_finite(self.restitution, "restitution")?;
        if !(0.0..=1.0).contains(&self.restitution) {
            return Err(ConfigurationError::InvalidParameter {
                what: "restitution must lie in [0, 1]",
            });
        }
        Ok(())
    }

    /// Ball at height `y` with vertical velocity `vy`, at t = 0.
    pub fn initial_state(&self, y: Real, vy: Real) -> ConfigResult<HybridState<BallMode>> {
        Ok(HybridState::new(
            BallMode::Flying,
            ContinuousState::new(0.0, vec![y], vec![vy])?,
        ))
    }
}

/// Build the bouncing ball automaton.
///
/// The bounce guard is armed only while falling, so the reversed velocity
/// after a bounce disarms it.
pub fn ball_automaton(params: &BallParams) -> ConfigResult<Automaton<BallMode>> {
    params.validate()?;
    let p = *params;

    let mut b = AutomatonBuilder::new(1);
    b.add_mode(BallMode::Flying, "flying", move |_x: &ContinuousState| {
        DVector::from_element(1, -p.gravity)
    });
    b.add_crossing(
        "bounce",
        BallMode::Flying,
        BallMode::Flying,
        0,
        |s, _| {
            if s.continuous.velocity[0] < 0.0 {
                -s.continuous.position[0]
            } else {
                -1.0
            }
        },
        move |s, _| {
            let mut x = s.continuous.clone();
            x.position[0] = 0.0;
            x.velocity[0] = -p.restitution * x.velocity[0];
            x
        },
    );
    b.build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounce_reverses_and_damps() {
        let a = ball_automaton(&BallParams::default()).unwrap();
        let s = BallParams::default().initial_state(-0.01, -4.0).unwrap();
        let eligible = a.guards(&s, None);
        assert_eq!(eligible.len(), 1);
        let post = a.reset(eligible[0].id, &s, None).unwrap();
        assert_eq!(post.continuous.position[0], 0.0);
        assert_eq!(post.continuous.velocity[0], 2.0);
    }

    #[test]
    fn rising_ball_is_not_eligible() {
        let a = ball_automaton(&BallParams::default()).unwrap();
        let s = BallParams::default().initial_state(-0.01, 1.0).unwrap();
        assert!(a.guards(&s, None).is_empty());
    }

    #[test]
    fn restitution_out_of_range() {
        let params = BallParams {
            restitution: 1.5,
            ..BallParams::default()
        };
        assert!(ball_automaton(&params).is_err());
    }
}
