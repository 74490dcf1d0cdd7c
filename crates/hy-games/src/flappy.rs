//! Flappy avoider as a hybrid automaton.
//!
//! State is two-dimensional: position `[x, y]`, velocity `[vx, vy]`. The bird
//! moves forward at constant speed and falls under gravity. Two control
//! styles are available:
//!
//! - `Tap`: every press adds a fixed upward velocity change while falling.
//! - `Hold`: pressing switches to a `Flapping` mode that rises at constant
//!   speed without gravity; releasing drops back to `Falling`.
//!
//! Touching a level bound or obstacle moves to the absorbing `GameOver` mode.

use std::sync::Arc;

use hy_automaton::{
    Automaton, AutomatonBuilder, ConfigResult, ConfigurationError, ContinuousState, HybridState,
    Payload,
};
use hy_core::{Real, ensure_finite};
use nalgebra::DVector;

use crate::level::FlappyLevel;

/// Index of the horizontal component.
pub const X: usize = 0;
/// Index of the vertical component.
pub const Y: usize = 1;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FlappyMode {
    Falling,
    /// Button held (hold style only)
    Flapping,
    GameOver,
}

/// How button input drives the bird.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ControlStyle {
    /// Press adds `flap_impulse` to the vertical velocity
    #[default]
    Tap,
    /// Press enters `Flapping`, release returns to `Falling`
    Hold,
}

/// Physical parameters of the game.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FlappyParams {
    /// Magnitude of downward acceleration (units/s²)
    pub gravity: Real,
    /// Constant horizontal speed (units/s)
    pub forward_speed: Real,
    /// Vertical velocity change of one tap (units/s)
    pub flap_impulse: Real,
    /// Vertical velocity while flapping in hold style (units/s)
    pub flap_velocity: Real,
    pub style: ControlStyle,
}

impl Default for FlappyParams {
    fn default() -> Self {
        Self {
            gravity: 9.81,
            forward_speed: 2.0,
            flap_impulse: 2.0,
            flap_velocity: 2.0,
            style: ControlStyle::Tap,
        }
    }
}

impl FlappyParams {
    pub fn validate(&self) -> ConfigResult<()> {
        ensure_finite(self.gravity, "gravity")?;
        ensure_finite(self.forward_speed, "forward speed")?;
        ensure_finite(self.flap_impulse, "flap impulse")?;
        ensure_finite(self.flap_velocity, "flap velocity")?;
        Ok(())
    }

    /// Falling bird at `(x, y)` with vertical velocity `vy`, at t = 0.
    pub fn initial_state(&self, x: Real, y: Real, vy: Real) -> ConfigResult<HybridState<FlappyMode>> {
        let continuous = ContinuousState::new(0.0, vec![x, y], vec![self.forward_speed, vy])?;
        Ok(HybridState::new(FlappyMode::Falling, continuous))
    }
}

/// Build the flappy automaton for `params` on `level`.
pub fn flappy_automaton(
    params: &FlappyParams,
    level: &FlappyLevel,
) -> ConfigResult<Automaton<FlappyMode>> {
    params.validate()?;
    if level.lower.is_nan() || level.upper.is_nan() || level.lower >= level.upper {
        return Err(ConfigurationError::InvalidParameter {
            what: "level lower bound must be below upper bound",
        });
    }

    let p = *params;
    let level = Arc::new(level.clone());
    let mut b = AutomatonBuilder::new(2);

    b.add_mode(FlappyMode::Falling, "falling", move |_x: &ContinuousState| {
        DVector::from_vec(vec![0.0, -p.gravity])
    });
    b.add_terminal_mode(FlappyMode::GameOver, "game over");
    add_collision(&mut b, FlappyMode::Falling, &level);

    match p.style {
        ControlStyle::Tap => {
            b.add_input(
                "flap",
                FlappyMode::Falling,
                FlappyMode::Falling,
                1,
                |_, payload| match payload {
                    Some(Payload::Press | Payload::Impulse(_)) => 0.0,
                    _ => -1.0,
                },
                move |s, payload| {
                    let kick = match payload {
                        Some(Payload::Impulse(m)) => *m,
                        _ => p.flap_impulse,
                    };
                    let mut x = s.continuous.clone();
                    x.velocity[Y] += kick;
                    x
                },
            );
        }
        ControlStyle::Hold => {
            b.add_mode(FlappyMode::Flapping, "flapping", |_x: &ContinuousState| {
                DVector::zeros(2)
            });
            add_collision(&mut b, FlappyMode::Flapping, &level);
            b.add_input(
                "press",
                FlappyMode::Falling,
                FlappyMode::Flapping,
                1,
                |_, payload| match payload {
                    Some(Payload::Press) => 0.0,
                    _ => -1.0,
                },
                move |s, _| {
                    let mut x = s.continuous.clone();
                    x.velocity[X] = p.forward_speed;
                    x.velocity[Y] = p.flap_velocity;
                    x
                },
            );
            b.add_input(
                "release",
                FlappyMode::Flapping,
                FlappyMode::Falling,
                1,
                |_, payload| match payload {
                    Some(Payload::Release) => 0.0,
                    _ => -1.0,
                },
                |s, _| s.continuous.clone(),
            );
        }
    }

    b.build()
}

fn add_collision(b: &mut AutomatonBuilder<FlappyMode>, mode: FlappyMode, level: &Arc<FlappyLevel>) {
    let level = Arc::clone(level);
    b.add_crossing(
        "collide",
        mode,
        FlappyMode::GameOver,
        0,
        move |s, _| {
            let p = &s.continuous.position;
            level.collision_metric(p[X], p[Y])
        },
        |s, _| s.continuous.clone(),
    );
}
