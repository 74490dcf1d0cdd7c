//! hy-games: concrete hybrid automata.
//!
//! Provides:
//! - Flappy avoider (tap and hold control styles, level geometry)
//! - Bouncing ball
//!
//! Every model is a plain [`hy_automaton::Automaton`] built from parameters;
//! the simulator knows nothing game-specific.

pub mod ball;
pub mod flappy;
pub mod level;

pub use ball::{BallMode, BallParams, ball_automaton};
pub use flappy::{ControlStyle, FlappyMode, FlappyParams, flappy_automaton};
pub use level::{FlappyLevel, Obstacle, Pipe};
