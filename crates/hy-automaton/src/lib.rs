//! hy-automaton: hybrid automaton model layer.
//!
//! Provides:
//! - Continuous and hybrid state types
//! - Exogenous input events and schedules
//! - Transitions (guard + reset + priority rank)
//! - Incremental automaton builder with validation
//!
//! # Example
//!
//! ```
//! use hy_automaton::{AutomatonBuilder, ContinuousState};
//! use nalgebra::DVector;
//!
//! #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
//! enum Ball {
//!     Flying,
//! }
//!
//! let mut builder = AutomatonBuilder::new(1);
//! builder.add_mode(Ball::Flying, "flying", |_x: &ContinuousState| DVector::from_element(1, -9.81));
//! builder.add_crossing(
//!     "bounce",
//!     Ball::Flying,
//!     Ball::Flying,
//!     0,
//!     |s, _| if s.continuous.velocity[0] < 0.0 { -s.continuous.position[0] } else { -1.0 },
//!     |s, _| {
//!         let mut x = s.continuous.clone();
//!         x.position[0] = 0.0;
//!         x.velocity[0] = -0.5 * x.velocity[0];
//!         x
//!     },
//! );
//! let automaton = builder.build().unwrap();
//! assert_eq!(automaton.modes().len(), 1);
//! assert_eq!(automaton.transitions().len(), 1);
//! ```

pub mod automaton;
pub mod builder;
pub mod error;
pub mod input;
pub mod state;
pub mod transition;
pub(crate) mod validate;

// Re-exports for ergonomics
pub use automaton::{Automaton, ModeSpec};
pub use builder::AutomatonBuilder;
pub use error::{ConfigResult, ConfigurationError};
pub use input::{InputEvent, InputSchedule, Payload};
pub use state::{ContinuousState, Derivative, HybridState, Mode};
pub use transition::{AccelerationFn, GuardFn, ResetFn, Transition, TransitionId, Trigger};
