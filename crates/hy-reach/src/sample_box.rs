//! Bounding region that reachability draws initial conditions from.
//!
//! Every bound is a closed [`Interval`]. Degenerate bounds are fixed values;
//! the others are the box's *free* coordinates, and a draw maps one point of
//! the unit cube `[0, 1]^d` onto them in declaration order: positions, then
//! velocities, then each input's time followed by its impulse magnitude.

use hy_automaton::{ContinuousState, HybridState, InputEvent, InputSchedule, Mode, Payload};
use hy_core::{Interval, Real};

use crate::error::{ReachError, ReachResult};

/// Payload of a sampled input.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PayloadBound {
    Press,
    Release,
    /// Impulse whose magnitude is drawn from the interval
    Impulse(Interval),
}

/// One input event with a sampled time.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InputBound {
    /// Event time bounds (s)
    pub time: Interval,
    pub payload: PayloadBound,
}

impl InputBound {
    pub fn new(time: Interval, payload: PayloadBound) -> ReachResult<Self> {
        if time.min < 0.0 {
            return Err(ReachError::InvalidArg {
                what: "input time bounds must be non-negative",
            });
        }
        Ok(Self { time, payload })
    }

    /// Input at a fixed time.
    pub fn at(time: Real, payload: PayloadBound) -> ReachResult<Self> {
        Self::new(Interval::new(time, time, "input time")?, payload)
    }
}

/// Bounds on initial conditions and inputs for one starting mode.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SampleBox<M> {
    pub mode: M,
    pub position: Vec<Interval>,
    pub velocity: Vec<Interval>,
    pub inputs: Vec<InputBound>,
}

impl<M: Mode> SampleBox<M> {
    pub fn new(mode: M, position: Vec<Interval>, velocity: Vec<Interval>) -> ReachResult<Self> {
        if position.is_empty() {
            return Err(ReachError::InvalidArg {
                what: "sample box needs at least one dimension",
            });
        }
        if position.len() != velocity.len() {
            return Err(ReachError::InvalidArg {
                what: "position and velocity bounds must have the same dimension",
            });
        }
        Ok(Self {
            mode,
            position,
            velocity,
            inputs: Vec::new(),
        })
    }

    /// Add a sampled input event.
    pub fn with_input(mut self, input: InputBound) -> Self {
        self.inputs.push(input);
        self
    }

    pub fn dims(&self) -> usize {
        self.position.len()
    }

    /// Every bound, in draw order.
    fn bounds(&self) -> impl Iterator<Item = &Interval> {
        let inputs = self.inputs.iter().flat_map(|input| {
            let magnitude = match &input.payload {
                PayloadBound::Impulse(m) => Some(m),
                _ => None,
            };
            std::iter::once(&input.time).chain(magnitude)
        });
        self.position.iter().chain(&self.velocity).chain(inputs)
    }

    /// Number of non-degenerate bounds, i.e. the dimension of a draw point.
    pub fn free_dims(&self) -> usize {
        self.bounds().filter(|b| !b.is_degenerate()).count()
    }

    /// Map a unit-cube point onto an initial state and input schedule.
    ///
    /// `unit` holds one coordinate per free bound.
    pub fn draw(&self, unit: &[Real]) -> ReachResult<(HybridState<M>, InputSchedule)> {
        if unit.len() != self.free_dims() {
            return Err(ReachError::InvalidArg {
                what: "draw point dimension does not match free bounds",
            });
        }
        let mut coords = unit.iter();
        let mut values = self.bounds().map(|b| {
            if b.is_degenerate() {
                b.min
            } else {
                coords.next().map_or(b.min, |&u| b.lerp(u))
            }
        });

        let n = self.dims();
        let position: Vec<Real> = values.by_ref().take(n).collect();
        let velocity: Vec<Real> = values.by_ref().take(n).collect();
        let mut events = Vec::with_capacity(self.inputs.len());
        for input in &self.inputs {
            let time = values.next().unwrap_or(input.time.min);
            let payload = match input.payload {
                PayloadBound::Press => Payload::Press,
                PayloadBound::Release => Payload::Release,
                PayloadBound::Impulse(m) => Payload::Impulse(values.next().unwrap_or(m.min)),
            };
            events.push(InputEvent::new(time, payload));
        }

        let continuous = ContinuousState::new(0.0, position, velocity)?;
        Ok((
            HybridState::new(self.mode, continuous),
            InputSchedule::new(events)?,
        ))
    }
}
