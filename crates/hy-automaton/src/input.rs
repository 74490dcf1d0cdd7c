//! Exogenous discrete inputs.
//!
//! Inputs are modelled as a time-ordered schedule of events. Whether an event
//! has an effect is decided by the guards of the active mode; the schedule
//! itself knows nothing about the automaton.

use hy_core::{Real, ensure_finite, ensure_positive};

use crate::error::ConfigResult;

/// Payload carried by an input event.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Payload {
    /// Button goes down (a flap)
    Press,
    /// Button goes up
    Release,
    /// Flap with an explicit velocity change
    Impulse(Real),
}

/// A scheduled input.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InputEvent {
    /// Scheduled time (s)
    pub time: Real,
    pub payload: Payload,
}

impl InputEvent {
    pub fn new(time: Real, payload: Payload) -> Self {
        Self { time, payload }
    }
}

/// Time-ordered input schedule.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InputSchedule {
    events: Vec<InputEvent>,
    /// Length of the input sequence this schedule was built from
    sequence_len: usize,
}

impl InputSchedule {
    /// Schedule with no inputs.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a schedule from explicit events.
    ///
    /// Events are stably sorted by time; times must be finite and
    /// non-negative. The sequence length equals the number of events.
    pub fn new(mut events: Vec<InputEvent>) -> ConfigResult<Self> {
        for event in &events {
            ensure_finite(event.time, "input event time")?;
            if event.time < 0.0 {
                return Err(crate::ConfigurationError::InvalidParameter {
                    what: "input event time must be non-negative",
                });
            }
            if let Payload::Impulse(m) = event.payload {
                ensure_finite(m, "input impulse")?;
            }
        }
        events.sort_by(|a, b| a.time.total_cmp(&b.time));
        let sequence_len = events.len();
        Ok(Self {
            events,
            sequence_len,
        })
    }

    /// Build a schedule from per-step button samples (0 = up, anything else = down).
    ///
    /// Sample `i` is taken at `i * dt`. A `Press`/`Release` event is emitted
    /// wherever the button level changes, starting from "up". The sequence
    /// length is the number of samples, so a horizon derived from it covers
    /// every sample interval.
    pub fn from_button_samples(samples: &[u8], dt: Real) -> ConfigResult<Self> {
        let dt = ensure_positive(dt, "sample rate")?;
        let mut events = Vec::new();
        let mut pressed = false;
        for (i, &sample) in samples.iter().enumerate() {
            let down = sample != 0;
            if down != pressed {
                let payload = if down {
                    Payload::Press
                } else {
                    Payload::Release
                };
                events.push(InputEvent::new(i as Real * dt, payload));
                pressed = down;
            }
        }
        Ok(Self {
            events,
            sequence_len: samples.len(),
        })
    }

    pub fn events(&self) -> &[InputEvent] {
        &self.events
    }

    pub fn iter(&self) -> impl Iterator<Item = &InputEvent> {
        self.events.iter()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Number of entries in the originating input sequence.
    pub fn sequence_len(&self) -> usize {
        self.sequence_len
    }
}
