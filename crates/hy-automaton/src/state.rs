//! Continuous and hybrid state types.

use core::fmt::Debug;
use core::hash::Hash;

use hy_core::{Real, ensure_finite};
use nalgebra::DVector;

use crate::error::{ConfigResult, ConfigurationError};

/// Discrete mode identifier.
///
/// Implemented for any small copyable enum; automata are generic over it so
/// each game keeps its own tagged mode set.
pub trait Mode: Copy + Eq + Ord + Hash + Debug + Send + Sync + 'static {}

impl<T> Mode for T where T: Copy + Eq + Ord + Hash + Debug + Send + Sync + 'static {}

/// Physical state at an instant.
///
/// `position` and `velocity` always have the same dimension.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ContinuousState {
    /// Time (s)
    pub time: Real,
    pub position: DVector<Real>,
    pub velocity: DVector<Real>,
}

impl ContinuousState {
    /// Create a validated state at `time`.
    pub fn new(time: Real, position: Vec<Real>, velocity: Vec<Real>) -> ConfigResult<Self> {
        if position.len() != velocity.len() {
            return Err(ConfigurationError::DimensionMismatch {
                what: "velocity",
                expected: position.len(),
                actual: velocity.len(),
            });
        }
        if position.is_empty() {
            return Err(ConfigurationError::ZeroDimension);
        }
        ensure_finite(time, "time")?;
        for &p in &position {
            ensure_finite(p, "position")?;
        }
        for &v in &velocity {
            ensure_finite(v, "velocity")?;
        }
        Ok(Self {
            time,
            position: DVector::from_vec(position),
            velocity: DVector::from_vec(velocity),
        })
    }

    /// Number of spatial dimensions.
    pub fn dims(&self) -> usize {
        self.position.len()
    }

    /// Flatten to `[position..., velocity...]`.
    pub fn to_flat(&self) -> DVector<Real> {
        let n = self.dims();
        DVector::from_fn(2 * n, |i, _| {
            if i < n {
                self.position[i]
            } else {
                self.velocity[i - n]
            }
        })
    }

    /// Rebuild from a flat `[position..., velocity...]` vector.
    pub fn from_flat(time: Real, flat: &DVector<Real>) -> Self {
        let n = flat.len() / 2;
        Self {
            time,
            position: flat.rows(0, n).into_owned(),
            velocity: flat.rows(n, n).into_owned(),
        }
    }

    /// Same state relocated in time.
    pub fn at_time(&self, time: Real) -> Self {
        Self {
            time,
            ..self.clone()
        }
    }

    pub fn is_finite(&self) -> bool {
        self.time.is_finite()
            && self.position.iter().all(|v| v.is_finite())
            && self.velocity.iter().all(|v| v.is_finite())
    }
}

/// Time derivative of a continuous state.
#[derive(Clone, Debug, PartialEq)]
pub struct Derivative {
    /// d(position)/dt, always equal to the current velocity
    pub d_position: DVector<Real>,
    /// d(velocity)/dt, the mode's acceleration
    pub d_velocity: DVector<Real>,
}

impl Derivative {
    /// Flatten to `[d_position..., d_velocity...]`.
    pub fn to_flat(&self) -> DVector<Real> {
        let n = self.d_position.len();
        DVector::from_fn(2 * n, |i, _| {
            if i < n {
                self.d_position[i]
            } else {
                self.d_velocity[i - n]
            }
        })
    }
}

/// Full instantaneous system state.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HybridState<M> {
    pub mode: M,
    pub continuous: ContinuousState,
}

impl<M: Mode> HybridState<M> {
    pub fn new(mode: M, continuous: ContinuousState) -> Self {
        Self { mode, continuous }
    }

    pub fn time(&self) -> Real {
        self.continuous.time
    }
}
