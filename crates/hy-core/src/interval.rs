//! Closed real intervals used for sampling bounds and envelope bands.

use crate::{CoreError, CoreResult, Real, ensure_finite};

/// Closed interval `[min, max]` with `min <= max`.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Interval {
    pub min: Real,
    pub max: Real,
}

impl Interval {
    /// Create a validated interval.
    pub fn new(min: Real, max: Real, what: &'static str) -> CoreResult<Self> {
        ensure_finite(min, what)?;
        ensure_finite(max, what)?;
        if min > max {
            return Err(CoreError::InvalidInterval { what, min, max });
        }
        Ok(Self { min, max })
    }

    /// Degenerate interval holding a single value.
    pub fn point(value: Real) -> Self {
        Self {
            min: value,
            max: value,
        }
    }

    pub fn width(&self) -> Real {
        self.max - self.min
    }

    pub fn is_degenerate(&self) -> bool {
        self.min == self.max
    }

    pub fn contains(&self, value: Real) -> bool {
        value >= self.min && value <= self.max
    }

    /// True if `other` lies entirely inside `self`.
    pub fn encloses(&self, other: &Interval) -> bool {
        self.min <= other.min && other.max <= self.max
    }

    /// Map a unit coordinate `u` in [0, 1] onto the interval.
    ///
    /// `u = 1` returns `max` exactly so grid endpoints are not lost to rounding.
    pub fn lerp(&self, u: Real) -> Real {
        if u >= 1.0 {
            return self.max;
        }
        self.min + u * self.width()
    }

    /// Smallest interval containing both.
    pub fn hull(&self, other: &Interval) -> Interval {
        Interval {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// Widen to include `value`.
    pub fn include(&mut self, value: Real) {
        self.min = self.min.min(value);
        self.max = self.max.max(value);
    }
}
