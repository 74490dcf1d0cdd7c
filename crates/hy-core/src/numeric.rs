use crate::CoreError;

/// Floating point type used throughout system
pub type Real = f64;

/// Relative slack used when snapping a horizon onto the sample grid.
pub const GRID_SNAP_REL: Real = 1e-9;

/// Slack for comparing integrated states and grid times.
///
/// Values pass when they agree to within `abs`, or to within `rel` of the
/// larger magnitude.
#[derive(Clone, Copy, Debug)]
pub struct Tolerances {
    pub abs: Real,
    pub rel: Real,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            abs: 1e-12,
            rel: 1e-9,
        }
    }
}

pub fn nearly_equal(a: Real, b: Real, tol: Tolerances) -> bool {
    let diff = (a - b).abs();
    diff <= tol.abs || diff <= tol.rel * a.abs().max(b.abs())
}

pub fn ensure_finite(v: Real, what: &'static str) -> Result<Real, CoreError> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(CoreError::NonFinite { what, value: v })
    }
}

pub fn ensure_positive(v: Real, what: &'static str) -> Result<Real, CoreError> {
    let v = ensure_finite(v, what)?;
    if v > 0.0 {
        Ok(v)
    } else {
        Err(CoreError::InvalidArg { what })
    }
}

/// Number of whole `dt` intervals that fit in `horizon`.
///
/// A horizon that is an integer multiple of `dt` up to rounding noise
/// (e.g. `1.0 / 0.02`) snaps to that multiple instead of losing the last
/// interval to a floor.
pub fn grid_steps(horizon: Real, dt: Real) -> Result<u64, CoreError> {
    let dt = ensure_positive(dt, "sample rate")?;
    let horizon = ensure_finite(horizon, "horizon")?;
    if horizon < 0.0 {
        return Err(CoreError::InvalidArg {
            what: "horizon must be non-negative",
        });
    }

    let ratio = horizon / dt;
    let nearest = ratio.round();
    let steps = if (ratio - nearest).abs() <= GRID_SNAP_REL * nearest.max(1.0) {
        nearest
    } else {
        ratio.floor()
    };
    Ok(steps as u64)
}

/// Time of grid sample `step`.
///
/// Always computed from the step index so repeated runs land on identical
/// floating point values.
#[inline]
pub fn grid_time(step: u64, dt: Real) -> Real {
    step as Real * dt
}
