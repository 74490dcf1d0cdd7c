//! Time integrators and resampling onto the sample grid.
//!
//! The integrators advance a flat state between two times. The adaptive
//! Dormand–Prince scheme picks its own substeps but always stops exactly on
//! the next grid time, so callers only ever observe states at `t = k·Δt`.

use hy_automaton::ContinuousState;
use hy_core::{Real, grid_time};
use nalgebra::DVector;

use crate::error::{SimError, SimResult};
use crate::model::FlowField;

/// Trait for time integrators.
pub trait Integrator {
    /// Advance `x0` from `t0` to `t1` under `field`.
    fn advance<F: FlowField + ?Sized>(
        &self,
        field: &F,
        t0: Real,
        x0: &DVector<Real>,
        t1: Real,
    ) -> SimResult<DVector<Real>>;
}

/// Classical RK4 (Runge-Kutta 4th order), one step per call.
#[derive(Clone, Debug)]
pub struct Rk4;

impl Integrator for Rk4 {
    fn advance<F: FlowField + ?Sized>(
        &self,
        field: &F,
        t0: Real,
        x0: &DVector<Real>,
        t1: Real,
    ) -> SimResult<DVector<Real>> {
        let dt = t1 - t0;
        let k1 = field.rhs(t0, x0)?;
        let k2 = field.rhs(t0 + 0.5 * dt, &(x0 + &k1 * (0.5 * dt)))?;
        let k3 = field.rhs(t0 + 0.5 * dt, &(x0 + &k2 * (0.5 * dt)))?;
        let k4 = field.rhs(t1, &(x0 + &k3 * dt))?;

        // x_new = x + (dt/6) * (k1 + 2*k2 + 2*k3 + k4)
        Ok(x0 + (k1 + k2 * 2.0 + k3 * 2.0 + k4) * (dt / 6.0))
    }
}

/// Forward Euler (explicit, 1st order, fast for testing).
/// Calls rhs() once per step instead of 4 times (RK4).
#[derive(Clone, Debug)]
pub struct ForwardEuler;

impl Integrator for ForwardEuler {
    fn advance<F: FlowField + ?Sized>(
        &self,
        field: &F,
        t0: Real,
        x0: &DVector<Real>,
        t1: Real,
    ) -> SimResult<DVector<Real>> {
        let xdot = field.rhs(t0, x0)?;
        Ok(x0 + xdot * (t1 - t0))
    }
}

// Dormand-Prince 5(4) tableau
const DP_C: [Real; 7] = [0.0, 1.0 / 5.0, 3.0 / 10.0, 4.0 / 5.0, 8.0 / 9.0, 1.0, 1.0];

#[rustfmt::skip]
const DP_A: [&[Real]; 6] = [
    &[1.0 / 5.0],
    &[3.0 / 40.0, 9.0 / 40.0],
    &[44.0 / 45.0, -56.0 / 15.0, 32.0 / 9.0],
    &[19372.0 / 6561.0, -25360.0 / 2187.0, 64448.0 / 6561.0, -212.0 / 729.0],
    &[9017.0 / 3168.0, -355.0 / 33.0, 46732.0 / 5247.0, 49.0 / 176.0, -5103.0 / 18656.0],
    &[35.0 / 384.0, 0.0, 500.0 / 1113.0, 125.0 / 192.0, -2187.0 / 6784.0, 11.0 / 84.0],
];

/// Difference between the 5th and embedded 4th order weights.
const DP_E: [Real; 7] = [
    71.0 / 57600.0,
    0.0,
    -71.0 / 16695.0,
    71.0 / 1920.0,
    -17253.0 / 339200.0,
    22.0 / 525.0,
    -1.0 / 40.0,
];

/// Adaptive Dormand–Prince 5(4) with max-norm error control.
#[derive(Clone, Debug)]
pub struct DormandPrince {
    pub abs_tol: Real,
    pub rel_tol: Real,
    pub min_step: Real,
    pub max_substeps: usize,
    pub safety: Real,
}

impl DormandPrince {
    /// One trial step of size `h`: returns the 5th order state and the scaled error norm.
    fn trial<F: FlowField + ?Sized>(
        &self,
        field: &F,
        t: Real,
        x: &DVector<Real>,
        h: Real,
    ) -> SimResult<(DVector<Real>, Real)> {
        let mut k: Vec<DVector<Real>> = Vec::with_capacity(7);
        k.push(field.rhs(t, x)?);
        for (stage, row) in DP_A.iter().enumerate() {
            let mut xs = x.clone();
            for (j, &a) in row.iter().enumerate() {
                if a != 0.0 {
                    xs.axpy(h * a, &k[j], 1.0);
                }
            }
            k.push(field.rhs(t + DP_C[stage + 1] * h, &xs)?);
        }

        // The last stage is evaluated at the 5th order solution (FSAL row)
        let mut x_new = x.clone();
        for (j, &b) in DP_A[5].iter().enumerate() {
            if b != 0.0 {
                x_new.axpy(h * b, &k[j], 1.0);
            }
        }

        let mut err = DVector::zeros(x.len());
        for (j, &e) in DP_E.iter().enumerate() {
            if e != 0.0 {
                err.axpy(h * e, &k[j], 1.0);
            }
        }

        let mut norm: Real = 0.0;
        for i in 0..x.len() {
            let scale = self.abs_tol + self.rel_tol * x[i].abs().max(x_new[i].abs());
            norm = norm.max(err[i].abs() / scale);
        }
        if !norm.is_finite() || x_new.iter().any(|v| !v.is_finite()) {
            norm = Real::INFINITY;
        }
        Ok((x_new, norm))
    }
}

impl Integrator for DormandPrince {
    fn advance<F: FlowField + ?Sized>(
        &self,
        field: &F,
        t0: Real,
        x0: &DVector<Real>,
        t1: Real,
    ) -> SimResult<DVector<Real>> {
        let mut t = t0;
        let mut x = x0.clone();
        let mut h = t1 - t0;
        let mut substeps = 0;

        while t < t1 {
            if substeps >= self.max_substeps {
                return Err(SimError::ConvergenceFailed {
                    what: format!("exceeded {} substeps", self.max_substeps),
                });
            }
            substeps += 1;

            let last = h >= t1 - t;
            if last {
                h = t1 - t;
            }

            let (x_new, norm) = self.trial(field, t, &x, h)?;
            let scale = if norm.is_finite() {
                (self.safety / norm.max(1e-16).powf(0.2)).clamp(0.1, 10.0)
            } else {
                0.1
            };

            if norm <= 1.0 {
                t = if last { t1 } else { t + h };
                x = x_new;
                h *= scale;
            } else {
                h *= scale;
                if h < self.min_step {
                    return Err(SimError::ConvergenceFailed {
                        what: format!("step size {h:.3e} below minimum at t={t}"),
                    });
                }
            }
        }

        Ok(x)
    }
}

/// Integrator selection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum IntegratorKind {
    /// Adaptive Dormand–Prince 5(4) (default).
    #[default]
    DormandPrince,
    /// 4th-order Runge-Kutta, one step per grid interval.
    Rk4,
    /// Forward Euler, one step per grid interval.
    ForwardEuler,
}

/// Options for the continuous integrator.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct IntegratorOptions {
    pub kind: IntegratorKind,
    /// Absolute error tolerance (adaptive only)
    pub abs_tol: Real,
    /// Relative error tolerance (adaptive only)
    pub rel_tol: Real,
    /// Smallest accepted substep (adaptive only)
    pub min_step: Real,
    /// Substep budget per grid interval (adaptive only)
    pub max_substeps: usize,
    /// Step size safety factor (adaptive only)
    pub safety: Real,
}

impl Default for IntegratorOptions {
    fn default() -> Self {
        Self {
            kind: IntegratorKind::default(),
            abs_tol: 1e-9,
            rel_tol: 1e-9,
            min_step: 1e-12,
            max_substeps: 10_000,
            safety: 0.9,
        }
    }
}

impl IntegratorOptions {
    pub fn validate(&self) -> SimResult<()> {
        if !(self.abs_tol > 0.0 && self.abs_tol.is_finite()) {
            return Err(SimError::InvalidArg {
                what: "abs_tol must be positive",
            });
        }
        if !(self.rel_tol >= 0.0 && self.rel_tol.is_finite()) {
            return Err(SimError::InvalidArg {
                what: "rel_tol must be non-negative",
            });
        }
        if !(self.min_step > 0.0 && self.min_step.is_finite()) {
            return Err(SimError::InvalidArg {
                what: "min_step must be positive",
            });
        }
        if self.max_substeps == 0 {
            return Err(SimError::InvalidArg {
                what: "max_substeps must be positive",
            });
        }
        if !(self.safety > 0.0 && self.safety <= 1.0) {
            return Err(SimError::InvalidArg {
                what: "safety must lie in (0, 1]",
            });
        }
        Ok(())
    }

    fn dormand_prince(&self) -> DormandPrince {
        DormandPrince {
            abs_tol: self.abs_tol,
            rel_tol: self.rel_tol,
            min_step: self.min_step,
            max_substeps: self.max_substeps,
            safety: self.safety,
        }
    }

    /// Advance with the selected integrator and reject non-finite results.
    pub fn advance<F: FlowField + ?Sized>(
        &self,
        field: &F,
        t0: Real,
        x0: &DVector<Real>,
        t1: Real,
    ) -> SimResult<DVector<Real>> {
        let x1 = match self.kind {
            IntegratorKind::DormandPrince => self.dormand_prince().advance(field, t0, x0, t1)?,
            IntegratorKind::Rk4 => Rk4.advance(field, t0, x0, t1)?,
            IntegratorKind::ForwardEuler => ForwardEuler.advance(field, t0, x0, t1)?,
        };
        if x1.iter().any(|v| !v.is_finite()) {
            return Err(SimError::ConvergenceFailed {
                what: format!("non-finite state at t={t1}"),
            });
        }
        Ok(x1)
    }
}

/// Advance a continuous state sitting on grid sample `step` to sample `step + 1`.
///
/// Both times come from [`grid_time`], so the output lies exactly on the grid.
pub fn step_on_grid<F: FlowField + ?Sized>(
    options: &IntegratorOptions,
    field: &F,
    x: &ContinuousState,
    step: u64,
    dt: Real,
) -> SimResult<ContinuousState> {
    if 2 * x.dims() != field.dim() {
        return Err(SimError::InvalidArg {
            what: "state dimension does not match flow field",
        });
    }
    let t0 = grid_time(step, dt);
    let t1 = grid_time(step + 1, dt);
    let flat = options.advance(field, t0, &x.to_flat(), t1)?;
    Ok(ContinuousState::from_flat(t1, &flat))
}

/// Grid-resampled flow over a span.
#[derive(Clone, Debug, PartialEq)]
pub struct GridSpan {
    /// Samples at consecutive grid steps, starting with the initial state
    pub samples: Vec<ContinuousState>,
    /// Why integration stopped early, if it did; the last sample is the last valid one
    pub failure: Option<String>,
}

/// Integrate `steps` grid intervals from `start` (which sits on grid step `first_step`).
///
/// Integrator failures end the span early and are reported in
/// [`GridSpan::failure`]; other errors propagate.
pub fn integrate_on_grid<F: FlowField + ?Sized>(
    options: &IntegratorOptions,
    field: &F,
    start: &ContinuousState,
    first_step: u64,
    dt: Real,
    steps: u64,
) -> SimResult<GridSpan> {
    options.validate()?;
    if !(dt > 0.0 && dt.is_finite()) {
        return Err(SimError::InvalidArg {
            what: "sample rate must be positive",
        });
    }

    let mut samples = Vec::with_capacity(steps as usize + 1);
    samples.push(start.at_time(grid_time(first_step, dt)));
    for i in 0..steps {
        let current = &samples[samples.len() - 1];
        match step_on_grid(options, field, current, first_step + i, dt) {
            Ok(next) => samples.push(next),
            Err(SimError::ConvergenceFailed { what }) => {
                return Ok(GridSpan {
                    samples,
                    failure: Some(what),
                });
            }
            Err(e) => return Err(e),
        }
    }

    Ok(GridSpan {
        samples,
        failure: None,
    })
}
