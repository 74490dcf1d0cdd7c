//! Sampled reachability analysis.
//!
//! Draw N initial conditions from a [`SampleBox`], simulate each one
//! independently and fold the trajectories into a [`ReachableEnvelope`].
//! Runs that fail to integrate, or whose reset re-arms its own guard, are
//! skipped and counted; any other error aborts the batch.
//!
//! The result is an under-approximation: more samples can only widen it.

use core::fmt;
use std::collections::BTreeMap;

use hy_automaton::{ConfigurationError, Mode};
use hy_core::Real;
use hy_sim::{SimError, Simulator};
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::envelope::ReachableEnvelope;
use crate::error::{ReachError, ReachResult};
use crate::sample_box::SampleBox;
use crate::sampler::{SamplingStrategy, unit_points};

/// Options for a reachability batch.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ReachOptions {
    /// Number of initial conditions to draw
    pub num_samples: usize,
    /// Seed of the pseudorandom stream; recorded in the report
    pub seed: u64,
    pub strategy: SamplingStrategy,
    /// Simulate draws on the rayon thread pool
    pub parallel: bool,
}

impl Default for ReachOptions {
    fn default() -> Self {
        Self {
            num_samples: 20,
            seed: 0,
            strategy: SamplingStrategy::Grid,
            parallel: true,
        }
    }
}

impl ReachOptions {
    pub fn validate(&self) -> ReachResult<()> {
        if self.num_samples == 0 {
            return Err(ReachError::InvalidArg {
                what: "num_samples must be positive",
            });
        }
        Ok(())
    }
}

/// Outcome of a reachability batch.
#[derive(Clone, Debug, PartialEq)]
pub struct ReachReport {
    pub envelope: ReachableEnvelope,
    /// Runs drawn
    pub total: usize,
    /// Runs excluded from the envelope
    pub skipped: usize,
    /// Completed runs per termination label
    pub outcomes: BTreeMap<&'static str, usize>,
    pub seed: u64,
    pub strategy: SamplingStrategy,
}

impl ReachReport {
    /// Runs folded into the envelope.
    pub fn completed(&self) -> usize {
        self.total - self.skipped
    }
}

impl fmt::Display for ReachReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} samples ({} strategy, seed {}), {} bands",
            self.total,
            self.strategy,
            self.seed,
            self.envelope.len()
        )?;
        for (label, count) in &self.outcomes {
            writeln!(f, "  {label}: {count}")?;
        }
        write!(
            f,
            "{} of {} samples skipped due to integration failure",
            self.skipped, self.total
        )
    }
}

/// Partial result over a subset of draws.
#[derive(Debug, Default)]
struct Tally {
    envelope: ReachableEnvelope,
    total: usize,
    skipped: usize,
    outcomes: BTreeMap<&'static str, usize>,
}

impl Tally {
    fn skipped() -> Self {
        Self {
            total: 1,
            skipped: 1,
            ..Self::default()
        }
    }

    fn merge(mut self, other: Tally) -> Self {
        self.envelope = self.envelope.merge(other.envelope);
        self.total += other.total;
        self.skipped += other.skipped;
        for (label, count) in other.outcomes {
            *self.outcomes.entry(label).or_default() += count;
        }
        self
    }
}

/// Reachability engine over one simulator.
pub struct ReachEngine<'s, 'a, M> {
    simulator: &'s Simulator<'a, M>,
    options: ReachOptions,
}

impl<'s, 'a, M: Mode> ReachEngine<'s, 'a, M> {
    pub fn new(simulator: &'s Simulator<'a, M>, options: ReachOptions) -> ReachResult<Self> {
        options.validate()?;
        Ok(Self { simulator, options })
    }

    pub fn options(&self) -> &ReachOptions {
        &self.options
    }

    /// Draw, simulate and fold every sample of `sample_box`.
    pub fn analyze(&self, sample_box: &SampleBox<M>) -> ReachResult<ReachReport> {
        let opts = &self.options;
        let dims = sample_box.free_dims();
        debug!(
            strategy = %opts.strategy,
            seed = opts.seed,
            free_dims = dims,
            samples = opts.num_samples,
            "drawing initial conditions"
        );
        let points = unit_points(opts.strategy, opts.num_samples, dims, opts.seed);

        let tally = if opts.parallel {
            points
                .into_par_iter()
                .enumerate()
                .map(|(index, unit)| self.run_one(sample_box, index, &unit))
                .try_reduce(Tally::default, |a, b| Ok(a.merge(b)))?
        } else {
            let mut tally = Tally::default();
            for (index, unit) in points.iter().enumerate() {
                tally = tally.merge(self.run_one(sample_box, index, unit)?);
            }
            tally
        };

        info!(
            samples = tally.total,
            skipped = tally.skipped,
            bands = tally.envelope.len(),
            strategy = %opts.strategy,
            seed = opts.seed,
            "reachability analysis complete"
        );

        Ok(ReachReport {
            envelope: tally.envelope,
            total: tally.total,
            skipped: tally.skipped,
            outcomes: tally.outcomes,
            seed: opts.seed,
            strategy: opts.strategy,
        })
    }

    fn run_one(&self, sample_box: &SampleBox<M>, index: usize, unit: &[Real]) -> ReachResult<Tally> {
        let (initial, inputs) = sample_box.draw(unit)?;
        let trajectory = match self.simulator.trace(&initial, &inputs) {
            Ok(t) => t,
            Err(SimError::Configuration(e @ ConfigurationError::SelfRetrigger { .. })) => {
                warn!(sample = index, error = %e, "skipping sample");
                return Ok(Tally::skipped());
            }
            Err(e) => return Err(e.into()),
        };
        if let Some(failure) = trajectory.integration_failure() {
            warn!(
                sample = index,
                mode = %failure.mode,
                time = failure.time,
                reason = %failure.reason,
                "skipping sample"
            );
            return Ok(Tally::skipped());
        }

        let mut outcomes = BTreeMap::new();
        outcomes.insert(trajectory.termination.reason.label(), 1);
        Ok(Tally {
            envelope: ReachableEnvelope::from_trajectory(&trajectory),
            total: 1,
            skipped: 0,
            outcomes,
        })
    }
}

/// Run a reachability batch of `simulator` over `sample_box`.
pub fn analyze<M: Mode>(
    simulator: &Simulator<'_, M>,
    sample_box: &SampleBox<M>,
    options: &ReachOptions,
) -> ReachResult<ReachReport> {
    ReachEngine::new(simulator, options.clone())?.analyze(sample_box)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hy_automaton::{AutomatonBuilder, ContinuousState};
    use hy_core::{Interval, Tolerances, nearly_equal};
    use hy_sim::{Horizon, IntegratorOptions, SimOptions};
    use nalgebra::DVector;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
    enum Drift {
        Moving,
    }

    /// Constant-velocity drift with a stiff blow-up above x = 10.
    fn drift() -> hy_automaton::Automaton<Drift> {
        let mut b = AutomatonBuilder::new(1);
        b.add_mode(Drift::Moving, "moving", |x: &ContinuousState| {
            let p = x.position[0];
            if p > 10.0 {
                DVector::from_element(1, Real::INFINITY)
            } else {
                DVector::zeros(1)
            }
        });
        b.build().unwrap()
    }

    fn sim_options() -> SimOptions {
        SimOptions {
            sample_rate: 0.1,
            horizon: Horizon::Time(1.0),
            integrator: IntegratorOptions::default(),
            ..SimOptions::default()
        }
    }

    #[test]
    fn reach_options_defaults() {
        let opts = ReachOptions::default();
        assert_eq!(opts.num_samples, 20);
        assert_eq!(opts.seed, 0);
        assert_eq!(opts.strategy, SamplingStrategy::Grid);
        assert!(opts.parallel);
        let zero = ReachOptions {
            num_samples: 0,
            ..ReachOptions::default()
        };
        assert!(zero.validate().is_err());
    }

    #[test]
    fn velocity_box_spreads_linearly() {
        let a = drift();
        let sim = Simulator::new(&a, sim_options()).unwrap();
        let b = SampleBox::new(
            Drift::Moving,
            vec![Interval::point(0.0)],
            vec![Interval::new(-1.0, 1.0, "v").unwrap()],
        )
        .unwrap();
        let report = analyze(&sim, &b, &ReachOptions::default()).unwrap();

        assert_eq!(report.total, 20);
        assert_eq!(report.skipped, 0);
        assert_eq!(report.outcomes.get("horizon"), Some(&20));
        let end = report.envelope.band_at_step(10).unwrap();
        assert_eq!(end.live, 20);
        let tol = Tolerances::default();
        assert!(nearly_equal(end.bounds[0].min, -1.0, tol));
        assert!(nearly_equal(end.bounds[0].max, 1.0, tol));
    }

    #[test]
    fn failed_runs_are_skipped_and_counted() {
        let a = drift();
        let sim = Simulator::new(&a, sim_options()).unwrap();
        // Starts above x = 10 blow up on the first interval
        let b = SampleBox::new(
            Drift::Moving,
            vec![Interval::new(0.0, 20.0, "x").unwrap()],
            vec![Interval::point(0.0)],
        )
        .unwrap();
        let opts = ReachOptions {
            num_samples: 5,
            parallel: false,
            ..ReachOptions::default()
        };
        let report = analyze(&sim, &b, &opts).unwrap();

        // Grid x = 0, 5, 10, 15, 20
        assert_eq!(report.total, 5);
        assert_eq!(report.skipped, 2);
        assert_eq!(report.completed(), 3);
        assert_eq!(report.envelope.runs(), 3);
        assert!(
            report
                .to_string()
                .contains("2 of 5 samples skipped due to integration failure")
        );
    }

    /// Drift with a stop at x = 1 whose reset leaves the guard armed.
    fn rearming_stop() -> hy_automaton::Automaton<Drift> {
        let mut b = AutomatonBuilder::new(1);
        b.add_mode(Drift::Moving, "moving", |_x: &ContinuousState| DVector::zeros(1));
        b.add_crossing(
            "stop",
            Drift::Moving,
            Drift::Moving,
            0,
            |s, _| s.continuous.position[0] - 1.0,
            |s, _| s.continuous.clone(),
        );
        b.build().unwrap()
    }

    #[test]
    fn rearming_resets_are_skipped_and_counted() {
        let a = rearming_stop();
        let sim = Simulator::new(&a, sim_options()).unwrap();
        let b = SampleBox::new(
            Drift::Moving,
            vec![Interval::point(0.43)],
            vec![Interval::new(-1.0, 1.0, "v").unwrap()],
        )
        .unwrap();

        // Grid v = -1, -1/3, 1/3, 1. Only v = 1 reaches the stop, between
        // x = 0.93 and x = 1.03, so the jump lands on the later sample.
        for parallel in [false, true] {
            let opts = ReachOptions {
                num_samples: 4,
                parallel,
                ..ReachOptions::default()
            };
            let report = analyze(&sim, &b, &opts).unwrap();
            assert_eq!(report.total, 4);
            assert_eq!(report.skipped, 1);
            assert_eq!(report.completed(), 3);
            assert_eq!(report.envelope.runs(), 3);
            assert_eq!(report.outcomes.get("horizon"), Some(&3));
            assert_eq!(report.envelope.band_at_step(10).unwrap().live, 3);
        }
    }

    #[test]
    fn parallel_and_sequential_agree() {
        let a = drift();
        let sim = Simulator::new(&a, sim_options()).unwrap();
        let b = SampleBox::new(
            Drift::Moving,
            vec![Interval::new(-2.0, 2.0, "x").unwrap()],
            vec![Interval::new(-1.0, 1.0, "v").unwrap()],
        )
        .unwrap();
        let seq = ReachOptions {
            num_samples: 30,
            strategy: SamplingStrategy::Pseudorandom,
            seed: 7,
            parallel: false,
        };
        let par = ReachOptions {
            parallel: true,
            ..seq.clone()
        };
        assert_eq!(
            analyze(&sim, &b, &seq).unwrap(),
            analyze(&sim, &b, &par).unwrap()
        );
    }
}
