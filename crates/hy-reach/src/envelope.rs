//! Reachable envelope: per hybrid time, the bounding box of every live run.
//!
//! Bands are keyed by [`HybridTime`], so the state just before a jump and the
//! state just after it land in different bands at the same grid time. Each
//! band bounds the flattened state `[position…, velocity…]`.
//!
//! A second set of bands is kept per grid step. It covers every jump index at
//! that step and counts each run at most once, however many jumps it takes
//! there.
//!
//! Folding and merging only take minima, maxima and sums, so the envelope of a
//! batch does not depend on the order runs are added in.

use std::collections::BTreeMap;

use hy_automaton::Mode;
use hy_core::{Interval, Real};
use hy_sim::Trajectory;
use nalgebra::DVector;

/// Hybrid time of a sample: grid step, then jumps taken so far.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HybridTime {
    pub step: u64,
    pub jumps: usize,
}

impl HybridTime {
    pub fn new(step: u64, jumps: usize) -> Self {
        Self { step, jumps }
    }
}

/// Bounds of all runs alive at one hybrid time.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Band {
    /// Grid time (s)
    pub time: Real,
    /// One interval per flattened state component
    pub bounds: Vec<Interval>,
    /// Number of runs with a sample here
    pub live: usize,
}

impl Band {
    fn from_state(time: Real, flat: &DVector<Real>) -> Self {
        Self {
            time,
            bounds: flat.iter().map(|&v| Interval::point(v)).collect(),
            live: 1,
        }
    }

    fn include(&mut self, flat: &DVector<Real>) {
        for (bound, &v) in self.bounds.iter_mut().zip(flat.iter()) {
            bound.include(v);
        }
    }

    fn merge(&mut self, other: &Band) {
        for (bound, o) in self.bounds.iter_mut().zip(&other.bounds) {
            *bound = bound.hull(o);
        }
        self.live += other.live;
    }

    /// True if every bound of `other` lies inside the matching bound here.
    pub fn encloses(&self, other: &Band) -> bool {
        self.bounds.len() == other.bounds.len()
            && self
                .bounds
                .iter()
                .zip(&other.bounds)
                .all(|(a, b)| a.encloses(b))
    }

    /// Position bounds, given the spatial dimension.
    pub fn position(&self, dims: usize) -> &[Interval] {
        &self.bounds[..dims.min(self.bounds.len())]
    }

    /// Velocity bounds, given the spatial dimension.
    pub fn velocity(&self, dims: usize) -> &[Interval] {
        &self.bounds[dims.min(self.bounds.len())..]
    }
}

/// Set approximation of the states reached by a batch of runs.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ReachableEnvelope {
    bands: BTreeMap<HybridTime, Band>,
    steps: BTreeMap<u64, Band>,
    runs: usize,
}

impl ReachableEnvelope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Envelope of a single run.
    pub fn from_trajectory<M: Mode>(trajectory: &Trajectory<M>) -> Self {
        let mut envelope = Self::new();
        envelope.add(trajectory);
        envelope
    }

    /// Widen every band the run has a sample in.
    pub fn add<M: Mode>(&mut self, trajectory: &Trajectory<M>) {
        let mut last_step = None;
        for sample in &trajectory.samples {
            let key = HybridTime::new(sample.step, sample.jumps);
            let flat = sample.state.continuous.to_flat();
            fold(&mut self.bands, key, sample.time(), &flat, true);
            // Samples of one run at one step are contiguous
            let first_at_step = last_step != Some(sample.step);
            fold(&mut self.steps, sample.step, sample.time(), &flat, first_at_step);
            last_step = Some(sample.step);
        }
        self.runs += 1;
    }

    /// Union of two envelopes.
    pub fn merge(mut self, other: ReachableEnvelope) -> Self {
        merge_bands(&mut self.bands, other.bands);
        merge_bands(&mut self.steps, other.steps);
        self.runs += other.runs;
        self
    }

    /// Number of runs folded in.
    pub fn runs(&self) -> usize {
        self.runs
    }

    pub fn len(&self) -> usize {
        self.bands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bands.is_empty()
    }

    /// Bands in hybrid-time order.
    pub fn bands(&self) -> impl Iterator<Item = (&HybridTime, &Band)> {
        self.bands.iter()
    }

    pub fn band(&self, at: HybridTime) -> Option<&Band> {
        self.bands.get(&at)
    }

    /// Union over every jump count at `step`. `live` counts runs with at
    /// least one sample at the step.
    pub fn band_at_step(&self, step: u64) -> Option<&Band> {
        self.steps.get(&step)
    }

    /// Per-step bands in grid order.
    pub fn steps(&self) -> impl Iterator<Item = (&u64, &Band)> {
        self.steps.iter()
    }

    /// Latest grid step any run reached.
    pub fn last_step(&self) -> Option<u64> {
        self.steps.keys().next_back().copied()
    }

    /// True if every band of `other` is enclosed by the band at the same
    /// hybrid time here.
    pub fn encloses(&self, other: &ReachableEnvelope) -> bool {
        other.bands.iter().all(|(key, band)| {
            self.bands
                .get(key)
                .is_some_and(|mine| mine.encloses(band))
        })
    }
}

fn fold<K: Ord>(
    bands: &mut BTreeMap<K, Band>,
    key: K,
    time: Real,
    flat: &DVector<Real>,
    count: bool,
) {
    match bands.get_mut(&key) {
        Some(band) => {
            band.include(flat);
            if count {
                band.live += 1;
            }
        }
        None => {
            let mut band = Band::from_state(time, flat);
            if !count {
                band.live = 0;
            }
            bands.insert(key, band);
        }
    }
}

fn merge_bands<K: Ord>(into: &mut BTreeMap<K, Band>, from: BTreeMap<K, Band>) {
    for (key, band) in from {
        match into.get_mut(&key) {
            Some(mine) => mine.merge(&band),
            None => {
                into.insert(key, band);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hy_automaton::{ContinuousState, HybridState};
    use hy_sim::{Termination, TerminationReason, TrajectorySample};

    #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
    enum One {
        Only,
    }

    fn run(points: &[(u64, usize, f64)]) -> Trajectory<One> {
        let samples = points
            .iter()
            .map(|&(step, jumps, p)| TrajectorySample {
                step,
                jumps,
                jump: false,
                state: HybridState::new(
                    One::Only,
                    ContinuousState::new(step as f64 * 0.1, vec![p], vec![-p]).unwrap(),
                ),
            })
            .collect();
        Trajectory {
            sample_rate: 0.1,
            samples,
            termination: Termination {
                reason: TerminationReason::HorizonReached,
                step: 0,
                time: 0.0,
            },
        }
    }

    #[test]
    fn fold_widens_and_counts_live_runs() {
        let mut env = ReachableEnvelope::new();
        env.add(&run(&[(0, 0, 1.0), (1, 0, 2.0)]));
        env.add(&run(&[(0, 0, -1.0)]));

        let start = env.band(HybridTime::new(0, 0)).unwrap();
        assert_eq!(start.live, 2);
        assert_eq!(start.position(1), &[Interval { min: -1.0, max: 1.0 }]);
        assert_eq!(start.velocity(1), &[Interval { min: -1.0, max: 1.0 }]);
        assert_eq!(env.band(HybridTime::new(1, 0)).unwrap().live, 1);
        assert_eq!(env.runs(), 2);
    }

    #[test]
    fn merge_is_order_independent() {
        let a = ReachableEnvelope::from_trajectory(&run(&[(0, 0, 1.0), (1, 0, 3.0)]));
        let b = ReachableEnvelope::from_trajectory(&run(&[(0, 0, 2.0), (1, 1, 5.0)]));
        let ab = a.clone().merge(b.clone());
        let ba = b.merge(a);
        assert_eq!(ab, ba);
        assert_eq!(ab.len(), 3);
    }

    #[test]
    fn band_at_step_unions_jump_indices() {
        let env = ReachableEnvelope::from_trajectory(&run(&[(1, 0, 1.0), (1, 1, 4.0), (2, 1, 0.0)]));
        let band = env.band_at_step(1).unwrap();
        assert_eq!(band.bounds[0], Interval { min: 1.0, max: 4.0 });
        assert_eq!(band.live, 1);
        assert!(env.band_at_step(7).is_none());
        assert_eq!(env.last_step(), Some(2));
    }

    #[test]
    fn jumping_runs_count_once_per_step() {
        // One run jumps twice at step 3, one jumps once, one never jumps
        let mut env = ReachableEnvelope::new();
        env.add(&run(&[(2, 0, 0.0), (3, 0, 1.0), (3, 1, 2.0), (3, 2, 3.0), (4, 2, 3.5)]));
        env.add(&run(&[(2, 0, 0.5), (3, 0, 1.5), (3, 1, -2.0), (4, 1, -1.0)]));
        env.add(&run(&[(2, 0, 0.2), (3, 0, 0.7)]));

        let at_jump = env.band_at_step(3).unwrap();
        assert_eq!(at_jump.live, 3);
        assert!(at_jump.live <= env.runs());
        assert_eq!(at_jump.bounds[0], Interval { min: -2.0, max: 3.0 });
        assert_eq!(env.band(HybridTime::new(3, 0)).unwrap().live, 3);
        assert_eq!(env.band(HybridTime::new(3, 1)).unwrap().live, 2);
        assert_eq!(env.band_at_step(4).unwrap().live, 2);

        // Same counts when the runs are folded separately and merged
        let merged = ReachableEnvelope::from_trajectory(&run(&[(3, 0, 1.0), (3, 1, 2.0)]))
            .merge(ReachableEnvelope::from_trajectory(&run(&[(3, 0, 0.0), (3, 1, 5.0)])));
        assert_eq!(merged.band_at_step(3).unwrap().live, 2);
        assert_eq!(merged.runs(), 2);
    }

    #[test]
    fn encloses_requires_every_band() {
        let small = ReachableEnvelope::from_trajectory(&run(&[(0, 0, 0.5)]));
        let mut big = small.clone();
        big.add(&run(&[(0, 0, 1.0), (1, 0, 1.0)]));
        assert!(big.encloses(&small));
        assert!(!small.encloses(&big));
    }
}
