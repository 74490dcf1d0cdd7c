//! Unit-cube draw strategies.
//!
//! Both strategies are deterministic: the grid depends only on `(n, d)`, and
//! the pseudorandom stream only on the seed. Pseudorandom draws are taken
//! sequentially, so the first `n` points of a larger batch equal the points
//! of a batch of `n`.

use core::fmt;

use hy_core::Real;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

/// How initial conditions are drawn from a sample box.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SamplingStrategy {
    /// Evenly spaced lattice including the box corners
    #[default]
    Grid,
    /// Uniform draws from a seeded PCG stream
    Pseudorandom,
}

impl fmt::Display for SamplingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SamplingStrategy::Grid => f.write_str("grid"),
            SamplingStrategy::Pseudorandom => f.write_str("pseudorandom"),
        }
    }
}

/// `n` points of `[0, 1]^dims` drawn with `strategy`.
pub fn unit_points(
    strategy: SamplingStrategy,
    n: usize,
    dims: usize,
    seed: u64,
) -> Vec<Vec<Real>> {
    match strategy {
        SamplingStrategy::Grid => grid_points(n, dims),
        SamplingStrategy::Pseudorandom => pseudorandom_points(n, dims, seed),
    }
}

/// Points per axis: smallest `m` with `m^dims >= n`.
pub fn grid_resolution(n: usize, dims: usize) -> usize {
    if n <= 1 || dims == 0 {
        return n.min(1);
    }
    let mut m = (n as Real).powf(1.0 / dims as Real).ceil() as usize;
    while m > 1 && covers(m - 1, dims, n) {
        m -= 1;
    }
    while !covers(m, dims, n) {
        m += 1;
    }
    m
}

fn covers(m: usize, dims: usize, n: usize) -> bool {
    let mut total: usize = 1;
    for _ in 0..dims {
        total = total.saturating_mul(m);
        if total >= n {
            return true;
        }
    }
    total >= n
}

/// First `n` lattice points in mixed-radix order, first axis fastest.
fn grid_points(n: usize, dims: usize) -> Vec<Vec<Real>> {
    if dims == 0 {
        return vec![Vec::new(); n];
    }
    let m = grid_resolution(n, dims);
    let coord = |i: usize| {
        if m == 1 {
            0.5
        } else {
            i as Real / (m - 1) as Real
        }
    };
    (0..n)
        .map(|index| {
            let mut rest = index;
            (0..dims)
                .map(|_| {
                    let digit = rest % m;
                    rest /= m;
                    coord(digit)
                })
                .collect()
        })
        .collect()
}

fn pseudorandom_points(n: usize, dims: usize, seed: u64) -> Vec<Vec<Real>> {
    let mut rng = Pcg32::seed_from_u64(seed);
    (0..n)
        .map(|_| (0..dims).map(|_| rng.random::<Real>()).collect())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolution_is_smallest_cover() {
        assert_eq!(grid_resolution(20, 1), 20);
        assert_eq!(grid_resolution(20, 2), 5);
        assert_eq!(grid_resolution(16, 2), 4);
        assert_eq!(grid_resolution(27, 3), 3);
        assert_eq!(grid_resolution(28, 3), 4);
        assert_eq!(grid_resolution(1, 4), 1);
    }

    #[test]
    fn grid_includes_endpoints() {
        let points = unit_points(SamplingStrategy::Grid, 5, 1, 0);
        let flat: Vec<Real> = points.into_iter().map(|p| p[0]).collect();
        assert_eq!(flat, vec![0.0, 0.25, 0.5, 0.75, 1.0]);
    }

    #[test]
    fn grid_first_axis_fastest() {
        let points = unit_points(SamplingStrategy::Grid, 4, 2, 0);
        assert_eq!(
            points,
            vec![vec![0.0, 0.0], vec![1.0, 0.0], vec![0.0, 1.0], vec![1.0, 1.0]]
        );
    }

    #[test]
    fn single_grid_point_is_centred() {
        assert_eq!(unit_points(SamplingStrategy::Grid, 1, 2, 0), vec![vec![0.5, 0.5]]);
    }

    #[test]
    fn zero_dims_repeat_the_empty_point() {
        let points = unit_points(SamplingStrategy::Grid, 3, 0, 0);
        assert_eq!(points.len(), 3);
        assert!(points.iter().all(Vec::is_empty));
    }

    #[test]
    fn pseudorandom_is_seeded_and_extends() {
        let a = unit_points(SamplingStrategy::Pseudorandom, 10, 3, 42);
        let b = unit_points(SamplingStrategy::Pseudorandom, 25, 3, 42);
        let c = unit_points(SamplingStrategy::Pseudorandom, 10, 3, 43);
        assert_eq!(a[..], b[..10]);
        assert_ne!(a, c);
        assert!(b.iter().flatten().all(|&u| (0.0..1.0).contains(&u)));
    }
}
