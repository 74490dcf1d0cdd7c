//! Level geometry for the flappy game: height bounds and rectangular obstacles.
//!
//! Collision is expressed as a scalar metric that is `>= 0` exactly when the
//! bird touches a bound or an obstacle, so it can drive a crossing guard.

use hy_automaton::{ConfigResult, ConfigurationError};
use hy_core::{Interval, Real};

/// Axis-aligned rectangle the bird must avoid. Edges count as collisions.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Obstacle {
    pub x: Interval,
    pub y: Interval,
}

impl Obstacle {
    /// Rectangle from its bottom-left and top-right corners.
    pub fn new(bottom_left: (Real, Real), top_right: (Real, Real)) -> ConfigResult<Self> {
        Ok(Self {
            x: Interval::new(bottom_left.0, top_right.0, "obstacle x")?,
            y: Interval::new(bottom_left.1, top_right.1, "obstacle y")?,
        })
    }

    /// Signed depth of `(x, y)` inside the rectangle (negative outside).
    pub fn metric(&self, x: Real, y: Real) -> Real {
        (x - self.x.min)
            .min(self.x.max - x)
            .min(y - self.y.min)
            .min(self.y.max - y)
    }
}

/// A pipe column with an opening between `gap.min` and `gap.max`.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Pipe {
    /// Left edge of the column
    pub x: Real,
    pub width: Real,
    pub gap: Interval,
}

/// Playing field.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FlappyLevel {
    /// Touching or going below this height ends the game
    pub lower: Real,
    /// Touching or going above this height ends the game
    pub upper: Real,
    pub obstacles: Vec<Obstacle>,
}

impl FlappyLevel {
    /// Level with explicit bounds and obstacles.
    pub fn new(lower: Real, upper: Real, obstacles: Vec<Obstacle>) -> ConfigResult<Self> {
        if lower.is_nan() || upper.is_nan() || lower >= upper {
            return Err(ConfigurationError::InvalidParameter {
                what: "level lower bound must be below upper bound",
            });
        }
        Ok(Self {
            lower,
            upper,
            obstacles,
        })
    }

    /// Unbounded level with no obstacles: the bird never collides.
    pub fn open() -> Self {
        Self {
            lower: Real::NEG_INFINITY,
            upper: Real::INFINITY,
            obstacles: Vec::new(),
        }
    }

    /// Small hand-made level: height 0..5 with one pipe from below and one from above.
    pub fn scripted() -> Self {
        Self {
            lower: 0.0,
            upper: 5.0,
            obstacles: vec![
                Obstacle {
                    x: Interval { min: 2.0, max: 2.5 },
                    y: Interval { min: 0.0, max: 2.0 },
                },
                Obstacle {
                    x: Interval {
                        min: 1.25,
                        max: 1.75,
                    },
                    y: Interval { min: 4.0, max: 5.0 },
                },
            ],
        }
    }

    /// Level made of pipe columns between finite bounds.
    ///
    /// Each pipe contributes an obstacle below and above its gap.
    pub fn with_pipes(lower: Real, upper: Real, pipes: &[Pipe]) -> ConfigResult<Self> {
        if !lower.is_finite() || !upper.is_finite() {
            return Err(ConfigurationError::InvalidParameter {
                what: "pipe levels need finite bounds",
            });
        }
        let mut obstacles = Vec::with_capacity(2 * pipes.len());
        for pipe in pipes {
            if !(pipe.width > 0.0) || !pipe.x.is_finite() {
                return Err(ConfigurationError::InvalidParameter {
                    what: "pipe width must be positive",
                });
            }
            if pipe.gap.min < lower || pipe.gap.max > upper {
                return Err(ConfigurationError::InvalidParameter {
                    what: "pipe gap must lie within the level bounds",
                });
            }
            let x_end = pipe.x + pipe.width;
            obstacles.push(Obstacle::new((pipe.x, lower), (x_end, pipe.gap.min))?);
            obstacles.push(Obstacle::new((pipe.x, pipe.gap.max), (x_end, upper))?);
        }
        Self::new(lower, upper, obstacles)
    }

    /// Collision metric at `(x, y)`: `>= 0` on contact with a bound or obstacle.
    pub fn collision_metric(&self, x: Real, y: Real) -> Real {
        let bounds = (self.lower - y).max(y - self.upper);
        self.obstacles
            .iter()
            .map(|o| o.metric(x, y))
            .fold(bounds, Real::max)
    }

    pub fn collides(&self, x: Real, y: Real) -> bool {
        self.collision_metric(x, y) >= 0.0
    }
}
