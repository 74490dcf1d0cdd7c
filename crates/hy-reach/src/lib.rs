//! hy-reach: sampled reachability for hybrid automata.
//!
//! Provides:
//! - Sample boxes over initial states and input events
//! - Grid and seeded pseudorandom draw strategies
//! - Reachable envelopes keyed by hybrid time, with order-independent merge
//! - A batch engine that runs draws sequentially or on the rayon pool
//!
//! The envelope is built from finitely many simulated runs, so it approximates
//! the reachable set from inside and is never guaranteed complete.

pub mod engine;
pub mod envelope;
pub mod error;
pub mod sample_box;
pub mod sampler;

// Re-exports for public API
pub use engine::{ReachEngine, ReachOptions, ReachReport, analyze};
pub use envelope::{Band, HybridTime, ReachableEnvelope};
pub use error::{ReachError, ReachResult};
pub use sample_box::{InputBound, PayloadBound, SampleBox};
pub use sampler::{SamplingStrategy, grid_resolution, unit_points};
