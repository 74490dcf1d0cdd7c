//! hy-core: shared foundation for the hybrid simulation workspace.
//!
//! Contains:
//! - numeric (Real + tolerances + float helpers + grid arithmetic)
//! - interval (closed per-dimension bounds)
//! - error (shared error types)

pub mod error;
pub mod interval;
pub mod numeric;

// Re-exports: nice ergonomics for downstream crates
pub use error::{CoreError, CoreResult};
pub use interval::Interval;
pub use numeric::*;
