//! Pledge Compose — consumers built on the promise primitive.
//!
//! - [`all`]: wait for every promise, or the first rejection.
//! - [`Coalescer`]: share one in-flight execution between callers.

pub mod coalesce;
pub mod join;

pub use coalesce::Coalescer;
pub use join::all;
