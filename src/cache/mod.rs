//! Bounded, time-limited local snapshot of the question list
//!
//! The snapshot backs offline reads. One JSON blob, replaced atomically,
//! expiring seven days after capture.

mod models;
mod store;

pub use models::*;
pub use store::*;
