//! Optimistic local mutation with eventual remote reconciliation

mod counts;
mod updater;

pub use counts::{start_count_batcher, CountBatcher, COUNT_DEBOUNCE};
pub use updater::{FieldUpdater, UpdatePhase, UpdateRecord};
