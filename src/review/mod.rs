//! Review scheduling: urgency classification and the due-for-review set

mod algorithm;
mod models;

pub use algorithm::{classify_urgency, compute_due_set, review_stats};
pub use models::{ReviewStats, Urgency};
