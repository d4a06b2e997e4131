//! Data models for review scheduling

use serde::{Deserialize, Serialize};

/// How urgently a question needs review, on the fixed 1/3/5-day scale.
/// Independent of the user-adjustable inclusion threshold that decides
/// due-list membership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    /// Reviewed less than a day ago
    None,
    /// 1-2 days since last review
    Low,
    /// 3-4 days since last review
    Medium,
    /// 5 or more days since last review
    High,
}

/// Aggregate review picture over a question set
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewStats {
    pub total_questions: usize,
    /// Questions past the inclusion threshold
    pub due_count: usize,
    pub high_urgency: usize,
    pub medium_urgency: usize,
    pub low_urgency: usize,
}
