//! Filter and sort semantics shared by both data paths
//!
//! The online path sends these constraints to the remote store; the
//! offline path applies this module over the cache snapshot. Keeping
//! one implementation is what guarantees both paths produce identical
//! ordered results for the same inputs.

use std::cmp::Ordering;

use crate::questions::Question;
use crate::remote::{CategoryFilter, QuestionFilters, Sort, SortDirection, SortField};

/// Whether a question satisfies a category constraint plus the equality
/// filters
pub fn matches(
    question: &Question,
    category: Option<&CategoryFilter>,
    filters: &QuestionFilters,
) -> bool {
    match category {
        Some(CategoryFilter::Id(id)) => {
            if question.category_id.as_deref() != Some(id.as_str()) {
                return false;
            }
        }
        Some(CategoryFilter::Uncategorized) => {
            if question.category_id.is_some() {
                return false;
            }
        }
        None => {}
    }

    if let Some(difficulty) = filters.difficulty {
        if question.difficulty != difficulty {
            return false;
        }
    }
    if let Some(proficiency) = filters.proficiency {
        if question.proficiency != proficiency {
            return false;
        }
    }
    if let Some(tag) = &filters.tag {
        if !question.tags.iter().any(|t| t == tag) {
            return false;
        }
    }

    true
}

/// Total order on questions for a sort spec. A missing `lastReviewedAt`
/// sorts before any present value in ascending order; equal keys fall
/// back to id so the order is stable across reruns.
pub fn compare(a: &Question, b: &Question, sort: &Sort) -> Ordering {
    let ordering = match sort.field {
        SortField::CreatedAt => a.created_at.cmp(&b.created_at),
        SortField::UpdatedAt => a.updated_at.cmp(&b.updated_at),
        SortField::LastReviewedAt => a.last_reviewed_at.cmp(&b.last_reviewed_at),
        SortField::AppearanceLevel => a.appearance_level.cmp(&b.appearance_level),
        SortField::Title => a.title.cmp(&b.title),
    };
    let ordering = match sort.direction {
        SortDirection::Ascending => ordering,
        SortDirection::Descending => ordering.reverse(),
    };
    ordering.then_with(|| a.id.cmp(&b.id))
}

/// Filter and sort a question list in memory — the offline rendition of
/// a remote query
pub fn apply(
    questions: &[Question],
    category: Option<&CategoryFilter>,
    filters: &QuestionFilters,
    sort: &Sort,
) -> Vec<Question> {
    let mut result: Vec<Question> = questions
        .iter()
        .filter(|q| matches(q, category, filters))
        .cloned()
        .collect();
    result.sort_by(|a, b| compare(a, b, sort));
    result
}
