//! Urgency classification and due-set computation
//!
//! Two deliberately decoupled time windows coexist:
//! - a fixed 1/3/5-day scale that colors each question's urgency tier
//! - a user-adjustable 1-30 day threshold that decides which questions
//!   appear in the aggregate due-for-review list
//!
//! A question can sit at medium urgency and still be absent from the
//! due list when the threshold is larger than its elapsed time.
//!
//! All functions are pure over the supplied `now`: no I/O, no side
//! effects, recomputed whenever the question list or the threshold
//! changes.

use chrono::{DateTime, Duration, Utc};

use super::models::{ReviewStats, Urgency};
use crate::questions::Question;

/// Days since last review at which urgency becomes high
const HIGH_URGENCY_DAYS: i64 = 5;
/// Days at which urgency becomes medium
const MEDIUM_URGENCY_DAYS: i64 = 3;
/// Days at which urgency becomes low
const LOW_URGENCY_DAYS: i64 = 1;

/// Classify a question's urgency from elapsed time since its baseline
/// (`lastReviewedAt`, or creation time if never reviewed). Boundary
/// instants count as having reached the tier (`>=`).
pub fn classify_urgency(question: &Question, now: DateTime<Utc>) -> Urgency {
    let elapsed = now - question.baseline();

    if elapsed >= Duration::days(HIGH_URGENCY_DAYS) {
        Urgency::High
    } else if elapsed >= Duration::days(MEDIUM_URGENCY_DAYS) {
        Urgency::Medium
    } else if elapsed >= Duration::days(LOW_URGENCY_DAYS) {
        Urgency::Low
    } else {
        Urgency::None
    }
}

/// The subset of `questions` whose elapsed time since baseline has
/// reached `threshold_days`, most overdue first. Ties on the baseline
/// instant are broken by id so reruns are deterministic.
pub fn compute_due_set(
    questions: &[Question],
    threshold_days: u32,
    now: DateTime<Utc>,
) -> Vec<Question> {
    let threshold = Duration::days(threshold_days as i64);

    let mut due: Vec<Question> = questions
        .iter()
        .filter(|q| now - q.baseline() >= threshold)
        .cloned()
        .collect();

    due.sort_by(|a, b| a.baseline().cmp(&b.baseline()).then_with(|| a.id.cmp(&b.id)));
    due
}

/// Aggregate counts per urgency tier plus due-list size
pub fn review_stats(questions: &[Question], threshold_days: u32, now: DateTime<Utc>) -> ReviewStats {
    let mut stats = ReviewStats {
        total_questions: questions.len(),
        ..Default::default()
    };

    for question in questions {
        match classify_urgency(question, now) {
            Urgency::High => stats.high_urgency += 1,
            Urgency::Medium => stats.medium_urgency += 1,
            Urgency::Low => stats.low_urgency += 1,
            Urgency::None => {}
        }
    }

    stats.due_count = compute_due_set(questions, threshold_days, now).len();
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    use crate::questions::{Difficulty, Proficiency};

    fn question_reviewed_days_ago(id: &str, days: i64, now: DateTime<Utc>) -> Question {
        let reviewed = now - Duration::days(days);
        Question {
            id: id.to_string(),
            title: format!("Question {}", id),
            detailed_answer: Some("answer".to_string()),
            oral_answer: None,
            code: None,
            reference_url: None,
            tags: Vec::new(),
            difficulty: Difficulty::Medium,
            proficiency: Proficiency::Beginner,
            appearance_level: 50,
            last_reviewed_at: Some(reviewed),
            category_id: None,
            created_by: "user-1".to_string(),
            created_at: reviewed - Duration::days(30),
            updated_at: reviewed,
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, 15, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_urgency_tiers() {
        let now = now();
        let cases = [
            (0, Urgency::None),
            (1, Urgency::Low),
            (2, Urgency::Low),
            (3, Urgency::Medium),
            (4, Urgency::Medium),
            (5, Urgency::High),
            (30, Urgency::High),
        ];
        for (days, expected) in cases {
            let q = question_reviewed_days_ago("q", days, now);
            assert_eq!(classify_urgency(&q, now), expected, "at {} days", days);
        }
    }

    #[test]
    fn test_boundary_instants_reach_their_tier() {
        let now = now();
        // Exactly N days elapsed, to the millisecond
        for (days, expected) in [(1, Urgency::Low), (3, Urgency::Medium), (5, Urgency::High)] {
            let mut q = question_reviewed_days_ago("q", 0, now);
            q.last_reviewed_at = Some(now - Duration::days(days));
            assert_eq!(classify_urgency(&q, now), expected, "at exactly {} days", days);

            // One millisecond short stays in the tier below
            q.last_reviewed_at = Some(now - Duration::days(days) + Duration::milliseconds(1));
            assert_ne!(classify_urgency(&q, now), expected, "just under {} days", days);
        }
    }

    #[test]
    fn test_urgency_monotonic_in_elapsed_time() {
        let now = now();
        let mut previous = Urgency::None;
        for hours in 0..24 * 10 {
            let mut q = question_reviewed_days_ago("q", 0, now);
            q.last_reviewed_at = Some(now - Duration::hours(hours));
            let urgency = classify_urgency(&q, now);
            assert!(urgency >= previous, "urgency regressed at {} hours", hours);
            previous = urgency;
        }
    }

    #[test]
    fn test_never_reviewed_uses_created_at() {
        let now = now();
        let mut q = question_reviewed_days_ago("q", 0, now);
        q.last_reviewed_at = None;
        q.created_at = now - Duration::days(6);
        assert_eq!(classify_urgency(&q, now), Urgency::High);
    }

    #[test]
    fn test_due_set_membership_and_order() {
        let now = now();
        let questions = vec![
            question_reviewed_days_ago("b", 10, now),
            question_reviewed_days_ago("a", 3, now),
            question_reviewed_days_ago("c", 20, now),
            question_reviewed_days_ago("d", 7, now),
        ];

        let due = compute_due_set(&questions, 7, now);
        let ids: Vec<&str> = due.iter().map(|q| q.id.as_str()).collect();
        // Most overdue first; 3-day-old "a" excluded; exactly-7-days "d"
        // included (>=)
        assert_eq!(ids, vec!["c", "b", "d"]);
    }

    #[test]
    fn test_due_set_ties_broken_by_id() {
        let now = now();
        let questions = vec![
            question_reviewed_days_ago("z", 8, now),
            question_reviewed_days_ago("a", 8, now),
            question_reviewed_days_ago("m", 8, now),
        ];

        let first = compute_due_set(&questions, 7, now);
        let second = compute_due_set(&questions, 7, now);
        let ids: Vec<&str> = first.iter().map(|q| q.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "m", "z"]);

        // Deterministic across reruns
        let ids2: Vec<&str> = second.iter().map(|q| q.id.as_str()).collect();
        assert_eq!(ids, ids2);
    }

    #[test]
    fn test_urgency_tier_decoupled_from_threshold() {
        let now = now();
        // Three days elapsed: medium urgency on the fixed scale...
        let q = question_reviewed_days_ago("q", 3, now);
        assert_eq!(classify_urgency(&q, now), Urgency::Medium);

        // ...yet absent from the due list under the default threshold
        let due = compute_due_set(std::slice::from_ref(&q), 7, now);
        assert!(due.is_empty());

        // Two days elapsed appears only when the threshold allows it
        let q2 = question_reviewed_days_ago("q2", 2, now);
        assert!(compute_due_set(std::slice::from_ref(&q2), 2, now).len() == 1);
        assert!(compute_due_set(std::slice::from_ref(&q2), 3, now).is_empty());
    }

    #[test]
    fn test_review_stats_counts() {
        let now = now();
        let questions = vec![
            question_reviewed_days_ago("a", 0, now),
            question_reviewed_days_ago("b", 2, now),
            question_reviewed_days_ago("c", 4, now),
            question_reviewed_days_ago("d", 9, now),
        ];

        let stats = review_stats(&questions, 7, now);
        assert_eq!(stats.total_questions, 4);
        assert_eq!(stats.low_urgency, 1);
        assert_eq!(stats.medium_urgency, 1);
        assert_eq!(stats.high_urgency, 1);
        assert_eq!(stats.due_count, 1);
    }
}
