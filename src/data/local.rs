//! In-memory question state read by the UI
//!
//! Refreshed by the facade after list reads, mutated synchronously by
//! the optimistic updater, purged on deletes. This is the "local UI
//! state" of the optimistic-update contract.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::questions::{FieldPatch, Question};

#[derive(Default)]
pub struct LocalQuestions {
    inner: Mutex<HashMap<String, Question>>,
}

impl LocalQuestions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole set after a successful list read
    pub fn replace_all(&self, questions: Vec<Question>) {
        let mut inner = self.inner.lock().unwrap();
        inner.clear();
        for question in questions {
            inner.insert(question.id.clone(), question);
        }
    }

    pub fn upsert(&self, question: Question) {
        self.inner
            .lock()
            .unwrap()
            .insert(question.id.clone(), question);
    }

    /// Adopt a canonical record from the server, but only if the
    /// question still exists locally — a late response must not
    /// resurrect a question deleted mid-flight.
    pub fn adopt_if_present(&self, question: Question) -> bool {
        let mut inner = self.inner.lock().unwrap();
        if inner.contains_key(&question.id) {
            inner.insert(question.id.clone(), question);
            true
        } else {
            false
        }
    }

    pub fn remove(&self, id: &str) -> Option<Question> {
        self.inner.lock().unwrap().remove(id)
    }

    pub fn get(&self, id: &str) -> Option<Question> {
        self.inner.lock().unwrap().get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.inner.lock().unwrap().contains_key(id)
    }

    /// Apply a field patch in place. Returns the rollback patch
    /// (capturing the previous value), or `None` if the question is
    /// absent.
    pub fn apply_patch(&self, id: &str, patch: &FieldPatch) -> Option<FieldPatch> {
        let mut inner = self.inner.lock().unwrap();
        let question = inner.get_mut(id)?;
        let previous = patch.capture(question);
        patch.apply(question);
        Some(previous)
    }

    /// Current set, unordered
    pub fn snapshot(&self) -> Vec<Question> {
        self.inner.lock().unwrap().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().unwrap().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    use crate::questions::{Difficulty, Proficiency};

    fn question(id: &str) -> Question {
        let created = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        Question {
            id: id.to_string(),
            title: "t".to_string(),
            detailed_answer: Some("a".to_string()),
            oral_answer: None,
            code: None,
            reference_url: None,
            tags: Vec::new(),
            difficulty: Difficulty::Medium,
            proficiency: Proficiency::Beginner,
            appearance_level: 50,
            last_reviewed_at: None,
            category_id: None,
            created_by: "user-1".to_string(),
            created_at: created,
            updated_at: created,
        }
    }

    #[test]
    fn test_replace_all_and_get() {
        let local = LocalQuestions::new();
        local.replace_all(vec![question("q1"), question("q2")]);
        assert_eq!(local.len(), 2);
        assert!(local.get("q1").is_some());

        local.replace_all(vec![question("q3")]);
        assert_eq!(local.len(), 1);
        assert!(local.get("q1").is_none());
    }

    #[test]
    fn test_apply_patch_returns_rollback() {
        let local = LocalQuestions::new();
        local.replace_all(vec![question("q1")]);

        let rollback = local
            .apply_patch("q1", &FieldPatch::AppearanceLevel(90))
            .unwrap();
        assert_eq!(local.get("q1").unwrap().appearance_level, 90);

        // rollback patch carries the previous value
        assert_eq!(rollback, FieldPatch::AppearanceLevel(50));
        local.apply_patch("q1", &rollback).unwrap();
        assert_eq!(local.get("q1").unwrap().appearance_level, 50);
    }

    #[test]
    fn test_adopt_if_present_ignores_deleted() {
        let local = LocalQuestions::new();
        local.replace_all(vec![question("q1")]);

        assert!(local.adopt_if_present(question("q1")));

        local.remove("q1");
        assert!(!local.adopt_if_present(question("q1")));
        assert!(local.is_empty());
    }
}
