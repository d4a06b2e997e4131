//! In-memory [`RemoteStore`] double for tests
//!
//! Implements the store's query semantics independently of
//! `data::filter`, so parity tests between the online and offline paths
//! compare two separate implementations. Supports injected transient
//! failures and records calls for assertions.

use std::cmp::Ordering;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use super::store::*;
use crate::questions::{Category, CategoryDraft, FieldPatch, Question, QuestionDraft};

#[derive(Default)]
pub struct InMemoryRemoteStore {
    questions: Mutex<Vec<Question>>,
    categories: Mutex<Vec<Category>>,
    /// Remaining read calls to fail with `Timeout`
    fail_reads: AtomicUsize,
    /// Remaining write calls to fail with a 500
    fail_writes: AtomicUsize,
    /// Artificial latency on single-field updates
    update_delay: Mutex<Option<Duration>>,
    pub fetch_calls: AtomicUsize,
    pub get_calls: AtomicUsize,
    pub create_calls: AtomicUsize,
    /// Recorded `(category_id, delta)` increments
    pub increments: Mutex<Vec<(String, i64)>>,
}

impl InMemoryRemoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed_questions(&self, questions: Vec<Question>) {
        *self.questions.lock().unwrap() = questions;
    }

    pub fn seed_categories(&self, categories: Vec<Category>) {
        *self.categories.lock().unwrap() = categories;
    }

    pub fn questions_snapshot(&self) -> Vec<Question> {
        self.questions.lock().unwrap().clone()
    }

    pub fn fail_next_reads(&self, n: usize) {
        self.fail_reads.store(n, AtomicOrdering::SeqCst);
    }

    pub fn fail_next_writes(&self, n: usize) {
        self.fail_writes.store(n, AtomicOrdering::SeqCst);
    }

    pub fn set_update_delay(&self, delay: Duration) {
        *self.update_delay.lock().unwrap() = Some(delay);
    }

    fn check_read(&self) -> Result<()> {
        if take_one(&self.fail_reads) {
            return Err(RemoteError::Timeout);
        }
        Ok(())
    }

    fn check_write(&self) -> Result<()> {
        if take_one(&self.fail_writes) {
            return Err(RemoteError::Server {
                status: 500,
                message: "injected failure".to_string(),
            });
        }
        Ok(())
    }

    /// The store's own query evaluation, written independently of the
    /// client-side filter module
    fn evaluate(&self, session: &Session, query: &QuestionQuery) -> Vec<Question> {
        let mut matched: Vec<Question> = self
            .questions
            .lock()
            .unwrap()
            .iter()
            .filter(|q| q.created_by == session.user_id)
            .filter(|q| match &query.category {
                Some(CategoryFilter::Id(id)) => q.category_id.as_ref() == Some(id),
                Some(CategoryFilter::Uncategorized) => q.category_id.is_none(),
                None => true,
            })
            .filter(|q| query.filters.difficulty.map_or(true, |d| q.difficulty == d))
            .filter(|q| query.filters.proficiency.map_or(true, |p| q.proficiency == p))
            .filter(|q| {
                query
                    .filters
                    .tag
                    .as_ref()
                    .map_or(true, |tag| q.tags.contains(tag))
            })
            .cloned()
            .collect();

        matched.sort_by(|a, b| {
            let key = match query.sort.field {
                SortField::CreatedAt => a.created_at.cmp(&b.created_at),
                SortField::UpdatedAt => a.updated_at.cmp(&b.updated_at),
                SortField::LastReviewedAt => a.last_reviewed_at.cmp(&b.last_reviewed_at),
                SortField::AppearanceLevel => a.appearance_level.cmp(&b.appearance_level),
                SortField::Title => a.title.cmp(&b.title),
            };
            let key = if query.sort.direction == SortDirection::Descending {
                key.reverse()
            } else {
                key
            };
            if key == Ordering::Equal {
                a.id.cmp(&b.id)
            } else {
                key
            }
        });

        let skip = query.skip.unwrap_or(0);
        let limit = query.limit.unwrap_or(usize::MAX);
        matched.into_iter().skip(skip).take(limit).collect()
    }
}

fn take_one(counter: &AtomicUsize) -> bool {
    counter
        .fetch_update(AtomicOrdering::SeqCst, AtomicOrdering::SeqCst, |n| {
            if n > 0 {
                Some(n - 1)
            } else {
                None
            }
        })
        .is_ok()
}

#[async_trait]
impl RemoteStore for InMemoryRemoteStore {
    async fn fetch_questions(
        &self,
        session: &Session,
        query: &QuestionQuery,
    ) -> Result<Vec<Question>> {
        self.fetch_calls.fetch_add(1, AtomicOrdering::SeqCst);
        self.check_read()?;
        Ok(self.evaluate(session, query))
    }

    async fn count_questions(&self, session: &Session, query: &QuestionQuery) -> Result<usize> {
        self.check_read()?;
        let unwindowed = QuestionQuery {
            limit: None,
            skip: None,
            ..query.clone()
        };
        Ok(self.evaluate(session, &unwindowed).len())
    }

    async fn get_question(&self, session: &Session, id: &str) -> Result<Question> {
        self.get_calls.fetch_add(1, AtomicOrdering::SeqCst);
        self.check_read()?;
        self.questions
            .lock()
            .unwrap()
            .iter()
            .find(|q| q.id == id && q.created_by == session.user_id)
            .cloned()
            .ok_or_else(|| RemoteError::NotFound(id.to_string()))
    }

    async fn create_question(&self, session: &Session, draft: &QuestionDraft) -> Result<Question> {
        self.create_calls.fetch_add(1, AtomicOrdering::SeqCst);
        self.check_write()?;
        let now = Utc::now();
        let question = Question {
            id: Uuid::new_v4().to_string(),
            title: draft.title.clone(),
            detailed_answer: draft.detailed_answer.clone(),
            oral_answer: draft.oral_answer.clone(),
            code: draft.code.clone(),
            reference_url: draft.reference_url.clone(),
            tags: draft.tags.clone(),
            difficulty: draft.difficulty,
            proficiency: draft.proficiency,
            appearance_level: draft
                .appearance_level
                .unwrap_or(crate::questions::DEFAULT_APPEARANCE_LEVEL),
            last_reviewed_at: None,
            category_id: draft.category_id.clone(),
            created_by: session.user_id.clone(),
            created_at: now,
            updated_at: now,
        };
        self.questions.lock().unwrap().push(question.clone());
        Ok(question)
    }

    async fn update_question(
        &self,
        session: &Session,
        id: &str,
        draft: &QuestionDraft,
    ) -> Result<Question> {
        self.check_write()?;
        let mut questions = self.questions.lock().unwrap();
        let question = questions
            .iter_mut()
            .find(|q| q.id == id && q.created_by == session.user_id)
            .ok_or_else(|| RemoteError::NotFound(id.to_string()))?;

        question.title = draft.title.clone();
        question.detailed_answer = draft.detailed_answer.clone();
        question.oral_answer = draft.oral_answer.clone();
        question.code = draft.code.clone();
        question.reference_url = draft.reference_url.clone();
        question.tags = draft.tags.clone();
        question.difficulty = draft.difficulty;
        question.proficiency = draft.proficiency;
        if let Some(level) = draft.appearance_level {
            question.appearance_level = level;
        }
        question.category_id = draft.category_id.clone();
        question.updated_at = Utc::now();
        Ok(question.clone())
    }

    async fn update_question_field(
        &self,
        session: &Session,
        id: &str,
        patch: &FieldPatch,
    ) -> Result<Question> {
        let delay = *self.update_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.check_write()?;
        let mut questions = self.questions.lock().unwrap();
        let question = questions
            .iter_mut()
            .find(|q| q.id == id && q.created_by == session.user_id)
            .ok_or_else(|| RemoteError::NotFound(id.to_string()))?;
        patch.apply(question);
        question.updated_at = Utc::now();
        Ok(question.clone())
    }

    async fn delete_question(&self, session: &Session, id: &str) -> Result<()> {
        self.check_write()?;
        let mut questions = self.questions.lock().unwrap();
        let before = questions.len();
        questions.retain(|q| !(q.id == id && q.created_by == session.user_id));
        if questions.len() == before {
            return Err(RemoteError::NotFound(id.to_string()));
        }
        Ok(())
    }

    async fn list_categories(&self, session: &Session) -> Result<Vec<Category>> {
        self.check_read()?;
        Ok(self
            .categories
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.created_by == session.user_id)
            .cloned()
            .collect())
    }

    async fn create_category(&self, session: &Session, draft: &CategoryDraft) -> Result<Category> {
        self.check_write()?;
        let now = Utc::now();
        let category = Category {
            id: Uuid::new_v4().to_string(),
            name: draft.name.clone(),
            description: draft.description.clone(),
            question_count: 0,
            created_by: session.user_id.clone(),
            created_at: now,
            updated_at: now,
        };
        self.categories.lock().unwrap().push(category.clone());
        Ok(category)
    }

    async fn update_category(
        &self,
        session: &Session,
        id: &str,
        draft: &CategoryDraft,
    ) -> Result<Category> {
        self.check_write()?;
        let mut categories = self.categories.lock().unwrap();
        let category = categories
            .iter_mut()
            .find(|c| c.id == id && c.created_by == session.user_id)
            .ok_or_else(|| RemoteError::NotFound(id.to_string()))?;
        category.name = draft.name.clone();
        category.description = draft.description.clone();
        category.updated_at = Utc::now();
        Ok(category.clone())
    }

    async fn delete_category(&self, session: &Session, id: &str) -> Result<()> {
        self.check_write()?;
        let mut categories = self.categories.lock().unwrap();
        let before = categories.len();
        categories.retain(|c| !(c.id == id && c.created_by == session.user_id));
        if categories.len() == before {
            return Err(RemoteError::NotFound(id.to_string()));
        }
        Ok(())
    }

    async fn increment_question_count(
        &self,
        session: &Session,
        category_id: &str,
        delta: i64,
    ) -> Result<()> {
        self.check_write()?;
        self.increments
            .lock()
            .unwrap()
            .push((category_id.to_string(), delta));
        let mut categories = self.categories.lock().unwrap();
        if let Some(category) = categories
            .iter_mut()
            .find(|c| c.id == category_id && c.created_by == session.user_id)
        {
            category.question_count += delta;
        }
        Ok(())
    }
}
