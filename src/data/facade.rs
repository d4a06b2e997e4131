//! The single entry point for question and category data access
//!
//! Every read routes on connectivity: online reads hit the remote store
//! and refresh the cache, offline reads serve from the cache snapshot.
//! Writes require connectivity and fail fast offline, before any state
//! is touched. Transient remote read failures degrade to the cache when
//! a snapshot exists rather than surfacing an error.

use std::sync::Arc;
use std::time::Duration;

use crate::cache::CacheStore;
use crate::events::{AppEvent, EventBus};
use crate::network::NetworkMonitor;
use crate::optimistic::CountBatcher;
use crate::questions::{Category, CategoryDraft, Question, QuestionDraft};
use crate::remote::{
    CategoryFilter, QuestionFilters, QuestionQuery, RemoteStore, Session, Sort,
};

use super::filter;
use super::local::LocalQuestions;
use super::{DataError, Result, SharedSession};

/// Questions fetched per request when walking a full listing
pub const PAGE_FETCH_SIZE: usize = 100;

/// A paginated page fetch gets one retry on a transient failure
const MAX_FETCH_ATTEMPTS: u32 = 2;
const INITIAL_RETRY_BACKOFF: Duration = Duration::from_millis(250);
const MAX_RETRY_BACKOFF: Duration = Duration::from_secs(1);

/// UI-facing page request, 1-based
#[derive(Debug, Clone, Copy)]
pub struct PageRequest {
    pub page: usize,
    pub page_size: usize,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: 20,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: usize,
    pub page_size: usize,
    pub total: usize,
    pub total_pages: usize,
}

#[derive(Debug, Clone)]
pub struct PagedQuestions {
    pub questions: Vec<Question>,
    pub pagination: Pagination,
}

pub struct DataFacade {
    remote: Arc<dyn RemoteStore>,
    cache: Arc<CacheStore>,
    local: Arc<LocalQuestions>,
    monitor: Arc<NetworkMonitor>,
    counts: Arc<CountBatcher>,
    bus: Arc<EventBus>,
    session: SharedSession,
}

impl DataFacade {
    pub fn new(
        remote: Arc<dyn RemoteStore>,
        cache: Arc<CacheStore>,
        local: Arc<LocalQuestions>,
        monitor: Arc<NetworkMonitor>,
        counts: Arc<CountBatcher>,
        bus: Arc<EventBus>,
        session: SharedSession,
    ) -> Self {
        Self {
            remote,
            cache,
            local,
            monitor,
            counts,
            bus,
            session,
        }
    }

    fn require_session(&self) -> Result<Session> {
        self.session
            .read()
            .unwrap()
            .clone()
            .ok_or(DataError::NotAuthenticated)
    }

    /// Writes are refused outright while serving offline data
    fn require_online(&self) -> Result<()> {
        if self.monitor.should_use_offline_data(&self.cache) {
            return Err(DataError::OfflineUnsupported);
        }
        Ok(())
    }

    fn offline(&self) -> bool {
        self.monitor.should_use_offline_data(&self.cache)
    }

    // ---- question reads ----

    /// Every question the user owns, newest first. Online this walks
    /// the remote store page by page, refreshes the cache snapshot and
    /// replaces local state; offline it serves the cache.
    pub async fn list_all(&self) -> Result<Vec<Question>> {
        let session = self.require_session()?;

        if self.offline() {
            let read = self.cache.read();
            log::info!(
                "Serving {} questions from offline cache",
                read.questions.len()
            );
            self.local.replace_all(read.questions.clone());
            return Ok(read.questions);
        }

        match self.fetch_all_pages(&session).await {
            Ok(questions) => {
                self.cache.write(&questions);
                self.local.replace_all(questions.clone());
                Ok(questions)
            }
            Err(e) if e.is_transient() => {
                let read = self.cache.read();
                if read.is_empty() {
                    Err(e.into())
                } else {
                    log::warn!(
                        "Question fetch failed ({}), falling back to cached snapshot of {}",
                        e,
                        read.questions.len()
                    );
                    self.local.replace_all(read.questions.clone());
                    Ok(read.questions)
                }
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Walk the full listing in fixed-size pages, sequentially. A page
    /// fetch that fails transiently is retried once with backoff; pages
    /// are never fetched out of order or concurrently.
    async fn fetch_all_pages(
        &self,
        session: &Session,
    ) -> std::result::Result<Vec<Question>, crate::remote::RemoteError> {
        let mut all = Vec::new();
        let mut skip = 0;
        loop {
            let query = QuestionQuery {
                limit: Some(PAGE_FETCH_SIZE),
                skip: Some(skip),
                ..QuestionQuery::default()
            };
            let page = self.fetch_page_with_retry(session, &query).await?;
            let len = page.len();
            all.extend(page);
            if len < PAGE_FETCH_SIZE {
                return Ok(all);
            }
            skip += PAGE_FETCH_SIZE;
        }
    }

    async fn fetch_page_with_retry(
        &self,
        session: &Session,
        query: &QuestionQuery,
    ) -> std::result::Result<Vec<Question>, crate::remote::RemoteError> {
        let mut backoff = INITIAL_RETRY_BACKOFF;
        let mut attempt = 1;
        loop {
            match self.remote.fetch_questions(session, query).await {
                Ok(page) => return Ok(page),
                Err(e) if e.is_transient() && attempt < MAX_FETCH_ATTEMPTS => {
                    log::warn!(
                        "Page fetch at skip {:?} failed (attempt {}): {}, retrying in {:?}",
                        query.skip,
                        attempt,
                        e,
                        backoff
                    );
                    tokio::time::sleep(backoff).await;
                    backoff = (backoff * 2).min(MAX_RETRY_BACKOFF);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// One page of a filtered, sorted category view. Online and offline
    /// apply the same filter semantics, so the two paths return the
    /// same questions in the same order for identical inputs.
    pub async fn list_by_category(
        &self,
        category: Option<CategoryFilter>,
        filters: QuestionFilters,
        sort: Sort,
        page: PageRequest,
    ) -> Result<PagedQuestions> {
        let session = self.require_session()?;

        if self.offline() {
            let read = self.cache.read();
            let matched = filter::apply(&read.questions, category.as_ref(), &filters, &sort);
            return Ok(paginate(matched, page));
        }

        let page_size = page.page_size.max(1);
        let query = QuestionQuery {
            category: category.clone(),
            filters: filters.clone(),
            sort,
            limit: Some(page_size),
            skip: Some(page.page.saturating_sub(1) * page_size),
        };
        let counted = QuestionQuery {
            limit: None,
            skip: None,
            ..query.clone()
        };

        let fetched = async {
            let total = self.remote.count_questions(&session, &counted).await?;
            let questions = self.remote.fetch_questions(&session, &query).await?;
            Ok::<_, crate::remote::RemoteError>((total, questions))
        }
        .await;

        match fetched {
            Ok((total, questions)) => {
                for q in &questions {
                    self.local.upsert(q.clone());
                }
                Ok(PagedQuestions {
                    questions,
                    pagination: Pagination {
                        page: page.page.max(1),
                        page_size,
                        total,
                        total_pages: total.div_ceil(page_size),
                    },
                })
            }
            Err(e) if e.is_transient() && !self.cache.read().is_empty() => {
                log::warn!("Category listing failed ({}), serving from cache", e);
                let read = self.cache.read();
                let matched = filter::apply(&read.questions, category.as_ref(), &filters, &sort);
                Ok(paginate(matched, page))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Fetch one question. Offline this is a pure cache lookup with no
    /// network fallback; online a failed fetch surfaces the error
    /// rather than silently serving stale data.
    pub async fn get_by_id(&self, id: &str) -> Result<Question> {
        let session = self.require_session()?;

        if self.offline() {
            return self
                .cache
                .read()
                .questions
                .into_iter()
                .find(|q| q.id == id)
                .ok_or_else(|| DataError::NotFound(id.to_string()));
        }

        let question = self.remote.get_question(&session, id).await?;
        self.local.upsert(question.clone());
        Ok(question)
    }

    // ---- question writes ----

    pub async fn create_question(&self, draft: &QuestionDraft) -> Result<Question> {
        draft.validate()?;
        let session = self.require_session()?;
        self.require_online()?;

        let question = self.remote.create_question(&session, draft).await?;
        if let Some(category_id) = &question.category_id {
            self.counts.enqueue(category_id, 1);
        }
        self.local.upsert(question.clone());
        Ok(question)
    }

    pub async fn update_question(&self, id: &str, draft: &QuestionDraft) -> Result<Question> {
        draft.validate()?;
        let session = self.require_session()?;
        self.require_online()?;

        let previous_category = self.local.get(id).and_then(|q| q.category_id);
        let question = self.remote.update_question(&session, id, draft).await?;
        if question.category_id != previous_category {
            if let Some(old) = &previous_category {
                self.counts.enqueue(old, -1);
            }
            if let Some(new) = &question.category_id {
                self.counts.enqueue(new, 1);
            }
        }
        self.local.upsert(question.clone());
        Ok(question)
    }

    /// Delete a question everywhere it lives: remote record, local
    /// state, cache snapshot, and the owning category's count.
    pub async fn delete_question(&self, id: &str) -> Result<()> {
        let session = self.require_session()?;
        self.require_online()?;

        self.remote.delete_question(&session, id).await?;
        let removed = self.local.remove(id);
        self.cache.remove_question(id);
        if let Some(category_id) = removed.and_then(|q| q.category_id) {
            self.counts.enqueue(&category_id, -1);
        }
        self.bus.publish(AppEvent::QuestionDeleted { id: id.to_string() });
        Ok(())
    }

    // ---- categories ----

    /// Category metadata lives only remotely; offline there is nothing
    /// to serve
    pub async fn list_categories(&self) -> Result<Vec<Category>> {
        let session = self.require_session()?;
        if self.offline() {
            return Err(DataError::OfflineUnsupported);
        }
        Ok(self.remote.list_categories(&session).await?)
    }

    pub async fn create_category(&self, draft: &CategoryDraft) -> Result<Category> {
        draft.validate()?;
        let session = self.require_session()?;
        self.require_online()?;
        Ok(self.remote.create_category(&session, draft).await?)
    }

    pub async fn update_category(&self, id: &str, draft: &CategoryDraft) -> Result<Category> {
        draft.validate()?;
        let session = self.require_session()?;
        self.require_online()?;
        Ok(self.remote.update_category(&session, id, draft).await?)
    }

    /// Delete a category and every question in it. Member questions go
    /// first so a partial failure leaves the category intact and
    /// re-runnable rather than orphaning its questions.
    pub async fn delete_category(&self, id: &str) -> Result<()> {
        let session = self.require_session()?;
        self.require_online()?;

        let query = QuestionQuery {
            category: Some(CategoryFilter::Id(id.to_string())),
            ..QuestionQuery::default()
        };
        let members = self.remote.fetch_questions(&session, &query).await?;
        for question in &members {
            self.remote.delete_question(&session, &question.id).await?;
            self.local.remove(&question.id);
            self.cache.remove_question(&question.id);
            self.bus.publish(AppEvent::QuestionDeleted {
                id: question.id.clone(),
            });
        }
        log::info!(
            "Deleted category {} and its {} member questions",
            id,
            members.len()
        );
        self.remote.delete_category(&session, id).await?;
        Ok(())
    }
}

/// In-memory pagination for the offline and fallback paths
fn paginate(questions: Vec<Question>, page: PageRequest) -> PagedQuestions {
    let page_size = page.page_size.max(1);
    let current = page.page.max(1);
    let total = questions.len();
    let start = (current - 1) * page_size;
    let slice = if start >= total {
        Vec::new()
    } else {
        questions[start..(start + page_size).min(total)].to_vec()
    };
    PagedQuestions {
        questions: slice,
        pagination: Pagination {
            page: current,
            page_size,
            total,
            total_pages: total.div_ceil(page_size),
        },
    }
}
