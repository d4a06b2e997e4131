//! The `RemoteStore` trait: every read and write the data facade issues
//! against the backing object store, expressed over equality filters,
//! sort, and limit/skip pagination. All operations are scoped to the
//! authenticated user.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::questions::{Category, CategoryDraft, FieldPatch, Question, QuestionDraft};

/// Authenticated user context. Every remote operation requires one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: String,
    pub session_token: String,
}

#[derive(Error, Debug)]
pub enum RemoteError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Authentication failed")]
    AuthFailed,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Rate limited")]
    RateLimited,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Server error: {status} - {message}")]
    Server { status: u16, message: String },

    #[error("Malformed response: {0}")]
    Malformed(String),
}

impl RemoteError {
    /// Whether the failure is network/rate-limit class, i.e. eligible
    /// for cache fallback on reads
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(_) | Self::Network(_) | Self::Timeout | Self::RateLimited => true,
            Self::Server { status, .. } => *status >= 500,
            Self::AuthFailed | Self::NotFound(_) | Self::Malformed(_) => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, RemoteError>;

/// Field a question list can be sorted by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortField {
    CreatedAt,
    UpdatedAt,
    LastReviewedAt,
    AppearanceLevel,
    Title,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sort {
    pub field: SortField,
    pub direction: SortDirection,
}

impl Default for Sort {
    fn default() -> Self {
        Self {
            field: SortField::CreatedAt,
            direction: SortDirection::Descending,
        }
    }
}

/// Category constraint on a question query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CategoryFilter {
    /// Questions with no category
    Uncategorized,
    /// Questions in a specific category
    Id(String),
}

/// Equality filters applied to a question list. `None` means "any".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionFilters {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<crate::questions::Difficulty>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proficiency: Option<crate::questions::Proficiency>,
    /// Matches questions whose tag list contains this tag
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

/// A complete remote question query: constraints plus sort plus window
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<CategoryFilter>,
    #[serde(default)]
    pub filters: QuestionFilters,
    #[serde(default)]
    pub sort: Sort,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip: Option<usize>,
}

/// Object-store operations consumed by the data facade. One HTTP
/// implementation exists ([`super::HttpRemoteStore`]); tests substitute
/// an in-memory double.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    async fn fetch_questions(&self, session: &Session, query: &QuestionQuery)
        -> Result<Vec<Question>>;

    async fn count_questions(&self, session: &Session, query: &QuestionQuery) -> Result<usize>;

    async fn get_question(&self, session: &Session, id: &str) -> Result<Question>;

    async fn create_question(&self, session: &Session, draft: &QuestionDraft) -> Result<Question>;

    /// Replace a question's editable fields and return the canonical
    /// updated record
    async fn update_question(
        &self,
        session: &Session,
        id: &str,
        draft: &QuestionDraft,
    ) -> Result<Question>;

    /// Write a single field and return the canonical updated record
    async fn update_question_field(
        &self,
        session: &Session,
        id: &str,
        patch: &FieldPatch,
    ) -> Result<Question>;

    async fn delete_question(&self, session: &Session, id: &str) -> Result<()>;

    async fn list_categories(&self, session: &Session) -> Result<Vec<Category>>;

    async fn create_category(&self, session: &Session, draft: &CategoryDraft) -> Result<Category>;

    async fn update_category(
        &self,
        session: &Session,
        id: &str,
        draft: &CategoryDraft,
    ) -> Result<Category>;

    async fn delete_category(&self, session: &Session, id: &str) -> Result<()>;

    /// Atomically adjust a category's denormalized question count
    async fn increment_question_count(
        &self,
        session: &Session,
        category_id: &str,
        delta: i64,
    ) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(RemoteError::Timeout.is_transient());
        assert!(RemoteError::RateLimited.is_transient());
        assert!(RemoteError::Network("reset".to_string()).is_transient());
        assert!(RemoteError::Server { status: 503, message: String::new() }.is_transient());

        assert!(!RemoteError::AuthFailed.is_transient());
        assert!(!RemoteError::NotFound("q1".to_string()).is_transient());
        assert!(!RemoteError::Server { status: 400, message: String::new() }.is_transient());
    }

    #[test]
    fn test_default_sort_is_newest_first() {
        let sort = Sort::default();
        assert_eq!(sort.field, SortField::CreatedAt);
        assert_eq!(sort.direction, SortDirection::Descending);
    }
}
