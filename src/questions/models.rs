//! Data models for the question bank

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Maximum number of tags on a question
pub const MAX_TAGS: usize = 10;

/// Maximum length of a single tag in characters
pub const MAX_TAG_LEN: usize = 20;

/// Default appearance level for new questions (0-100 scale)
pub const DEFAULT_APPEARANCE_LEVEL: u8 = 50;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Title must not be empty")]
    EmptyTitle,

    #[error("At least one answer rendering (detailed or oral) is required")]
    MissingAnswer,

    #[error("Too many tags: {0} (maximum {MAX_TAGS})")]
    TooManyTags(usize),

    #[error("Tag '{0}' exceeds {MAX_TAG_LEN} characters")]
    TagTooLong(String),

    #[error("Appearance level {0} is out of range 0-100")]
    AppearanceLevelOutOfRange(u8),

    #[error("Category name must not be empty")]
    EmptyCategoryName,
}

/// Difficulty of a question
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Default for Difficulty {
    fn default() -> Self {
        Self::Medium
    }
}

/// User-reported proficiency with a question
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Proficiency {
    Beginner,
    Intermediate,
    Advanced,
    Master,
}

impl Default for Proficiency {
    fn default() -> Self {
        Self::Beginner
    }
}

/// A single study question with answer content, classification and
/// scheduling metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    /// Opaque id assigned by the backing store on creation
    pub id: String,
    pub title: String,
    /// Long-form answer rendering
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detailed_answer: Option<String>,
    /// Short answer rendering suitable for speaking aloud
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oral_answer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_url: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub difficulty: Difficulty,
    #[serde(default)]
    pub proficiency: Proficiency,
    /// Relative likelihood (0-100) of being surfaced during review
    #[serde(default = "default_appearance_level")]
    pub appearance_level: u8,
    /// When the question was last confirmed reviewed; never set for
    /// questions that have not been reviewed yet
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_reviewed_at: Option<DateTime<Utc>>,
    /// Owning category; `None` means uncategorized
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<String>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_appearance_level() -> u8 {
    DEFAULT_APPEARANCE_LEVEL
}

impl Question {
    /// The instant review scheduling is measured from: the last review,
    /// or creation time if the question has never been reviewed.
    pub fn baseline(&self) -> DateTime<Utc> {
        self.last_reviewed_at.unwrap_or(self.created_at)
    }

    /// Normalize a record arriving from the remote store or the cache so
    /// downstream logic never re-checks optional fields: empty optional
    /// strings become `None` and the appearance level is clamped to 0-100.
    pub fn normalize(mut self) -> Self {
        self.appearance_level = self.appearance_level.min(100);
        self.detailed_answer = non_empty(self.detailed_answer);
        self.oral_answer = non_empty(self.oral_answer);
        self.code = non_empty(self.code);
        self.reference_url = non_empty(self.reference_url);
        self.category_id = non_empty(self.category_id);
        self.tags.retain(|t| !t.trim().is_empty());
        self
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

/// Input for creating or replacing a question
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionDraft {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detailed_answer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oral_answer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_url: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub difficulty: Difficulty,
    #[serde(default)]
    pub proficiency: Proficiency,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub appearance_level: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<String>,
}

impl QuestionDraft {
    /// Validate the draft before any mutation is attempted
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::EmptyTitle);
        }

        let has_detailed = self
            .detailed_answer
            .as_deref()
            .map_or(false, |a| !a.trim().is_empty());
        let has_oral = self
            .oral_answer
            .as_deref()
            .map_or(false, |a| !a.trim().is_empty());
        if !has_detailed && !has_oral {
            return Err(ValidationError::MissingAnswer);
        }

        if self.tags.len() > MAX_TAGS {
            return Err(ValidationError::TooManyTags(self.tags.len()));
        }
        for tag in &self.tags {
            if tag.chars().count() > MAX_TAG_LEN {
                return Err(ValidationError::TagTooLong(tag.clone()));
            }
        }

        if let Some(level) = self.appearance_level {
            if level > 100 {
                return Err(ValidationError::AppearanceLevelOutOfRange(level));
            }
        }

        Ok(())
    }
}

/// A typed single-field mutation on a question. Carries the new value;
/// `capture` on the same variant yields the patch that restores the
/// previous value, which is what rollback replays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "field", content = "value", rename_all = "camelCase")]
pub enum FieldPatch {
    AppearanceLevel(u8),
    /// `None` clears the field back to the never-reviewed state, which
    /// only happens when rolling back a first-ever review
    LastReviewedAt(Option<DateTime<Utc>>),
    Difficulty(Difficulty),
    Proficiency(Proficiency),
    /// `None` moves the question to the uncategorized state
    Category(Option<String>),
}

impl FieldPatch {
    pub fn field_name(&self) -> &'static str {
        match self {
            Self::AppearanceLevel(_) => "appearanceLevel",
            Self::LastReviewedAt(_) => "lastReviewedAt",
            Self::Difficulty(_) => "difficulty",
            Self::Proficiency(_) => "proficiency",
            Self::Category(_) => "categoryId",
        }
    }

    /// Apply the patch to a question in place
    pub fn apply(&self, question: &mut Question) {
        match self {
            Self::AppearanceLevel(level) => question.appearance_level = *level,
            Self::LastReviewedAt(at) => question.last_reviewed_at = *at,
            Self::Difficulty(d) => question.difficulty = *d,
            Self::Proficiency(p) => question.proficiency = *p,
            Self::Category(id) => question.category_id = id.clone(),
        }
    }

    /// Capture the question's current value of this patch's field
    pub fn capture(&self, question: &Question) -> FieldPatch {
        match self {
            Self::AppearanceLevel(_) => Self::AppearanceLevel(question.appearance_level),
            Self::LastReviewedAt(_) => Self::LastReviewedAt(question.last_reviewed_at),
            Self::Difficulty(_) => Self::Difficulty(question.difficulty),
            Self::Proficiency(_) => Self::Proficiency(question.proficiency),
            Self::Category(_) => Self::Category(question.category_id.clone()),
        }
    }

    /// Validate the new value against the data model's ranges
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Self::AppearanceLevel(level) = self {
            if *level > 100 {
                return Err(ValidationError::AppearanceLevelOutOfRange(*level));
            }
        }
        Ok(())
    }
}

/// A named grouping of questions, owned by one user
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Denormalized member count, maintained via batched increments
    #[serde(default)]
    pub question_count: i64,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating or renaming a category
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryDraft {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl CategoryDraft {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyCategoryName);
        }
        Ok(())
    }
}
