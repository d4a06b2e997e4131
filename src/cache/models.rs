//! Data models for the cache store

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::questions::Question;

/// Schema version written into every snapshot. Snapshots carrying a
/// different version are treated as absent.
pub const CACHE_SCHEMA_VERSION: u32 = 1;

/// Snapshot lifetime in milliseconds (7 days)
pub const CACHE_TTL_MS: i64 = 604_800_000;

/// Default number of questions retained in a snapshot
pub const DEFAULT_CACHE_LIMIT: usize = 30;

/// Smallest accepted cache limit
pub const MIN_CACHE_LIMIT: usize = 1;

/// Largest accepted cache limit
pub const MAX_CACHE_LIMIT: usize = 500;

/// Which storage path a snapshot was persisted through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheOrigin {
    /// The preferred data-directory location
    Primary,
    /// The secondary location used when the primary is unavailable
    Fallback,
}

/// The persisted snapshot blob
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheSnapshot {
    pub version: u32,
    pub questions: Vec<Question>,
    /// When the snapshot was captured
    pub captured_at: DateTime<Utc>,
    /// The item limit in effect at capture time
    pub limit: usize,
    pub origin: CacheOrigin,
}

impl CacheSnapshot {
    /// Whether the snapshot is past its 7-day lifetime at `now`.
    /// Exactly 7 days old is still valid (`>`, not `>=`).
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        (now - self.captured_at).num_milliseconds() > CACHE_TTL_MS
    }
}

/// Result of reading the cache: the empty shape (no questions, no
/// timestamp) stands for "no snapshot"
#[derive(Debug, Clone, Default)]
pub struct CacheRead {
    pub questions: Vec<Question>,
    pub captured_at: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
}

impl CacheRead {
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }
}

/// Read-only cache introspection. Unlike [`CacheRead`], reporting an
/// expired snapshot here does not purge it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStatus {
    pub has_cache: bool,
    pub count: usize,
    pub limit: usize,
    pub is_expired: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub captured_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin: Option<CacheOrigin>,
}
