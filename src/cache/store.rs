//! Persistence for the question-list snapshot
//!
//! One snapshot file per location:
//! ```text
//! <data_local_dir>/qbank/cache/questions.json    (primary)
//! <cache_dir>/qbank/questions.json               (fallback)
//! ```
//! The fallback is only written when the primary location is unusable;
//! snapshots record which path served them so status displays can tell.

use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;

use super::models::*;
use crate::events::{AppEvent, EventBus};
use crate::questions::Question;

/// Snapshot file name, identical in both locations
pub(crate) const SNAPSHOT_FILE: &str = "questions.json";

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Data directory not found")]
    DataDirNotFound,

    #[error("Cache limit {0} is out of range {MIN_CACHE_LIMIT}-{MAX_CACHE_LIMIT}")]
    InvalidLimit(usize),
}

pub type Result<T> = std::result::Result<T, CacheError>;

pub struct CacheStore {
    primary_dir: PathBuf,
    fallback_dir: PathBuf,
    limit: AtomicUsize,
    bus: Arc<EventBus>,
}

impl CacheStore {
    pub fn new(primary_dir: PathBuf, fallback_dir: PathBuf, bus: Arc<EventBus>) -> Self {
        Self {
            primary_dir,
            fallback_dir,
            limit: AtomicUsize::new(DEFAULT_CACHE_LIMIT),
            bus,
        }
    }

    /// Default primary/fallback locations under the platform directories
    pub fn default_dirs() -> Result<(PathBuf, PathBuf)> {
        let primary = dirs::data_local_dir()
            .map(|p| p.join("qbank").join("cache"))
            .ok_or(CacheError::DataDirNotFound)?;
        let fallback = dirs::cache_dir()
            .map(|p| p.join("qbank"))
            .ok_or(CacheError::DataDirNotFound)?;
        Ok((primary, fallback))
    }

    fn primary_path(&self) -> PathBuf {
        self.primary_dir.join(SNAPSHOT_FILE)
    }

    fn fallback_path(&self) -> PathBuf {
        self.fallback_dir.join(SNAPSHOT_FILE)
    }

    // ===== Limit configuration =====

    /// Set the item limit. Out-of-range values are rejected and the prior
    /// limit stays in effect.
    pub fn set_limit(&self, limit: usize) -> Result<()> {
        if !(MIN_CACHE_LIMIT..=MAX_CACHE_LIMIT).contains(&limit) {
            return Err(CacheError::InvalidLimit(limit));
        }
        self.limit.store(limit, Ordering::SeqCst);
        Ok(())
    }

    pub fn get_limit(&self) -> usize {
        self.limit.load(Ordering::SeqCst)
    }

    // ===== Snapshot operations =====

    /// Persist a snapshot of `questions`, truncated to the active limit
    /// while preserving caller order. Returns `false` on persistence
    /// failure so callers can treat caching as best-effort.
    pub fn write(&self, questions: &[Question]) -> bool {
        let limit = self.get_limit();
        let retained: Vec<Question> = questions.iter().take(limit).cloned().collect();
        let count = retained.len();

        let mut snapshot = CacheSnapshot {
            version: CACHE_SCHEMA_VERSION,
            questions: retained,
            captured_at: Utc::now(),
            limit,
            origin: CacheOrigin::Primary,
        };

        if let Err(e) = self.persist(&self.primary_dir, &snapshot) {
            log::warn!(
                "Cache: primary write to {:?} failed: {} — trying fallback",
                self.primary_dir,
                e
            );
            snapshot.origin = CacheOrigin::Fallback;
            if let Err(e) = self.persist(&self.fallback_dir, &snapshot) {
                log::warn!("Cache: fallback write to {:?} failed: {}", self.fallback_dir, e);
                return false;
            }
        }

        log::debug!("Cache: snapshot written ({} questions, limit {})", count, limit);
        self.bus.publish(AppEvent::CacheUpdated { count });
        true
    }

    /// Write the whole blob via a temp file and rename, so a concurrent
    /// reader sees either the old snapshot or the new one, never a
    /// partial write.
    fn persist(&self, dir: &PathBuf, snapshot: &CacheSnapshot) -> Result<()> {
        fs::create_dir_all(dir)?;
        let tmp = dir.join(format!("{}.tmp", SNAPSHOT_FILE));
        fs::write(&tmp, serde_json::to_string_pretty(snapshot)?)?;
        fs::rename(&tmp, dir.join(SNAPSHOT_FILE))?;
        Ok(())
    }

    /// Read the current snapshot. Returns the empty shape when no
    /// snapshot exists; an expired snapshot is deleted on the spot and
    /// the empty shape returned (no resurrection on later reads).
    pub fn read(&self) -> CacheRead {
        let Some((snapshot, path)) = self.load() else {
            return CacheRead::default();
        };

        if snapshot.is_expired(Utc::now()) {
            log::info!("Cache: snapshot captured {} is expired, purging", snapshot.captured_at);
            if let Err(e) = fs::remove_file(&path) {
                log::warn!("Cache: failed to remove expired snapshot {:?}: {}", path, e);
            }
            return CacheRead::default();
        }

        CacheRead {
            questions: snapshot.questions,
            captured_at: Some(snapshot.captured_at),
            limit: Some(snapshot.limit),
        }
    }

    /// Read-only introspection. Does not purge an expired snapshot, so
    /// status displays can show "expired" before the next `read()`.
    pub fn status(&self) -> CacheStatus {
        match self.load() {
            Some((snapshot, _)) => CacheStatus {
                has_cache: true,
                count: snapshot.questions.len(),
                limit: self.get_limit(),
                is_expired: snapshot.is_expired(Utc::now()),
                captured_at: Some(snapshot.captured_at),
                origin: Some(snapshot.origin),
            },
            None => CacheStatus {
                has_cache: false,
                count: 0,
                limit: self.get_limit(),
                is_expired: false,
                captured_at: None,
                origin: None,
            },
        }
    }

    /// Unconditionally delete the snapshot from both locations
    pub fn clear(&self) {
        for path in [self.primary_path(), self.fallback_path()] {
            if path.exists() {
                if let Err(e) = fs::remove_file(&path) {
                    log::warn!("Cache: failed to remove {:?}: {}", path, e);
                }
            }
        }
        self.bus.publish(AppEvent::CacheCleared);
    }

    /// Remove a single question from the snapshot in place, used when a
    /// question is deleted while a snapshot exists.
    pub fn remove_question(&self, id: &str) {
        let Some((mut snapshot, path)) = self.load() else {
            return;
        };
        let before = snapshot.questions.len();
        snapshot.questions.retain(|q| q.id != id);
        if snapshot.questions.len() == before {
            return;
        }
        let dir = path.parent().map(PathBuf::from).unwrap_or_else(|| self.primary_dir.clone());
        if let Err(e) = self.persist(&dir, &snapshot) {
            log::warn!("Cache: failed to rewrite snapshot after delete of {}: {}", id, e);
        }
    }

    /// Load the newest parsable snapshot. Both locations are checked
    /// and the one with the later capture time wins, so a fallback
    /// write landed after the primary became unwritable is not shadowed
    /// by a stale primary snapshot. Version-tag mismatches are treated
    /// as absent.
    fn load(&self) -> Option<(CacheSnapshot, PathBuf)> {
        let mut newest: Option<(CacheSnapshot, PathBuf)> = None;
        for path in [self.primary_path(), self.fallback_path()] {
            if !path.exists() {
                continue;
            }
            let content = match fs::read_to_string(&path) {
                Ok(c) => c,
                Err(e) => {
                    log::warn!("Cache: failed to read {:?}: {}", path, e);
                    continue;
                }
            };
            match serde_json::from_str::<CacheSnapshot>(&content) {
                Ok(snapshot) if snapshot.version == CACHE_SCHEMA_VERSION => {
                    let newer = newest
                        .as_ref()
                        .map_or(true, |(best, _)| snapshot.captured_at > best.captured_at);
                    if newer {
                        newest = Some((snapshot, path));
                    }
                }
                Ok(snapshot) => {
                    log::warn!(
                        "Cache: snapshot at {:?} has schema version {}, expected {} — ignoring",
                        path,
                        snapshot.version,
                        CACHE_SCHEMA_VERSION
                    );
                }
                Err(e) => {
                    log::warn!("Cache: snapshot at {:?} is unparsable: {}", path, e);
                }
            }
        }
        newest
    }
}
