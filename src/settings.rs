//! User-adjustable configuration persisted across sessions
//!
//! Two knobs: the review inclusion threshold (1-30 days) and the cache
//! item limit (1-500). Out-of-range values are rejected at the boundary
//! and the prior valid configuration stays in effect.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cache::{DEFAULT_CACHE_LIMIT, MAX_CACHE_LIMIT, MIN_CACHE_LIMIT};

/// Default review inclusion threshold in days
pub const DEFAULT_REVIEW_THRESHOLD_DAYS: u32 = 7;

/// Smallest accepted review threshold
pub const MIN_REVIEW_THRESHOLD_DAYS: u32 = 1;

/// Largest accepted review threshold
pub const MAX_REVIEW_THRESHOLD_DAYS: u32 = 30;

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(
        "Review threshold {0} is out of range \
         {MIN_REVIEW_THRESHOLD_DAYS}-{MAX_REVIEW_THRESHOLD_DAYS} days"
    )]
    InvalidThreshold(u32),

    #[error("Cache limit {0} is out of range {MIN_CACHE_LIMIT}-{MAX_CACHE_LIMIT}")]
    InvalidCacheLimit(usize),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppSettings {
    #[serde(default = "default_threshold")]
    pub review_threshold_days: u32,
    #[serde(default = "default_cache_limit")]
    pub cache_limit: usize,
}

fn default_threshold() -> u32 {
    DEFAULT_REVIEW_THRESHOLD_DAYS
}

fn default_cache_limit() -> usize {
    DEFAULT_CACHE_LIMIT
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            review_threshold_days: DEFAULT_REVIEW_THRESHOLD_DAYS,
            cache_limit: DEFAULT_CACHE_LIMIT,
        }
    }
}

impl AppSettings {
    pub fn set_review_threshold(&mut self, days: u32) -> Result<(), SettingsError> {
        if !(MIN_REVIEW_THRESHOLD_DAYS..=MAX_REVIEW_THRESHOLD_DAYS).contains(&days) {
            return Err(SettingsError::InvalidThreshold(days));
        }
        self.review_threshold_days = days;
        Ok(())
    }

    pub fn set_cache_limit(&mut self, limit: usize) -> Result<(), SettingsError> {
        if !(MIN_CACHE_LIMIT..=MAX_CACHE_LIMIT).contains(&limit) {
            return Err(SettingsError::InvalidCacheLimit(limit));
        }
        self.cache_limit = limit;
        Ok(())
    }

    /// Load settings from file, falling back to defaults when the file
    /// does not exist. Persisted out-of-range values are clamped back to
    /// defaults rather than trusted.
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(path)?;
        let mut settings: Self = serde_json::from_str(&data)?;

        if !(MIN_REVIEW_THRESHOLD_DAYS..=MAX_REVIEW_THRESHOLD_DAYS)
            .contains(&settings.review_threshold_days)
        {
            log::warn!(
                "Settings: persisted threshold {} out of range, using default",
                settings.review_threshold_days
            );
            settings.review_threshold_days = DEFAULT_REVIEW_THRESHOLD_DAYS;
        }
        if !(MIN_CACHE_LIMIT..=MAX_CACHE_LIMIT).contains(&settings.cache_limit) {
            log::warn!(
                "Settings: persisted cache limit {} out of range, using default",
                settings.cache_limit
            );
            settings.cache_limit = DEFAULT_CACHE_LIMIT;
        }

        Ok(settings)
    }

    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}
