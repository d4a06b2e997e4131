//! Question bank review and offline cache core
//!
//! The pieces fit together around one data facade: a [`NetworkMonitor`]
//! decides whether reads go to the remote store or the on-disk
//! [`CacheStore`] snapshot, a pure review scheduler ranks questions by
//! how overdue they are, and an optimistic [`FieldUpdater`] applies
//! single-field edits locally before the remote write resolves, with
//! category counts batched behind a debounce. [`App`] wires the whole
//! thing up.

use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use chrono::Utc;
use thiserror::Error;

pub mod cache;
pub mod data;
pub mod events;
pub mod network;
pub mod optimistic;
pub mod questions;
pub mod remote;
pub mod review;
pub mod settings;

use cache::{CacheError, CacheStore};
use data::{DataFacade, LocalQuestions, SharedSession};
use events::EventBus;
use network::NetworkMonitor;
use optimistic::{start_count_batcher, CountBatcher, FieldUpdater};
use questions::Question;
use remote::{RemoteStore, Session};
use review::ReviewStats;
use settings::{AppSettings, SettingsError};

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Settings(#[from] SettingsError),
}

/// Fully wired application services sharing one event bus and session
pub struct App {
    pub bus: Arc<EventBus>,
    pub monitor: Arc<NetworkMonitor>,
    pub cache: Arc<CacheStore>,
    pub local: Arc<LocalQuestions>,
    pub counts: Arc<CountBatcher>,
    pub data: Arc<DataFacade>,
    pub updater: Arc<FieldUpdater>,
    session: SharedSession,
    settings: std::sync::Mutex<AppSettings>,
    settings_path: PathBuf,
}

impl App {
    /// Build the service graph around a remote store, storing the cache
    /// and settings under the platform data directories. The host
    /// supplies the connectivity state observed at startup; later
    /// transitions go through `monitor.set_online`.
    pub fn new(remote: Arc<dyn RemoteStore>, initially_online: bool) -> Result<Self, AppError> {
        let (primary_dir, fallback_dir) = CacheStore::default_dirs()?;
        let settings_path = primary_dir
            .parent()
            .map(|p| p.join("settings.json"))
            .unwrap_or_else(|| PathBuf::from("settings.json"));
        Self::with_paths(remote, initially_online, primary_dir, fallback_dir, settings_path)
    }

    /// Same as [`App::new`] with explicit storage locations
    pub fn with_paths(
        remote: Arc<dyn RemoteStore>,
        initially_online: bool,
        primary_dir: PathBuf,
        fallback_dir: PathBuf,
        settings_path: PathBuf,
    ) -> Result<Self, AppError> {
        let settings = AppSettings::load(&settings_path)?;

        let bus = Arc::new(EventBus::new());
        let cache = Arc::new(CacheStore::new(
            primary_dir,
            fallback_dir,
            Arc::clone(&bus),
        ));
        cache.set_limit(settings.cache_limit)?;

        let monitor = Arc::new(NetworkMonitor::new(initially_online, Arc::clone(&bus)));
        let local = Arc::new(LocalQuestions::new());
        let session: SharedSession = Arc::new(RwLock::new(None));
        let counts = Arc::new(start_count_batcher(
            Arc::clone(&remote),
            Arc::clone(&session),
        ));

        let data = Arc::new(DataFacade::new(
            Arc::clone(&remote),
            Arc::clone(&cache),
            Arc::clone(&local),
            Arc::clone(&monitor),
            Arc::clone(&counts),
            Arc::clone(&bus),
            Arc::clone(&session),
        ));
        let updater = Arc::new(FieldUpdater::new(
            remote,
            Arc::clone(&local),
            Arc::clone(&cache),
            Arc::clone(&monitor),
            Arc::clone(&counts),
            Arc::clone(&session),
        ));

        log::info!(
            "App initialized: cache limit {}, review threshold {} days",
            settings.cache_limit,
            settings.review_threshold_days
        );

        Ok(Self {
            bus,
            monitor,
            cache,
            local,
            counts,
            data,
            updater,
            session,
            settings: std::sync::Mutex::new(settings),
            settings_path,
        })
    }

    // ---- session ----

    pub fn login(&self, session: Session) {
        log::info!("Session established for user {}", session.user_id);
        *self.session.write().unwrap() = Some(session);
    }

    /// Drop the session and clear all user-scoped state, including the
    /// on-disk cache snapshot.
    pub async fn logout(&self) {
        self.counts.flush_now().await;
        *self.session.write().unwrap() = None;
        self.local.replace_all(Vec::new());
        self.cache.clear();
        log::info!("Session ended, local state and cache cleared");
    }

    pub fn current_session(&self) -> Option<Session> {
        self.session.read().unwrap().clone()
    }

    // ---- settings ----

    pub fn settings(&self) -> AppSettings {
        self.settings.lock().unwrap().clone()
    }

    /// Change the review inclusion threshold and persist it
    pub fn set_review_threshold(&self, days: u32) -> Result<(), SettingsError> {
        let mut settings = self.settings.lock().unwrap();
        settings.set_review_threshold(days)?;
        settings.save(&self.settings_path)
    }

    /// Change the cache item limit and persist it. Takes effect on the
    /// next snapshot write; the current snapshot is not re-truncated.
    pub fn set_cache_limit(&self, limit: usize) -> Result<(), SettingsError> {
        let mut settings = self.settings.lock().unwrap();
        settings.set_cache_limit(limit)?;
        self.cache
            .set_limit(limit)
            .map_err(|_| SettingsError::InvalidCacheLimit(limit))?;
        settings.save(&self.settings_path)
    }

    // ---- review conveniences ----

    /// Questions due for review under the configured threshold, most
    /// overdue first
    pub fn due_questions(&self) -> Vec<Question> {
        let threshold = self.settings.lock().unwrap().review_threshold_days;
        review::compute_due_set(&self.local.snapshot(), threshold, Utc::now())
    }

    pub fn review_stats(&self) -> ReviewStats {
        let threshold = self.settings.lock().unwrap().review_threshold_days;
        review::review_stats(&self.local.snapshot(), threshold, Utc::now())
    }

    // ---- lifecycle ----

    /// Flush outstanding count deltas and stop the batcher. Call before
    /// process exit; pending deltas are lost otherwise.
    pub async fn shutdown(&self) {
        self.counts.flush_now().await;
        self.counts.shutdown();
        log::info!("App shut down");
    }
}
