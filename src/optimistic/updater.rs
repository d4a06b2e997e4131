//! Optimistic single-field updates with rollback
//!
//! A field update applies to local state synchronously, then issues the
//! remote write. Success adopts the server's canonical record; failure
//! restores the captured previous value and surfaces the error, with no
//! automatic retry. Each in-flight update moves through an explicit
//! pristine → pending → settled lifecycle.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::cache::CacheStore;
use crate::data::{DataError, LocalQuestions, Result, SharedSession};
use crate::network::NetworkMonitor;
use crate::questions::{FieldPatch, Question};
use crate::remote::RemoteStore;

use super::counts::CountBatcher;

/// Lifecycle of one in-flight field update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdatePhase {
    /// Created, local state untouched
    Pristine,
    /// Optimistic value applied locally, remote write outstanding
    Pending,
    /// Remote write resolved (either way); no further transitions
    Settled,
}

/// Bookkeeping for one field update
#[derive(Debug, Clone)]
pub struct UpdateRecord {
    pub id: Uuid,
    pub question_id: String,
    /// The optimistic value being written
    pub optimistic: FieldPatch,
    /// Rollback patch capturing the pre-update value; set on pending
    pub previous: Option<FieldPatch>,
    pub phase: UpdatePhase,
    pub started_at: DateTime<Utc>,
}

impl UpdateRecord {
    pub fn new(question_id: &str, optimistic: FieldPatch) -> Self {
        Self {
            id: Uuid::new_v4(),
            question_id: question_id.to_string(),
            optimistic,
            previous: None,
            phase: UpdatePhase::Pristine,
            started_at: Utc::now(),
        }
    }

    pub fn mark_pending(&mut self, previous: FieldPatch) {
        debug_assert_eq!(self.phase, UpdatePhase::Pristine);
        self.previous = Some(previous);
        self.phase = UpdatePhase::Pending;
    }

    pub fn mark_settled(&mut self) {
        debug_assert_eq!(self.phase, UpdatePhase::Pending);
        self.phase = UpdatePhase::Settled;
    }
}

pub struct FieldUpdater {
    remote: Arc<dyn RemoteStore>,
    local: Arc<LocalQuestions>,
    cache: Arc<CacheStore>,
    monitor: Arc<NetworkMonitor>,
    counts: Arc<CountBatcher>,
    session: SharedSession,
    in_flight: Mutex<HashMap<Uuid, UpdateRecord>>,
}

impl FieldUpdater {
    pub fn new(
        remote: Arc<dyn RemoteStore>,
        local: Arc<LocalQuestions>,
        cache: Arc<CacheStore>,
        monitor: Arc<NetworkMonitor>,
        counts: Arc<CountBatcher>,
        session: SharedSession,
    ) -> Self {
        Self {
            remote,
            local,
            cache,
            monitor,
            counts,
            session,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// Number of updates currently awaiting remote resolution
    pub fn pending_updates(&self) -> usize {
        self.in_flight
            .lock()
            .unwrap()
            .values()
            .filter(|r| r.phase == UpdatePhase::Pending)
            .count()
    }

    /// Apply `patch` to the question: local state first, then the
    /// remote write. Returns the canonical record on success; on
    /// failure the local field is restored and the error returned.
    pub async fn apply_field_update(&self, question_id: &str, patch: FieldPatch) -> Result<Question> {
        patch.validate()?;

        let session = self
            .session
            .read()
            .unwrap()
            .clone()
            .ok_or(DataError::NotAuthenticated)?;

        // Writes are disabled entirely in offline mode: fail before the
        // optimistic mutation, not just before the network attempt
        if self.monitor.should_use_offline_data(&self.cache) {
            return Err(DataError::OfflineUnsupported);
        }

        let mut record = UpdateRecord::new(question_id, patch.clone());

        let previous = self
            .local
            .apply_patch(question_id, &patch)
            .ok_or_else(|| DataError::NotFound(question_id.to_string()))?;
        record.mark_pending(previous.clone());
        self.in_flight
            .lock()
            .unwrap()
            .insert(record.id, record.clone());

        let result = self
            .remote
            .update_question_field(&session, question_id, &patch)
            .await;
        let outcome = match result {
            Ok(canonical) => {
                // Category membership changes adjust the denormalized
                // counts, batched rather than written inline. Enqueued
                // only once the remote write has landed, so a rolled
                // back update never skews the counts.
                if let (FieldPatch::Category(new), FieldPatch::Category(old)) =
                    (&patch, &previous)
                {
                    if new != old {
                        if let Some(old) = old {
                            self.counts.enqueue(old, -1);
                        }
                        if let Some(new) = new {
                            self.counts.enqueue(new, 1);
                        }
                    }
                }
                // A late success against a question deleted mid-flight
                // must not resurrect it
                if !self.local.adopt_if_present(canonical.clone()) {
                    log::debug!(
                        "Field update {} resolved after question {} was deleted locally",
                        record.id,
                        question_id
                    );
                }
                Ok(canonical)
            }
            Err(e) => {
                log::warn!(
                    "Field update for {} ({}) failed, rolling back: {}",
                    question_id,
                    patch.field_name(),
                    e
                );
                // Restore the previous value unless the question is gone
                let _ = self.local.apply_patch(question_id, &previous);
                Err(e.into())
            }
        };

        if let Some(record) = self.in_flight.lock().unwrap().get_mut(&record.id) {
            record.mark_settled();
        }
        self.in_flight.lock().unwrap().remove(&record.id);

        outcome
    }

    /// Slider-driven appearance level change
    pub async fn set_appearance_level(&self, question_id: &str, level: u8) -> Result<Question> {
        self.apply_field_update(question_id, FieldPatch::AppearanceLevel(level))
            .await
    }

    /// Review-confirmation action: stamp the question as reviewed now
    pub async fn mark_reviewed(&self, question_id: &str) -> Result<Question> {
        self.apply_field_update(question_id, FieldPatch::LastReviewedAt(Some(Utc::now())))
            .await
    }
}
