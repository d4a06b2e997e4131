//! Debounced batching of category-count adjustments
//!
//! Category membership changes arrive per slider tick or keystroke;
//! issuing a remote write for each would hammer the store. Pending
//! `(category_id, delta)` pairs accumulate in a coalescing map — deltas
//! sum, never overwrite — and a debounce window that restarts on every
//! enqueue flushes them as one atomic increment per category with a
//! non-zero net delta. Flush failures are logged only: the denormalized
//! count is a best-effort display value, not correctness-critical.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;

use crate::data::SharedSession;
use crate::remote::RemoteStore;

/// Debounce window before accumulated deltas are flushed
pub const COUNT_DEBOUNCE: Duration = Duration::from_millis(1500);

type PendingDeltas = Arc<Mutex<HashMap<String, i64>>>;

#[derive(Debug)]
enum BatcherMessage {
    /// A delta was enqueued; restart the debounce window
    Touched,
    /// Flush immediately and acknowledge
    Flush(oneshot::Sender<()>),
    Shutdown,
}

/// Handle for the running count batcher
pub struct CountBatcher {
    pending: PendingDeltas,
    sender: mpsc::Sender<BatcherMessage>,
}

impl CountBatcher {
    /// Record a count adjustment for a category. Concurrent enqueues
    /// within one window sum into a single net delta.
    pub fn enqueue(&self, category_id: &str, delta: i64) {
        {
            let mut pending = self.pending.lock().unwrap();
            *pending.entry(category_id.to_string()).or_insert(0) += delta;
        }
        let _ = self.sender.try_send(BatcherMessage::Touched);
    }

    /// Flush accumulated deltas now, without waiting out the window.
    /// Used at shutdown so pending adjustments are not lost.
    pub async fn flush_now(&self) {
        let (ack_tx, ack_rx) = oneshot::channel();
        if self.sender.send(BatcherMessage::Flush(ack_tx)).await.is_ok() {
            let _ = ack_rx.await;
        }
    }

    /// Stop the worker. Remaining deltas are flushed first.
    pub fn shutdown(&self) {
        let _ = self.sender.try_send(BatcherMessage::Shutdown);
    }

    /// Number of categories with a pending non-zero net delta
    pub fn pending_categories(&self) -> usize {
        self.pending
            .lock()
            .unwrap()
            .values()
            .filter(|delta| **delta != 0)
            .count()
    }
}

/// Start the count batcher worker
pub fn start_count_batcher(
    remote: Arc<dyn RemoteStore>,
    session: SharedSession,
) -> CountBatcher {
    let (tx, rx) = mpsc::channel(64);
    let pending: PendingDeltas = Arc::new(Mutex::new(HashMap::new()));

    tokio::spawn(batcher_loop(remote, session, Arc::clone(&pending), rx));

    CountBatcher {
        pending,
        sender: tx,
    }
}

async fn batcher_loop(
    remote: Arc<dyn RemoteStore>,
    session: SharedSession,
    pending: PendingDeltas,
    mut receiver: mpsc::Receiver<BatcherMessage>,
) {
    log::debug!("Count batcher started");
    let mut deadline: Option<Instant> = None;

    loop {
        let message = match deadline {
            Some(at) => {
                tokio::select! {
                    _ = tokio::time::sleep_until(at) => {
                        flush(&remote, &session, &pending).await;
                        deadline = None;
                        continue;
                    }
                    msg = receiver.recv() => msg,
                }
            }
            None => receiver.recv().await,
        };

        match message {
            Some(BatcherMessage::Touched) => {
                deadline = Some(Instant::now() + COUNT_DEBOUNCE);
            }
            Some(BatcherMessage::Flush(ack)) => {
                flush(&remote, &session, &pending).await;
                deadline = None;
                let _ = ack.send(());
            }
            Some(BatcherMessage::Shutdown) | None => {
                flush(&remote, &session, &pending).await;
                log::debug!("Count batcher stopped");
                break;
            }
        }
    }
}

/// Drain the pending map and apply one increment per category with a
/// non-zero net delta. Failures are logged, never surfaced.
async fn flush(remote: &Arc<dyn RemoteStore>, session: &SharedSession, pending: &PendingDeltas) {
    let drained: Vec<(String, i64)> = {
        let mut map = pending.lock().unwrap();
        map.drain().collect()
    };
    let deltas: Vec<(String, i64)> = drained
        .into_iter()
        .filter(|(_, delta)| *delta != 0)
        .collect();
    if deltas.is_empty() {
        return;
    }

    let Some(session) = session.read().unwrap().clone() else {
        log::warn!(
            "Count batcher: no session at flush time, dropping {} delta(s)",
            deltas.len()
        );
        return;
    };

    for (category_id, delta) in deltas {
        if let Err(e) = remote
            .increment_question_count(&session, &category_id, delta)
            .await
        {
            log::warn!(
                "Count batcher: increment for category {} by {} failed: {}",
                category_id,
                delta,
                e
            );
        }
    }
}
