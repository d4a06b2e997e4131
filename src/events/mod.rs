//! Typed publish/subscribe bus for cross-component signaling
//!
//! Replaces ad hoc per-component callbacks with a single broadcast
//! channel: the network monitor and cache store publish, any number of
//! independent listeners subscribe. No ordering is guaranteed between
//! listeners.

use tokio::sync::broadcast;

/// Events published by the review/cache core
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// Connectivity regained
    Online,
    /// Connectivity lost
    Offline,
    /// A new cache snapshot was persisted with `count` questions
    CacheUpdated { count: usize },
    /// The cache snapshot was cleared
    CacheCleared,
    /// A question was deleted and removed from local state
    QuestionDeleted { id: String },
}

/// Broadcast bus for [`AppEvent`]s
pub struct EventBus {
    sender: broadcast::Sender<AppEvent>,
}

const CHANNEL_CAPACITY: usize = 64;

impl EventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<AppEvent> {
        self.sender.subscribe()
    }

    /// Publish an event. Publishing with no subscribers is not an error.
    pub fn publish(&self, event: AppEvent) {
        let _ = self.sender.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
