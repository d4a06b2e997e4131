//! Online/offline mode tracking
//!
//! The host feeds platform connectivity transitions into
//! [`NetworkMonitor::set_online`]; every data-access operation consults
//! [`NetworkMonitor::should_use_offline_data`] as its single decision
//! point. Transitions are not debounced — rapid flapping republishes
//! events just as rapidly.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::cache::CacheStore;
use crate::events::{AppEvent, EventBus};

pub struct NetworkMonitor {
    online: AtomicBool,
    bus: Arc<EventBus>,
}

impl NetworkMonitor {
    /// Create a monitor seeded from the host's connectivity indicator
    pub fn new(initially_online: bool, bus: Arc<EventBus>) -> Self {
        Self {
            online: AtomicBool::new(initially_online),
            bus,
        }
    }

    /// Current mode, no side effects
    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    /// Record a platform connectivity transition and publish the
    /// matching event. Publishing happens even when the flag does not
    /// change, mirroring the platform's own repeated events.
    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
        if online {
            log::info!("Network: online");
            self.bus.publish(AppEvent::Online);
        } else {
            log::info!("Network: offline");
            self.bus.publish(AppEvent::Offline);
        }
    }

    /// True iff offline AND a valid (non-expired, non-empty) snapshot
    /// exists. `CacheStore::read` purges expired snapshots, so a stale
    /// cache yields `false` here.
    pub fn should_use_offline_data(&self, cache: &CacheStore) -> bool {
        if self.is_online() {
            return false;
        }
        !cache.read().is_empty()
    }
}
