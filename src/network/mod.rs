//! Connectivity state tracking

mod monitor;

pub use monitor::NetworkMonitor;
