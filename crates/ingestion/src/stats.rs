//! Listener counters

use std::sync::atomic::{AtomicU64, Ordering};

/// Listener metrics, shared between the read loop and observers
#[derive(Debug, Default)]
pub struct ListenerMetrics {
    /// Frames persisted by the store
    pub frames_stored: AtomicU64,

    /// Bytes read from the transport
    pub bytes_read: AtomicU64,

    /// Invalid UTF-8 bytes plus unterminated tails dropped
    pub bytes_discarded: AtomicU64,
}

impl ListenerMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_read(&self, n: usize) {
        self.bytes_read.fetch_add(n as u64, Ordering::Relaxed);
    }

    pub fn record_stored(&self) {
        self.frames_stored.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("astm_bridge_frames_stored_total").increment(1);
    }

    pub fn record_discarded(&self, n: usize) {
        if n > 0 {
            self.bytes_discarded.fetch_add(n as u64, Ordering::Relaxed);
        }
    }

    /// Get snapshot
    pub fn snapshot(&self) -> ListenerStats {
        ListenerStats {
            frames_stored: self.frames_stored.load(Ordering::Relaxed),
            bytes_read: self.bytes_read.load(Ordering::Relaxed),
            bytes_discarded: self.bytes_discarded.load(Ordering::Relaxed),
        }
    }
}

/// Listener statistics snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListenerStats {
    pub frames_stored: u64,
    pub bytes_read: u64,
    pub bytes_discarded: u64,
}
