//! Traffic statistics for the link
//!
//! Lock-free counters shared by every session of one manager.
//! Updated from the reader thread (rx) and from `write` callers (tx).

use std::sync::atomic::{AtomicU64, Ordering};

/// Byte and session counters
#[derive(Debug, Default)]
pub struct Stats {
    /// Total bytes written to the link
    tx_total: AtomicU64,
    /// Total bytes read from the link
    rx_total: AtomicU64,
    /// Sessions successfully opened
    sessions: AtomicU64,
}

impl Stats {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn add_tx(&self, bytes: usize) {
        self.tx_total.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    #[inline]
    pub fn add_rx(&self, bytes: usize) {
        self.rx_total.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn add_session(&self) {
        self.sessions.fetch_add(1, Ordering::Relaxed);
    }

    /// Total bytes written
    #[inline]
    pub fn tx_bytes(&self) -> u64 {
        self.tx_total.load(Ordering::Relaxed)
    }

    /// Total bytes read
    #[inline]
    pub fn rx_bytes(&self) -> u64 {
        self.rx_total.load(Ordering::Relaxed)
    }

    /// Number of sessions opened by this manager
    #[inline]
    pub fn sessions(&self) -> u64 {
        self.sessions.load(Ordering::Relaxed)
    }
}
