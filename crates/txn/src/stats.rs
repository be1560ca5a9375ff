//! Coordinator statistics
//!
//! The coordinator reports a handful of counters through the pluggable
//! [`StatsSink`] trait; embedders wire them into whatever metrics pipeline
//! they run. [`AtomicStats`] is the in-process implementation, [`NoopStats`]
//! the default when nobody is looking.

use siphon_core::traits::StatsSink;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counter sink backed by atomics, readable in-process.
#[derive(Debug, Default)]
pub struct AtomicStats {
    rollback_rows: AtomicU64,
    lock_cleans: AtomicU64,
    read_retries: AtomicU64,
}

impl AtomicStats {
    /// Create a zeroed sink.
    pub fn new() -> Self {
        AtomicStats::default()
    }

    /// Number of rows rolled back.
    pub fn rollback_rows(&self) -> u64 {
        self.rollback_rows.load(Ordering::Relaxed)
    }

    /// Number of conflicting locks handed to the cleaner.
    pub fn lock_cleans(&self) -> u64 {
        self.lock_cleans.load(Ordering::Relaxed)
    }

    /// Number of reads retried with locks ignored.
    pub fn read_retries(&self) -> u64 {
        self.read_retries.load(Ordering::Relaxed)
    }
}

impl StatsSink for AtomicStats {
    fn incr_rollback_rows(&self) {
        self.rollback_rows.fetch_add(1, Ordering::Relaxed);
    }

    fn incr_lock_cleans(&self) {
        self.lock_cleans.fetch_add(1, Ordering::Relaxed);
    }

    fn incr_read_retries(&self) {
        self.read_retries.fetch_add(1, Ordering::Relaxed);
    }
}

/// Sink that drops every counter.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopStats;

impl StatsSink for NoopStats {
    fn incr_rollback_rows(&self) {}
    fn incr_lock_cleans(&self) {}
    fn incr_read_retries(&self) {}
}
