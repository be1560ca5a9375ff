//! In-process timestamp oracle
//!
//! A single shared counter hands out both start and commit timestamps, which
//! makes the ordering guarantee structural: a commit timestamp requested
//! after a start timestamp is strictly greater. Suitable for tests and
//! single-process embeddings; a deployment spanning workers needs an oracle
//! service behind the same trait.

use siphon_core::error::Result;
use siphon_core::traits::TimestampOracle;
use std::sync::atomic::{AtomicU64, Ordering};

/// Timestamp oracle backed by a process-local atomic counter.
#[derive(Debug, Default)]
pub struct LocalTimestampOracle {
    next: AtomicU64,
}

impl LocalTimestampOracle {
    /// Create an oracle starting at timestamp 1.
    pub fn new() -> Self {
        LocalTimestampOracle::default()
    }

    /// Create an oracle whose first timestamp follows `last_seen`.
    pub fn starting_after(last_seen: u64) -> Self {
        LocalTimestampOracle {
            next: AtomicU64::new(last_seen),
        }
    }

    /// # Panics
    ///
    /// Panics if the counter reaches `u64::MAX` (overflow).
    fn allocate(&self) -> u64 {
        self.next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |v| v.checked_add(1))
            .expect("timestamp counter overflow: u64::MAX reached")
            + 1
    }
}

impl TimestampOracle for LocalTimestampOracle {
    fn start_ts(&self) -> Result<u64> {
        Ok(self.allocate())
    }

    fn commit_ts(&self) -> Result<u64> {
        Ok(self.allocate())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamps_are_strictly_increasing() {
        let oracle = LocalTimestampOracle::new();
        let a = oracle.start_ts().unwrap();
        let b = oracle.commit_ts().unwrap();
        let c = oracle.start_ts().unwrap();
        assert!(a < b && b < c);
    }

    #[test]
    fn test_starting_after_resumes_past_last_seen() {
        let oracle = LocalTimestampOracle::starting_after(100);
        assert_eq!(oracle.start_ts().unwrap(), 101);
    }

    #[test]
    fn test_concurrent_allocation_yields_unique_timestamps() {
        use std::collections::HashSet;
        use std::sync::Arc;

        let oracle = Arc::new(LocalTimestampOracle::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let oracle = Arc::clone(&oracle);
                std::thread::spawn(move || {
                    (0..200).map(|_| oracle.start_ts().unwrap()).collect::<Vec<_>>()
                })
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for ts in handle.join().unwrap() {
                assert!(seen.insert(ts), "timestamp {ts} allocated twice");
            }
        }
        assert_eq!(seen.len(), 8 * 200);
    }
}
