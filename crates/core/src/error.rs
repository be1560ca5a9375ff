//! Error types for the transaction client
//!
//! One unified error enum covers the whole client surface. We use `thiserror`
//! for `Display` and `Error` trait implementations.
//!
//! The variants map to distinct failure classes:
//!
//! - `InvalidRequest` — a user-supplied get/put/delete/scan is malformed.
//! - `InvalidState` — the coordinator cannot proceed (no selectable primary,
//!   operation on a finished transaction).
//! - `LockConflict` — a conflicting lock survived one cleaning attempt.
//!   Retryable at the transaction level.
//! - `LockCleaned` — a peer cleaner erased this transaction's primary lock;
//!   the transaction has been rolled back behind its back. Terminal.
//! - `Fatal` — a collaborator violated the protocol. Non-recoverable.
//! - `Io` — transport-level failure. For a primary commit this is ambiguous:
//!   the commit may have landed, so callers must not assume the transaction
//!   aborted.

use crate::lock::ConflictLock;
use std::io;
use thiserror::Error;

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the transaction client.
#[derive(Debug, Error)]
pub enum Error {
    /// User-supplied request lacks required parts.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The coordinator is in no state to perform the operation.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// A conflicting lock could not be resolved after one cleaning attempt.
    #[error("lock conflict: {conflict}")]
    LockConflict {
        /// The lock that blocked the operation.
        conflict: Box<ConflictLock>,
    },

    /// This transaction's primary lock was erased by a peer cleaner.
    #[error("primary lock cleaned for transaction started at {start_ts}")]
    LockCleaned {
        /// Start timestamp of the rolled-back transaction.
        start_ts: u64,
    },

    /// A collaborator broke the protocol contract.
    #[error("protocol violation: {0}")]
    Fatal(String),

    /// Transport-level failure.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    /// Whether this error is a lock conflict.
    pub fn is_lock_conflict(&self) -> bool {
        matches!(self, Error::LockConflict { .. })
    }

    /// Whether retrying the whole transaction may succeed.
    ///
    /// Only lock conflicts are retryable; everything else is either a caller
    /// bug, a terminal outcome, or an ambiguous transport failure.
    pub fn is_retryable(&self) -> bool {
        self.is_lock_conflict()
    }

    /// Whether this error means the transaction was rolled back by a peer.
    pub fn is_lock_cleaned(&self) -> bool {
        matches!(self, Error::LockCleaned { .. })
    }
}
