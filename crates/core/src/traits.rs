//! Collaborator traits consumed by the transaction coordinator
//!
//! The coordinator drives five external collaborators: the backing store's
//! transaction-aware coprocessor endpoints, a global timestamp oracle, a wall
//! clock, a worker registry, and a lock cleaner. All of them outlive any
//! single transaction and are shared across transactions, so every trait
//! requires `Send + Sync` and is object-safe.
//!
//! The store-side contract is row-atomic: each prewrite, commit, and erase
//! call either fully applies to its row or not at all. Cross-row atomicity is
//! the coordinator's job, built from these row-atomic pieces.

use crate::error::Result;
use crate::lock::ConflictLock;
use crate::request::{Get, ReadResult, Scan};
use crate::types::{Cell, Column, TableName};

/// Transaction-aware endpoints of the backing store.
pub trait TxnStore: Send + Sync {
    /// Snapshot read of one row at `start_ts`.
    ///
    /// With `ignore_locks = false`, blocking lock entries surface in the
    /// result (see [`ReadResult::is_lock_result`]). With `ignore_locks =
    /// true`, the store resolves the read from committed versions only.
    fn txn_get(
        &self,
        table: &TableName,
        get: &Get,
        start_ts: u64,
        ignore_locks: bool,
    ) -> Result<ReadResult>;

    /// Open a snapshot scan at `start_ts`.
    ///
    /// Rows carrying blocking locks surface as lock-marked results, exactly
    /// as with [`TxnStore::txn_get`].
    fn txn_scan(
        &self,
        table: &TableName,
        scan: &Scan,
        start_ts: u64,
    ) -> Result<Box<dyn RowStream>>;

    /// Row-atomic prewrite of the primary row.
    ///
    /// Stages data at `start_ts` and lock entries for every cell, succeeding
    /// iff no conflicting lock and no commit record at or after `start_ts`
    /// exists for any of the columns. The column at `primary_index` receives
    /// `primary_lock`; the others receive `secondary_lock` completed with
    /// their own kind byte. Returns the blocking lock on conflict.
    #[allow(clippy::too_many_arguments)]
    fn prewrite_row(
        &self,
        table: &TableName,
        row: &[u8],
        mutations: &[Cell],
        start_ts: u64,
        primary_lock: &[u8],
        secondary_lock: Option<&[u8]>,
        primary_index: usize,
    ) -> Result<Option<ConflictLock>>;

    /// Row-atomic prewrite of a secondary row.
    ///
    /// Every cell receives `secondary_lock` completed with its own kind byte.
    fn prewrite_secondary_row(
        &self,
        table: &TableName,
        row: &[u8],
        mutations: &[Cell],
        start_ts: u64,
        secondary_lock: &[u8],
    ) -> Result<Option<ConflictLock>>;

    /// Row-atomic commit of the primary row.
    ///
    /// Writes a commit record at `commit_ts` pointing back at `start_ts` for
    /// every cell and erases the staged locks. Fails with
    /// [`crate::Error::LockCleaned`] if the primary lock is already gone.
    fn commit_row(
        &self,
        table: &TableName,
        row: &[u8],
        mutations: &[Cell],
        start_ts: u64,
        commit_ts: u64,
        primary_index: usize,
    ) -> Result<()>;

    /// Row-atomic commit of a secondary row.
    fn commit_secondary_row(
        &self,
        table: &TableName,
        row: &[u8],
        mutations: &[Cell],
        start_ts: u64,
        commit_ts: u64,
    ) -> Result<()>;
}

/// A pull-based stream of row results produced by [`TxnStore::txn_scan`].
pub trait RowStream: Send {
    /// Next row, or `None` at end of range.
    fn next_row(&mut self) -> Result<Option<ReadResult>>;
}

/// Resolver for locks left behind by other transactions.
///
/// Given an observed lock, the cleaner consults the referenced primary to
/// decide the owning transaction's fate: roll forward if the primary was
/// committed, roll back otherwise. Erasure of a primary lock is the
/// authoritative roll-back decision for the whole transaction.
pub trait LockCleaner: Send + Sync {
    /// Resolve every lock in `lock_cells`, observed during a read of
    /// `table`. Fails if any lock could not be resolved.
    fn clean_locks(&self, table: &TableName, lock_cells: &[Cell]) -> Result<()>;

    /// Resolve a single lock observed as a prewrite conflict.
    fn clean_lock(&self, conflict: &ConflictLock) -> Result<()>;

    /// Row-atomically erase lock entries and staged data at `start_ts` for
    /// the given columns. Idempotent: erasing an already-erased row is a
    /// no-op.
    fn erase_lock_and_data(
        &self,
        table: &TableName,
        row: &[u8],
        columns: &[Column],
        start_ts: u64,
    ) -> Result<()>;
}

/// Global monotonic timestamp allocator.
///
/// All timestamps across all workers come from one logical sequence; a
/// commit timestamp requested after a start timestamp is strictly greater.
pub trait TimestampOracle: Send + Sync {
    /// Allocate a transaction start timestamp.
    fn start_ts(&self) -> Result<u64>;

    /// Allocate a commit timestamp.
    fn commit_ts(&self) -> Result<u64>;
}

/// Wall clock embedded in locks so remote cleaners can judge whether a
/// lock's owner is plausibly still alive.
pub trait WallClock: Send + Sync {
    /// Current wall time in milliseconds since the epoch.
    fn now_millis(&self) -> u64;
}

/// Registry of live workers.
pub trait WorkerRegistry: Send + Sync {
    /// Announce this worker to the registry.
    fn register_worker(&self) -> Result<()>;

    /// Stable address identifying this worker, embedded in every lock.
    fn client_address(&self) -> Vec<u8>;
}

/// Counter sink for coordinator statistics.
pub trait StatsSink: Send + Sync {
    /// A row was rolled back.
    fn incr_rollback_rows(&self);

    /// A conflicting lock was handed to the cleaner.
    fn incr_lock_cleans(&self);

    /// A read was retried with locks ignored.
    fn incr_read_retries(&self);
}
