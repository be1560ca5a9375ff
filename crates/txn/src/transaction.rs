//! The transaction coordinator
//!
//! A [`Transaction`] groups reads and writes across rows and tables into one
//! snapshot-isolated unit. Writes are buffered locally; `commit()` drives the
//! two-phase protocol:
//!
//! 1. Freeze the buffer into a commit plan (primary selection).
//! 2. Prewrite the primary row, then each secondary row, resolving at most
//!    one conflicting lock per row through the cleaner. A failed secondary
//!    prewrite rolls back the primary and the already-prewritten secondaries
//!    in reverse order.
//! 3. Fetch the commit timestamp, strictly after the last prewrite returned.
//!    Fetching it earlier could order a commit before a conflicting lock it
//!    should have observed.
//! 4. Commit the primary row. This one row-atomic store operation is the
//!    transaction's linearization point.
//! 5. Commit the secondary rows best-effort; leftovers are rolled forward by
//!    whichever reader next trips over them.
//!
//! Reads never touch the buffer; `get` reflects the committed snapshot at
//! `start_ts` only, resolving blocking locks through the cleaner and
//! retrying once with locks ignored. Any lock written between the two reads
//! belongs to a transaction whose commit timestamp exceeds this snapshot, so
//! its data is invisible here anyway.
//!
//! Each transaction is single-threaded and single-use; the collaborators it
//! holds are shared across transactions and outlive it.

use crate::buffer::{MutationBuffer, RowMutation};
use crate::config::ClientConfig;
use crate::plan::{CommitPlan, CommitPlanner};
use crate::scanner::TxnScanner;
use siphon_core::error::{Error, Result};
use siphon_core::lock::ConflictLock;
use siphon_core::request::{self, Delete, Get, Put, ReadResult, Scan};
use siphon_core::traits::{LockCleaner, StatsSink, TimestampOracle, TxnStore, WallClock};
use siphon_core::types::{Column, ColumnCoordinate, TableName};
use std::sync::Arc;

/// Lifecycle state of a transaction.
///
/// State transitions:
/// - `Active` → `Committed` (primary commit succeeded, or nothing to commit)
/// - `Active` → `Aborted` (prewrite failed, peer cleaned our primary lock,
///   or a collaborator failed before the primary commit)
/// - `Active` → `Indeterminate` (transport failure during primary commit:
///   the commit may or may not have landed; nothing was rolled back)
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TxnStatus {
    /// Accepting reads and buffered writes.
    Active,
    /// Durably committed; the primary commit record exists.
    Committed,
    /// Terminally failed; staged state was rolled back where the protocol
    /// allows it.
    Aborted,
    /// Primary commit outcome unknown. The transaction must not be retried
    /// blindly; resolution is left to lock cleaners.
    Indeterminate,
}

pub(crate) struct Collaborators {
    pub(crate) store: Arc<dyn TxnStore>,
    pub(crate) oracle: Arc<dyn TimestampOracle>,
    pub(crate) clock: Arc<dyn WallClock>,
    pub(crate) cleaner: Arc<dyn LockCleaner>,
    pub(crate) planner: Arc<dyn CommitPlanner>,
    pub(crate) stats: Arc<dyn StatsSink>,
    pub(crate) config: ClientConfig,
}

/// A single snapshot-isolated transaction.
pub struct Transaction {
    shared: Arc<Collaborators>,
    client_address: Vec<u8>,
    start_ts: u64,
    commit_ts: Option<u64>,
    wall_time: u64,
    buffer: MutationBuffer,
    preferred_primary: Option<ColumnCoordinate>,
    plan: Option<CommitPlan>,
    status: TxnStatus,
}

impl Transaction {
    pub(crate) fn new(
        shared: Arc<Collaborators>,
        client_address: Vec<u8>,
        start_ts: u64,
    ) -> Self {
        Transaction {
            shared,
            client_address,
            start_ts,
            commit_ts: None,
            wall_time: 0,
            buffer: MutationBuffer::new(),
            preferred_primary: None,
            plan: None,
            status: TxnStatus::Active,
        }
    }

    /// Snapshot timestamp of this transaction.
    pub fn start_ts(&self) -> u64 {
        self.start_ts
    }

    /// Commit timestamp, once acquired.
    pub fn commit_ts(&self) -> Option<u64> {
        self.commit_ts
    }

    /// Current lifecycle state.
    pub fn status(&self) -> TxnStatus {
        self.status
    }

    /// Number of buffered (table, row, column) mutations.
    pub fn pending_mutations(&self) -> usize {
        self.buffer.size()
    }

    /// Pin the primary column before commit.
    ///
    /// Selection honors the pin only if the column carries a buffered
    /// mutation when `commit()` runs; otherwise commit fails with
    /// [`Error::InvalidState`].
    pub fn set_primary(&mut self, primary: ColumnCoordinate) {
        self.preferred_primary = Some(primary);
    }

    /// The primary chosen by the last `commit()` attempt, for diagnostics.
    pub fn primary(&self) -> Option<&ColumnCoordinate> {
        self.plan.as_ref().map(|plan| &plan.primary)
    }

    /// Secondary-row count of the last `commit()` attempt, for diagnostics.
    pub fn secondary_row_count(&self) -> Option<usize> {
        self.plan.as_ref().map(|plan| plan.secondary_rows.len())
    }

    // === Reads ===

    /// Snapshot read of one row at `start_ts`.
    ///
    /// The result reflects committed data only, never this transaction's own
    /// buffer. Blocking locks are handed to the cleaner; on success the read
    /// is retried once with locks ignored.
    pub fn get(&self, table: &TableName, get: &Get) -> Result<ReadResult> {
        self.ensure_active()?;
        request::validate_get(get)?;

        let first = self
            .shared
            .store
            .txn_get(table, get, self.start_ts, false)?;
        if !first.is_lock_result() {
            return Ok(first);
        }

        self.shared.cleaner.clean_locks(table, &first.lock_cells())?;
        self.shared.stats.incr_lock_cleans();

        // Any lock written after the first read belongs to a transaction
        // with a later snapshot; its data is invisible here, so locks can be
        // ignored on the retry.
        let second = self.shared.store.txn_get(table, get, self.start_ts, true)?;
        self.shared.stats.incr_read_retries();
        if second.is_lock_result() {
            return Err(Error::Fatal(format!(
                "lock entries survived an ignore-locks read of table {table}"
            )));
        }
        Ok(second)
    }

    /// Open a snapshot scanner over `table`.
    pub fn scanner(&self, table: &TableName, scan: Scan) -> Result<TxnScanner> {
        self.ensure_active()?;
        request::validate_scan(&scan)?;
        let scan = if scan.caching() == 0 {
            scan.with_caching(self.shared.config.scan_batch_size)
        } else {
            scan
        };
        let stream = self.shared.store.txn_scan(table, &scan, self.start_ts)?;
        Ok(TxnScanner::new(
            table.clone(),
            scan.columns().to_vec(),
            self.start_ts,
            stream,
            Arc::clone(&self.shared.store),
            Arc::clone(&self.shared.cleaner),
            Arc::clone(&self.shared.stats),
        ))
    }

    // === Mutation ingestion ===

    /// Buffer the writes of `put`.
    pub fn put(&mut self, table: &TableName, put: Put) -> Result<()> {
        self.ensure_active()?;
        request::validate_put(&put)?;
        for cell in put.cells() {
            self.buffer.add(table, cell.clone());
        }
        Ok(())
    }

    /// Buffer the deletions of `delete`.
    pub fn delete(&mut self, table: &TableName, delete: Delete) -> Result<()> {
        self.ensure_active()?;
        request::validate_delete(&delete)?;
        for cell in delete.cells() {
            self.buffer.add(table, cell.clone());
        }
        Ok(())
    }

    // === Commit ===

    /// Commit all buffered mutations atomically.
    ///
    /// On success every mutation is visible to snapshots at or after the
    /// commit timestamp. On [`Error::LockConflict`] the transaction was
    /// rolled back and may be retried from scratch. An [`Error::Io`] from
    /// the primary commit is ambiguous: the transaction may have committed,
    /// and nothing is rolled back.
    pub fn commit(&mut self) -> Result<()> {
        self.ensure_active()?;
        if self.buffer.is_empty() {
            self.status = TxnStatus::Committed;
            return Ok(());
        }

        self.wall_time = self.shared.clock.now_millis();
        let plan = self.shared.planner.plan(
            &self.buffer,
            self.preferred_primary.as_ref(),
            self.start_ts,
            self.wall_time,
            &self.client_address,
        )?;

        let outcome = self.drive_commit(&plan);
        self.plan = Some(plan);
        match outcome {
            Ok(()) => self.status = TxnStatus::Committed,
            Err(_) if self.status == TxnStatus::Active => self.status = TxnStatus::Aborted,
            Err(_) => {}
        }
        outcome
    }

    fn drive_commit(&mut self, plan: &CommitPlan) -> Result<()> {
        // Phase one: primary row first. Its lock is the ground truth other
        // transactions recover from, so it must exist before any secondary
        // lock that references it.
        self.prewrite_row_with_lock_clean(&plan.primary_table, &plan.primary_row, true, plan)?;

        for (index, (table, row)) in plan.secondary_rows.iter().enumerate() {
            if let Err(err) = self.prewrite_row_with_lock_clean(table, row, false, plan) {
                self.rollback_after_prewrite_failure(plan, index);
                return Err(err);
            }
        }

        // The commit timestamp is fetched only after every prewrite
        // succeeded.
        let commit_ts = self.shared.oracle.commit_ts()?;
        self.commit_ts = Some(commit_ts);

        self.commit_primary(plan, commit_ts)?;
        self.commit_secondaries(plan, commit_ts);
        Ok(())
    }

    /// Prewrite one row, resolving at most one conflicting lock.
    fn prewrite_row_with_lock_clean(
        &self,
        table: &TableName,
        row: &RowMutation,
        is_primary_row: bool,
        plan: &CommitPlan,
    ) -> Result<()> {
        let Some(conflict) = self.prewrite_once(table, row, is_primary_row, plan)? else {
            return Ok(());
        };

        // The only legitimate conflict surface is a data column.
        if !conflict.coordinate.column().is_data() {
            return Err(Error::Fatal(format!(
                "prewrite conflict reported on non-data column {}",
                conflict.coordinate
            )));
        }

        tracing::debug!(conflict = %conflict, start_ts = self.start_ts, "prewrite conflict, cleaning lock");
        self.shared.cleaner.clean_lock(&conflict)?;
        self.shared.stats.incr_lock_cleans();

        match self.prewrite_once(table, row, is_primary_row, plan)? {
            None => Ok(()),
            Some(conflict) => Err(Error::LockConflict {
                conflict: Box::new(conflict),
            }),
        }
    }

    fn prewrite_once(
        &self,
        table: &TableName,
        row: &RowMutation,
        is_primary_row: bool,
        plan: &CommitPlan,
    ) -> Result<Option<ConflictLock>> {
        if is_primary_row {
            let primary_lock = plan.encode_primary_lock();
            self.shared.store.prewrite_row(
                table,
                row.row(),
                row.cells(),
                self.start_ts,
                &primary_lock,
                plan.secondary_lock_bytes.as_deref(),
                plan.primary_index_in_row,
            )
        } else {
            let secondary_lock = plan.secondary_lock_bytes.as_deref().ok_or_else(|| {
                Error::InvalidState(
                    "secondary row prewrite without a secondary lock payload".to_string(),
                )
            })?;
            self.shared.store.prewrite_secondary_row(
                table,
                row.row(),
                row.cells(),
                self.start_ts,
                secondary_lock,
            )
        }
    }

    fn commit_primary(&mut self, plan: &CommitPlan, commit_ts: u64) -> Result<()> {
        let stripped = plan.primary_row.without_values();
        let result = self.shared.store.commit_row(
            &plan.primary_table,
            plan.primary_row.row(),
            stripped.cells(),
            self.start_ts,
            commit_ts,
            plan.primary_index_in_row,
        );
        match result {
            Ok(()) => Ok(()),
            Err(Error::LockCleaned { .. }) => {
                // A peer cleaner erased our primary lock: it has committed to
                // rolling this transaction back, and cannot have rolled it
                // forward, because forward-rolling requires the primary to be
                // committed first.
                self.rollback_everything(plan);
                Err(Error::LockCleaned {
                    start_ts: self.start_ts,
                })
            }
            Err(err) => {
                // Ambiguous outcome: the commit record may exist. Rolling
                // back here could erase a committed transaction, so leave
                // resolution to whichever cleaner meets the primary next.
                self.status = TxnStatus::Indeterminate;
                Err(err)
            }
        }
    }

    fn commit_secondaries(&self, plan: &CommitPlan, commit_ts: u64) {
        for (table, row) in &plan.secondary_rows {
            let stripped = row.without_values();
            if let Err(err) = self.shared.store.commit_secondary_row(
                table,
                row.row(),
                stripped.cells(),
                self.start_ts,
                commit_ts,
            ) {
                // Once the primary is committed the transaction is durable;
                // a reader meeting this leftover lock will roll it forward.
                tracing::warn!(
                    table = %table,
                    start_ts = self.start_ts,
                    commit_ts,
                    error = %err,
                    "secondary commit failed, leaving roll-forward to lock cleaners"
                );
            }
        }
    }

    // === Rollback ===

    /// The secondary prewrite at `failed_index` did not go through: erase
    /// the primary row and the secondaries that did, newest first.
    fn rollback_after_prewrite_failure(&self, plan: &CommitPlan, failed_index: usize) {
        self.rollback_row(&plan.primary_table, &plan.primary_row);
        for (table, row) in plan.secondary_rows[..failed_index].iter().rev() {
            self.rollback_row(table, row);
        }
    }

    fn rollback_everything(&self, plan: &CommitPlan) {
        self.rollback_row(&plan.primary_table, &plan.primary_row);
        for (table, row) in plan.secondary_rows.iter().rev() {
            self.rollback_row(table, row);
        }
    }

    /// Erase the staged locks and data of one row. Failures are logged, not
    /// propagated: erase is idempotent and any cleaner can finish the job.
    fn rollback_row(&self, table: &TableName, row: &RowMutation) {
        let columns: Vec<Column> = row.columns().cloned().collect();
        if let Err(err) =
            self.shared
                .cleaner
                .erase_lock_and_data(table, row.row(), &columns, self.start_ts)
        {
            tracing::error!(
                table = %table,
                start_ts = self.start_ts,
                error = %err,
                "rollback erase failed, leaving cleanup to lock cleaners"
            );
        }
        self.shared.stats.incr_rollback_rows();
    }

    fn ensure_active(&self) -> Result<()> {
        if self.status == TxnStatus::Active {
            Ok(())
        } else {
            Err(Error::InvalidState(format!(
                "transaction at start_ts {} is {:?}",
                self.start_ts, self.status
            )))
        }
    }
}
