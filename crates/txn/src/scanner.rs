//! Snapshot scanner with lock resolution
//!
//! Scans read the same snapshot as point gets and meet the same obstacle:
//! rows whose columns carry uncommitted locks surface as lock-marked
//! results. The scanner resolves each such row through the cleaner and
//! re-reads it with locks ignored, at most once per row.

use siphon_core::error::{Error, Result};
use siphon_core::request::{Get, ReadResult};
use siphon_core::traits::{LockCleaner, RowStream, StatsSink, TxnStore};
use siphon_core::types::{Column, TableName};
use std::sync::Arc;

/// A pull-based scanner over one table at the transaction's snapshot.
pub struct TxnScanner {
    table: TableName,
    columns: Vec<Column>,
    start_ts: u64,
    stream: Box<dyn RowStream>,
    store: Arc<dyn TxnStore>,
    cleaner: Arc<dyn LockCleaner>,
    stats: Arc<dyn StatsSink>,
}

impl std::fmt::Debug for TxnScanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TxnScanner")
            .field("table", &self.table)
            .field("columns", &self.columns)
            .field("start_ts", &self.start_ts)
            .finish_non_exhaustive()
    }
}

impl TxnScanner {
    pub(crate) fn new(
        table: TableName,
        columns: Vec<Column>,
        start_ts: u64,
        stream: Box<dyn RowStream>,
        store: Arc<dyn TxnStore>,
        cleaner: Arc<dyn LockCleaner>,
        stats: Arc<dyn StatsSink>,
    ) -> Self {
        TxnScanner {
            table,
            columns,
            start_ts,
            stream,
            store,
            cleaner,
            stats,
        }
    }

    /// Next row of the scan, or `None` at end of range.
    ///
    /// Rows blocked by locks are resolved through the cleaner and re-read
    /// with locks ignored; a row with no committed data at this snapshot
    /// after cleaning is skipped.
    pub fn next_row(&mut self) -> Result<Option<ReadResult>> {
        loop {
            let Some(result) = self.stream.next_row()? else {
                return Ok(None);
            };
            if !result.is_lock_result() {
                return Ok(Some(result));
            }

            let Some(row) = result.row().map(<[u8]>::to_vec) else {
                return Err(Error::Fatal(
                    "lock-marked scan result carries no cells".to_string(),
                ));
            };
            tracing::debug!(
                table = %self.table,
                start_ts = self.start_ts,
                "scan hit locked row, cleaning"
            );
            self.cleaner.clean_locks(&self.table, &result.lock_cells())?;
            self.stats.incr_lock_cleans();

            let mut get = Get::new(row);
            for column in &self.columns {
                get = get.add(column.clone());
            }
            let reread = self.store.txn_get(&self.table, &get, self.start_ts, true)?;
            self.stats.incr_read_retries();
            if reread.is_lock_result() {
                return Err(Error::Fatal(format!(
                    "lock entries survived an ignore-locks re-read of table {}",
                    self.table
                )));
            }
            if !reread.is_empty() {
                return Ok(Some(reread));
            }
            // The cleaned row has no committed version visible at this
            // snapshot; move on.
        }
    }
}
