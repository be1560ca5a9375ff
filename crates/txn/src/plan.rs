//! Commit planning: primary selection and lock construction
//!
//! Before prewrite, the coordinator freezes the buffer into a [`CommitPlan`]:
//! one column becomes the primary, whose lock-to-commit-record transition is
//! the transaction's single atomic commit point; every other column becomes a
//! secondary whose lock points back at the primary. The plan also precomputes
//! the one kind-less secondary lock payload shared by every secondary
//! prewrite of the transaction.
//!
//! Planning is behind the [`CommitPlanner`] trait so tests and embedders can
//! swap the selection policy without touching the protocol driver.

use crate::buffer::{MutationBuffer, RowMutation};
use siphon_core::error::{Error, Result};
use siphon_core::lock::TxnLock;
use siphon_core::types::{CellKind, ColumnCoordinate, TableName};

/// The frozen shape of a transaction at commit time.
#[derive(Clone, Debug)]
pub struct CommitPlan {
    /// The primary column.
    pub primary: ColumnCoordinate,
    /// Kind of the primary column's mutation.
    pub primary_kind: CellKind,
    /// Position of the primary column within its row mutation.
    pub primary_index_in_row: usize,
    /// Table of the primary row.
    pub primary_table: TableName,
    /// The primary row's mutations.
    pub primary_row: RowMutation,
    /// Every non-primary column with its mutation kind, in selection order.
    /// The primary lock enumerates exactly this set, so a cleaner holding
    /// only the primary can find all secondaries.
    pub secondaries: Vec<(ColumnCoordinate, CellKind)>,
    /// Rows containing no primary column, in enumeration order. The primary
    /// row is never listed here.
    pub secondary_rows: Vec<(TableName, RowMutation)>,
    /// Shared kind-less secondary lock payload; `None` for a single-column
    /// transaction, which needs no secondary locks at all.
    pub secondary_lock_bytes: Option<Vec<u8>>,
    /// Start timestamp stamped into the locks.
    pub start_ts: u64,
    /// Wall time stamped into the locks.
    pub wall_time: u64,
    /// Worker address stamped into the locks.
    pub client_address: Vec<u8>,
}

impl CommitPlan {
    /// Whether the transaction writes exactly one column.
    pub fn is_single_column(&self) -> bool {
        self.primary_row.len() <= 1 && self.secondary_rows.is_empty()
    }

    /// Build the primary lock for this plan.
    pub fn primary_lock(&self) -> TxnLock {
        TxnLock::primary(
            self.primary_kind,
            self.start_ts,
            self.wall_time,
            self.client_address.clone(),
            self.secondaries.clone(),
        )
    }

    /// Serialized primary lock, kind byte included.
    pub fn encode_primary_lock(&self) -> Vec<u8> {
        self.primary_lock().encode()
    }
}

/// Policy that freezes a buffer into a [`CommitPlan`].
pub trait CommitPlanner: Send + Sync {
    /// Select the primary, enumerate secondaries, and precompute the shared
    /// secondary lock payload.
    ///
    /// `preferred` pins the primary to a specific column; selection honors it
    /// only if that column is buffered, and fails with
    /// [`Error::InvalidState`] otherwise.
    fn plan(
        &self,
        buffer: &MutationBuffer,
        preferred: Option<&ColumnCoordinate>,
        start_ts: u64,
        wall_time: u64,
        client_address: &[u8],
    ) -> Result<CommitPlan>;
}

/// Default policy: the first enumerated column becomes primary, unless a
/// preferred primary is pinned, in which case only that column qualifies.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultPlanner;

impl CommitPlanner for DefaultPlanner {
    fn plan(
        &self,
        buffer: &MutationBuffer,
        preferred: Option<&ColumnCoordinate>,
        start_ts: u64,
        wall_time: u64,
        client_address: &[u8],
    ) -> Result<CommitPlan> {
        let mut primary: Option<(ColumnCoordinate, CellKind, usize, TableName, RowMutation)> = None;
        let mut secondaries = Vec::new();
        let mut secondary_rows = Vec::new();

        for (table, row_mutation) in buffer.rows() {
            let mut primary_in_this_row = false;
            for (index, cell) in row_mutation.cells().iter().enumerate() {
                let coordinate =
                    ColumnCoordinate::new(table.clone(), cell.row.clone(), cell.column.clone());
                let adoptable =
                    primary.is_none() && preferred.map_or(true, |want| *want == coordinate);
                if adoptable {
                    primary = Some((
                        coordinate,
                        cell.kind,
                        index,
                        table.clone(),
                        row_mutation.clone(),
                    ));
                    primary_in_this_row = true;
                } else {
                    secondaries.push((coordinate, cell.kind));
                }
            }
            if !primary_in_this_row {
                secondary_rows.push((table.clone(), row_mutation.clone()));
            }
        }

        let (primary, primary_kind, primary_index_in_row, primary_table, primary_row) = primary
            .ok_or_else(|| Error::InvalidState("can not find primary column".to_string()))?;

        let mut plan = CommitPlan {
            primary,
            primary_kind,
            primary_index_in_row,
            primary_table,
            primary_row,
            secondaries,
            secondary_rows,
            secondary_lock_bytes: None,
            start_ts,
            wall_time,
            client_address: client_address.to_vec(),
        };

        if !plan.is_single_column() {
            // One payload serves every secondary column; the store prepends
            // the per-column kind byte at prewrite time. The kind stored here
            // never reaches the wire.
            let lock = TxnLock::secondary(
                CellKind::Put,
                start_ts,
                wall_time,
                client_address.to_vec(),
                plan.primary.clone(),
            );
            plan.secondary_lock_bytes = Some(lock.encode_without_kind());
        }

        Ok(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use siphon_core::lock::LockRole;
    use siphon_core::types::{Cell, Column};

    fn table(name: &str) -> TableName {
        TableName::from(name)
    }

    fn buffer_with(cells: &[(&str, &str, &str)]) -> MutationBuffer {
        let mut buffer = MutationBuffer::new();
        for (tbl, row, qualifier) in cells {
            buffer.add(
                &table(tbl),
                Cell::put(row.as_bytes().to_vec(), Column::new("cf", *qualifier), b"v".to_vec()),
            );
        }
        buffer
    }

    fn plan(buffer: &MutationBuffer, preferred: Option<&ColumnCoordinate>) -> Result<CommitPlan> {
        DefaultPlanner.plan(buffer, preferred, 10, 1000, b"addr")
    }

    // === Selection ===

    #[test]
    fn test_single_column_plan() {
        let buffer = buffer_with(&[("t", "r1", "q")]);
        let plan = plan(&buffer, None).unwrap();

        assert_eq!(plan.primary.row(), b"r1");
        assert_eq!(plan.primary_index_in_row, 0);
        assert!(plan.secondaries.is_empty());
        assert!(plan.secondary_rows.is_empty());
        assert!(plan.is_single_column());
        assert!(plan.secondary_lock_bytes.is_none());
    }

    #[test]
    fn test_multi_row_plan_enumerates_secondaries() {
        let buffer = buffer_with(&[("t", "r1", "q1"), ("t", "r1", "q2"), ("t", "r2", "q1")]);
        let plan = plan(&buffer, None).unwrap();

        // First enumerated column becomes primary.
        assert_eq!(plan.primary.row(), b"r1");
        assert_eq!(plan.primary.column().qualifier(), b"q1");
        assert_eq!(plan.secondaries.len(), 2);
        // The primary row is never a secondary row.
        assert_eq!(plan.secondary_rows.len(), 1);
        assert_eq!(plan.secondary_rows[0].1.row(), b"r2");
        assert!(plan.secondary_lock_bytes.is_some());
    }

    #[test]
    fn test_single_row_multi_column_needs_secondary_lock() {
        let buffer = buffer_with(&[("t", "r1", "q1"), ("t", "r1", "q2")]);
        let plan = plan(&buffer, None).unwrap();

        assert!(!plan.is_single_column());
        assert!(plan.secondary_rows.is_empty());
        assert!(plan.secondary_lock_bytes.is_some());
        assert_eq!(plan.secondaries.len(), 1);
    }

    #[test]
    fn test_preferred_primary_is_honored() {
        let buffer = buffer_with(&[("t", "r1", "q1"), ("t", "r2", "q1")]);
        let want = ColumnCoordinate::new(table("t"), b"r2".to_vec(), Column::new("cf", "q1"));
        let plan = plan(&buffer, Some(&want)).unwrap();

        assert_eq!(plan.primary, want);
        // The other row's column is now a secondary, and its row a secondary row.
        assert_eq!(plan.secondary_rows.len(), 1);
        assert_eq!(plan.secondary_rows[0].1.row(), b"r1");
    }

    #[test]
    fn test_preferred_primary_not_buffered_fails() {
        let buffer = buffer_with(&[("t", "r1", "q1")]);
        let want = ColumnCoordinate::new(table("t"), b"zz".to_vec(), Column::new("cf", "q1"));
        let err = plan(&buffer, Some(&want)).unwrap_err();

        assert!(matches!(err, Error::InvalidState(_)));
        assert!(err.to_string().contains("can not find primary column"));
    }

    #[test]
    fn test_empty_buffer_has_no_primary() {
        let buffer = MutationBuffer::new();
        assert!(matches!(
            plan(&buffer, None),
            Err(Error::InvalidState(_))
        ));
    }

    // === Lock construction ===

    #[test]
    fn test_primary_lock_enumerates_exactly_the_secondaries() {
        let buffer = buffer_with(&[("t", "r1", "q1"), ("t", "r1", "q2"), ("t", "r2", "q1")]);
        let plan = plan(&buffer, None).unwrap();
        let lock = plan.primary_lock();

        assert_eq!(lock.start_ts, 10);
        assert_eq!(lock.wall_time, 1000);
        assert_eq!(lock.client_address, b"addr");
        match lock.role {
            LockRole::Primary { secondaries } => {
                assert_eq!(secondaries.len(), buffer.size() - 1);
                assert!(secondaries.iter().all(|(c, _)| *c != plan.primary));
            }
            LockRole::Secondary { .. } => panic!("expected primary lock"),
        }
    }

    #[test]
    fn test_secondary_lock_bytes_reference_the_primary() {
        let buffer = buffer_with(&[("t", "r1", "q1"), ("t", "r2", "q1")]);
        let plan = plan(&buffer, None).unwrap();
        let bytes = plan.secondary_lock_bytes.clone().unwrap();

        // Complete with a kind byte and parse back.
        let mut full = vec![CellKind::Put.code()];
        full.extend_from_slice(&bytes);
        let parsed = TxnLock::parse(&full).unwrap();
        match parsed.role {
            LockRole::Secondary { primary } => assert_eq!(primary, plan.primary),
            LockRole::Primary { .. } => panic!("expected secondary lock"),
        }
    }
}
