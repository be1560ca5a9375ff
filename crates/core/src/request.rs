//! User-facing request and result types
//!
//! These mirror the backing store's native read/mutate requests, restricted
//! to what the transaction layer supports. Validation rules are enforced by
//! the coordinator before any RPC is issued:
//!
//! - every get, put, delete, and scan must name at least one column.

use crate::error::{Error, Result};
use crate::types::{Cell, CellKind, Column};

/// A point read of one row.
#[derive(Clone, Debug)]
pub struct Get {
    row: Vec<u8>,
    columns: Vec<Column>,
}

impl Get {
    /// Create a get for a row.
    pub fn new(row: impl Into<Vec<u8>>) -> Self {
        Get {
            row: row.into(),
            columns: Vec::new(),
        }
    }

    /// Add a column to read.
    pub fn add_column(mut self, family: impl Into<Vec<u8>>, qualifier: impl Into<Vec<u8>>) -> Self {
        self.columns.push(Column::new(family, qualifier));
        self
    }

    /// Add an already-built column.
    pub fn add(mut self, column: Column) -> Self {
        self.columns.push(column);
        self
    }

    /// The row key.
    pub fn row(&self) -> &[u8] {
        &self.row
    }

    /// The requested columns.
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }
}

/// A buffered write of one or more columns in a row.
#[derive(Clone, Debug)]
pub struct Put {
    row: Vec<u8>,
    cells: Vec<Cell>,
}

impl Put {
    /// Create a put for a row.
    pub fn new(row: impl Into<Vec<u8>>) -> Self {
        Put {
            row: row.into(),
            cells: Vec::new(),
        }
    }

    /// Add a column value.
    pub fn add_column(
        mut self,
        family: impl Into<Vec<u8>>,
        qualifier: impl Into<Vec<u8>>,
        value: impl Into<Vec<u8>>,
    ) -> Self {
        let column = Column::new(family, qualifier);
        self.cells.push(Cell::put(self.row.clone(), column, value));
        self
    }

    /// The row key.
    pub fn row(&self) -> &[u8] {
        &self.row
    }

    /// The cells this put stages.
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }
}

/// A buffered deletion of one or more columns in a row.
#[derive(Clone, Debug)]
pub struct Delete {
    row: Vec<u8>,
    cells: Vec<Cell>,
}

impl Delete {
    /// Create a delete for a row.
    pub fn new(row: impl Into<Vec<u8>>) -> Self {
        Delete {
            row: row.into(),
            cells: Vec::new(),
        }
    }

    /// Delete the latest version of a column.
    pub fn delete_column(
        mut self,
        family: impl Into<Vec<u8>>,
        qualifier: impl Into<Vec<u8>>,
    ) -> Self {
        let column = Column::new(family, qualifier);
        self.cells
            .push(Cell::delete(self.row.clone(), column, CellKind::Delete));
        self
    }

    /// Delete all versions of a column.
    pub fn delete_columns(
        mut self,
        family: impl Into<Vec<u8>>,
        qualifier: impl Into<Vec<u8>>,
    ) -> Self {
        let column = Column::new(family, qualifier);
        self.cells
            .push(Cell::delete(self.row.clone(), column, CellKind::DeleteColumn));
        self
    }

    /// The row key.
    pub fn row(&self) -> &[u8] {
        &self.row
    }

    /// The cells this delete stages.
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }
}

/// A range read over rows.
#[derive(Clone, Debug)]
pub struct Scan {
    start_row: Vec<u8>,
    stop_row: Vec<u8>,
    columns: Vec<Column>,
    caching: usize,
}

impl Scan {
    /// Create a scan over `[start_row, stop_row)`. Empty bounds are open.
    pub fn new(start_row: impl Into<Vec<u8>>, stop_row: impl Into<Vec<u8>>) -> Self {
        Scan {
            start_row: start_row.into(),
            stop_row: stop_row.into(),
            columns: Vec::new(),
            caching: 0,
        }
    }

    /// Add a column to read.
    pub fn add_column(mut self, family: impl Into<Vec<u8>>, qualifier: impl Into<Vec<u8>>) -> Self {
        self.columns.push(Column::new(family, qualifier));
        self
    }

    /// Rows fetched per backing-store round trip. Zero means "use the
    /// client's configured default".
    pub fn with_caching(mut self, caching: usize) -> Self {
        self.caching = caching;
        self
    }

    /// Start of the row range.
    pub fn start_row(&self) -> &[u8] {
        &self.start_row
    }

    /// End of the row range (exclusive).
    pub fn stop_row(&self) -> &[u8] {
        &self.stop_row
    }

    /// The requested columns.
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// The configured caching, zero if unset.
    pub fn caching(&self) -> usize {
        self.caching
    }
}

/// Result of a snapshot read: the cells of one row.
///
/// When a non-ignore-locks read hits uncommitted intents, the store answers
/// with the blocking lock cells instead of data; such a result is marked by
/// its cells living in the lock shadow family.
#[derive(Clone, Debug, Default)]
pub struct ReadResult {
    cells: Vec<Cell>,
}

impl ReadResult {
    /// Build a result from cells.
    pub fn new(cells: Vec<Cell>) -> Self {
        ReadResult { cells }
    }

    /// An empty result.
    pub fn empty() -> Self {
        ReadResult::default()
    }

    /// The cells of this row.
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Whether no cells were returned.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Row key of this result, if any cell was returned.
    pub fn row(&self) -> Option<&[u8]> {
        self.cells.first().map(|cell| cell.row.as_slice())
    }

    /// Whether this result reports blocking locks instead of data.
    pub fn is_lock_result(&self) -> bool {
        self.cells
            .first()
            .is_some_and(|cell| cell.column.is_lock_family())
    }

    /// The lock cells of a lock-marked result.
    pub fn lock_cells(&self) -> Vec<Cell> {
        self.cells
            .iter()
            .filter(|cell| cell.column.is_lock_family())
            .cloned()
            .collect()
    }

    /// Value of the given column, if present.
    pub fn value(&self, column: &Column) -> Option<&[u8]> {
        self.cells
            .iter()
            .find(|cell| &cell.column == column)
            .map(|cell| cell.value.as_slice())
    }
}

/// Check that a get names at least one column.
pub fn validate_get(get: &Get) -> Result<()> {
    require_columns(get.columns().len(), "get")
}

/// Check that a put stages at least one column.
pub fn validate_put(put: &Put) -> Result<()> {
    require_columns(put.cells().len(), "put")
}

/// Check that a delete stages at least one column.
pub fn validate_delete(delete: &Delete) -> Result<()> {
    require_columns(delete.cells().len(), "delete")
}

/// Check that a scan names at least one column.
pub fn validate_scan(scan: &Scan) -> Result<()> {
    require_columns(scan.columns().len(), "scan")
}

fn require_columns(count: usize, what: &str) -> Result<()> {
    if count == 0 {
        Err(Error::InvalidRequest(format!(
            "{what} must specify at least one column"
        )))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::LOCK_FAMILY;

    // === Validation ===

    #[test]
    fn test_empty_get_rejected() {
        let err = validate_get(&Get::new(b"r".to_vec())).unwrap_err();
        assert!(matches!(err, Error::InvalidRequest(_)));
    }

    #[test]
    fn test_get_with_column_accepted() {
        let get = Get::new(b"r".to_vec()).add_column("cf", "q");
        assert!(validate_get(&get).is_ok());
    }

    #[test]
    fn test_empty_put_and_delete_rejected() {
        assert!(validate_put(&Put::new(b"r".to_vec())).is_err());
        assert!(validate_delete(&Delete::new(b"r".to_vec())).is_err());
    }

    #[test]
    fn test_empty_scan_rejected() {
        assert!(validate_scan(&Scan::new(b"a".to_vec(), b"z".to_vec())).is_err());
    }

    // === Mutation cells ===

    #[test]
    fn test_put_builds_put_cells() {
        let put = Put::new(b"r".to_vec())
            .add_column("cf", "q1", "v1")
            .add_column("cf", "q2", "v2");
        assert_eq!(put.cells().len(), 2);
        assert!(put.cells().iter().all(|c| c.kind == CellKind::Put));
        assert_eq!(put.cells()[0].value, b"v1");
    }

    #[test]
    fn test_delete_kinds_map_to_cells() {
        let delete = Delete::new(b"r".to_vec())
            .delete_column("cf", "q1")
            .delete_columns("cf", "q2");
        assert_eq!(delete.cells()[0].kind, CellKind::Delete);
        assert_eq!(delete.cells()[1].kind, CellKind::DeleteColumn);
        assert!(delete.cells().iter().all(|c| c.value.is_empty()));
    }

    // === Read results ===

    fn data_cell(row: &[u8], qualifier: &str, value: &[u8]) -> Cell {
        Cell::put(row.to_vec(), Column::new("cf", qualifier), value.to_vec())
    }

    fn lock_cell(row: &[u8], qualifier: &str) -> Cell {
        Cell::put(
            row.to_vec(),
            Column::new(LOCK_FAMILY.to_vec(), qualifier.as_bytes().to_vec()),
            b"lockbytes".to_vec(),
        )
    }

    #[test]
    fn test_data_result_is_not_lock_result() {
        let result = ReadResult::new(vec![data_cell(b"r", "q", b"v")]);
        assert!(!result.is_lock_result());
        assert_eq!(result.row(), Some(&b"r"[..]));
        assert_eq!(result.value(&Column::new("cf", "q")), Some(&b"v"[..]));
    }

    #[test]
    fn test_lock_result_sentinel_and_extraction() {
        let result = ReadResult::new(vec![lock_cell(b"r", "q1"), lock_cell(b"r", "q2")]);
        assert!(result.is_lock_result());
        assert_eq!(result.lock_cells().len(), 2);
    }

    #[test]
    fn test_empty_result() {
        let result = ReadResult::empty();
        assert!(result.is_empty());
        assert!(!result.is_lock_result());
        assert_eq!(result.row(), None);
    }
}
