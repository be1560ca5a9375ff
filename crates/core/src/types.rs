//! Core data model for the transaction client
//!
//! A transaction spans cells addressed by (table, row, family, qualifier).
//! Next to every user family the backing store keeps two shadow families
//! that encode intent and commit state:
//!
//! - the **lock** family holds uncommitted intents, keyed by the start
//!   timestamp of the writing transaction;
//! - the **write** family holds commit records, keyed by commit timestamp and
//!   pointing back at the staged data.
//!
//! Everything outside those two families is a data column. The coordinator
//! never interprets shadow-family payloads beyond family identity; the one
//! thing it must be able to decide is whether a conflict lock reported by the
//! store sits on a data column.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Family name of the lock shadow family.
pub const LOCK_FAMILY: &[u8] = b"#l";

/// Family name of the write shadow family.
pub const WRITE_FAMILY: &[u8] = b"#w";

/// A table name, compared and ordered as a byte sequence.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TableName(Vec<u8>);

impl TableName {
    /// Create a table name from raw bytes.
    pub fn new(name: impl Into<Vec<u8>>) -> Self {
        TableName(name.into())
    }

    /// The raw name bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl From<&str> for TableName {
    fn from(name: &str) -> Self {
        TableName(name.as_bytes().to_vec())
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.0))
    }
}

impl fmt::Debug for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TableName({})", self)
    }
}

/// A (family, qualifier) pair within a row.
///
/// Identity is by value: two columns are the same column iff both byte
/// sequences match. Columns are usable as map keys.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Column {
    family: Vec<u8>,
    qualifier: Vec<u8>,
}

impl Column {
    /// Create a column from family and qualifier bytes.
    pub fn new(family: impl Into<Vec<u8>>, qualifier: impl Into<Vec<u8>>) -> Self {
        Column {
            family: family.into(),
            qualifier: qualifier.into(),
        }
    }

    /// The column family bytes.
    pub fn family(&self) -> &[u8] {
        &self.family
    }

    /// The column qualifier bytes.
    pub fn qualifier(&self) -> &[u8] {
        &self.qualifier
    }

    /// Whether this column belongs to the lock shadow family.
    pub fn is_lock_family(&self) -> bool {
        self.family == LOCK_FAMILY
    }

    /// Whether this column belongs to the write shadow family.
    pub fn is_write_family(&self) -> bool {
        self.family == WRITE_FAMILY
    }

    /// Whether this is a data column.
    ///
    /// A conflict lock reported during prewrite is legitimate only when it
    /// sits on a data column.
    pub fn is_data(&self) -> bool {
        !self.is_lock_family() && !self.is_write_family()
    }
}

impl fmt::Debug for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}",
            String::from_utf8_lossy(&self.family),
            String::from_utf8_lossy(&self.qualifier)
        )
    }
}

/// A fully qualified cell address: (table, row, family, qualifier).
///
/// Identity is by value; coordinates are usable as map keys and are compared
/// for equality when matching a preferred primary against the buffer.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ColumnCoordinate {
    table: TableName,
    row: Vec<u8>,
    column: Column,
}

impl ColumnCoordinate {
    /// Create a coordinate from its parts.
    pub fn new(table: TableName, row: impl Into<Vec<u8>>, column: Column) -> Self {
        ColumnCoordinate {
            table,
            row: row.into(),
            column,
        }
    }

    /// The table this coordinate addresses.
    pub fn table(&self) -> &TableName {
        &self.table
    }

    /// The row key bytes.
    pub fn row(&self) -> &[u8] {
        &self.row
    }

    /// The (family, qualifier) pair.
    pub fn column(&self) -> &Column {
        &self.column
    }
}

impl fmt::Display for ColumnCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{:?}",
            self.table,
            String::from_utf8_lossy(&self.row),
            self.column
        )
    }
}

impl fmt::Debug for ColumnCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}

/// The kind of a buffered or stored cell.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum CellKind {
    /// A value write.
    Put,
    /// Removal of the latest version of a column.
    Delete,
    /// Removal of all versions of a column.
    DeleteColumn,
}

impl CellKind {
    /// Wire code of this kind, embedded in lock payloads.
    pub fn code(self) -> u8 {
        match self {
            CellKind::Put => 0,
            CellKind::Delete => 1,
            CellKind::DeleteColumn => 2,
        }
    }

    /// Decode a wire code.
    pub fn from_code(code: u8) -> Option<CellKind> {
        match code {
            0 => Some(CellKind::Put),
            1 => Some(CellKind::Delete),
            2 => Some(CellKind::DeleteColumn),
            _ => None,
        }
    }

    /// Whether this kind removes data rather than writing it.
    pub fn is_delete(self) -> bool {
        !matches!(self, CellKind::Put)
    }
}

/// A single cell: a column within a row plus kind, timestamp, and value.
///
/// Cells are the currency of the client: mutation ingestion turns user
/// requests into cells, the buffer stores them, prewrite and commit RPCs ship
/// them, and reads return them. Delete cells carry an empty value.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Cell {
    /// Row key.
    pub row: Vec<u8>,
    /// Column within the row.
    pub column: Column,
    /// Cell kind.
    pub kind: CellKind,
    /// Cell timestamp; zero for buffered mutations, whose effective timestamp
    /// becomes the transaction's start timestamp at prewrite time.
    pub timestamp: u64,
    /// Cell value; empty for delete kinds.
    pub value: Vec<u8>,
}

impl Cell {
    /// Create a value write cell.
    pub fn put(row: impl Into<Vec<u8>>, column: Column, value: impl Into<Vec<u8>>) -> Self {
        Cell {
            row: row.into(),
            column,
            kind: CellKind::Put,
            timestamp: 0,
            value: value.into(),
        }
    }

    /// Create a delete cell of the given delete kind.
    pub fn delete(row: impl Into<Vec<u8>>, column: Column, kind: CellKind) -> Self {
        debug_assert!(kind.is_delete());
        Cell {
            row: row.into(),
            column,
            kind,
            timestamp: 0,
            value: Vec::new(),
        }
    }

    /// Copy of this cell with the value removed.
    ///
    /// Commit RPCs ship value-stripped cells: the committed value already
    /// lives in the data family under the start timestamp.
    pub fn without_value(&self) -> Cell {
        Cell {
            row: self.row.clone(),
            column: self.column.clone(),
            kind: self.kind,
            timestamp: self.timestamp,
            value: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    // === Column identity ===

    #[test]
    fn test_column_equality_is_by_value() {
        let a = Column::new(b"cf".to_vec(), b"q".to_vec());
        let b = Column::new("cf", "q");
        assert_eq!(a, b);
        assert_ne!(a, Column::new("cf", "q2"));
    }

    #[test]
    fn test_column_usable_as_map_key() {
        let mut map = HashMap::new();
        map.insert(Column::new("cf", "q"), 1);
        map.insert(Column::new("cf", "q"), 2);
        assert_eq!(map.len(), 1);
        assert_eq!(map[&Column::new("cf", "q")], 2);
    }

    #[test]
    fn test_coordinate_equality_is_by_value() {
        let a = ColumnCoordinate::new("t".into(), b"r".to_vec(), Column::new("cf", "q"));
        let b = ColumnCoordinate::new("t".into(), b"r".to_vec(), Column::new("cf", "q"));
        assert_eq!(a, b);

        let other_row = ColumnCoordinate::new("t".into(), b"r2".to_vec(), Column::new("cf", "q"));
        assert_ne!(a, other_row);
    }

    // === Shadow family identity ===

    #[test]
    fn test_user_column_is_data() {
        assert!(Column::new("cf", "q").is_data());
    }

    #[test]
    fn test_lock_family_column_is_not_data() {
        let col = Column::new(LOCK_FAMILY.to_vec(), b"q".to_vec());
        assert!(col.is_lock_family());
        assert!(!col.is_data());
    }

    #[test]
    fn test_write_family_column_is_not_data() {
        let col = Column::new(WRITE_FAMILY.to_vec(), b"q".to_vec());
        assert!(col.is_write_family());
        assert!(!col.is_data());
    }

    // === CellKind codes ===

    #[test]
    fn test_cell_kind_codes_round_trip() {
        for kind in [CellKind::Put, CellKind::Delete, CellKind::DeleteColumn] {
            assert_eq!(CellKind::from_code(kind.code()), Some(kind));
        }
        assert_eq!(CellKind::from_code(0xff), None);
    }

    #[test]
    fn test_delete_kinds() {
        assert!(!CellKind::Put.is_delete());
        assert!(CellKind::Delete.is_delete());
        assert!(CellKind::DeleteColumn.is_delete());
    }

    // === Cells ===

    #[test]
    fn test_delete_cell_has_no_value() {
        let cell = Cell::delete(b"r".to_vec(), Column::new("cf", "q"), CellKind::DeleteColumn);
        assert!(cell.value.is_empty());
        assert_eq!(cell.kind, CellKind::DeleteColumn);
    }

    #[test]
    fn test_without_value_strips_value_only() {
        let cell = Cell::put(b"r".to_vec(), Column::new("cf", "q"), b"v".to_vec());
        let stripped = cell.without_value();
        assert!(stripped.value.is_empty());
        assert_eq!(stripped.row, cell.row);
        assert_eq!(stripped.column, cell.column);
        assert_eq!(stripped.kind, cell.kind);
    }

    #[test]
    fn test_table_name_display() {
        let t = TableName::from("orders");
        assert_eq!(t.to_string(), "orders");
        assert_eq!(t.as_bytes(), b"orders");
    }
}
