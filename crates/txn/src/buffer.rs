//! Per-transaction mutation buffer
//!
//! Writes and deletes are buffered locally until commit; nothing reaches the
//! backing store before prewrite. The buffer deduplicates by (table, row,
//! column): a later mutation of the same column replaces the earlier one in
//! place, so each column holds exactly one pending mutation and keeps its
//! original position in the row.

use siphon_core::types::{Cell, CellKind, Column, ColumnCoordinate, TableName};
use std::collections::{BTreeMap, HashMap};

/// The pending mutations of one (table, row), in first-seen column order.
#[derive(Clone, Debug, Default)]
pub struct RowMutation {
    row: Vec<u8>,
    cells: Vec<Cell>,
    positions: HashMap<Column, usize>,
}

impl RowMutation {
    /// Create an empty row mutation.
    pub fn new(row: impl Into<Vec<u8>>) -> Self {
        RowMutation {
            row: row.into(),
            cells: Vec::new(),
            positions: HashMap::new(),
        }
    }

    /// The row key.
    pub fn row(&self) -> &[u8] {
        &self.row
    }

    /// Insert or replace the mutation for the cell's column.
    ///
    /// A replaced column keeps its position; the payload and kind reflect the
    /// latest write.
    pub fn add(&mut self, cell: Cell) {
        debug_assert_eq!(cell.row, self.row);
        match self.positions.get(&cell.column) {
            Some(&at) => self.cells[at] = cell,
            None => {
                self.positions.insert(cell.column.clone(), self.cells.len());
                self.cells.push(cell);
            }
        }
    }

    /// The buffered cells in column order.
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// The buffered columns in order.
    pub fn columns(&self) -> impl Iterator<Item = &Column> {
        self.cells.iter().map(|cell| &cell.column)
    }

    /// Kind of the pending mutation for `column`, if buffered.
    pub fn kind_of(&self, column: &Column) -> Option<CellKind> {
        self.positions.get(column).map(|&at| self.cells[at].kind)
    }

    /// Number of buffered columns.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Whether no columns are buffered.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Value-stripped copy for commit RPCs.
    pub fn without_values(&self) -> RowMutation {
        RowMutation {
            row: self.row.clone(),
            cells: self.cells.iter().map(Cell::without_value).collect(),
            positions: self.positions.clone(),
        }
    }
}

/// All pending mutations of a transaction, grouped by table and row.
///
/// Tables and rows are keyed by byte-sequence equality and enumerate in
/// sorted byte order, which fixes the primary-selection walk for a given
/// buffer content.
#[derive(Clone, Debug, Default)]
pub struct MutationBuffer {
    tables: BTreeMap<TableName, BTreeMap<Vec<u8>, RowMutation>>,
    len: usize,
}

impl MutationBuffer {
    /// Create an empty buffer.
    pub fn new() -> Self {
        MutationBuffer::default()
    }

    /// Insert or replace the mutation for (table, cell.row, cell.column).
    pub fn add(&mut self, table: &TableName, cell: Cell) {
        let row_mutation = self
            .tables
            .entry(table.clone())
            .or_default()
            .entry(cell.row.clone())
            .or_insert_with(|| RowMutation::new(cell.row.clone()));
        let before = row_mutation.len();
        row_mutation.add(cell);
        self.len += row_mutation.len() - before;
    }

    /// Number of distinct (table, row, column) entries.
    pub fn size(&self) -> usize {
        self.len
    }

    /// Whether the buffer holds no mutations.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Iterate over `(table, row mutation)` in table then row byte order.
    pub fn rows(&self) -> impl Iterator<Item = (&TableName, &RowMutation)> {
        self.tables
            .iter()
            .flat_map(|(table, rows)| rows.values().map(move |row| (table, row)))
    }

    /// Kind of the pending mutation at `coordinate`, if buffered.
    pub fn kind_of(&self, coordinate: &ColumnCoordinate) -> Option<CellKind> {
        self.tables
            .get(coordinate.table())?
            .get(coordinate.row())?
            .kind_of(coordinate.column())
    }

    /// Whether `coordinate` has a buffered mutation.
    pub fn contains(&self, coordinate: &ColumnCoordinate) -> bool {
        self.kind_of(coordinate).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn table() -> TableName {
        TableName::from("t")
    }

    fn put_cell(row: &[u8], qualifier: &str, value: &[u8]) -> Cell {
        Cell::put(row.to_vec(), Column::new("cf", qualifier), value.to_vec())
    }

    fn delete_cell(row: &[u8], qualifier: &str) -> Cell {
        Cell::delete(
            row.to_vec(),
            Column::new("cf", qualifier),
            CellKind::DeleteColumn,
        )
    }

    // === Deduplication ===

    #[test]
    fn test_add_overwrites_same_column() {
        let mut buffer = MutationBuffer::new();
        buffer.add(&table(), put_cell(b"r", "q", b"v1"));
        buffer.add(&table(), put_cell(b"r", "q", b"v2"));

        assert_eq!(buffer.size(), 1);
        let (_, row) = buffer.rows().next().unwrap();
        assert_eq!(row.cells()[0].value, b"v2");
    }

    #[test]
    fn test_delete_then_put_keeps_latest_kind() {
        let mut buffer = MutationBuffer::new();
        buffer.add(&table(), delete_cell(b"r", "q"));
        buffer.add(&table(), put_cell(b"r", "q", b"v"));

        let coordinate = ColumnCoordinate::new(table(), b"r".to_vec(), Column::new("cf", "q"));
        assert_eq!(buffer.kind_of(&coordinate), Some(CellKind::Put));
        assert_eq!(buffer.size(), 1);
    }

    #[test]
    fn test_overwrite_keeps_column_position() {
        let mut row = RowMutation::new(b"r".to_vec());
        row.add(put_cell(b"r", "q1", b"a"));
        row.add(put_cell(b"r", "q2", b"b"));
        row.add(put_cell(b"r", "q1", b"c"));

        let qualifiers: Vec<_> = row.columns().map(|c| c.qualifier().to_vec()).collect();
        assert_eq!(qualifiers, vec![b"q1".to_vec(), b"q2".to_vec()]);
        assert_eq!(row.cells()[0].value, b"c");
    }

    // === Grouping and enumeration ===

    #[test]
    fn test_size_counts_distinct_columns_across_rows_and_tables() {
        let mut buffer = MutationBuffer::new();
        buffer.add(&table(), put_cell(b"r1", "q1", b"v"));
        buffer.add(&table(), put_cell(b"r1", "q2", b"v"));
        buffer.add(&table(), put_cell(b"r2", "q1", b"v"));
        buffer.add(&TableName::from("t2"), put_cell(b"r1", "q1", b"v"));

        assert_eq!(buffer.size(), 4);
        assert_eq!(buffer.rows().count(), 3);
    }

    #[test]
    fn test_rows_enumerate_in_byte_order() {
        let mut buffer = MutationBuffer::new();
        buffer.add(&TableName::from("tb"), put_cell(b"r", "q", b"v"));
        buffer.add(&TableName::from("ta"), put_cell(b"r2", "q", b"v"));
        buffer.add(&TableName::from("ta"), put_cell(b"r1", "q", b"v"));

        let keys: Vec<_> = buffer
            .rows()
            .map(|(t, r)| (t.as_bytes().to_vec(), r.row().to_vec()))
            .collect();
        assert_eq!(
            keys,
            vec![
                (b"ta".to_vec(), b"r1".to_vec()),
                (b"ta".to_vec(), b"r2".to_vec()),
                (b"tb".to_vec(), b"r".to_vec()),
            ]
        );
    }

    #[test]
    fn test_kind_of_missing_coordinate() {
        let buffer = MutationBuffer::new();
        let coordinate = ColumnCoordinate::new(table(), b"r".to_vec(), Column::new("cf", "q"));
        assert_eq!(buffer.kind_of(&coordinate), None);
        assert!(!buffer.contains(&coordinate));
    }

    #[test]
    fn test_without_values_preserves_structure() {
        let mut row = RowMutation::new(b"r".to_vec());
        row.add(put_cell(b"r", "q1", b"v1"));
        row.add(delete_cell(b"r", "q2"));

        let stripped = row.without_values();
        assert_eq!(stripped.len(), 2);
        assert!(stripped.cells().iter().all(|c| c.value.is_empty()));
        assert_eq!(stripped.cells()[0].kind, CellKind::Put);
        assert_eq!(stripped.cells()[1].kind, CellKind::DeleteColumn);
    }

    proptest! {
        /// Whatever the write sequence, each (row, column) holds exactly the
        /// last value written to it and size counts distinct columns.
        #[test]
        fn prop_last_writer_wins(
            writes in proptest::collection::vec(
                (0u8..3, 0u8..3, proptest::collection::vec(any::<u8>(), 0..8)),
                1..40,
            )
        ) {
            let mut buffer = MutationBuffer::new();
            let mut expected: HashMap<(u8, u8), Vec<u8>> = HashMap::new();
            for (row, qualifier, value) in &writes {
                let cell = Cell::put(
                    vec![*row],
                    Column::new(b"cf".to_vec(), vec![*qualifier]),
                    value.clone(),
                );
                buffer.add(&table(), cell);
                expected.insert((*row, *qualifier), value.clone());
            }

            prop_assert_eq!(buffer.size(), expected.len());
            for ((row, qualifier), value) in &expected {
                let coordinate = ColumnCoordinate::new(
                    table(),
                    vec![*row],
                    Column::new(b"cf".to_vec(), vec![*qualifier]),
                );
                prop_assert_eq!(buffer.kind_of(&coordinate), Some(CellKind::Put));
                let (_, row_mutation) = buffer
                    .rows()
                    .find(|(_, r)| r.row() == [*row])
                    .expect("row present");
                let cell = row_mutation
                    .cells()
                    .iter()
                    .find(|c| c.column.qualifier() == [*qualifier])
                    .expect("column present");
                prop_assert_eq!(&cell.value, value);
            }
        }
    }
}
