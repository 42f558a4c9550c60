use crate::db::error::CacheError;
use crate::db::table::core::column::Schema;
use crate::db::table::core::row::{Row, RowHandle, RowState, TrackedRow};
use crate::db::table::core::value::{Record, Value};
use indexmap::IndexMap;
use std::ops::Index;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_TABLE_ID: AtomicU64 = AtomicU64::new(1);

/// In-memory snapshot of one store table.
///
/// Rows are kept in insertion order: loaded rows first, in delivery order,
/// then locally added rows. Deleted rows stay in place until they are
/// reconciled but are skipped by [`Table::iter`] and [`Table::get`].
///
/// A clone keeps the table identity, so handles stay valid against it.
#[derive(Debug, Clone)]
pub struct Table {
    name: String,
    schema: Schema,
    id: u64,
    rows: IndexMap<u64, TrackedRow>,
    next_row_id: u64,
}

impl Index<RowHandle> for Table {
    type Output = Row;

    fn index(&self, handle: RowHandle) -> &Self::Output {
        match self.get(handle) {
            Some(row) => row.current(),
            None => panic!("{handle} does not belong to table `{}`", self.name),
        }
    }
}

impl Table {
    pub fn new(name: impl Into<String>, schema: Schema) -> Self {
        Self {
            name: name.into(),
            schema,
            id: NEXT_TABLE_ID.fetch_add(1, Ordering::Relaxed),
            rows: IndexMap::new(),
            next_row_id: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Visible row, i.e. not Deleted.
    pub fn get(&self, handle: RowHandle) -> Option<&TrackedRow> {
        self.entry(handle)
            .filter(|row| row.state() != RowState::Deleted)
    }

    pub fn get_value(&self, handle: RowHandle, column: &str) -> Result<&Value, CacheError> {
        let index = self.schema.get_index_of_column(column)?;
        let row = self.get(handle).ok_or(CacheError::UnknownRow(handle))?;
        Ok(&row.current()[index])
    }

    /// Visible rows in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &TrackedRow> {
        self.rows
            .values()
            .filter(|row| row.state() != RowState::Deleted)
    }

    /// All rows including the ones marked Deleted.
    pub fn iter_all(&self) -> impl Iterator<Item = &TrackedRow> {
        self.rows.values()
    }

    pub fn handles(&self) -> Vec<RowHandle> {
        self.iter().map(|row| row.handle()).collect()
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn has_changes(&self) -> bool {
        self.rows
            .values()
            .any(|row| row.state() != RowState::Unchanged)
    }

    pub fn row_to_record(&self, row: &Row) -> Record {
        self.schema
            .columns()
            .iter()
            .zip(row.iter())
            .map(|(column, value)| (column.name.clone(), value.clone()))
            .collect()
    }

    /// Current values of the visible rows, keyed by column name.
    pub fn to_records(&self) -> Vec<Record> {
        self.iter()
            .map(|row| self.row_to_record(row.current()))
            .collect()
    }

    /// Values of the primary key columns of `row`.
    pub fn key_of(&self, row: &Row) -> Record {
        self.schema
            .primary_key()
            .iter()
            .map(|&i| (self.schema.columns()[i].name.clone(), row[i].clone()))
            .collect()
    }

    /// Row at `position` in storage order, Deleted included.
    pub(crate) fn row_at(&self, position: usize) -> Option<&TrackedRow> {
        self.rows.get_index(position).map(|(_, row)| row)
    }

    pub(crate) fn storage_len(&self) -> usize {
        self.rows.len()
    }

    pub(crate) fn next_handle(&mut self) -> RowHandle {
        let handle = RowHandle {
            table: self.id,
            id: self.next_row_id,
        };
        self.next_row_id += 1;
        handle
    }

    pub(crate) fn push(&mut self, row: TrackedRow) {
        self.rows.insert(row.handle().id, row);
    }

    pub(crate) fn remove(&mut self, handle: RowHandle) -> Option<TrackedRow> {
        if handle.table != self.id {
            return None;
        }
        self.rows.shift_remove(&handle.id)
    }

    /// Any row of this table, Deleted included.
    pub(crate) fn entry(&self, handle: RowHandle) -> Option<&TrackedRow> {
        if handle.table != self.id {
            return None;
        }
        self.rows.get(&handle.id)
    }

    pub(crate) fn entry_mut(&mut self, handle: RowHandle) -> Option<&mut TrackedRow> {
        if handle.table != self.id {
            return None;
        }
        self.rows.get_mut(&handle.id)
    }

    /// Visible row for editing, `UnknownRow` otherwise.
    pub(crate) fn live_mut(&mut self, handle: RowHandle) -> Result<&mut TrackedRow, CacheError> {
        self.entry_mut(handle)
            .filter(|row| row.state() != RowState::Deleted)
            .ok_or(CacheError::UnknownRow(handle))
    }

    pub(crate) fn rows_mut(&mut self) -> impl Iterator<Item = &mut TrackedRow> {
        self.rows.values_mut()
    }

    pub(crate) fn retain(&mut self, mut keep: impl FnMut(&TrackedRow) -> bool) {
        self.rows.retain(|_, row| keep(row));
    }
}
