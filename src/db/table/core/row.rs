use crate::db::table::core::value::Value;
use serde::Serialize;
use std::fmt;
use std::ops::{Deref, DerefMut};

/// Positional values, one per schema column.
#[derive(Debug, Eq, PartialEq, Hash, Clone, Serialize)]
#[repr(transparent)]
pub struct Row(pub Vec<Value>);

impl Deref for Row {
    type Target = Vec<Value>;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for Row {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, Serialize)]
pub enum RowState {
    Unchanged,
    Added,
    Modified,
    Deleted,
}

/// Stable identifier of a row within the table that created it.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, PartialOrd, Ord)]
pub struct RowHandle {
    pub(crate) table: u64,
    pub(crate) id: u64,
}

impl fmt::Display for RowHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "row #{} of table #{}", self.id, self.table)
    }
}

/// A row together with its last known store image and change state.
#[derive(Debug, PartialEq, Clone)]
pub struct TrackedRow {
    handle: RowHandle,
    original: Option<Row>,
    current: Row,
    state: RowState,
}

impl TrackedRow {
    pub(crate) fn loaded(handle: RowHandle, row: Row) -> Self {
        Self {
            handle,
            original: Some(row.clone()),
            current: row,
            state: RowState::Unchanged,
        }
    }

    pub(crate) fn added(handle: RowHandle, row: Row) -> Self {
        Self {
            handle,
            original: None,
            current: row,
            state: RowState::Added,
        }
    }

    pub fn handle(&self) -> RowHandle {
        self.handle
    }

    pub fn original(&self) -> Option<&Row> {
        self.original.as_ref()
    }

    pub fn current(&self) -> &Row {
        &self.current
    }

    pub fn state(&self) -> RowState {
        self.state
    }

    pub(crate) fn current_mut(&mut self) -> &mut Row {
        &mut self.current
    }

    pub(crate) fn set_state(&mut self, state: RowState) {
        self.state = state;
    }

    /// Marks the current values as matching the store.
    pub(crate) fn accept(&mut self) {
        self.original = Some(self.current.clone());
        self.state = RowState::Unchanged;
    }

    /// Restores the last known store image. Returns `false` for rows that were
    /// never persisted and should be dropped instead.
    pub(crate) fn reject(&mut self) -> bool {
        match &self.original {
            Some(original) => {
                self.current = original.clone();
                self.state = RowState::Unchanged;
                true
            }
            None => false,
        }
    }

    /// Indices whose current value differs from the original. Every index for
    /// rows that were never persisted.
    ///
    /// `Absent` current cells are never reported: their store value is unknown
    /// (e.g. a column default) and nothing local replaced it.
    pub fn changed_columns(&self) -> Vec<usize> {
        match &self.original {
            Some(original) => original
                .iter()
                .zip(self.current.iter())
                .enumerate()
                .filter(|(_, (before, after))| !after.is_absent() && before != after)
                .map(|(i, _)| i)
                .collect(),
            None => (0..self.current.len()).collect(),
        }
    }
}
