use crate::db::error::CacheError;
use crate::db::table::core::row::{RowHandle, RowState};
use crate::db::table::core::table::Table;

/// Throws away every local edit: Added rows disappear, Modified and Deleted
/// rows go back to their original values.
pub fn reject_changes(table: &mut Table) {
    table.retain(|row| row.state() != RowState::Added);
    for row in table.rows_mut() {
        if row.state() != RowState::Unchanged {
            row.reject();
        }
    }
    tracing::debug!(table = %table.name(), "changes rejected");
}

/// Same as [`reject_changes`] for a single row. Deleted rows are accepted
/// here so a delete can be undone.
pub fn reject_row_changes(table: &mut Table, handle: RowHandle) -> Result<(), CacheError> {
    let row = table
        .entry_mut(handle)
        .ok_or(CacheError::UnknownRow(handle))?;
    if !row.reject() {
        table.remove(handle);
    }
    Ok(())
}
