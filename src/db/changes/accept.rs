use crate::db::table::core::row::RowState;
use crate::db::table::core::table::Table;

/// Treats every pending change as already persisted: Deleted rows are dropped
/// and the rest take their current values as the new original.
pub fn accept_changes(table: &mut Table) {
    table.retain(|row| row.state() != RowState::Deleted);
    for row in table.rows_mut() {
        if row.state() != RowState::Unchanged {
            row.accept();
        }
    }
    tracing::debug!(table = %table.name(), "changes accepted");
}
