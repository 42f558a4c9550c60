use crate::db::table::core::row::{RowState, TrackedRow};
use crate::db::table::core::table::Table;

/// Deletes go first so a key can be reused by a later insert, and updates go
/// before inserts so an insert never collides with a key an update vacates.
const RECONCILE_ORDER: [RowState; 3] = [RowState::Deleted, RowState::Modified, RowState::Added];

/// Lazy walk over the rows that differ from the store, in reconcile order.
///
/// Cloning the iterator, or calling [`Table::pending_changes`] again, restarts it.
#[derive(Debug, Clone)]
pub struct PendingChanges<'a> {
    table: &'a Table,
    phase: usize,
    position: usize,
}

impl<'a> Iterator for PendingChanges<'a> {
    type Item = (&'a TrackedRow, RowState);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(&wanted) = RECONCILE_ORDER.get(self.phase) {
            while let Some(row) = self.table.row_at(self.position) {
                self.position += 1;
                if row.state() == wanted {
                    return Some((row, wanted));
                }
            }
            self.phase += 1;
            self.position = 0;
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining_phases = RECONCILE_ORDER.len().saturating_sub(self.phase);
        (0, Some(remaining_phases * self.table.storage_len()))
    }
}

pub fn pending_changes(table: &Table) -> PendingChanges<'_> {
    PendingChanges {
        table,
        phase: 0,
        position: 0,
    }
}
