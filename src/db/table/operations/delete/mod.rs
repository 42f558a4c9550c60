use crate::db::error::CacheError;
use crate::db::table::core::row::{RowHandle, RowState};
use crate::db::table::core::table::Table;

pub fn delete(table: &mut Table, handle: RowHandle) -> Result<(), CacheError> {
    let row = table.live_mut(handle)?;
    // Never persisted, so there is nothing to reconcile.
    if row.state() == RowState::Added {
        table.remove(handle);
        return Ok(());
    }
    row.set_state(RowState::Deleted);
    Ok(())
}
