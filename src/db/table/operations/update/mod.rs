use crate::db::error::CacheError;
use crate::db::table::core::row::{RowHandle, RowState};
use crate::db::table::core::table::Table;
use crate::db::table::core::value::Record;
use crate::db::table::operations::helpers::common::validate_update_values;

pub fn update(table: &mut Table, handle: RowHandle, values: Record) -> Result<(), CacheError> {
    // Resolve the row first so a stale handle wins over a bad payload.
    let persisted = table
        .get(handle)
        .ok_or(CacheError::UnknownRow(handle))?
        .original()
        .is_some();
    let update_values = validate_update_values(table.schema(), values)?;
    if update_values.is_empty() {
        return Ok(());
    }

    if persisted {
        let row = table.get(handle).ok_or(CacheError::UnknownRow(handle))?;
        for (index, value) in &update_values {
            if table.schema().is_key_column(*index) && row.current()[*index] != *value {
                return Err(CacheError::schema(format!(
                    "Primary key column `{}` cannot be edited on a persisted row; delete it and insert a new one",
                    table.schema().columns()[*index].name
                )));
            }
        }
    }

    let row = table.live_mut(handle)?;
    for (index, value) in update_values {
        row.current_mut()[index] = value;
    }
    if row.state() == RowState::Unchanged {
        row.set_state(RowState::Modified);
    }
    Ok(())
}
