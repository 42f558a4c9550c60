use crate::db::error::CacheError;
use crate::db::table::core::row::{RowHandle, TrackedRow};
use crate::db::table::core::table::Table;
use crate::db::table::core::value::Record;
use crate::db::table::operations::helpers::common::validate_insert_values;

pub fn insert(table: &mut Table, values: Record) -> Result<RowHandle, CacheError> {
    let row = validate_insert_values(table.schema(), &values)?;
    let handle = table.next_handle();
    table.push(TrackedRow::added(handle, row));
    Ok(handle)
}
