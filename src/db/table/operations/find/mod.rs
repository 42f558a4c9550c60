use crate::db::error::CacheError;
use crate::db::table::core::row::RowHandle;
use crate::db::table::core::table::Table;
use crate::db::table::core::value::Value;

/// Looks a visible row up by its current primary key values.
pub fn find(table: &Table, key: &[Value]) -> Result<Option<RowHandle>, CacheError> {
    let key_columns = table.schema().primary_key();
    if key_columns.is_empty() {
        return Err(CacheError::schema(format!(
            "Table `{}` has no primary key",
            table.name()
        )));
    }
    if key.len() != key_columns.len() {
        return Err(CacheError::schema(format!(
            "Expected {} key values, got {}",
            key_columns.len(),
            key.len()
        )));
    }
    Ok(table
        .iter()
        .find(|row| {
            key_columns
                .iter()
                .zip(key)
                .all(|(&column, value)| row.current()[column] == *value)
        })
        .map(|row| row.handle()))
}
