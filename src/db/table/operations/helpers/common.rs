use crate::db::error::CacheError;
use crate::db::table::core::column::Schema;
use crate::db::table::core::row::Row;
use crate::db::table::core::value::{Record, Value};

/// Builds a row from a record that must carry exactly the schema's columns.
pub fn validate_and_clone_record(schema: &Schema, record: &Record) -> Result<Row, CacheError> {
    if record.len() != schema.width() {
        return Err(CacheError::schema(format!(
            "Record has {} fields but the schema declares {} columns",
            record.len(),
            schema.width()
        )));
    }
    reject_unknown_columns(schema, record)?;

    let mut row = Row(Vec::with_capacity(schema.width()));
    for column in schema.columns() {
        let value = record.get(&column.name).ok_or_else(|| {
            CacheError::schema(format!("Record is missing column `{}`", column.name))
        })?;
        if value.is_absent() {
            return Err(CacheError::schema(format!(
                "Loaded column `{}` has no value",
                column.name
            )));
        }
        column.check(value)?;
        row.push(value.clone());
    }
    Ok(row)
}

/// Builds a row for a local insert. Columns the caller left out become
/// `Absent`, which is only allowed for nullable or generated columns.
pub fn validate_insert_values(schema: &Schema, values: &Record) -> Result<Row, CacheError> {
    reject_unknown_columns(schema, values)?;

    let mut row = Row(Vec::with_capacity(schema.width()));
    for column in schema.columns() {
        match values.get(&column.name) {
            Some(value) if !value.is_absent() => {
                column.check(value)?;
                row.push(value.clone());
            }
            _ if column.may_be_omitted() => row.push(Value::Absent),
            _ => {
                return Err(CacheError::schema(format!(
                    "Column `{}` is not nullable and must be given a value",
                    column.name
                )));
            }
        }
    }
    Ok(row)
}

/// Resolves an update payload to `(column index, value)` pairs, validating
/// every entry before anything is written.
pub fn validate_update_values(
    schema: &Schema,
    values: Record,
) -> Result<Vec<(usize, Value)>, CacheError> {
    let mut resolved = Vec::with_capacity(values.len());
    for (column_name, value) in values {
        let index = schema.get_index_of_column(&column_name)?;
        if value.is_absent() {
            return Err(CacheError::schema(format!(
                "Column `{}` cannot be reset to absent",
                column_name
            )));
        }
        schema.columns()[index].check(&value)?;
        resolved.push((index, value));
    }
    Ok(resolved)
}

fn reject_unknown_columns(schema: &Schema, record: &Record) -> Result<(), CacheError> {
    match record.keys().find(|name| !schema.has_column(name)) {
        Some(name) => Err(CacheError::schema(format!(
            "Column `{}` does not exist",
            name
        ))),
        None => Ok(()),
    }
}
