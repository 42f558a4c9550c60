use crate::db::error::CacheError;
use crate::db::table::core::column::Schema;
use crate::db::table::core::row::{RowHandle, TrackedRow};
use crate::db::table::core::table::Table;
use crate::db::table::core::value::Record;
use crate::db::table::operations::helpers::common::validate_and_clone_record;

pub fn load<I>(name: impl Into<String>, schema: Schema, records: I) -> Result<Table, CacheError>
where
    I: IntoIterator<Item = Record>,
{
    let mut table = Table::new(name, schema);
    fill(&mut table, records)?;
    Ok(table)
}

/// Appends query results as Unchanged rows. Either every record is accepted
/// or the table is left as it was.
pub fn fill<I>(table: &mut Table, records: I) -> Result<Vec<RowHandle>, CacheError>
where
    I: IntoIterator<Item = Record>,
{
    let rows = records
        .into_iter()
        .enumerate()
        .map(|(i, record)| {
            validate_and_clone_record(table.schema(), &record).map_err(|e| match e {
                CacheError::SchemaMismatch(msg) => {
                    CacheError::SchemaMismatch(format!("record {i}: {msg}"))
                }
                other => other,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut handles = Vec::with_capacity(rows.len());
    for row in rows {
        let handle = table.next_handle();
        table.push(TrackedRow::loaded(handle, row));
        handles.push(handle);
    }
    tracing::debug!(table = %table.name(), rows = handles.len(), "rows loaded");
    Ok(handles)
}
