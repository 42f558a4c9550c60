use std::str::FromStr;

use chrono::NaiveDateTime;
use rusqlite::types::{ToSql, ToSqlOutput, Value as SqlValue, ValueRef};
use rusqlite::{Connection, params_from_iter};
use rust_decimal::Decimal;

use crate::db::error::CacheError;
use crate::db::reconcile::{ReconciliationResult, reconcile};
use crate::db::table::core::column::{ColumnDefinition, Schema};
use crate::db::table::core::table::Table;
use crate::db::table::core::value::{DataType, Record, Value};
use crate::store::{BackingStore, StoreError};

const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Value::Integer(i) => ToSqlOutput::Owned(SqlValue::Integer(*i)),
            Value::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            Value::Decimal(d) => ToSqlOutput::Owned(SqlValue::Text(d.to_string())),
            Value::Boolean(b) => ToSqlOutput::Owned(SqlValue::Integer(*b as i64)),
            Value::DateTime(dt) => {
                ToSqlOutput::Owned(SqlValue::Text(dt.format(DATETIME_FORMAT).to_string()))
            }
            Value::Binary(bytes) => ToSqlOutput::Borrowed(ValueRef::Blob(bytes)),
            Value::Null | Value::Absent => ToSqlOutput::Owned(SqlValue::Null),
        })
    }
}

/// A SQLite table seen through the [`BackingStore`] contract.
///
/// Statements are parameterized; values never end up in the SQL text.
pub struct SqliteStore<'c> {
    conn: &'c Connection,
    table: String,
    generated_key: Option<String>,
}

impl<'c> SqliteStore<'c> {
    pub fn new(conn: &'c Connection, table: impl Into<String>) -> Self {
        Self {
            conn,
            table: table.into(),
            generated_key: None,
        }
    }

    /// Reports `last_insert_rowid` as `column` for inserts that leave it out.
    pub fn with_generated_key(mut self, column: impl Into<String>) -> Self {
        self.generated_key = Some(column.into());
        self
    }

    /// Store for the SQLite table named like `table`, picking up its
    /// generated column.
    pub fn for_table(conn: &'c Connection, table: &Table) -> Self {
        let store = Self::new(conn, table.name());
        match table.schema().generated_column() {
            Some(column) => store.with_generated_key(column.name.clone()),
            None => store,
        }
    }

    pub fn create_table(conn: &Connection, table_name: &str, schema: &Schema) -> Result<(), StoreError> {
        let sql = create_table_sql(table_name, schema);
        tracing::debug!(%sql, "creating table");
        conn.execute_batch(&sql)?;
        Ok(())
    }

    /// Runs a read query and decodes each row into a record. Result columns
    /// that match `schema` are decoded as their declared type.
    pub fn query(
        conn: &Connection,
        schema: &Schema,
        sql: &str,
        params: &[&dyn ToSql],
    ) -> Result<Vec<Record>, StoreError> {
        let mut stmt = conn.prepare(sql)?;
        let names: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let mut rows = stmt.query(params)?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            let mut record = Record::with_capacity(names.len());
            for (i, name) in names.iter().enumerate() {
                let raw = row.get_ref(i)?;
                let value = match schema.get_index_of_column(name) {
                    Ok(index) => decode(&schema.columns()[index], raw)?,
                    Err(_) => decode_untyped(name, raw)?,
                };
                record.insert(name.clone(), value);
            }
            records.push(record);
        }
        Ok(records)
    }

    pub fn select_all(&self, schema: &Schema) -> Result<Vec<Record>, StoreError> {
        let columns = schema
            .get_column_names()
            .into_iter()
            .map(|name| quote(name))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!("SELECT {} FROM {}", columns, quote(&self.table));
        Self::query(self.conn, schema, &sql, &[])
    }

    fn execute(&self, sql: &str, values: Vec<&Value>) -> Result<usize, StoreError> {
        tracing::debug!(table = %self.table, %sql, "executing");
        Ok(self.conn.execute(sql, params_from_iter(values))?)
    }
}

impl BackingStore for SqliteStore<'_> {
    fn delete(&mut self, key: &Record) -> Result<(), StoreError> {
        let sql = format!(
            "DELETE FROM {} WHERE {}",
            quote(&self.table),
            where_clause(key, 1)
        );
        match self.execute(&sql, key.values().collect())? {
            0 => Err(StoreError::not_found(key)),
            _ => Ok(()),
        }
    }

    fn update(&mut self, key: &Record, changes: &Record) -> Result<(), StoreError> {
        let assignments = changes
            .keys()
            .enumerate()
            .map(|(i, column)| format!("{} = ?{}", quote(column), i + 1))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "UPDATE {} SET {} WHERE {}",
            quote(&self.table),
            assignments,
            where_clause(key, changes.len() + 1)
        );
        let values = changes.values().chain(key.values()).collect();
        match self.execute(&sql, values)? {
            0 => Err(StoreError::not_found(key)),
            _ => Ok(()),
        }
    }

    fn insert(&mut self, values: &Record) -> Result<Option<Record>, StoreError> {
        let sql = if values.is_empty() {
            format!("INSERT INTO {} DEFAULT VALUES", quote(&self.table))
        } else {
            let columns = values.keys().map(|c| quote(c)).collect::<Vec<_>>().join(", ");
            let placeholders = (1..=values.len())
                .map(|i| format!("?{i}"))
                .collect::<Vec<_>>()
                .join(", ");
            format!(
                "INSERT INTO {} ({}) VALUES ({})",
                quote(&self.table),
                columns,
                placeholders
            )
        };
        self.execute(&sql, values.values().collect())?;

        Ok(match &self.generated_key {
            Some(column) if !values.contains_key(column.as_str()) => Some(Record::from([(
                column.clone(),
                Value::Integer(self.conn.last_insert_rowid()),
            )])),
            _ => None,
        })
    }
}

/// Reconciles `table` inside one SQLite transaction.
///
/// On success the transaction is committed. On a store failure it is rolled
/// back and `table` is restored to its state before the call, so nothing is
/// reported as reconciled; `failed_at` and `error` still name the culprit.
pub fn reconcile_in_transaction(
    conn: &mut Connection,
    table: &mut Table,
) -> Result<ReconciliationResult, CacheError> {
    let snapshot = table.clone();
    let tx = conn.transaction().map_err(StoreError::from)?;
    let result = {
        let mut store = SqliteStore::for_table(&tx, table);
        reconcile(table, &mut store)?
    };

    if result.is_success() {
        if let Err(e) = tx.commit() {
            *table = snapshot;
            return Err(StoreError::from(e).into());
        }
        return Ok(result);
    }

    tx.rollback().map_err(StoreError::from)?;
    *table = snapshot;
    tracing::warn!(table = %table.name(), failed_at = ?result.failed_at, "transaction rolled back");
    Ok(ReconciliationResult {
        reconciled: 0,
        ..result
    })
}

fn quote(identifier: &str) -> String {
    format!("\"{}\"", identifier.replace('"', "\"\""))
}

/// `IS` rather than `=` so NULL key parts still match.
fn where_clause(key: &Record, first_param: usize) -> String {
    key.keys()
        .enumerate()
        .map(|(i, column)| format!("{} IS ?{}", quote(column), first_param + i))
        .collect::<Vec<_>>()
        .join(" AND ")
}

fn sql_type(data_type: DataType) -> &'static str {
    match data_type {
        DataType::Integer | DataType::Boolean => "INTEGER",
        DataType::Text | DataType::Decimal | DataType::DateTime => "TEXT",
        DataType::Binary => "BLOB",
    }
}

fn create_table_sql(table_name: &str, schema: &Schema) -> String {
    // A lone generated integer key maps onto SQLite's rowid alias.
    let rowid_key = match schema.primary_key() {
        [index] => {
            let column = &schema.columns()[*index];
            (column.generated && column.data_type == DataType::Integer).then_some(*index)
        }
        _ => None,
    };

    let mut definitions: Vec<String> = schema
        .columns()
        .iter()
        .enumerate()
        .map(|(i, column)| {
            let mut definition = format!("{} {}", quote(&column.name), sql_type(column.data_type));
            if rowid_key == Some(i) {
                definition.push_str(" PRIMARY KEY AUTOINCREMENT");
            } else if !column.nullable {
                definition.push_str(" NOT NULL");
            }
            definition
        })
        .collect();
    if rowid_key.is_none() && schema.has_primary_key() {
        let key = schema
            .primary_key()
            .iter()
            .map(|&i| quote(&schema.columns()[i].name))
            .collect::<Vec<_>>()
            .join(", ");
        definitions.push(format!("PRIMARY KEY ({key})"));
    }
    format!(
        "CREATE TABLE IF NOT EXISTS {} ({})",
        quote(table_name),
        definitions.join(", ")
    )
}

fn decode_error(column: &str, message: impl Into<String>) -> StoreError {
    StoreError::Decode {
        column: column.to_string(),
        message: message.into(),
    }
}

fn text<'a>(column: &str, bytes: &'a [u8]) -> Result<&'a str, StoreError> {
    std::str::from_utf8(bytes).map_err(|e| decode_error(column, e.to_string()))
}

fn decode(column: &ColumnDefinition, raw: ValueRef<'_>) -> Result<Value, StoreError> {
    let name = column.name.as_str();
    let value = match (column.data_type, raw) {
        (_, ValueRef::Null) => Value::Null,
        (DataType::Integer, ValueRef::Integer(i)) => Value::Integer(i),
        (DataType::Text, ValueRef::Text(t)) => Value::Text(text(name, t)?.to_string()),
        (DataType::Decimal, ValueRef::Text(t)) => Value::Decimal(
            Decimal::from_str(text(name, t)?).map_err(|e| decode_error(name, e.to_string()))?,
        ),
        (DataType::Decimal, ValueRef::Integer(i)) => Value::Decimal(Decimal::from(i)),
        (DataType::Decimal, ValueRef::Real(f)) => Value::Decimal(
            Decimal::try_from(f).map_err(|e| decode_error(name, e.to_string()))?,
        ),
        (DataType::Boolean, ValueRef::Integer(i)) => Value::Boolean(i != 0),
        (DataType::DateTime, ValueRef::Text(t)) => Value::DateTime(
            NaiveDateTime::parse_from_str(text(name, t)?, DATETIME_FORMAT)
                .map_err(|e| decode_error(name, e.to_string()))?,
        ),
        (DataType::Binary, ValueRef::Blob(b)) => Value::Binary(b.to_vec()),
        (expected, raw) => {
            return Err(decode_error(
                name,
                format!("expected {}, found {}", expected, raw.data_type()),
            ));
        }
    };
    Ok(value)
}

fn decode_untyped(column: &str, raw: ValueRef<'_>) -> Result<Value, StoreError> {
    Ok(match raw {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Integer(i),
        ValueRef::Real(f) => {
            Value::Decimal(Decimal::try_from(f).map_err(|e| decode_error(column, e.to_string()))?)
        }
        ValueRef::Text(t) => Value::Text(text(column, t)?.to_string()),
        ValueRef::Blob(b) => Value::Binary(b.to_vec()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::table::core::value::record;
    use chrono::NaiveDate;

    fn employees_schema() -> Schema {
        Schema::new(vec![
            ColumnDefinition::new("Id", DataType::Integer).not_null().generated(),
            ColumnDefinition::new("Name", DataType::Text).not_null(),
            ColumnDefinition::new("Age", DataType::Integer),
        ])
        .unwrap()
        .with_primary_key(&["Id"])
        .unwrap()
    }

    #[test]
    fn create_table_sql_uses_rowid_for_generated_key() {
        assert_eq!(
            create_table_sql("Employees", &employees_schema()),
            "CREATE TABLE IF NOT EXISTS \"Employees\" (\"Id\" INTEGER PRIMARY KEY AUTOINCREMENT, \"Name\" TEXT NOT NULL, \"Age\" INTEGER)"
        );
    }

    #[test]
    fn create_table_sql_with_composite_key() {
        let schema = Schema::new(vec![
            ColumnDefinition::new("a", DataType::Integer).not_null(),
            ColumnDefinition::new("b", DataType::Text).not_null(),
        ])
        .unwrap()
        .with_primary_key(&["a", "b"])
        .unwrap();
        assert_eq!(
            create_table_sql("pairs", &schema),
            "CREATE TABLE IF NOT EXISTS \"pairs\" (\"a\" INTEGER NOT NULL, \"b\" TEXT NOT NULL, PRIMARY KEY (\"a\", \"b\"))"
        );
    }

    #[test]
    fn quote_escapes_double_quotes() {
        assert_eq!(quote("we\"ird"), "\"we\"\"ird\"");
    }

    #[test]
    fn values_round_trip_through_sqlite() {
        let conn = Connection::open_in_memory().unwrap();
        let schema = Schema::new(vec![
            ColumnDefinition::new("id", DataType::Integer).not_null(),
            ColumnDefinition::new("price", DataType::Decimal),
            ColumnDefinition::new("active", DataType::Boolean),
            ColumnDefinition::new("seen", DataType::DateTime),
            ColumnDefinition::new("payload", DataType::Binary),
            ColumnDefinition::new("note", DataType::Text),
        ])
        .unwrap()
        .with_primary_key(&["id"])
        .unwrap();
        SqliteStore::create_table(&conn, "things", &schema).unwrap();

        let seen = NaiveDate::from_ymd_opt(2024, 2, 29)
            .unwrap()
            .and_hms_milli_opt(13, 45, 10, 250)
            .unwrap();
        let values = record([
            ("id", Value::Integer(1)),
            ("price", Value::Decimal(Decimal::new(1999, 2))),
            ("active", Value::Boolean(true)),
            ("seen", Value::DateTime(seen)),
            ("payload", Value::Binary(vec![0, 1, 2])),
            ("note", Value::Null),
        ]);
        let mut store = SqliteStore::new(&conn, "things");
        store.insert(&values).unwrap();

        let records = store.select_all(&schema).unwrap();
        assert_eq!(records, vec![values]);
    }

    #[test]
    fn decode_reports_type_mismatch() {
        let column = ColumnDefinition::new("age", DataType::Integer);
        let result = decode(&column, ValueRef::Text(b"old"));
        assert!(matches!(result, Err(StoreError::Decode { .. })));
    }

    #[test]
    fn update_and_delete_of_missing_row_are_not_found() {
        let conn = Connection::open_in_memory().unwrap();
        SqliteStore::create_table(&conn, "Employees", &employees_schema()).unwrap();
        let mut store = SqliteStore::new(&conn, "Employees");
        let key = record([("Id", Value::Integer(42))]);
        assert!(matches!(store.delete(&key), Err(StoreError::NotFound(_))));
        assert!(matches!(
            store.update(&key, &record([("Age", Value::Integer(1))])),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn insert_reports_generated_key() {
        let conn = Connection::open_in_memory().unwrap();
        SqliteStore::create_table(&conn, "Employees", &employees_schema()).unwrap();
        let mut store = SqliteStore::new(&conn, "Employees").with_generated_key("Id");
        let first = store
            .insert(&record([("Name", Value::from("Ann")), ("Age", Value::Integer(30))]))
            .unwrap();
        let second = store.insert(&record([("Name", Value::from("Ben"))])).unwrap();
        assert_eq!(first, Some(record([("Id", Value::Integer(1))])));
        assert_eq!(second, Some(record([("Id", Value::Integer(2))])));
        let explicit = store
            .insert(&record([("Id", Value::Integer(10)), ("Name", Value::from("Cy"))]))
            .unwrap();
        assert_eq!(explicit, None);
    }
}
