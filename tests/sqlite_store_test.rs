mod common;

use common::{SqliteHarness, assert_records_unordered, employee, employees_schema};
use rust_decimal::Decimal;
use tablecache::db::table::core::row::RowState;
use tablecache::db::table::core::table::Table;
use tablecache::db::table::core::column::{ColumnDefinition, Schema};
use tablecache::db::table::core::value::{DataType, Record, Value, record};
use tablecache::store::StoreError;
use tablecache::store::sqlite::{SqliteStore, reconcile_in_transaction};

#[test]
fn reconcile_round_trips_through_sqlite() {
    let mut harness = SqliteHarness::new();
    let mut table = harness.load();
    let handles = table.handles();
    table
        .update(
            handles[0],
            record([("Salary", Value::Decimal(Decimal::from(90_000)))]),
        )
        .unwrap();
    table.delete(handles[1]).unwrap();
    let dana = table.insert(employee("Dana", 38_000)).unwrap();
    assert_eq!(table.get_value(dana, "Id").unwrap(), &Value::Absent);

    let result = reconcile_in_transaction(&mut harness.conn, &mut table).unwrap();

    assert!(result.is_success());
    assert_eq!(result.reconciled, 3);
    assert_eq!(table.get_value(dana, "Id").unwrap(), &Value::Integer(3));
    assert_eq!(table.find(&[Value::Integer(3)]).unwrap(), Some(dana));
    assert!(!table.has_changes());
    assert_records_unordered(harness.records(), table.to_records());
}

#[test]
fn failed_reconcile_rolls_back_store_and_table() {
    let mut harness = SqliteHarness::new();
    let mut table = harness.load();
    let alice = table.find(&[Value::Integer(1)]).unwrap().unwrap();
    let bob = table.find(&[Value::Integer(2)]).unwrap().unwrap();
    table.delete(alice).unwrap();
    table
        .update(bob, record([("Name", Value::from("Robert"))]))
        .unwrap();
    // Someone else removes Bob after the table was loaded.
    harness.execute("DELETE FROM \"Employees\" WHERE \"Id\" = 2");

    let result = reconcile_in_transaction(&mut harness.conn, &mut table).unwrap();

    assert_eq!(result.failed_at, Some(1));
    assert_eq!(result.reconciled, 0);
    assert!(matches!(result.error, Some(StoreError::NotFound(_))));
    // Alice's delete was rolled back on both sides.
    assert_eq!(harness.records().len(), 1);
    assert_eq!(table.pending_changes().count(), 2);
    assert_eq!(table.get(bob).unwrap().state(), RowState::Modified);
    assert!(table.get(alice).is_none());
    table.reject_row_changes(alice).unwrap();
    assert_eq!(table.get(alice).unwrap().state(), RowState::Unchanged);
}

#[test]
fn query_feeds_load() {
    let harness = SqliteHarness::new();
    let records = SqliteStore::query(
        &harness.conn,
        &employees_schema(),
        "SELECT \"Id\", \"Name\", \"Salary\" FROM \"Employees\" WHERE \"Id\" = ?1",
        rusqlite::params![2i64],
    )
    .unwrap();

    let table = Table::load("Employees", employees_schema(), records).unwrap();

    assert_eq!(table.len(), 1);
    let handle = table.handles()[0];
    assert_eq!(table.get_value(handle, "Name").unwrap(), &Value::from("Bob"));
    assert_eq!(
        table.get_value(handle, "Salary").unwrap(),
        &Value::Decimal(Decimal::from(72_000))
    );
    assert_eq!(table.pending_changes().count(), 0);
}

#[test]
fn query_with_extra_column_does_not_load() {
    let harness = SqliteHarness::new();
    let records = SqliteStore::query(
        &harness.conn,
        &employees_schema(),
        "SELECT \"Id\", \"Name\", \"Salary\", 1 AS \"Extra\" FROM \"Employees\"",
        &[],
    )
    .unwrap();
    assert_eq!(records[0].get("Extra"), Some(&Value::Integer(1)));

    let error = Table::load("Employees", employees_schema(), records).unwrap_err();
    assert!(error.is_schema_mismatch());
}

#[test]
fn reconcile_without_edits_leaves_database_untouched() {
    let mut harness = SqliteHarness::new();
    let before = harness.records();
    let mut table = harness.load();

    let result = reconcile_in_transaction(&mut harness.conn, &mut table).unwrap();

    assert!(result.is_success());
    assert_eq!(result.reconciled, 0);
    assert_eq!(harness.records(), before);
}

#[test]
fn omitted_column_is_not_assumed_null_after_insert() {
    let mut harness = SqliteHarness::new();
    harness.execute(
        "CREATE TABLE \"Tags\" (\"Id\" INTEGER PRIMARY KEY AUTOINCREMENT, \"Name\" TEXT DEFAULT 'anon')",
    );
    let schema = Schema::new(vec![
        ColumnDefinition::new("Id", DataType::Integer).not_null().generated(),
        ColumnDefinition::new("Name", DataType::Text),
    ])
    .unwrap()
    .with_primary_key(&["Id"])
    .unwrap();
    let mut table = Table::new("Tags", schema.clone());
    let handle = table.insert(Record::new()).unwrap();

    let result = reconcile_in_transaction(&mut harness.conn, &mut table).unwrap();

    assert!(result.is_success());
    assert!(result.write_back_errors.is_empty());
    assert_eq!(table.get_value(handle, "Id").unwrap(), &Value::Integer(1));
    assert_eq!(table.get_value(handle, "Name").unwrap(), &Value::Absent);
    assert!(!table.has_changes());
    let store = SqliteStore::new(&harness.conn, "Tags");
    assert_eq!(
        store.select_all(&schema).unwrap(),
        vec![record([("Id", Value::Integer(1)), ("Name", Value::from("anon"))])]
    );

    table
        .update(handle, record([("Name", Value::from("tagged"))]))
        .unwrap();
    reconcile_in_transaction(&mut harness.conn, &mut table).unwrap();
    assert_eq!(
        SqliteStore::new(&harness.conn, "Tags").select_all(&schema).unwrap(),
        vec![record([("Id", Value::Integer(1)), ("Name", Value::from("tagged"))])]
    );
}
