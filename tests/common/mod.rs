#![allow(dead_code)] // Each test binary only uses part of the harness.

use rusqlite::Connection;
use rust_decimal::Decimal;
use tablecache::db::table::core::column::{ColumnDefinition, Schema};
use tablecache::db::table::core::table::Table;
use tablecache::db::table::core::value::{DataType, Record, Value, record};
use tablecache::store::BackingStore;
use tablecache::store::memory::MemoryStore;
use tablecache::store::sqlite::SqliteStore;

pub fn people_schema() -> Schema {
    Schema::new(vec![
        ColumnDefinition::new("Id", DataType::Integer).not_null(),
        ColumnDefinition::new("Name", DataType::Text),
    ])
    .unwrap()
    .with_primary_key(&["Id"])
    .unwrap()
}

pub fn person(id: i64, name: &str) -> Record {
    record([("Id", Value::Integer(id)), ("Name", Value::from(name))])
}

pub fn people() -> Vec<Record> {
    vec![person(1, "Alice"), person(2, "Bob")]
}

pub fn people_table() -> Table {
    Table::load("People", people_schema(), people()).unwrap()
}

/// Store already holding what [`people_table`] loaded.
pub fn people_store() -> MemoryStore {
    MemoryStore::new(&["Id"]).with_rows(people())
}

pub fn employees_schema() -> Schema {
    Schema::new(vec![
        ColumnDefinition::new("Id", DataType::Integer).not_null().generated(),
        ColumnDefinition::new("Name", DataType::Text).not_null(),
        ColumnDefinition::new("Salary", DataType::Decimal).not_null(),
    ])
    .unwrap()
    .with_primary_key(&["Id"])
    .unwrap()
}

pub fn employee(name: &str, salary: i64) -> Record {
    record([
        ("Name", Value::from(name)),
        ("Salary", Value::Decimal(Decimal::from(salary))),
    ])
}

/// An in-memory SQLite database with a seeded `Employees` table.
pub struct SqliteHarness {
    pub conn: Connection,
}

impl SqliteHarness {
    pub fn new() -> Self {
        let conn = Connection::open_in_memory().expect("Failed to create in-memory SQLite DB");
        SqliteStore::create_table(&conn, "Employees", &employees_schema()).unwrap();
        let mut store = SqliteStore::new(&conn, "Employees");
        for values in [employee("Alice", 85_000), employee("Bob", 72_000)] {
            store.insert(&values).unwrap();
        }
        Self { conn }
    }

    pub fn records(&self) -> Vec<Record> {
        SqliteStore::new(&self.conn, "Employees")
            .select_all(&employees_schema())
            .unwrap()
    }

    pub fn load(&self) -> Table {
        Table::load("Employees", employees_schema(), self.records()).unwrap()
    }

    pub fn execute(&self, sql: &str) {
        self.conn.execute_batch(sql).expect("SQLite statement failed");
    }
}

pub fn assert_records_unordered(mut expected: Vec<Record>, mut actual: Vec<Record>) {
    assert_eq!(expected.len(), actual.len());
    expected.sort_by_key(|r| format!("{r:?}"));
    actual.sort_by_key(|r| format!("{r:?}"));
    assert_eq!(expected, actual);
}
