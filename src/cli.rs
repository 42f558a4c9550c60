use chrono::NaiveDate;
use clap::Parser;
use rusqlite::Connection;
use rust_decimal::Decimal;

use tablecache::db::dataset::DataSet;
use tablecache::db::error::CacheError;
use tablecache::db::reconcile::plan;
use tablecache::db::table::core::column::{ColumnDefinition, Schema};
use tablecache::db::table::core::table::Table;
use tablecache::db::table::core::value::{DataType, Record, Value, record};
use tablecache::store::{BackingStore, StoreError};
use tablecache::store::sqlite::{SqliteStore, reconcile_in_transaction};

const EMPLOYEES: &str = "Employees";

#[derive(Parser, Debug)]
#[command(
    name = "tablecache",
    about = "Edit an employee table offline, then reconcile it with SQLite"
)]
pub struct Cli {
    /// SQLite database file
    #[arg(long, default_value = ":memory:", env = "TABLECACHE_DATABASE")]
    pub database: String,

    /// Print the reconciled table as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
}

fn employees_schema() -> Result<Schema, CacheError> {
    Schema::new(vec![
        ColumnDefinition::new("Id", DataType::Integer).not_null().generated(),
        ColumnDefinition::new("Name", DataType::Text).not_null(),
        ColumnDefinition::new("Position", DataType::Text),
        ColumnDefinition::new("Salary", DataType::Decimal).not_null(),
        ColumnDefinition::new("HireDate", DataType::DateTime),
    ])?
    .with_primary_key(&["Id"])
}

fn employee(name: &str, position: &str, salary: i64, hired: (i32, u32, u32)) -> Record {
    let (year, month, day) = hired;
    let hire_date = NaiveDate::from_ymd_opt(year, month, day).and_then(|d| d.and_hms_opt(9, 0, 0));
    record([
        ("Name", Value::from(name)),
        ("Position", Value::from(position)),
        ("Salary", Value::Decimal(Decimal::new(salary, 0))),
        ("HireDate", Value::from(hire_date)),
    ])
}

fn seed(conn: &Connection, schema: &Schema) -> Result<Vec<Record>, StoreError> {
    let mut store = SqliteStore::new(conn, EMPLOYEES);
    let existing = store.select_all(schema)?;
    if !existing.is_empty() {
        return Ok(existing);
    }
    tracing::info!(table = EMPLOYEES, "seeding empty table");
    for values in [
        employee("Alice", "Manager", 85_000, (2019, 3, 1)),
        employee("Bob", "Developer", 72_000, (2020, 7, 15)),
        employee("Cara", "Analyst", 64_000, (2022, 1, 10)),
    ] {
        store.insert(&values)?;
    }
    store.select_all(schema)
}

fn print_table(title: &str, table: &Table) {
    println!("{title}");
    let header = table
        .schema()
        .get_column_names()
        .into_iter()
        .map(String::as_str)
        .collect::<Vec<_>>();
    println!("  {}", header.join(" | "));
    for row in table.iter() {
        let cells = row.current().iter().map(Value::to_string).collect::<Vec<_>>();
        println!("  {}  [{:?}]", cells.join(" | "), row.state());
    }
}

pub fn run(cli: Cli) -> Result<(), CliError> {
    let mut conn = Connection::open(&cli.database).map_err(StoreError::from)?;
    let schema = employees_schema()?;
    SqliteStore::create_table(&conn, EMPLOYEES, &schema)?;
    let records = seed(&conn, &schema)?;

    let mut dataset = DataSet::new();
    dataset.add_table(Table::load(EMPLOYEES, schema, records)?)?;
    let table = dataset.get_table_mut(EMPLOYEES)?;
    print_table("Loaded:", table);

    let handles = table.handles();
    if let Some(&first) = handles.first() {
        let salary = table.get_value(first, "Salary")?.clone();
        let raised = match salary {
            Value::Decimal(d) => Value::Decimal(d + Decimal::new(5_000, 0)),
            other => other,
        };
        table.update(first, record([("Salary", raised)]))?;
    }
    if let Some(&second) = handles.get(1) {
        table.delete(second)?;
    }
    table.insert(employee("Dana", "Intern", 38_000, (2024, 9, 2)))?;
    print_table("Edited offline:", table);

    println!("Pending operations:");
    for step in plan(table)? {
        match step.operation {
            Some(operation) => println!("  {operation}"),
            None => println!("  (settled locally)"),
        }
    }

    let result = reconcile_in_transaction(&mut conn, table)?;
    match (&result.failed_at, &result.error) {
        (Some(index), Some(error)) => {
            println!("Reconcile failed at operation {index}: {error}; nothing was written")
        }
        _ => println!("Reconciled {} row(s)", result.reconciled),
    }
    for (index, error) in &result.write_back_errors {
        println!("Operation {index} applied, but its result was not written back: {error}");
    }
    print_table("After reconcile:", table);

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&table.to_records())?);
    }
    Ok(())
}
