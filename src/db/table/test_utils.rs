use crate::db::table::core::column::{ColumnDefinition, Schema};
use crate::db::table::core::table::Table;
use crate::db::table::core::value::{DataType, Record, Value, record};
use rust_decimal::Decimal;

pub fn users_schema() -> Schema {
    Schema::new(vec![
        ColumnDefinition::new("id", DataType::Integer).not_null(),
        ColumnDefinition::new("name", DataType::Text),
        ColumnDefinition::new("age", DataType::Integer).not_null(),
        ColumnDefinition::new("money", DataType::Decimal),
    ])
    .unwrap()
    .with_primary_key(&["id"])
    .unwrap()
}

pub fn user(id: i64, name: Option<&str>, age: i64, money: i64) -> Record {
    record([
        ("id", Value::Integer(id)),
        ("name", Value::from(name)),
        ("age", Value::Integer(age)),
        ("money", Value::Decimal(Decimal::from(money))),
    ])
}

pub fn default_records() -> Vec<Record> {
    vec![
        user(1, Some("John"), 25, 1000),
        user(2, Some("Jane"), 30, 2000),
        user(3, Some("Jim"), 35, 3000),
        user(4, None, 40, 4000),
    ]
}

pub fn default_table() -> Table {
    Table::load("users", users_schema(), default_records()).unwrap()
}
