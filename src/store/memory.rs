use crate::db::table::core::column::Schema;
use crate::db::table::core::value::{Record, Value};
use crate::store::{BackingStore, StoreError, StoreOperation, describe};

/// Store kept in a `Vec`, recording every operation it is sent.
///
/// Useful as a reference sink and for exercising failure paths with
/// [`MemoryStore::fail_at`]. Built with [`MemoryStore::for_schema`] it also
/// stores full rows, so [`MemoryStore::records`] can feed `Table::load`.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    key_columns: Vec<String>,
    /// When set, inserts fill omitted columns with NULL and reject unknown ones.
    columns: Vec<String>,
    rows: Vec<Record>,
    log: Vec<StoreOperation>,
    generated: Option<(String, i64)>,
    fail_at: Option<usize>,
}

impl MemoryStore {
    pub fn new(key_columns: &[&str]) -> Self {
        Self {
            key_columns: key_columns.iter().map(|c| c.to_string()).collect(),
            ..Self::default()
        }
    }

    /// Store shaped like `schema`: keyed by its primary key, with its generated
    /// column counting from 1.
    pub fn for_schema(schema: &Schema) -> Self {
        let columns = schema.columns();
        Self {
            key_columns: schema
                .primary_key()
                .iter()
                .map(|&i| columns[i].name.clone())
                .collect(),
            columns: columns.iter().map(|c| c.name.clone()).collect(),
            generated: schema.generated_column().map(|c| (c.name.clone(), 1)),
            ..Self::default()
        }
    }

    pub fn with_rows(mut self, rows: Vec<Record>) -> Self {
        self.rows = rows;
        self
    }

    /// Assigns `column` from a counter starting at `start` whenever an insert
    /// leaves it out.
    pub fn with_generated_key(mut self, column: &str, start: i64) -> Self {
        self.generated = Some((column.to_string(), start));
        self
    }

    /// Makes the `call`-th operation (zero-based) fail with `Rejected`.
    pub fn fail_at(mut self, call: usize) -> Self {
        self.fail_at = Some(call);
        self
    }

    pub fn rows(&self) -> &[Record] {
        &self.rows
    }

    /// Every operation received, including a rejected one.
    pub fn operations(&self) -> &[StoreOperation] {
        &self.log
    }

    pub fn records(&self) -> Vec<Record> {
        self.rows.clone()
    }

    fn receive(&mut self, operation: StoreOperation) -> Result<(), StoreError> {
        let call = self.log.len();
        let rejected = self.fail_at == Some(call);
        if rejected {
            tracing::debug!(call, %operation, "memory store rejecting operation");
        }
        self.log.push(operation);
        if rejected {
            return Err(StoreError::rejected(format!("injected failure at call {call}")));
        }
        Ok(())
    }

    fn position_of(&self, key: &Record) -> Option<usize> {
        self.rows.iter().position(|row| {
            key.iter()
                .all(|(column, value)| row.get(column) == Some(value))
        })
    }

    fn key_of(&self, values: &Record) -> Option<Record> {
        self.key_columns
            .iter()
            .map(|c| values.get(c).map(|v| (c.clone(), v.clone())))
            .collect()
    }
}

impl BackingStore for MemoryStore {
    fn delete(&mut self, key: &Record) -> Result<(), StoreError> {
        self.receive(StoreOperation::Delete { key: key.clone() })?;
        let position = self.position_of(key).ok_or_else(|| StoreError::not_found(key))?;
        self.rows.remove(position);
        Ok(())
    }

    fn update(&mut self, key: &Record, changes: &Record) -> Result<(), StoreError> {
        self.receive(StoreOperation::Update {
            key: key.clone(),
            changes: changes.clone(),
        })?;
        let position = self.position_of(key).ok_or_else(|| StoreError::not_found(key))?;
        let row = &mut self.rows[position];
        for (column, value) in changes {
            row.insert(column.clone(), value.clone());
        }
        Ok(())
    }

    fn insert(&mut self, values: &Record) -> Result<Option<Record>, StoreError> {
        self.receive(StoreOperation::Insert {
            values: values.clone(),
        })?;
        if !self.columns.is_empty()
            && let Some(unknown) = values.keys().find(|c| !self.columns.contains(*c))
        {
            return Err(StoreError::rejected(format!("no column `{unknown}`")));
        }

        let mut row = values.clone();
        let mut generated_key = None;
        if let Some((column, next)) = &self.generated
            && !row.contains_key(column.as_str())
        {
            row.insert(column.clone(), Value::Integer(*next));
            generated_key = Some(Record::from([(column.clone(), Value::Integer(*next))]));
        }
        for column in &self.columns {
            if !row.contains_key(column.as_str()) {
                row.insert(column.clone(), Value::Null);
            }
        }
        if !self.key_columns.is_empty()
            && let Some(key) = self.key_of(&row)
            && self.position_of(&key).is_some()
        {
            return Err(StoreError::rejected(format!(
                "duplicate key {}",
                describe(&key)
            )));
        }

        if generated_key.is_some()
            && let Some((_, next)) = &mut self.generated
        {
            *next += 1;
        }
        self.rows.push(row);
        Ok(generated_key)
    }
}
