//! The store side of reconciliation.
//!
//! The cache never talks to a database directly. [`reconcile`] hands each
//! derived [`StoreOperation`] to a [`BackingStore`], one call per row, and
//! reads back only success or failure.
//!
//! [`reconcile`]: crate::db::reconcile::reconcile

use std::fmt;

use crate::db::table::core::value::Record;

pub mod memory;
pub mod sqlite;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Delete or update addressed a key the store does not have. Usually
    /// someone else changed the row since it was loaded.
    #[error("no row matched key {0}")]
    NotFound(String),

    #[error("operation rejected: {0}")]
    Rejected(String),

    #[error("cannot decode column `{column}`: {message}")]
    Decode { column: String, message: String },

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

impl StoreError {
    pub fn rejected(msg: impl Into<String>) -> Self {
        StoreError::Rejected(msg.into())
    }

    pub fn not_found(key: &Record) -> Self {
        StoreError::NotFound(describe(key))
    }
}

/// Sink for reconciled rows. Each call is one atomic remote operation.
pub trait BackingStore {
    fn delete(&mut self, key: &Record) -> Result<(), StoreError>;

    fn update(&mut self, key: &Record, changes: &Record) -> Result<(), StoreError>;

    /// Returns the key columns the store assigned, if any.
    fn insert(&mut self, values: &Record) -> Result<Option<Record>, StoreError>;
}

impl<S: BackingStore + ?Sized> BackingStore for &mut S {
    fn delete(&mut self, key: &Record) -> Result<(), StoreError> {
        (**self).delete(key)
    }

    fn update(&mut self, key: &Record, changes: &Record) -> Result<(), StoreError> {
        (**self).update(key, changes)
    }

    fn insert(&mut self, values: &Record) -> Result<Option<Record>, StoreError> {
        (**self).insert(values)
    }
}

#[derive(Debug, PartialEq, Clone)]
pub enum StoreOperation {
    Delete { key: Record },
    Update { key: Record, changes: Record },
    Insert { values: Record },
}

impl StoreOperation {
    pub fn kind(&self) -> &'static str {
        match self {
            StoreOperation::Delete { .. } => "delete",
            StoreOperation::Update { .. } => "update",
            StoreOperation::Insert { .. } => "insert",
        }
    }

    /// Sends this operation to `store`.
    pub fn apply<S: BackingStore + ?Sized>(
        &self,
        store: &mut S,
    ) -> Result<Option<Record>, StoreError> {
        match self {
            StoreOperation::Delete { key } => store.delete(key).map(|_| None),
            StoreOperation::Update { key, changes } => store.update(key, changes).map(|_| None),
            StoreOperation::Insert { values } => store.insert(values),
        }
    }
}

impl fmt::Display for StoreOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreOperation::Delete { key } => write!(f, "delete({})", describe(key)),
            StoreOperation::Update { key, changes } => {
                write!(f, "update({}, {{{}}})", describe(key), describe(changes))
            }
            StoreOperation::Insert { values } => write!(f, "insert({{{}}})", describe(values)),
        }
    }
}

pub(crate) fn describe(record: &Record) -> String {
    record
        .iter()
        .map(|(column, value)| format!("{column}={value}"))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::table::core::value::{Value, record};

    #[test]
    fn operations_display_like_calls() {
        let delete = StoreOperation::Delete {
            key: record([("Id", Value::Integer(2))]),
        };
        assert_eq!(delete.to_string(), "delete(Id=2)");
        let update = StoreOperation::Update {
            key: record([("Id", Value::Integer(1))]),
            changes: record([("Name", Value::from("Alicia"))]),
        };
        assert_eq!(update.to_string(), "update(Id=1, {Name='Alicia'})");
        let insert = StoreOperation::Insert {
            values: record([("Id", Value::Integer(3)), ("Name", Value::from("Cara"))]),
        };
        assert_eq!(insert.to_string(), "insert({Id=3, Name='Cara'})");
    }
}
