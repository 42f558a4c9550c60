use crate::db::changes::{accept, reject};
use crate::db::error::CacheError;
use crate::db::table::core::column::Schema;
use crate::db::table::core::row::RowHandle;
use crate::db::table::core::table::Table;
use crate::db::table::core::value::{Record, Value};
use crate::db::table::operations::pending::PendingChanges;
use crate::db::table::operations::{delete, find, insert, load, pending, update};

pub mod core;
pub mod operations;
#[cfg(test)]
pub mod test_utils;

impl Table {
    pub fn load<I>(name: impl Into<String>, schema: Schema, records: I) -> Result<Table, CacheError>
    where
        I: IntoIterator<Item = Record>,
    {
        load::load(name, schema, records)
    }

    pub fn fill<I>(&mut self, records: I) -> Result<Vec<RowHandle>, CacheError>
    where
        I: IntoIterator<Item = Record>,
    {
        load::fill(self, records)
    }

    pub fn insert(&mut self, values: Record) -> Result<RowHandle, CacheError> {
        insert::insert(self, values)
    }

    pub fn update(&mut self, handle: RowHandle, values: Record) -> Result<(), CacheError> {
        update::update(self, handle, values)
    }

    pub fn delete(&mut self, handle: RowHandle) -> Result<(), CacheError> {
        delete::delete(self, handle)
    }

    pub fn pending_changes(&self) -> PendingChanges<'_> {
        pending::pending_changes(self)
    }

    pub fn find(&self, key: &[Value]) -> Result<Option<RowHandle>, CacheError> {
        find::find(self, key)
    }

    pub fn accept_changes(&mut self) {
        accept::accept_changes(self)
    }

    pub fn reject_changes(&mut self) {
        reject::reject_changes(self)
    }

    pub fn reject_row_changes(&mut self, handle: RowHandle) -> Result<(), CacheError> {
        reject::reject_row_changes(self, handle)
    }
}
