use crate::db::error::CacheError;
use crate::db::table::core::table::Table;
use indexmap::IndexMap;

/// Named tables loaded side by side, each reconciled on its own.
#[derive(Debug, Default, Clone)]
pub struct DataSet {
    tables: IndexMap<String, Table>,
}

impl DataSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `table` under its own name. Fails if the name is taken.
    pub fn add_table(&mut self, table: Table) -> Result<(), CacheError> {
        if self.has_table(table.name()) {
            return Err(CacheError::DuplicateTable(table.name().to_string()));
        }
        self.tables.insert(table.name().to_string(), table);
        Ok(())
    }

    pub fn has_table(&self, table_name: &str) -> bool {
        self.tables.contains_key(table_name)
    }

    pub fn get_table(&self, table_name: &str) -> Result<&Table, CacheError> {
        self.tables
            .get(table_name)
            .ok_or_else(|| CacheError::UnknownTable(table_name.to_string()))
    }

    pub fn get_table_mut(&mut self, table_name: &str) -> Result<&mut Table, CacheError> {
        self.tables
            .get_mut(table_name)
            .ok_or_else(|| CacheError::UnknownTable(table_name.to_string()))
    }

    pub fn remove_table(&mut self, table_name: &str) -> Option<Table> {
        self.tables.shift_remove(table_name)
    }

    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.tables.values()
    }

    pub fn has_changes(&self) -> bool {
        self.tables.values().any(Table::has_changes)
    }

    pub fn accept_changes(&mut self) {
        self.tables.values_mut().for_each(Table::accept_changes);
    }

    pub fn reject_changes(&mut self) {
        self.tables.values_mut().for_each(Table::reject_changes);
    }
}
