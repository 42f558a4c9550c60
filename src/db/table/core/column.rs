use crate::db::error::CacheError;
use crate::db::table::core::value::{DataType, Value};

#[derive(Debug, PartialEq, Clone)]
pub struct ColumnDefinition {
    pub name: String,
    pub data_type: DataType,
    pub nullable: bool,
    /// Assigned by the store on insert (autoincrement); may be omitted locally.
    pub generated: bool,
}

impl ColumnDefinition {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            nullable: true,
            generated: false,
        }
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn generated(mut self) -> Self {
        self.generated = true;
        self
    }

    /// Checks that `value` may be stored in this column.
    pub fn check(&self, value: &Value) -> Result<(), CacheError> {
        if !value.fits(self.data_type) {
            return Err(CacheError::schema(format!(
                "Found different data types for column `{}`: expected {}, got {:?}",
                self.name,
                self.data_type,
                value.get_type()
            )));
        }
        if value.is_null() && !self.nullable {
            return Err(CacheError::schema(format!(
                "Column `{}` does not accept NULL",
                self.name
            )));
        }
        Ok(())
    }

    /// Whether an insert may leave this column unset.
    pub fn may_be_omitted(&self) -> bool {
        self.nullable || self.generated
    }
}

/// Column list plus the primary key used to address rows in the store.
#[derive(Debug, PartialEq, Clone)]
pub struct Schema {
    columns: Vec<ColumnDefinition>,
    primary_key: Vec<usize>,
}

impl Schema {
    pub fn new(columns: Vec<ColumnDefinition>) -> Result<Self, CacheError> {
        for (i, column) in columns.iter().enumerate() {
            if columns[..i].iter().any(|c| c.name == column.name) {
                return Err(CacheError::schema(format!(
                    "Column `{}` is declared more than once",
                    column.name
                )));
            }
        }
        Ok(Self {
            columns,
            primary_key: vec![],
        })
    }

    pub fn with_primary_key(mut self, key_columns: &[&str]) -> Result<Self, CacheError> {
        let mut primary_key = Vec::with_capacity(key_columns.len());
        for name in key_columns {
            let index = self.get_index_of_column(name)?;
            if primary_key.contains(&index) {
                return Err(CacheError::schema(format!(
                    "Column `{}` appears twice in the primary key",
                    name
                )));
            }
            primary_key.push(index);
        }
        self.primary_key = primary_key;
        Ok(self)
    }

    pub fn columns(&self) -> &[ColumnDefinition] {
        &self.columns
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c.name == column)
    }

    pub fn get_index_of_column(&self, column: &str) -> Result<usize, CacheError> {
        self.columns
            .iter()
            .position(|c| c.name == column)
            .ok_or_else(|| CacheError::schema(format!("Column `{}` does not exist", column)))
    }

    pub fn get_column_names(&self) -> Vec<&String> {
        self.columns.iter().map(|c| &c.name).collect()
    }

    /// Column indices of the primary key, in declaration order of the key.
    pub fn primary_key(&self) -> &[usize] {
        &self.primary_key
    }

    pub fn has_primary_key(&self) -> bool {
        !self.primary_key.is_empty()
    }

    pub fn is_key_column(&self, index: usize) -> bool {
        self.primary_key.contains(&index)
    }

    pub fn generated_column(&self) -> Option<&ColumnDefinition> {
        self.columns.iter().find(|c| c.generated)
    }
}
