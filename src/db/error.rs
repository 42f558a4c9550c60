use crate::db::table::core::row::RowHandle;
use crate::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error("unknown row: {0}")]
    UnknownRow(RowHandle),

    #[error("table `{0}` does not exist")]
    UnknownTable(String),

    #[error("table `{0}` already exists")]
    DuplicateTable(String),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl CacheError {
    pub fn schema(msg: impl Into<String>) -> Self {
        CacheError::SchemaMismatch(msg.into())
    }

    pub fn is_schema_mismatch(&self) -> bool {
        matches!(self, CacheError::SchemaMismatch(_))
    }

    pub fn is_unknown_row(&self) -> bool {
        matches!(self, CacheError::UnknownRow(_))
    }

    pub fn is_unknown_table(&self) -> bool {
        matches!(self, CacheError::UnknownTable(_))
    }
}
