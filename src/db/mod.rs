pub mod changes;
pub mod dataset;
pub mod error;
pub mod reconcile;
pub mod table;
