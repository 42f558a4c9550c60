pub mod delete;
pub mod find;
pub mod helpers;
pub mod insert;
pub mod load;
pub mod pending;
pub mod update;
