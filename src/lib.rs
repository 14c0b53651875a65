pub mod commands;
pub mod config;
pub mod db;
pub mod db_types;
pub mod error;
pub mod parser;
pub mod protocol;
pub mod records;
pub mod render;
pub mod schema;
pub mod shell;
pub mod storage;

pub use commands::{DbCommand, DbResult};
pub use db::{AutoConfirm, Confirm, Database};
pub use db_types::{Column, ColumnType, Predicate, Record, TableSchema, Value};
pub use error::{DbError, StorageError};
pub use schema::SchemaStore;
pub use storage::{JsonFileStore, Key, MemoryStore, Storage};
