//! Storage Layer - SQLite gateway
//!
//! The only code that talks to the engine:
//! - execute / commit / rollback of statement text
//! - positional and named-column inserts with bound values
//! - introspection of created tables (sqlite_master, table_info)

pub mod introspect;
pub mod sqlite;

pub use introspect::ColumnInfo;
pub use sqlite::SqliteStore;
