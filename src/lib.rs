//! # Modelite - declarative models over SQLite
//!
//! Declare a record schema once and derive from it:
//! - a `CREATE TABLE` statement with the right column types
//! - per-instance validation and coercion of field values
//!
//! Modelite provides:
//! - Field descriptors with a fixed primitive-to-column type mapping
//! - A schema registry that rejects incomplete model declarations up front
//! - Pure statement builders for `CREATE TABLE` and `INSERT`
//! - A thin SQLite gateway (execute, commit, introspect)
//! - TOML model declarations for config-driven setups

pub mod value;
pub mod field;
pub mod statement;
pub mod storage;
pub mod schema;
pub mod model;
pub mod config;

// Re-exports for convenient access
pub use value::{RawValues, Value};
pub use field::{ColumnType, FieldDescriptor, PrimitiveType};
pub use schema::{ModelConfig, ModelDefinition, ModelRegistry, Schema, ValidationPolicy};
pub use model::ModelInstance;
pub use storage::SqliteStore;

/// Result type alias for Modelite operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for Modelite operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Model {0} has no configuration block")]
    MissingConfiguration(String),

    #[error("Model {0} has no storage handle")]
    MissingStorageHandle(String),

    #[error("Model {0} has no table name")]
    MissingTableName(String),

    #[error("Invalid {expected} value {found}{}", field_suffix(.field))]
    InvalidFieldType {
        field: Option<String>,
        expected: PrimitiveType,
        found: String,
    },

    #[error("Unknown primitive type: {0}")]
    UnknownPrimitiveType(String),

    #[error("Required field '{0}' is missing")]
    MissingRequiredField(String),

    #[error("No schema registered for model {0}")]
    SchemaNotReady(String),

    #[error("Model {model} declares field '{field}' twice")]
    DuplicateField { model: String, field: String },

    #[error("Model {0} is already registered")]
    DuplicateModel(String),

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),
}

fn field_suffix(field: &Option<String>) -> String {
    match field {
        Some(f) => format!(" for field '{f}'"),
        None => String::new(),
    }
}

impl Error {
    /// Attach a field name to an `InvalidFieldType` error
    pub fn in_field(self, name: &str) -> Self {
        match self {
            Error::InvalidFieldType { expected, found, .. } => Error::InvalidFieldType {
                field: Some(name.to_string()),
                expected,
                found,
            },
            other => other,
        }
    }
}
