//! SQLite storage gateway

use std::path::{Path, PathBuf};
use rusqlite::types::ValueRef;
use rusqlite::{params_from_iter, Connection};
use crate::statement;
use crate::value::Value;
use crate::Result;

/// Thin gateway over one SQLite connection.
///
/// Statements run inside an implicit transaction that is opened by the
/// first `execute` and closed by `commit`. The store performs no locking;
/// callers sharing it must serialize access.
pub struct SqliteStore {
    pub(super) conn: Connection,
    path: Option<PathBuf>,
}

impl SqliteStore {
    /// Open a database file (creates if doesn't exist)
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        tracing::info!("Opened database {}", path.display());
        Ok(Self {
            conn,
            path: Some(path.to_path_buf()),
        })
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self { conn, path: None })
    }

    /// Path of the database file, `None` for in-memory stores
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Execute a single statement.
    ///
    /// The engine's error is returned as-is in `Error::Storage`.
    pub fn execute(&self, sql: &str) -> Result<()> {
        self.execute_with(sql, &[])
    }

    /// Execute a single statement with positional parameters bound to `?1..?N`.
    ///
    /// If this call opened the transaction and the statement fails, the
    /// transaction is closed again; earlier pending statements are kept.
    pub fn execute_with(&self, sql: &str, values: &[Option<Value>]) -> Result<()> {
        tracing::debug!("Executing: {} ({} params)", sql, values.len());
        let opened = self.begin()?;
        if let Err(e) = self.conn.execute(sql, params_from_iter(values.iter())) {
            if opened {
                self.rollback()?;
            }
            return Err(e.into());
        }
        Ok(())
    }

    /// Execute one statement and commit it.
    ///
    /// On failure everything pending is rolled back, so the store is never
    /// left mid-transaction.
    pub fn apply(&self, sql: &str, values: &[Option<Value>]) -> Result<()> {
        let result = self.execute_with(sql, values).and_then(|()| self.commit());
        if let Err(e) = result {
            tracing::debug!("Rolling back after failure: {}", e);
            self.rollback()?;
            return Err(e);
        }
        Ok(())
    }

    /// Make prior `execute` calls durable
    pub fn commit(&self) -> Result<()> {
        if !self.conn.is_autocommit() {
            self.conn.execute_batch("COMMIT")?;
        }
        Ok(())
    }

    /// Discard statements executed since the last commit
    pub fn rollback(&self) -> Result<()> {
        if !self.conn.is_autocommit() {
            self.conn.execute_batch("ROLLBACK")?;
        }
        Ok(())
    }

    /// True when statements have run since the last commit or rollback
    pub fn in_transaction(&self) -> bool {
        !self.conn.is_autocommit()
    }

    /// Returns true if a new transaction was opened
    fn begin(&self) -> Result<bool> {
        if self.conn.is_autocommit() {
            self.conn.execute_batch("BEGIN")?;
            return Ok(true);
        }
        Ok(false)
    }

    // ========== Row Operations ==========

    /// Insert one positional row and commit
    pub fn insert(&self, table: &str, values: &[Option<Value>]) -> Result<()> {
        let sql = statement::build_insert_params(table, &[], values.len());
        self.apply(&sql, values)
    }

    /// Insert one row into the named columns and commit
    pub fn insert_columns(&self, table: &str, columns: &[&str], values: &[Option<Value>]) -> Result<()> {
        let sql = statement::build_insert_params(table, columns, values.len());
        self.apply(&sql, values)
    }

    /// Fetch every row of a table, columns in table order
    pub fn fetch_all(&self, table: &str) -> Result<Vec<Vec<Option<Value>>>> {
        let sql = format!("SELECT * FROM {}", statement::quote_ident(table));
        let mut stmt = self.conn.prepare(&sql)?;
        let width = stmt.column_count();

        let rows = stmt
            .query_map([], |row| {
                (0..width)
                    .map(|i| row.get_ref(i).map(value_from_ref))
                    .collect::<rusqlite::Result<Vec<_>>>()
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(rows)
    }

    /// Count rows in a table
    pub fn count_rows(&self, table: &str) -> Result<usize> {
        let sql = format!("SELECT COUNT(*) FROM {}", statement::quote_ident(table));
        let count: i64 = self.conn.query_row(&sql, [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

/// Blobs have no model representation and read back as their UTF-8 text
fn value_from_ref(value: ValueRef<'_>) -> Option<Value> {
    match value {
        ValueRef::Null => None,
        ValueRef::Integer(i) => Some(Value::Integer(i)),
        ValueRef::Real(r) => Some(Value::Real(r)),
        ValueRef::Text(t) | ValueRef::Blob(t) => Some(Value::Text(String::from_utf8_lossy(t).into_owned())),
    }
}
