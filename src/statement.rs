//! Statement builder - pure SQL text generation
//!
//! Nothing here touches a connection. The gateway in [`crate::storage`]
//! executes what these functions produce.

use crate::field::ColumnType;
use crate::value::Value;

/// Wrap an identifier in double quotes, doubling any embedded quote
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Render a value as a type-aware SQL literal.
///
/// Integers and reals are emitted bare, text is single-quoted with
/// embedded quotes doubled, absent values become `NULL`.
pub fn sql_literal(value: Option<&Value>) -> String {
    match value {
        None => "NULL".to_string(),
        Some(Value::Integer(i)) => i.to_string(),
        Some(Value::Real(r)) if r.is_finite() => Value::Real(*r).to_string(),
        // SQLite has no literal for inf/nan
        Some(Value::Real(_)) => "NULL".to_string(),
        Some(Value::Text(s)) => format!("'{}'", s.replace('\'', "''")),
    }
}

/// Build a `CREATE TABLE` statement; columns appear in the given order.
///
/// An empty column list is not rejected here; the engine decides.
pub fn build_create_table(table_name: &str, columns: &[(&str, ColumnType)]) -> String {
    let columns = columns
        .iter()
        .map(|(name, column_type)| format!("{} {}", quote_ident(name), column_type.as_sql()))
        .collect::<Vec<_>>()
        .join(", ");
    format!("create table {} ({})", quote_ident(table_name), columns)
}

/// Build an `INSERT` statement with every value written as a double-quoted
/// literal, whatever its type.
///
/// Embedded quotes are not escaped and nothing is bound, so this form must
/// only be used with trusted values. [`build_insert_params`] is what the
/// gateway executes.
pub fn build_insert(table_name: &str, values: &[Value]) -> String {
    let values = values
        .iter()
        .map(|v| format!("\"{v}\""))
        .collect::<Vec<_>>()
        .join(", ");
    format!("insert into {} values ({})", quote_ident(table_name), values)
}

/// Build a parameterized `INSERT` with numbered placeholders (`?1`, `?2`, ...).
///
/// With no column names the column list is omitted and `count` placeholders
/// are emitted, matching positional inserts. A row with nothing to bind
/// becomes `default values`.
pub fn build_insert_params(table_name: &str, columns: &[&str], count: usize) -> String {
    if count == 0 {
        return format!("insert into {} default values", quote_ident(table_name));
    }

    let placeholders = (1..=count)
        .map(|i| format!("?{i}"))
        .collect::<Vec<_>>()
        .join(", ");

    if columns.is_empty() {
        format!("insert into {} values ({})", quote_ident(table_name), placeholders)
    } else {
        let columns = columns
            .iter()
            .map(|c| quote_ident(c))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "insert into {} ({}) values ({})",
            quote_ident(table_name),
            columns,
            placeholders
        )
    }
}
