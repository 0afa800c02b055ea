//! Field descriptors - one declared column of a model
//!
//! Every descriptor carries a primitive type from a closed set:
//! - `Integer` -> `INTEGER` column
//! - `Text` -> `TEXT` column
//! - `Real` -> `REAL` column

use crate::value::Value;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Primitive types a field may declare
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrimitiveType {
    Integer,
    Text,
    Real,
}

impl PrimitiveType {
    /// Get the string representation of the primitive type
    pub fn as_str(&self) -> &'static str {
        match self {
            PrimitiveType::Integer => "integer",
            PrimitiveType::Text => "text",
            PrimitiveType::Real => "real",
        }
    }

    /// Get all primitive types
    pub fn all() -> &'static [PrimitiveType] {
        &[PrimitiveType::Integer, PrimitiveType::Text, PrimitiveType::Real]
    }
}

impl FromStr for PrimitiveType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "integer" | "int" => Ok(PrimitiveType::Integer),
            "text" | "str" | "string" => Ok(PrimitiveType::Text),
            "real" | "float" | "double" => Ok(PrimitiveType::Real),
            _ => Err(Error::UnknownPrimitiveType(s.to_string())),
        }
    }
}

impl fmt::Display for PrimitiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Storage column types understood by the SQL engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnType {
    Integer,
    Text,
    Real,
}

impl ColumnType {
    /// Fixed mapping from primitive type to column type
    pub fn for_primitive(primitive: PrimitiveType) -> Self {
        match primitive {
            PrimitiveType::Integer => ColumnType::Integer,
            PrimitiveType::Text => ColumnType::Text,
            PrimitiveType::Real => ColumnType::Real,
        }
    }

    /// SQL keyword for this column type
    pub fn as_sql(&self) -> &'static str {
        match self {
            ColumnType::Integer => "INTEGER",
            ColumnType::Text => "TEXT",
            ColumnType::Real => "REAL",
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// Declared type, required-ness and default of a single column.
///
/// Descriptors are immutable once built; the builder methods consume `self`.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    pub primitive_type: PrimitiveType,
    pub required: bool,
    /// Stored for reference only; validation never substitutes it
    pub default: Option<Value>,
}

impl FieldDescriptor {
    /// Create a required field of the given type
    pub fn new(primitive_type: PrimitiveType) -> Self {
        Self {
            primitive_type,
            required: true,
            default: None,
        }
    }

    pub fn integer() -> Self {
        Self::new(PrimitiveType::Integer)
    }

    pub fn text() -> Self {
        Self::new(PrimitiveType::Text)
    }

    pub fn real() -> Self {
        Self::new(PrimitiveType::Real)
    }

    /// Mark the field as optional
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// Set the declared default
    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }

    /// Column type this field maps to
    pub fn column_type(&self) -> ColumnType {
        ColumnType::for_primitive(self.primitive_type)
    }

    /// Validate and coerce a raw value.
    ///
    /// An absent value stays absent whether or not the field is required;
    /// the declared default is not applied. A present value is coerced to
    /// the declared type or rejected with `InvalidFieldType`.
    pub fn validate(&self, raw: Option<&Value>) -> Result<Option<Value>> {
        match raw {
            None => Ok(None),
            Some(value) => self.coerce(value).map(Some),
        }
    }

    fn coerce(&self, value: &Value) -> Result<Value> {
        let coerced = match (self.primitive_type, value) {
            (PrimitiveType::Integer, Value::Integer(i)) => Some(Value::Integer(*i)),
            (PrimitiveType::Integer, Value::Real(r)) => real_to_integer(*r).map(Value::Integer),
            (PrimitiveType::Integer, Value::Text(s)) => s.trim().parse().ok().map(Value::Integer),

            (PrimitiveType::Real, Value::Integer(i)) => Some(Value::Real(*i as f64)),
            (PrimitiveType::Real, Value::Real(r)) => Some(Value::Real(*r)),
            (PrimitiveType::Real, Value::Text(s)) => s.trim().parse().ok().map(Value::Real),

            (PrimitiveType::Text, Value::Text(s)) => Some(Value::Text(s.clone())),
            (PrimitiveType::Text, other) => Some(Value::Text(other.to_string())),
        };

        coerced.ok_or_else(|| Error::InvalidFieldType {
            field: None,
            expected: self.primitive_type,
            found: format!("{} {:?}", value.type_name(), value.to_string()),
        })
    }
}

/// Truncate toward zero; non-finite and out-of-range reals have no integer form
fn real_to_integer(r: f64) -> Option<i64> {
    let t = r.trunc();
    if t.is_finite() && t >= i64::MIN as f64 && t < i64::MAX as f64 {
        Some(t as i64)
    } else {
        None
    }
}
