//! Field values - raw inputs and validated outputs share one representation

use rusqlite::types::ToSqlOutput;
use rusqlite::ToSql;
use std::collections::HashMap;
use std::fmt;

/// A single scalar value as it flows into a model or out of validation.
///
/// Absence is modelled with `Option<Value>`, never with a variant here.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Integer(i64),
    Real(f64),
    Text(String),
}

impl Value {
    /// Convert a JSON value into a raw value.
    ///
    /// `null` becomes absent, booleans become `0`/`1`, arrays and objects
    /// are kept as their JSON text.
    pub fn from_json(json: &serde_json::Value) -> Option<Self> {
        match json {
            serde_json::Value::Null => None,
            serde_json::Value::Bool(b) => Some(Value::Integer(i64::from(*b))),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Some(Value::Integer(i)),
                None => n.as_f64().map(Value::Real),
            },
            serde_json::Value::String(s) => Some(Value::Text(s.clone())),
            other => Some(Value::Text(other.to_string())),
        }
    }

    /// Short type name used in diagnostics
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Integer(_) => "integer",
            Value::Real(_) => "real",
            Value::Text(_) => "text",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(i) => write!(f, "{i}"),
            Value::Real(r) => f.write_str(&format_real(*r)),
            Value::Text(s) => f.write_str(s),
        }
    }
}

/// Shortest round-trip text for a real.
///
/// Magnitudes below 1e-4 or from 1e16 up use exponent form with a signed,
/// two-digit exponent (`1e+20`, `1.5e-07`); whole numbers otherwise keep a
/// trailing `.0` so they never read back as integers.
fn format_real(r: f64) -> String {
    if r.is_nan() {
        return "nan".to_string();
    }
    if r.is_infinite() {
        return if r > 0.0 { "inf" } else { "-inf" }.to_string();
    }

    let magnitude = r.abs();
    if magnitude != 0.0 && !(1e-4..1e16).contains(&magnitude) {
        let exp_form = format!("{r:e}");
        if let Some((mantissa, exponent)) = exp_form.split_once('e') {
            if let Ok(exponent) = exponent.parse::<i32>() {
                let sign = if exponent < 0 { '-' } else { '+' };
                return format!("{mantissa}e{sign}{:02}", exponent.abs());
            }
        }
        return exp_form;
    }

    let plain = format!("{r}");
    if plain.contains('.') {
        plain
    } else {
        format!("{plain}.0")
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Real(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Value::Integer(i) => ToSqlOutput::from(*i),
            Value::Real(r) => ToSqlOutput::from(*r),
            Value::Text(s) => ToSqlOutput::from(s.as_str()),
        })
    }
}

/// Raw field values supplied to a model constructor, keyed by field name.
///
/// Fields that are not set are treated as absent.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RawValues {
    pub values: HashMap<String, Value>,
}

impl RawValues {
    /// Create an empty set of raw values
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a named value
    pub fn with(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.values.insert(name.to_string(), value.into());
        self
    }

    /// Build raw values from a JSON object; `null` members are left absent.
    ///
    /// Returns `None` if `json` is not an object.
    pub fn from_json_object(json: &serde_json::Value) -> Option<Self> {
        let object = json.as_object()?;
        let values = object
            .iter()
            .filter_map(|(k, v)| Value::from_json(v).map(|v| (k.clone(), v)))
            .collect();
        Some(Self { values })
    }

    /// Look up a raw value by field name
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Field names present in this set
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }
}
