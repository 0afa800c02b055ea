//! Model instances - validated field values bound to a schema

use std::rc::Rc;
use crate::schema::{Schema, ValidationPolicy};
use crate::value::{RawValues, Value};
use crate::{Error, Result};

/// One record of a model.
///
/// Holds a validated value (or absence) for every declared field, in
/// declaration order.
#[derive(Debug, Clone)]
pub struct ModelInstance {
    schema: Rc<Schema>,
    values: Vec<(String, Option<Value>)>,
}

impl ModelInstance {
    /// Validate raw values against a schema.
    ///
    /// Missing fields are absent. Keys the schema does not declare are
    /// ignored. Under `ValidationPolicy::Strict` a required field with no
    /// value fails with `MissingRequiredField`.
    pub fn new(schema: Rc<Schema>, raw: &RawValues) -> Result<Self> {
        for name in raw.names() {
            if schema.field(name).is_none() {
                tracing::warn!(
                    "Ignoring undeclared field '{}' for model {}",
                    name,
                    schema.model_name()
                );
            }
        }

        let mut values = Vec::new();
        for (name, descriptor) in schema.fields() {
            let raw_value = raw.get(name);
            if raw_value.is_none()
                && descriptor.required
                && schema.policy() == ValidationPolicy::Strict
            {
                return Err(Error::MissingRequiredField(name.to_string()));
            }

            let value = descriptor.validate(raw_value).map_err(|e| e.in_field(name))?;
            values.push((name.to_string(), value));
        }

        Ok(Self { schema, values })
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Validated value of a field; `None` if absent or undeclared
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values
            .iter()
            .find(|(n, _)| n == name)
            .and_then(|(_, v)| v.as_ref())
    }

    /// (field, value) pairs in declaration order
    pub fn values(&self) -> &[(String, Option<Value>)] {
        &self.values
    }

    /// Insert this instance as a new row and commit.
    ///
    /// A model without fields inserts a row of column defaults.
    pub fn save(&self) -> Result<()> {
        let columns: Vec<&str> = self.values.iter().map(|(n, _)| n.as_str()).collect();
        let values: Vec<Option<Value>> = self.values.iter().map(|(_, v)| v.clone()).collect();
        self.schema
            .storage()
            .insert_columns(self.schema.table_name(), &columns, &values)
    }
}
