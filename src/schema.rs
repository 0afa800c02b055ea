//! Schema registry - model declarations checked once, at declaration time
//!
//! A model is declared with a [`ModelDefinition`]: an ordered list of
//! named field descriptors plus a [`ModelConfig`] block carrying the
//! storage handle and table name. Registration turns it into an immutable
//! [`Schema`]; everything downstream assumes the schema is well formed.

use std::collections::HashMap;
use std::rc::Rc;
use serde::{Deserialize, Serialize};
use crate::field::{ColumnType, FieldDescriptor};
use crate::model::ModelInstance;
use crate::statement;
use crate::storage::SqliteStore;
use crate::value::RawValues;
use crate::{Error, Result};

/// How instance construction treats a required field with no value
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationPolicy {
    /// Leave the field absent
    #[default]
    Lenient,
    /// Fail with `MissingRequiredField`
    Strict,
}

/// Configuration block of a model declaration
#[derive(Clone, Default)]
pub struct ModelConfig {
    pub storage: Option<Rc<SqliteStore>>,
    pub table_name: Option<String>,
    pub policy: ValidationPolicy,
}

impl ModelConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the shared storage handle
    pub fn storage(mut self, storage: Rc<SqliteStore>) -> Self {
        self.storage = Some(storage);
        self
    }

    pub fn table_name(mut self, table_name: impl Into<String>) -> Self {
        self.table_name = Some(table_name.into());
        self
    }

    pub fn policy(mut self, policy: ValidationPolicy) -> Self {
        self.policy = policy;
        self
    }
}

/// Declaration of a model, prior to registration
#[derive(Clone)]
pub struct ModelDefinition {
    pub name: String,
    pub fields: Vec<(String, FieldDescriptor)>,
    pub config: Option<ModelConfig>,
}

impl ModelDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
            config: None,
        }
    }

    /// Declare a field; declaration order is column order
    pub fn field(mut self, name: impl Into<String>, descriptor: FieldDescriptor) -> Self {
        self.fields.push((name.into(), descriptor));
        self
    }

    pub fn config(mut self, config: ModelConfig) -> Self {
        self.config = Some(config);
        self
    }
}

/// A registered, immutable model schema
pub struct Schema {
    model: String,
    table_name: String,
    fields: Vec<(String, FieldDescriptor)>,
    storage: Rc<SqliteStore>,
    policy: ValidationPolicy,
}

impl Schema {
    /// Check a declaration and build its schema.
    ///
    /// Fails with `MissingConfiguration`, `MissingStorageHandle` or
    /// `MissingTableName` (checked in that order), or `DuplicateField`.
    pub fn declare(definition: ModelDefinition) -> Result<Self> {
        let ModelDefinition { name, fields, config } = definition;

        let config = config.ok_or_else(|| Error::MissingConfiguration(name.clone()))?;
        let storage = config
            .storage
            .ok_or_else(|| Error::MissingStorageHandle(name.clone()))?;
        let table_name = config
            .table_name
            .filter(|t| !t.is_empty())
            .ok_or_else(|| Error::MissingTableName(name.clone()))?;

        for (i, (field, _)) in fields.iter().enumerate() {
            if fields[..i].iter().any(|(seen, _)| seen == field) {
                return Err(Error::DuplicateField {
                    model: name,
                    field: field.clone(),
                });
            }
        }

        tracing::debug!(
            "Declared model {} -> table {} ({} fields)",
            name,
            table_name,
            fields.len()
        );

        Ok(Self {
            model: name,
            table_name,
            fields,
            storage,
            policy: config.policy,
        })
    }

    pub fn model_name(&self) -> &str {
        &self.model
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn policy(&self) -> ValidationPolicy {
        self.policy
    }

    /// Shared storage handle; the schema never closes it
    pub fn storage(&self) -> &SqliteStore {
        &self.storage
    }

    /// Fields in declaration order
    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldDescriptor)> {
        self.fields.iter().map(|(n, d)| (n.as_str(), d))
    }

    /// Look up a field descriptor by name
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, d)| d)
    }

    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|(n, _)| n.as_str()).collect()
    }

    /// (name, column type) pairs in declaration order
    pub fn columns(&self) -> Vec<(&str, ColumnType)> {
        self.fields
            .iter()
            .map(|(n, d)| (n.as_str(), d.column_type()))
            .collect()
    }

    pub fn create_table_sql(&self) -> String {
        statement::build_create_table(&self.table_name, &self.columns())
    }

    /// Create this model's table and commit; rolls back on failure
    pub fn create_table(&self) -> Result<()> {
        tracing::info!("Creating table {} for model {}", self.table_name, self.model);
        self.storage.apply(&self.create_table_sql(), &[])
    }

    /// Construct a validated instance of this model
    pub fn instantiate(self: &Rc<Self>, raw: &RawValues) -> Result<ModelInstance> {
        ModelInstance::new(Rc::clone(self), raw)
    }

    /// Construct an instance and save it in one step
    pub fn create(self: &Rc<Self>, raw: &RawValues) -> Result<ModelInstance> {
        let instance = self.instantiate(raw)?;
        instance.save()?;
        Ok(instance)
    }
}

impl std::fmt::Debug for Schema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Schema")
            .field("model", &self.model)
            .field("table_name", &self.table_name)
            .field("fields", &self.fields)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

/// Schemas keyed by model name, in registration order
#[derive(Default)]
pub struct ModelRegistry {
    schemas: HashMap<String, Rc<Schema>>,
    order: Vec<String>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare and register a model
    pub fn register(&mut self, definition: ModelDefinition) -> Result<Rc<Schema>> {
        if self.schemas.contains_key(&definition.name) {
            return Err(Error::DuplicateModel(definition.name));
        }

        let schema = Rc::new(Schema::declare(definition)?);
        let name = schema.model_name().to_string();
        self.order.push(name.clone());
        self.schemas.insert(name, Rc::clone(&schema));
        Ok(schema)
    }

    /// Declare and register several models as one unit.
    ///
    /// Every definition is checked before any is registered, so on error
    /// the registry is left unchanged.
    pub fn register_all(&mut self, definitions: Vec<ModelDefinition>) -> Result<Vec<Rc<Schema>>> {
        let mut schemas: Vec<Rc<Schema>> = Vec::with_capacity(definitions.len());
        for definition in definitions {
            let taken = self.schemas.contains_key(&definition.name)
                || schemas.iter().any(|s| s.model_name() == definition.name);
            if taken {
                return Err(Error::DuplicateModel(definition.name));
            }
            schemas.push(Rc::new(Schema::declare(definition)?));
        }

        for schema in &schemas {
            let name = schema.model_name().to_string();
            self.order.push(name.clone());
            self.schemas.insert(name, Rc::clone(schema));
        }
        Ok(schemas)
    }

    /// Get a registered schema, or `SchemaNotReady`
    pub fn get(&self, model: &str) -> Result<Rc<Schema>> {
        self.schemas
            .get(model)
            .cloned()
            .ok_or_else(|| Error::SchemaNotReady(model.to_string()))
    }

    pub fn contains(&self, model: &str) -> bool {
        self.schemas.contains_key(model)
    }

    /// Registered model names in registration order
    pub fn models(&self) -> &[String] {
        &self.order
    }

    pub fn create_table(&self, model: &str) -> Result<()> {
        self.get(model)?.create_table()
    }

    /// Create every registered table, stopping at the first failure
    pub fn create_all_tables(&self) -> Result<()> {
        for model in &self.order {
            self.create_table(model)?;
        }
        Ok(())
    }

    pub fn instantiate(&self, model: &str, raw: &RawValues) -> Result<ModelInstance> {
        self.get(model)?.instantiate(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> Rc<SqliteStore> {
        Rc::new(SqliteStore::open_in_memory().unwrap())
    }

    fn user_definition(store: Rc<SqliteStore>) -> ModelDefinition {
        ModelDefinition::new("User")
            .field("id", FieldDescriptor::integer())
            .field("name", FieldDescriptor::text())
            .config(ModelConfig::new().storage(store).table_name("User"))
    }

    #[test]
    fn test_declare_keeps_field_order() {
        let schema = Schema::declare(user_definition(store())).unwrap();
        assert_eq!(schema.table_name(), "User");
        assert_eq!(schema.field_names(), vec!["id", "name"]);
        assert_eq!(
            schema.create_table_sql(),
            r#"create table "User" ("id" INTEGER, "name" TEXT)"#
        );
    }

    #[test]
    fn test_missing_configuration() {
        let def = ModelDefinition::new("User").field("id", FieldDescriptor::integer());
        assert!(matches!(Schema::declare(def), Err(Error::MissingConfiguration(m)) if m == "User"));
    }

    #[test]
    fn test_missing_storage_handle() {
        let def = ModelDefinition::new("User").config(ModelConfig::new().table_name("User"));
        assert!(matches!(Schema::declare(def), Err(Error::MissingStorageHandle(_))));
    }

    #[test]
    fn test_missing_table_name() {
        let def = ModelDefinition::new("User").config(ModelConfig::new().storage(store()));
        assert!(matches!(Schema::declare(def), Err(Error::MissingTableName(_))));

        let def = ModelDefinition::new("User")
            .config(ModelConfig::new().storage(store()).table_name(""));
        assert!(matches!(Schema::declare(def), Err(Error::MissingTableName(_))));
    }

    #[test]
    fn test_duplicate_field_rejected() {
        let def = user_definition(store()).field("id", FieldDescriptor::real());
        assert!(matches!(
            Schema::declare(def),
            Err(Error::DuplicateField { field, .. }) if field == "id"
        ));
    }

    #[test]
    fn test_zero_fields_is_legal() {
        let def = ModelDefinition::new("Empty")
            .config(ModelConfig::new().storage(store()).table_name("Empty"));
        let schema = Schema::declare(def).unwrap();
        assert_eq!(schema.fields().count(), 0);
    }

    #[test]
    fn test_registry_lookup() {
        let mut registry = ModelRegistry::new();
        registry.register(user_definition(store())).unwrap();

        assert!(registry.contains("User"));
        assert_eq!(registry.models(), ["User".to_string()]);
        assert!(matches!(registry.get("Post"), Err(Error::SchemaNotReady(m)) if m == "Post"));
        assert!(matches!(
            registry.register(user_definition(store())),
            Err(Error::DuplicateModel(_))
        ));
    }

    #[test]
    fn test_register_all_is_all_or_nothing() {
        let store = store();
        let mut registry = ModelRegistry::new();
        let post = ModelDefinition::new("Post")
            .field("title", FieldDescriptor::text())
            .config(ModelConfig::new().storage(Rc::clone(&store)).table_name("Post"));
        let orphan = ModelDefinition::new("Orphan").config(ModelConfig::new().storage(Rc::clone(&store)));

        let err = registry
            .register_all(vec![user_definition(Rc::clone(&store)), post.clone(), orphan])
            .unwrap_err();
        assert!(matches!(err, Error::MissingTableName(m) if m == "Orphan"));
        assert!(registry.models().is_empty());

        let err = registry
            .register_all(vec![post.clone(), post.clone()])
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateModel(m) if m == "Post"));
        assert!(!registry.contains("Post"));

        let schemas = registry
            .register_all(vec![user_definition(Rc::clone(&store)), post])
            .unwrap();
        assert_eq!(schemas.len(), 2);
        assert_eq!(registry.models(), ["User".to_string(), "Post".to_string()]);
    }

    #[test]
    fn test_failed_declaration_is_not_registered() {
        let mut registry = ModelRegistry::new();
        let def = ModelDefinition::new("User").config(ModelConfig::new().storage(store()));
        assert!(registry.register(def).is_err());
        assert!(!registry.contains("User"));
        assert!(matches!(registry.create_table("User"), Err(Error::SchemaNotReady(_))));
    }

    #[test]
    fn test_create_table_through_registry() {
        let store = store();
        let mut registry = ModelRegistry::new();
        registry.register(user_definition(Rc::clone(&store))).unwrap();
        registry.create_all_tables().unwrap();

        assert!(store.table_exists("User").unwrap());
        assert!(matches!(registry.create_table("User"), Err(Error::Storage(_))));
        assert!(!store.in_transaction());
    }
}
