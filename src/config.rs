use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use crate::field::{FieldDescriptor, PrimitiveType};
use crate::schema::{ModelConfig, ModelDefinition, ModelRegistry, Schema, ValidationPolicy};
use crate::storage::SqliteStore;
use crate::value::Value;

/// Model declarations loaded from a TOML file
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct OrmConfig {
    pub database: Option<String>,
    #[serde(default)]
    pub models: Vec<ModelSpec>,
    /// Directory of the file this config was loaded from
    #[serde(skip)]
    pub root: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSpec {
    pub name: String,
    pub table_name: Option<String>,
    #[serde(default)]
    pub policy: ValidationPolicy,
    #[serde(default)]
    pub fields: Vec<FieldSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default = "default_required")]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
}

fn default_required() -> bool {
    true
}

impl FieldSpec {
    /// Build the descriptor; an unrecognised `type` fails with `UnknownPrimitiveType`
    pub fn descriptor(&self) -> crate::Result<FieldDescriptor> {
        let primitive: PrimitiveType = self.type_name.parse()?;
        let mut descriptor = FieldDescriptor::new(primitive);
        descriptor.required = self.required;
        descriptor.default = self.default.as_ref().and_then(Value::from_json);
        Ok(descriptor)
    }
}

impl ModelSpec {
    /// Turn this entry into a model definition bound to `store`
    pub fn definition(&self, store: Rc<SqliteStore>) -> crate::Result<ModelDefinition> {
        let mut config = ModelConfig::new().storage(store).policy(self.policy);
        config.table_name = self.table_name.clone();

        let mut definition = ModelDefinition::new(&self.name).config(config);
        for field in &self.fields {
            definition = definition.field(&field.name, field.descriptor()?);
        }
        Ok(definition)
    }
}

impl OrmConfig {
    /// Register every declared model against one shared store.
    ///
    /// Nothing is registered unless every model is valid.
    pub fn register_all(
        &self,
        registry: &mut ModelRegistry,
        store: &Rc<SqliteStore>,
    ) -> crate::Result<Vec<Rc<Schema>>> {
        let definitions = self
            .models
            .iter()
            .map(|model| model.definition(Rc::clone(store)))
            .collect::<crate::Result<Vec<_>>>()?;
        registry.register_all(definitions)
    }

    /// Database path, relative paths resolved against `base`
    pub fn database_path(&self, base: &Path) -> PathBuf {
        match &self.database {
            Some(db) => base.join(db),
            None => default_database_path_in(base),
        }
    }

    /// Directory relative database paths resolve against: the config
    /// file's directory when loaded from disk, else the working directory
    pub fn base_dir(&self) -> &Path {
        self.root.as_deref().unwrap_or_else(|| Path::new("."))
    }

    /// Open (creating if needed) the configured database
    pub fn open_store(&self) -> anyhow::Result<SqliteStore> {
        let path = self.database_path(self.base_dir());
        ensure_db_dir(&path)?;
        SqliteStore::open(&path).with_context(|| format!("opening database {}", path.display()))
    }
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("modelite.toml")
}

pub fn default_database_path_in(base: &Path) -> PathBuf {
    base.join(".modelite").join("modelite.db")
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Option<OrmConfig>> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path)?;
    let mut config: OrmConfig = toml::from_str(&contents)
        .with_context(|| format!("parsing model config {}", path.display()))?;
    config.root = Some(match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    });
    Ok(Some(config))
}

pub fn write_config(path: &Path, config: &OrmConfig, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!("refusing to replace model config {}", path.display());
    }

    let contents = toml::to_string_pretty(config)?;
    std::fs::write(path, contents)?;
    Ok(())
}

pub fn ensure_db_dir(db_path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    const USER_TOML: &str = r#"
database = "data/app.db"

[[models]]
name = "User"
table_name = "User"

[[models.fields]]
name = "id"
type = "integer"

[[models.fields]]
name = "nickname"
type = "str"
required = false
default = "anon"
"#;

    #[test]
    fn test_parse_models() {
        let config: OrmConfig = toml::from_str(USER_TOML).unwrap();
        assert_eq!(config.database.as_deref(), Some("data/app.db"));

        let model = &config.models[0];
        assert_eq!(model.policy, ValidationPolicy::Lenient);

        let id = model.fields[0].descriptor().unwrap();
        assert_eq!(id.primitive_type, PrimitiveType::Integer);
        assert!(id.required);

        let nickname = model.fields[1].descriptor().unwrap();
        assert_eq!(nickname.primitive_type, PrimitiveType::Text);
        assert!(!nickname.required);
        assert_eq!(nickname.default, Some(Value::Text("anon".into())));
    }

    #[test]
    fn test_register_all() {
        let config: OrmConfig = toml::from_str(USER_TOML).unwrap();
        let store = Rc::new(SqliteStore::open_in_memory().unwrap());
        let mut registry = ModelRegistry::new();

        let schemas = config.register_all(&mut registry, &store).unwrap();
        assert_eq!(schemas.len(), 1);
        assert_eq!(
            registry.get("User").unwrap().create_table_sql(),
            r#"create table "User" ("id" INTEGER, "nickname" TEXT)"#
        );
    }

    #[test]
    fn test_unknown_type_rejected() {
        let spec = FieldSpec {
            name: "blob".into(),
            type_name: "bytes".into(),
            required: true,
            default: None,
        };
        assert!(matches!(spec.descriptor(), Err(Error::UnknownPrimitiveType(t)) if t == "bytes"));
    }

    #[test]
    fn test_missing_table_name_in_file() {
        let config: OrmConfig = toml::from_str(
            r#"
[[models]]
name = "Orphan"
"#,
        )
        .unwrap();
        let store = Rc::new(SqliteStore::open_in_memory().unwrap());
        let mut registry = ModelRegistry::new();

        let err = config.register_all(&mut registry, &store).unwrap_err();
        assert!(matches!(err, Error::MissingTableName(m) if m == "Orphan"));
    }

    #[test]
    fn test_bad_model_registers_nothing() {
        let mut contents = USER_TOML.to_string();
        contents.push_str("\n[[models]]\nname = \"Orphan\"\n");
        let config: OrmConfig = toml::from_str(&contents).unwrap();
        let store = Rc::new(SqliteStore::open_in_memory().unwrap());
        let mut registry = ModelRegistry::new();

        assert!(config.register_all(&mut registry, &store).is_err());
        assert!(!registry.contains("User"));
        assert!(registry.models().is_empty());
    }

    #[test]
    fn test_load_default_path_when_absent() {
        // tests run from the crate root, which carries no modelite.toml
        assert!(!default_config_path().exists());
        assert!(load_config(None).unwrap().is_none());
    }

    #[test]
    fn test_database_resolves_next_to_config_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("models.toml");
        std::fs::write(&path, USER_TOML).unwrap();

        let config = load_config(Some(&path)).unwrap().unwrap();
        assert_eq!(config.base_dir(), dir.path());

        let store = config.open_store().unwrap();
        let expected = dir.path().join("data").join("app.db");
        assert_eq!(store.path(), Some(expected.as_path()));
        assert!(expected.exists());
    }

    #[test]
    fn test_parse_error_names_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "models = 3").unwrap();

        let err = load_config(Some(&path)).unwrap_err();
        assert!(err.to_string().contains("broken.toml"));
    }

    #[test]
    fn test_database_path() {
        let base = Path::new("/srv/app");
        let config = OrmConfig::default();
        assert_eq!(config.database_path(base), PathBuf::from("/srv/app/.modelite/modelite.db"));

        let config = OrmConfig {
            database: Some("db/x.db".into()),
            ..OrmConfig::default()
        };
        assert_eq!(config.base_dir(), Path::new("."));
        assert_eq!(config.database_path(base), PathBuf::from("/srv/app/db/x.db"));
    }
}
