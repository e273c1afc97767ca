//! Resolved model registry: config validated and flattened for runtime use.
//! Built once at startup and read-only afterwards.

use crate::error::ConfigError;
use crate::storage::{ModelTemplate, Storage};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    Get,
    Create,
    Update,
    Delete,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Operation::Get => "get",
            Operation::Create => "create",
            Operation::Update => "update",
            Operation::Delete => "delete",
        })
    }
}

/// Flags of one whitelisted field.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FieldSpec {
    /// Column holds a JSON document; filtered with `key:value` tokens.
    pub is_json_field: bool,
}

/// Fields a model allows in filter and sort input.
pub type Whitelist = BTreeMap<String, FieldSpec>;

#[derive(Clone)]
pub struct ModelDescriptor {
    pub name: String,
    pub template: ModelTemplate,
    /// Model-specific storage; the registry default is used when absent.
    pub storage: Option<Arc<dyn Storage>>,
    pub can_get: bool,
    pub can_create: bool,
    pub can_update: bool,
    pub can_delete: bool,
    pub whitelist: Whitelist,
    /// Columns always added to a projection.
    pub compulsory_fields: Vec<String>,
    /// Relation name -> root columns the relation depends on. Used by callers
    /// that build nested relation queries from `QueryFactory::apply_fields`.
    pub relations: HashMap<String, Vec<String>>,
}

impl fmt::Debug for ModelDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelDescriptor")
            .field("name", &self.name)
            .field("table", &self.template.table_key())
            .field("has_storage", &self.storage.is_some())
            .field("can_get", &self.can_get)
            .field("can_create", &self.can_create)
            .field("can_update", &self.can_update)
            .field("can_delete", &self.can_delete)
            .field("whitelist", &self.whitelist)
            .field("compulsory_fields", &self.compulsory_fields)
            .finish()
    }
}

impl ModelDescriptor {
    /// Descriptor with every operation denied and nothing whitelisted.
    pub fn new(name: impl Into<String>, template: ModelTemplate) -> Self {
        ModelDescriptor {
            name: name.into(),
            template,
            storage: None,
            can_get: false,
            can_create: false,
            can_update: false,
            can_delete: false,
            whitelist: Whitelist::new(),
            compulsory_fields: Vec::new(),
            relations: HashMap::new(),
        }
    }

    pub fn with_storage(mut self, storage: Arc<dyn Storage>) -> Self {
        self.storage = Some(storage);
        self
    }

    pub fn allow(mut self, ops: &[Operation]) -> Self {
        for op in ops {
            match op {
                Operation::Get => self.can_get = true,
                Operation::Create => self.can_create = true,
                Operation::Update => self.can_update = true,
                Operation::Delete => self.can_delete = true,
            }
        }
        self
    }

    pub fn whitelist_field(mut self, field: impl Into<String>, spec: FieldSpec) -> Self {
        self.whitelist.insert(field.into(), spec);
        self
    }

    pub fn compulsory(mut self, fields: &[&str]) -> Self {
        self.compulsory_fields.extend(fields.iter().map(|f| f.to_string()));
        self
    }

    pub fn relation(mut self, name: impl Into<String>, dependencies: &[&str]) -> Self {
        self.relations
            .insert(name.into(), dependencies.iter().map(|d| d.to_string()).collect());
        self
    }

    pub fn permits(&self, op: Operation) -> bool {
        match op {
            Operation::Get => self.can_get,
            Operation::Create => self.can_create,
            Operation::Update => self.can_update,
            Operation::Delete => self.can_delete,
        }
    }

    /// Whitelisted fields holding JSON documents.
    pub fn json_fields(&self) -> Vec<String> {
        self.whitelist
            .iter()
            .filter(|(_, spec)| spec.is_json_field)
            .map(|(name, _)| name.clone())
            .collect()
    }
}

#[derive(Clone, Default)]
pub struct ModelRegistry {
    models: HashMap<String, ModelDescriptor>,
    default_model_class: String,
    default_storage: Option<Arc<dyn Storage>>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_default_model_class(mut self, name: impl Into<String>) -> Self {
        self.default_model_class = name.into();
        self
    }

    pub fn with_default_storage(mut self, storage: Arc<dyn Storage>) -> Self {
        self.default_storage = Some(storage);
        self
    }

    pub fn register(&mut self, model: ModelDescriptor) -> Result<(), ConfigError> {
        if self.models.contains_key(&model.name) {
            return Err(ConfigError::DuplicateModelClass(model.name));
        }
        self.models.insert(model.name.clone(), model);
        Ok(())
    }

    pub fn model(&self, name: &str) -> Option<&ModelDescriptor> {
        self.models.get(name)
    }

    pub fn default_model_class(&self) -> &str {
        &self.default_model_class
    }

    /// The model's own storage, else the registry default.
    pub fn storage_for(&self, model: &ModelDescriptor) -> Option<Arc<dyn Storage>> {
        model.storage.clone().or_else(|| self.default_storage.clone())
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}
