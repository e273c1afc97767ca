//! Load the registry config file and resolve it into a [`ModelRegistry`].

use crate::config::resolved::{FieldSpec, ModelDescriptor, ModelRegistry, Operation};
use crate::config::{validate, ModelConfig, ServiceConfig};
use crate::error::ConfigError;
use crate::storage::{ModelTemplate, PgStorage, Storage};
use sqlx::PgPool;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// Pool size for models that carry their own `databaseUrl`.
const MODEL_POOL_CONNECTIONS: u32 = 5;

pub fn parse(text: &str) -> Result<ServiceConfig, ConfigError> {
    serde_json::from_str(text).map_err(|e| ConfigError::Load(e.to_string()))
}

pub async fn load_from_path(path: impl AsRef<Path>) -> Result<ServiceConfig, ConfigError> {
    let path = path.as_ref();
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ConfigError::Load(format!("{}: {}", path.display(), e)))?;
    parse(&text)
}

/// Build the registry (validates first). Models with a `databaseUrl` get the
/// storage returned by `connect`, shared between models naming the same URL.
pub fn resolve<C>(
    config: &ServiceConfig,
    default_storage: Option<Arc<dyn Storage>>,
    mut connect: C,
) -> Result<ModelRegistry, ConfigError>
where
    C: FnMut(&str) -> Result<Arc<dyn Storage>, ConfigError>,
{
    validate(config)?;
    let mut registry = ModelRegistry::new()
        .with_default_model_class(config.default_model_class.clone().unwrap_or_default());
    if let Some(storage) = default_storage {
        registry = registry.with_default_storage(storage);
    }

    let mut by_url: HashMap<&str, Arc<dyn Storage>> = HashMap::new();
    for m in &config.models {
        let mut model = resolve_model(m);
        if let Some(url) = m.database_url.as_deref() {
            let storage = match by_url.get(url) {
                Some(s) => s.clone(),
                None => {
                    let s = connect(url)?;
                    by_url.insert(url, s.clone());
                    s
                }
            };
            model = model.with_storage(storage);
        }
        registry.register(model)?;
    }
    tracing::info!(models = registry.len(), "model registry resolved");
    Ok(registry)
}

/// [`resolve`] against PostgreSQL: `pool` backs every model without its own URL.
pub fn resolve_pg(config: &ServiceConfig, pool: Option<PgPool>) -> Result<ModelRegistry, ConfigError> {
    let default_storage = pool.map(|p| Arc::new(PgStorage::new(p)) as Arc<dyn Storage>);
    resolve(config, default_storage, |url| {
        let storage = PgStorage::connect_lazy(url, MODEL_POOL_CONNECTIONS)
            .map_err(|e| ConfigError::Load(format!("model database: {}", e)))?;
        Ok(Arc::new(storage) as Arc<dyn Storage>)
    })
}

fn resolve_model(m: &ModelConfig) -> ModelDescriptor {
    let mut template = ModelTemplate::new(m.table.clone());
    if let Some(schema) = &m.schema {
        template = template.with_schema(schema.clone());
    }
    for (column, ty) in &m.column_types {
        template = template.with_column_type(column.clone(), ty.clone());
    }
    for (key, value) in &m.defaults {
        template = template.with_default(key.clone(), value.clone());
    }

    let ops: Vec<Operation> = [
        (m.can_get, Operation::Get),
        (m.can_create, Operation::Create),
        (m.can_update, Operation::Update),
        (m.can_delete, Operation::Delete),
    ]
    .into_iter()
    .filter_map(|(allowed, op)| allowed.then_some(op))
    .collect();

    let mut model = ModelDescriptor::new(m.name.clone(), template).allow(&ops);
    for (field, cfg) in m.whitelisted_fields.iter().filter(|(_, cfg)| cfg.enabled()) {
        model = model.whitelist_field(
            field.clone(),
            FieldSpec {
                is_json_field: cfg.is_json_field(),
            },
        );
    }
    model.compulsory_fields = m.compulsory_fields.clone();
    model.relations = m.relations.clone().into_iter().collect();
    model
}
