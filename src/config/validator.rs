//! Config validation: unique model names, resolvable references, safe identifiers.

use crate::config::ServiceConfig;
use crate::error::ConfigError;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

/// `uuid`, `double precision`, `numeric(12, 2)`, `shop.order_state`, `text[]`.
static COLUMN_TYPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_ ]*(\.[A-Za-z_][A-Za-z0-9_]*)?(\(\d+(, ?\d+)?\))?(\[\])?$")
        .expect("column type pattern")
});

fn invalid(kind: &'static str, value: &str) -> ConfigError {
    ConfigError::InvalidIdentifier {
        kind,
        value: value.to_string(),
    }
}

pub fn validate(config: &ServiceConfig) -> Result<(), ConfigError> {
    if config.request_timeout_secs == Some(0) {
        return Err(ConfigError::Validation("requestTimeoutSecs must be positive".into()));
    }

    let mut names = HashSet::new();
    for m in &config.models {
        if m.name.is_empty() {
            return Err(invalid("model class", &m.name));
        }
        if !names.insert(m.name.as_str()) {
            return Err(ConfigError::DuplicateModelClass(m.name.clone()));
        }
        if m.table.trim().is_empty() {
            return Err(invalid("table", &m.table));
        }
        if matches!(&m.schema, Some(s) if s.trim().is_empty()) {
            return Err(invalid("schema", ""));
        }
        for field in m.whitelisted_fields.keys() {
            if field.is_empty() {
                return Err(ConfigError::Validation(format!(
                    "model '{}' whitelists an empty field name",
                    m.name
                )));
            }
        }
        for relation in m.relations.keys() {
            if relation.is_empty() || relation.contains('.') {
                return Err(invalid("relation", relation));
            }
        }
        for ty in m.column_types.values() {
            if !COLUMN_TYPE.is_match(ty) {
                return Err(invalid("column type", ty));
            }
        }
        if matches!(&m.database_url, Some(url) if url.is_empty()) {
            return Err(ConfigError::Validation(format!(
                "model '{}' has an empty databaseUrl",
                m.name
            )));
        }
    }

    if let Some(default) = config.default_model_class.as_deref() {
        if !default.is_empty() && !names.contains(default) {
            return Err(ConfigError::MissingReference {
                kind: "model class",
                id: default.to_string(),
            });
        }
    }
    Ok(())
}
