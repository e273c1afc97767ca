//! Raw registry config as read from the JSON config file.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::time::Duration;

pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceConfig {
    /// Model used when a request omits `modelClass`.
    #[serde(default)]
    pub default_model_class: Option<String>,
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
    #[serde(default)]
    pub models: Vec<ModelConfig>,
}

impl ServiceConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS))
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelConfig {
    pub name: String,
    #[serde(default)]
    pub schema: Option<String>,
    pub table: String,
    /// Separate database for this model; the service pool is used otherwise.
    #[serde(default)]
    pub database_url: Option<String>,
    #[serde(default)]
    pub can_get: bool,
    #[serde(default)]
    pub can_create: bool,
    #[serde(default)]
    pub can_update: bool,
    #[serde(default)]
    pub can_delete: bool,
    #[serde(default)]
    pub whitelisted_fields: BTreeMap<String, FieldConfig>,
    #[serde(default)]
    pub compulsory_fields: Vec<String>,
    #[serde(default)]
    pub relations: BTreeMap<String, Vec<String>>,
    /// Column -> postgres type used to cast bound parameters (`uuid`, `jsonb`).
    #[serde(default)]
    pub column_types: BTreeMap<String, String>,
    /// Values every new record starts with.
    #[serde(default)]
    pub defaults: Map<String, Value>,
}

/// Whitelist entry: `true` / `false`, or an object with field flags.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldConfig {
    Flag(bool),
    Spec(FieldSpecConfig),
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldSpecConfig {
    #[serde(default)]
    pub is_json_field: bool,
}

impl FieldConfig {
    /// `false` keeps the entry out of the whitelist.
    pub fn enabled(&self) -> bool {
        !matches!(self, FieldConfig::Flag(false))
    }

    pub fn is_json_field(&self) -> bool {
        matches!(self, FieldConfig::Spec(spec) if spec.is_json_field)
    }
}
