//! Get/Create/Update/Delete dispatch over the model registry.
//!
//! Every request runs the same gates before the operation body: parse the
//! options document, resolve the model class, resolve its storage, check the
//! capability flag. Storage calls share one request deadline.

use crate::config::{ModelDescriptor, ModelRegistry, Operation, DEFAULT_REQUEST_TIMEOUT_SECS};
use crate::error::{AppError, Code, ErrorFactory, StatusErrorFactory, StorageError};
use crate::pathmap::PathMap;
use crate::query::{convert_json_values_in_records, QueryFactory};
use crate::response::{CreateResponse, Empty, QueryResponse};
use crate::service::filter::{apply_filter, apply_sort_defs};
use crate::storage::Storage;
use serde::Serialize;
use serde_json::value::RawValue;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{timeout_at, Instant};

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS);

pub struct QueryService<F: ErrorFactory = StatusErrorFactory> {
    registry: Arc<ModelRegistry>,
    errors: F,
    request_timeout: Duration,
}

struct Target<'a> {
    options: PathMap,
    model: &'a ModelDescriptor,
    storage: Arc<dyn Storage>,
}

async fn bounded<T, Fut>(deadline: Instant, fut: Fut) -> Result<T, AppError>
where
    Fut: Future<Output = Result<T, StorageError>>,
{
    match timeout_at(deadline, fut).await {
        Ok(result) => Ok(result?),
        Err(_) => Err(AppError::DeadlineExceeded),
    }
}

fn to_raw<T: Serialize + ?Sized>(value: &T) -> Result<Box<RawValue>, AppError> {
    serde_json::value::to_raw_value(value).map_err(|e| AppError::Internal(format!("serialize results: {}", e)))
}

impl<F: ErrorFactory> QueryService<F> {
    pub fn new(registry: Arc<ModelRegistry>, errors: F) -> Self {
        QueryService {
            registry,
            errors,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Options: `modelClass`, `fields`, `limit`, `page`, `filter`, `sort`.
    pub async fn get(&self, options: &[u8]) -> Result<QueryResponse, F::Error> {
        let deadline = Instant::now() + self.request_timeout;
        self.do_get(options, deadline)
            .await
            .map_err(|e| self.fail(Operation::Get, e))
    }

    /// Options: `modelClass`, `data`.
    pub async fn create(&self, options: &[u8]) -> Result<CreateResponse, F::Error> {
        let deadline = Instant::now() + self.request_timeout;
        self.do_create(options, deadline)
            .await
            .map_err(|e| self.fail(Operation::Create, e))
    }

    /// Options: `modelClass`, `filter`, `data`.
    pub async fn update(&self, options: &[u8]) -> Result<Empty, F::Error> {
        let deadline = Instant::now() + self.request_timeout;
        self.do_update(options, deadline)
            .await
            .map_err(|e| self.fail(Operation::Update, e))
    }

    /// Options: `modelClass`, `filter`.
    pub async fn delete(&self, options: &[u8]) -> Result<Empty, F::Error> {
        let deadline = Instant::now() + self.request_timeout;
        self.do_delete(options, deadline)
            .await
            .map_err(|e| self.fail(Operation::Delete, e))
    }

    fn fail(&self, op: Operation, err: AppError) -> F::Error {
        let code = err.code();
        if code == Code::Internal {
            tracing::error!(op = %op, error = %err, "request failed");
        } else {
            tracing::debug!(op = %op, code = %code, error = %err, "request rejected");
        }
        self.errors.new(code, err.public_message())
    }

    fn resolve(&self, options: &[u8], op: Operation) -> Result<Target<'_>, AppError> {
        let options: PathMap = serde_json::from_slice(options)
            .map_err(|e| AppError::InvalidArgument(format!("invalid options: {}", e)))?;
        let class = options.get_string_default("modelClass", self.registry.default_model_class());
        let model = self
            .registry
            .model(&class)
            .ok_or_else(|| AppError::InvalidArgument("invalid model class".into()))?;
        let storage = self
            .registry
            .storage_for(model)
            .ok_or_else(|| AppError::Internal("missing db".into()))?;
        if !model.permits(op) {
            return Err(AppError::PermissionDenied("permission denied".into()));
        }
        Ok(Target { options, model, storage })
    }

    async fn do_get(&self, options: &[u8], deadline: Instant) -> Result<QueryResponse, AppError> {
        let Target { options, model, storage } = self.resolve(options, Operation::Get)?;
        let fields = options.get_string_array_safe("fields");
        let limit = options.get_int_default("limit", 0).max(0) as u64;
        let page = options.get_int_default("page", 0).max(0) as u64;
        let filter = options.get_map_default("filter", PathMap::new());
        let sort = options.get_map_default("sort", PathMap::new());

        let mut qf = QueryFactory::new(storage.query(&model.template));
        qf.apply_fields(&fields, &model.compulsory_fields, &HashMap::new());
        apply_filter(&mut qf, &filter, &model.whitelist);
        apply_sort_defs(&mut qf, &sort, &model.whitelist);

        let total = bounded(deadline, qf.query().count()).await?;
        qf.paginate(limit, page);
        let mut records = if total > 0 {
            bounded(deadline, qf.query().find()).await?
        } else {
            model.template.new_collection()
        };
        convert_json_values_in_records(&mut records, &model.json_fields());
        tracing::debug!(model = %model.name, total, returned = records.len(), "get");

        Ok(QueryResponse {
            total_count: total.max(0) as u64,
            results: to_raw(&records)?,
        })
    }

    async fn do_create(&self, options: &[u8], deadline: Instant) -> Result<CreateResponse, AppError> {
        let Target { options, model, storage } = self.resolve(options, Operation::Create)?;
        let data = options
            .get_map("data")
            .map_err(|_| AppError::InvalidArgument("missing data".into()))?;

        let mut record = model.template.new_record();
        for (key, value) in data.into_map() {
            record.insert(key, value);
        }
        let created = bounded(deadline, storage.query(&model.template).create(record)).await?;
        tracing::debug!(model = %model.name, "create");
        Ok(CreateResponse { result: to_raw(&created)? })
    }

    async fn do_update(&self, options: &[u8], deadline: Instant) -> Result<Empty, AppError> {
        let Target { options, model, storage } = self.resolve(options, Operation::Update)?;
        let filter = options
            .get_map("filter")
            .map_err(|_| AppError::InvalidArgument("missing filter".into()))?;
        let data = options
            .get_map("data")
            .map_err(|_| AppError::InvalidArgument("missing data".into()))?;

        let mut qf = QueryFactory::new(storage.query(&model.template));
        if !apply_filter(&mut qf, &filter, &model.whitelist) {
            return Err(AppError::InvalidArgument("missing filter".into()));
        }
        let affected = bounded(deadline, qf.query().update(data)).await?;
        tracing::debug!(model = %model.name, affected, "update");
        Ok(Empty {})
    }

    async fn do_delete(&self, options: &[u8], deadline: Instant) -> Result<Empty, AppError> {
        let Target { options, model, storage } = self.resolve(options, Operation::Delete)?;
        let filter = options
            .get_map("filter")
            .map_err(|_| AppError::InvalidArgument("missing filter".into()))?;

        let mut qf = QueryFactory::new(storage.query(&model.template));
        if !apply_filter(&mut qf, &filter, &model.whitelist) {
            return Err(AppError::InvalidArgument("missing filter".into()));
        }
        let affected = bounded(deadline, qf.query().delete()).await?;
        tracing::debug!(model = %model.name, affected, "delete");
        Ok(Empty {})
    }
}
