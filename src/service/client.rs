//! Typed client over a query service transport.

use crate::error::{Code, ServiceError, StatusErrorFactory};
use crate::pathmap::PathMap;
use crate::response::{CreateResponse, Empty, QueryResponse};
use crate::service::QueryService;
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// One round trip per operation, carrying the serialized options document.
#[async_trait]
pub trait QueryTransport: Send + Sync {
    async fn get(&self, options: &[u8]) -> Result<QueryResponse, ServiceError>;
    async fn create(&self, options: &[u8]) -> Result<CreateResponse, ServiceError>;
    async fn update(&self, options: &[u8]) -> Result<Empty, ServiceError>;
    async fn delete(&self, options: &[u8]) -> Result<Empty, ServiceError>;
}

/// In-process transport.
#[async_trait]
impl QueryTransport for QueryService<StatusErrorFactory> {
    async fn get(&self, options: &[u8]) -> Result<QueryResponse, ServiceError> {
        QueryService::get(self, options).await
    }

    async fn create(&self, options: &[u8]) -> Result<CreateResponse, ServiceError> {
        QueryService::create(self, options).await
    }

    async fn update(&self, options: &[u8]) -> Result<Empty, ServiceError> {
        QueryService::update(self, options).await
    }

    async fn delete(&self, options: &[u8]) -> Result<Empty, ServiceError> {
        QueryService::delete(self, options).await
    }
}

fn internal(what: &str, e: serde_json::Error) -> ServiceError {
    ServiceError {
        code: Code::Internal,
        message: format!("{}: {}", what, e),
    }
}

/// Each call is bounded by `request_timeout`; expiry drops the in-flight
/// call and returns `DeadlineExceeded`.
pub struct QueryClient<T: ?Sized = dyn QueryTransport> {
    transport: Arc<T>,
    request_timeout: Duration,
}

impl<T: QueryTransport + ?Sized> QueryClient<T> {
    pub fn new(transport: Arc<T>, request_timeout: Duration) -> Self {
        QueryClient {
            transport,
            request_timeout,
        }
    }

    async fn call<R>(&self, fut: impl Future<Output = Result<R, ServiceError>>) -> Result<R, ServiceError> {
        tokio::time::timeout(self.request_timeout, fut)
            .await
            .unwrap_or_else(|_| {
                Err(ServiceError {
                    code: Code::DeadlineExceeded,
                    message: "deadline exceeded".into(),
                })
            })
    }

    /// Records and the total count before pagination.
    pub async fn get(&self, options: &PathMap) -> Result<(Vec<PathMap>, u64), ServiceError> {
        let bytes = serde_json::to_vec(options).map_err(|e| internal("encode options", e))?;
        let resp = self.call(self.transport.get(&bytes)).await?;
        let results: Vec<PathMap> =
            serde_json::from_str(resp.results.get()).map_err(|e| internal("decode results", e))?;
        Ok((results, resp.total_count))
    }

    pub async fn create(&self, options: &PathMap) -> Result<PathMap, ServiceError> {
        let bytes = serde_json::to_vec(options).map_err(|e| internal("encode options", e))?;
        let resp = self.call(self.transport.create(&bytes)).await?;
        serde_json::from_str(resp.result.get()).map_err(|e| internal("decode result", e))
    }

    pub async fn update(&self, options: &PathMap) -> Result<(), ServiceError> {
        let bytes = serde_json::to_vec(options).map_err(|e| internal("encode options", e))?;
        self.call(self.transport.update(&bytes)).await.map(|_| ())
    }

    pub async fn delete(&self, options: &PathMap) -> Result<(), ServiceError> {
        let bytes = serde_json::to_vec(options).map_err(|e| internal("encode options", e))?;
        self.call(self.transport.delete(&bytes)).await.map(|_| ())
    }
}
