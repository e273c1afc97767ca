//! crudgate: configuration-driven CRUD query service over path-addressable documents.
//!
//! A request's options document is decoded into a [`PathMap`], dispatched to a
//! registered model by [`QueryService`], turned into a storage query by
//! [`QueryFactory`], and executed against a [`Storage`] engine.

pub mod config;
pub mod error;
pub mod handlers;
pub mod pathmap;
pub mod query;
pub mod response;
pub mod routes;
pub mod service;
pub mod sql;
pub mod state;
pub mod storage;

pub use config::{
    load_from_path, resolve, resolve_pg, FieldSpec, ModelDescriptor, ModelRegistry, Operation, ServiceConfig,
    Settings,
};
pub use error::{
    AppError, Code, ConfigError, ErrorFactory, HttpError, HttpErrorFactory, PathError, ServiceError,
    StatusErrorFactory, StorageError,
};
pub use pathmap::PathMap;
pub use query::QueryFactory;
pub use response::{CreateResponse, Empty, QueryResponse};
pub use routes::query_routes;
pub use service::{QueryClient, QueryService, QueryTransport};
pub use state::AppState;
pub use storage::{MemoryStorage, ModelTemplate, PgStorage, QueryBuilder, Record, Storage};
