//! Typed errors, stable error codes, and per-transport error factories.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use thiserror::Error;

/// Path resolution failures of a [`crate::PathMap`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    #[error("invalid path: {0}")]
    InvalidPath(String),
    #[error("invalid field: {0}")]
    InvalidField(String),
    #[error("invalid type: {0}")]
    InvalidType(String),
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("database: {0}")]
    Db(#[from] sqlx::Error),
    #[error("storage lock poisoned")]
    Poisoned,
    /// Operation the engine does not provide (e.g. writes on a read-only engine).
    #[error("unsupported: {0}")]
    Unsupported(String),
    /// Unique key already taken.
    #[error("conflict: {0}")]
    Conflict(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("duplicate model class: {0}")]
    DuplicateModelClass(String),
    #[error("missing reference: {kind} '{id}'")]
    MissingReference { kind: &'static str, id: String },
    #[error("invalid identifier for {kind}: '{value}'")]
    InvalidIdentifier { kind: &'static str, value: String },
    #[error("config load: {0}")]
    Load(String),
    #[error("validation: {0}")]
    Validation(String),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Path(#[from] PathError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("{0}")]
    InvalidArgument(String),
    #[error("{0}")]
    PermissionDenied(String),
    #[error("deadline exceeded")]
    DeadlineExceeded,
    #[error("{0}")]
    Internal(String),
}

impl AppError {
    pub fn code(&self) -> Code {
        match self {
            AppError::Path(_) | AppError::InvalidArgument(_) => Code::InvalidArgument,
            AppError::PermissionDenied(_) => Code::PermissionDenied,
            AppError::DeadlineExceeded => Code::DeadlineExceeded,
            AppError::Storage(StorageError::Conflict(_)) => Code::AlreadyExists,
            AppError::Storage(StorageError::Unsupported(_)) => Code::Unimplemented,
            AppError::Storage(_) | AppError::Config(_) | AppError::Internal(_) => Code::Internal,
        }
    }

    /// Message safe to hand to a caller: storage and config details stay in the logs.
    pub fn public_message(&self) -> String {
        match self {
            AppError::Storage(StorageError::Conflict(_)) => "already exists".to_string(),
            AppError::Storage(StorageError::Unsupported(op)) => format!("{} not supported", op),
            AppError::Storage(_) => "storage failure".to_string(),
            AppError::Config(_) => "service misconfigured".to_string(),
            other => other.to_string(),
        }
    }
}

/// Error codes with gRPC-like naming and HTTP-like values.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Code {
    InvalidArgument,
    PermissionDenied,
    DeadlineExceeded,
    AlreadyExists,
    Internal,
    Unimplemented,
}

impl Code {
    pub fn as_u16(self) -> u16 {
        match self {
            Code::InvalidArgument => 400,
            Code::PermissionDenied => 403,
            Code::DeadlineExceeded => 408,
            Code::AlreadyExists => 409,
            Code::Internal => 500,
            Code::Unimplemented => 501,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Code::InvalidArgument => "invalid_argument",
            Code::PermissionDenied => "permission_denied",
            Code::DeadlineExceeded => "deadline_exceeded",
            Code::AlreadyExists => "already_exists",
            Code::Internal => "internal",
            Code::Unimplemented => "unimplemented",
        }
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Builds the error representation of one transport. Injected into
/// [`crate::QueryService`] at construction.
pub trait ErrorFactory: Send + Sync + 'static {
    type Error: std::error::Error + Send + Sync + 'static;

    fn new(&self, code: Code, message: String) -> Self::Error;
}

/// Transport-neutral status error, shaped like a gRPC status.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("rpc error: code = {code} desc = {message}")]
pub struct ServiceError {
    pub code: Code,
    pub message: String,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct StatusErrorFactory;

impl ErrorFactory for StatusErrorFactory {
    type Error = ServiceError;

    fn new(&self, code: Code, message: String) -> ServiceError {
        ServiceError { code, message }
    }
}

/// HTTP error: status derived from the code, JSON error envelope as body.
#[derive(Error, Debug, Clone)]
#[error("http error: code = {} desc = {message}", .status.as_u16())]
pub struct HttpError {
    pub status: StatusCode,
    pub code: Code,
    pub message: String,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct HttpErrorFactory;

impl ErrorFactory for HttpErrorFactory {
    type Error = HttpError;

    fn new(&self, code: Code, message: String) -> HttpError {
        let status = StatusCode::from_u16(code.as_u16()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        HttpError { status, code, message }
    }
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub error: Value,
}

impl HttpError {
    /// Error detail object. A message that is itself a JSON object is passed
    /// through, with `code` and `message` filled in when absent.
    pub fn detail(&self) -> Value {
        match serde_json::from_str::<Value>(&self.message) {
            Ok(Value::Object(mut obj)) => {
                obj.entry("code").or_insert_with(|| Value::String(self.code.as_str().into()));
                obj.entry("message").or_insert_with(|| Value::String(self.message.clone()));
                Value::Object(obj)
            }
            _ => {
                let mut obj = Map::new();
                obj.insert("code".into(), Value::String(self.code.as_str().into()));
                obj.insert("message".into(), Value::String(self.message.clone()));
                Value::Object(obj)
            }
        }
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let body = ErrorBody { error: self.detail() };
        (self.status, Json(body)).into_response()
    }
}
