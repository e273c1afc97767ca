//! Response documents of the query service and HTTP helpers around them.

use axum::{http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;

/// Read result. `results` is the serialized record array, passed through as-is.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResponse {
    pub total_count: u64,
    pub results: Box<RawValue>,
}

/// Create result: the stored record including storage-generated columns.
#[derive(Debug, Serialize, Deserialize)]
pub struct CreateResponse {
    pub result: Box<RawValue>,
}

/// Acknowledgement of update and delete.
#[derive(Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Empty {}

pub fn ok<T: Serialize>(body: T) -> (StatusCode, Json<T>) {
    (StatusCode::OK, Json(body))
}

pub fn created<T: Serialize>(body: T) -> (StatusCode, Json<T>) {
    (StatusCode::CREATED, Json(body))
}
