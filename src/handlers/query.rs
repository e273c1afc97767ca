//! Query handlers: the request body is the options document, passed through unparsed.

use crate::error::HttpError;
use crate::response::{created, ok};
use crate::state::AppState;
use axum::{body::Bytes, extract::State, response::IntoResponse};

/// POST /query/get
pub async fn get(State(state): State<AppState>, body: Bytes) -> Result<impl IntoResponse, HttpError> {
    Ok(ok(state.service.get(&body).await?))
}

/// POST /query/create
pub async fn create(State(state): State<AppState>, body: Bytes) -> Result<impl IntoResponse, HttpError> {
    Ok(created(state.service.create(&body).await?))
}

/// POST /query/update
pub async fn update(State(state): State<AppState>, body: Bytes) -> Result<impl IntoResponse, HttpError> {
    Ok(ok(state.service.update(&body).await?))
}

/// POST /query/delete
pub async fn delete(State(state): State<AppState>, body: Bytes) -> Result<impl IntoResponse, HttpError> {
    Ok(ok(state.service.delete(&body).await?))
}
