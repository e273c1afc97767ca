//! Query routes: one POST per operation under `/query`.

use crate::handlers::query::{create, delete, get, update};
use crate::state::AppState;
use axum::{routing::post, Router};
use tower_http::limit::RequestBodyLimitLayer;

/// Upper bound of one options document.
pub const MAX_OPTIONS_BYTES: usize = 1024 * 1024;

pub fn query_routes(state: AppState) -> Router {
    Router::new()
        .route("/query/get", post(get))
        .route("/query/create", post(create))
        .route("/query/update", post(update))
        .route("/query/delete", post(delete))
        .layer(RequestBodyLimitLayer::new(MAX_OPTIONS_BYTES))
        .with_state(state)
}
