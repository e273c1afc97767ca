//! Shared application state for the query routes.

use crate::error::HttpErrorFactory;
use crate::service::QueryService;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<QueryService<HttpErrorFactory>>,
}

impl AppState {
    pub fn new(service: QueryService<HttpErrorFactory>) -> Self {
        AppState {
            service: Arc::new(service),
        }
    }
}
