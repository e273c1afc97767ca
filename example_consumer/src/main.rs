//! Example consumer: a separate Rust project that uses crudgate as a dependency.
//! Registers one model in code, seeds the in-memory store, and serves the query routes.
//!
//! Run from repo root: `cargo run -p example-consumer`
//! Then: `curl -XPOST localhost:3000/query/get -d '{"filter":{"status":"open"},"sort":{"name":"DESC"}}'`

use crudgate::{
    query_routes, AppState, FieldSpec, HttpErrorFactory, MemoryStorage, ModelDescriptor, ModelRegistry,
    ModelTemplate, Operation, PathMap, QueryService, Settings,
};
use serde_json::json;
use std::sync::Arc;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("crudgate=debug")),
        )
        .init();

    let settings = Settings::from_env();
    let template = ModelTemplate::new("tasks").with_default("status", "open");
    let storage = MemoryStorage::new();
    let seed = ["write docs", "review patch", "cut release"]
        .iter()
        .enumerate()
        .map(|(i, name)| PathMap::try_from(json!({"id": i + 1, "name": name, "status": "open"})))
        .collect::<Result<Vec<_>, _>>()?;
    storage.insert_rows(&template, seed)?;

    let tasks = ModelDescriptor::new("tasks", template)
        .allow(&[Operation::Get, Operation::Create, Operation::Update])
        .whitelist_field("id", FieldSpec::default())
        .whitelist_field("name", FieldSpec::default())
        .whitelist_field("status", FieldSpec::default())
        .compulsory(&["id"]);
    let mut registry = ModelRegistry::new()
        .with_default_model_class("tasks")
        .with_default_storage(Arc::new(storage));
    registry.register(tasks)?;

    let mut service = QueryService::new(Arc::new(registry), HttpErrorFactory);
    if let Some(timeout) = settings.request_timeout {
        service = service.with_request_timeout(timeout);
    }
    let app = query_routes(AppState::new(service));

    let listener = TcpListener::bind(&settings.bind_addr).await?;
    tracing::info!("Example consumer listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
