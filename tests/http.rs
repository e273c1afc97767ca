use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use crudgate::{
    query_routes, AppState, FieldSpec, HttpErrorFactory, MemoryStorage, ModelDescriptor, ModelRegistry, ModelTemplate,
    Operation, PathMap, QueryService,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

fn app() -> axum::Router {
    let storage = MemoryStorage::new();
    let template = ModelTemplate::new("notes");
    let rows = (1..=3)
        .map(|id| PathMap::try_from(json!({"id": id, "title": format!("note {}", id)})).unwrap());
    storage.insert_rows(&template, rows).unwrap();

    let notes = ModelDescriptor::new("notes", template)
        .allow(&[Operation::Get, Operation::Create, Operation::Delete])
        .whitelist_field("id", FieldSpec::default())
        .whitelist_field("title", FieldSpec::default());
    let mut registry = ModelRegistry::new()
        .with_default_model_class("notes")
        .with_default_storage(Arc::new(storage));
    registry.register(notes).unwrap();
    query_routes(AppState::new(QueryService::new(Arc::new(registry), HttpErrorFactory)))
}

async fn post(app: axum::Router, uri: &str, body: &str) -> (StatusCode, Value) {
    let req = Request::post(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn get_returns_count_and_results() {
    let (status, body) = post(app(), "/query/get", r#"{"sort":{"id":"DESC"},"limit":2}"#).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["totalCount"], 3);
    assert_eq!(body["results"][0]["title"], "note 3");
    assert_eq!(body["results"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn create_returns_created() {
    let (status, body) = post(app(), "/query/create", r#"{"data":{"title":"fresh"}}"#).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["result"]["title"], "fresh");
    assert!(body["result"]["id"].is_string());
}

#[tokio::test]
async fn errors_use_the_error_envelope() {
    let (status, body) = post(app(), "/query/update", r#"{"filter":{"id":1},"data":{"title":"x"}}"#).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body, json!({"error": {"code": "permission_denied", "message": "permission denied"}}));

    let (status, body) = post(app(), "/query/delete", r#"{"filter":{"body":"x"}}"#).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["message"], "missing filter");

    let (status, body) = post(app(), "/query/get", "not json").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "invalid_argument");
}

#[tokio::test]
async fn duplicate_create_is_a_conflict() {
    let (status, body) = post(app(), "/query/create", r#"{"data":{"id":2,"title":"again"}}"#).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body, json!({"error": {"code": "already_exists", "message": "already exists"}}));
}

#[tokio::test]
async fn delete_acknowledges_with_empty_object() {
    let (status, body) = post(app(), "/query/delete", r#"{"filter":{"id":[1,2]}}"#).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({}));
}
