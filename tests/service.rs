use async_trait::async_trait;
use crudgate::storage::QueryParts;
use crudgate::{
    Code, FieldSpec, MemoryStorage, ModelDescriptor, ModelRegistry, ModelTemplate, Operation, PathMap, QueryBuilder,
    QueryClient, QueryService, Record, ServiceError, StatusErrorFactory, Storage, StorageError,
};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

const ALL: &[Operation] = &[Operation::Get, Operation::Create, Operation::Update, Operation::Delete];

fn rec(v: Value) -> Record {
    Record::try_from(v).unwrap()
}

/// 25 rows with `a = "x"` (ids 1..=25), 5 with `a = "y"` (ids 26..=30).
fn seeded() -> MemoryStorage {
    let storage = MemoryStorage::new();
    let rows = (1..=30).map(|id| {
        let a = if id <= 25 { "x" } else { "y" };
        let app = if id % 2 == 0 { "even" } else { "odd" };
        rec(json!({
            "id": id,
            "a": a,
            "b": id * 10,
            "owner_id": id % 3,
            "tags": format!("{{\"app\":\"{}\"}}", app),
        }))
    });
    storage.insert_rows(&ModelTemplate::new("items"), rows).unwrap();
    storage
}

fn registry(storage: MemoryStorage) -> ModelRegistry {
    let items = ModelDescriptor::new("items", ModelTemplate::new("items").with_default("status", "new"))
        .allow(ALL)
        .whitelist_field("a", FieldSpec::default())
        .whitelist_field("b", FieldSpec::default())
        .whitelist_field("tags", FieldSpec { is_json_field: true })
        .compulsory(&["id"]);
    let readonly = ModelDescriptor::new("readonly", ModelTemplate::new("items"))
        .allow(&[Operation::Get])
        .whitelist_field("a", FieldSpec::default());
    let mut registry = ModelRegistry::new()
        .with_default_model_class("items")
        .with_default_storage(Arc::new(storage));
    registry.register(items).unwrap();
    registry.register(readonly).unwrap();
    registry
}

fn service() -> (QueryService, MemoryStorage) {
    let storage = seeded();
    (QueryService::new(Arc::new(registry(storage.clone())), StatusErrorFactory), storage)
}

fn results(raw: &serde_json::value::RawValue) -> Vec<PathMap> {
    serde_json::from_str(raw.get()).unwrap()
}

#[tokio::test]
async fn get_filters_sorts_and_paginates() {
    let (svc, _) = service();
    let resp = svc
        .get(br#"{"fields":["a"],"filter":{"a":"x"},"sort":{"a":"DESC"},"limit":10,"page":1}"#)
        .await
        .unwrap();
    assert_eq!(resp.total_count, 25);
    let rows = results(&resp.results);
    assert_eq!(rows.len(), 10);
    let ids: Vec<i64> = rows.iter().map(|r| r.get_int("id").unwrap()).collect();
    assert_eq!(ids, (11..=20).collect::<Vec<i64>>());
    for row in &rows {
        assert_eq!(row.get_string("a").unwrap(), "x");
        assert_eq!(row.len(), 2, "projection is the requested field plus compulsory id");
    }
}

#[tokio::test]
async fn dropped_fields_fall_back_to_full_rows() {
    let (svc, _) = service();
    let resp = svc
        .get(br#"{"modelClass":"readonly","fields":["owner.name"],"filter":{"a":"y"},"limit":1}"#)
        .await
        .unwrap();
    assert_eq!(resp.total_count, 5);
    let rows = results(&resp.results);
    assert_eq!(rows[0].get_int("id").unwrap(), 26);
    assert_eq!(rows[0].get_int("b").unwrap(), 260);
    assert_eq!(rows[0].len(), 5);
}

#[tokio::test]
async fn get_sorts_descending() {
    let (svc, _) = service();
    let resp = svc.get(br#"{"sort":{"b":"DESC"},"limit":3}"#).await.unwrap();
    assert_eq!(resp.total_count, 30);
    let ids: Vec<i64> = results(&resp.results).iter().map(|r| r.get_int("id").unwrap()).collect();
    assert_eq!(ids, vec![30, 29, 28]);
}

#[tokio::test]
async fn get_clamps_negative_paging() {
    let (svc, _) = service();
    let resp = svc.get(br#"{"limit":-5,"page":-1}"#).await.unwrap();
    assert_eq!(resp.total_count, 30);
    assert_eq!(results(&resp.results).len(), 30);
}

#[tokio::test]
async fn oversized_limit_still_paginates() {
    let (svc, _) = service();
    let resp = svc.get(br#"{"limit":9223372036854775808,"page":1}"#).await.unwrap();
    assert_eq!(resp.total_count, 30);
    assert!(results(&resp.results).is_empty());

    let resp = svc.get(br#"{"limit":18446744073709551615}"#).await.unwrap();
    assert_eq!(results(&resp.results).len(), 30);
}

#[tokio::test]
async fn non_whitelisted_filter_keys_are_ignored() {
    let (svc, _) = service();
    let resp = svc.get(br#"{"filter":{"owner_id":1,"id":4}}"#).await.unwrap();
    assert_eq!(resp.total_count, 30);

    let resp = svc
        .get(br#"{"modelClass":"readonly","filter":{"a":"y","b":260}}"#)
        .await
        .unwrap();
    assert_eq!(resp.total_count, 5);
}

#[tokio::test]
async fn json_fields_filter_and_decode() {
    let (svc, _) = service();
    let resp = svc
        .get(br#"{"filter":{"tags":["app:even","garbage"],"a":["y"]},"limit":1}"#)
        .await
        .unwrap();
    assert_eq!(resp.total_count, 3);
    let rows = results(&resp.results);
    assert_eq!(rows[0].get_int("id").unwrap(), 26);
    assert_eq!(rows[0].get_string("tags.app").unwrap(), "even");
}

#[tokio::test]
async fn create_starts_from_model_defaults() {
    let (svc, storage) = service();
    let resp = svc.create(br#"{"data":{"a":"z","meta":{"k":[1,2]}}}"#).await.unwrap();
    let created: PathMap = serde_json::from_str(resp.result.get()).unwrap();
    assert_eq!(created.get_string("status").unwrap(), "new");
    assert_eq!(created.get_string("a").unwrap(), "z");
    assert_eq!(created.get_int("meta.k[1]").unwrap(), 2);
    assert!(!created.get_string("id").unwrap().is_empty());
    assert_eq!(storage.rows(&ModelTemplate::new("items")).unwrap().len(), 31);

    let err = svc.create(br#"{"data":"nope"}"#).await.unwrap_err();
    assert_eq!(err, ServiceError { code: Code::InvalidArgument, message: "missing data".into() });
}

#[tokio::test]
async fn create_with_taken_id_already_exists() {
    let (svc, storage) = service();
    let err = svc.create(br#"{"data":{"id":7,"a":"dup"}}"#).await.unwrap_err();
    assert_eq!(err, ServiceError { code: Code::AlreadyExists, message: "already exists".into() });
    assert_eq!(storage.rows(&ModelTemplate::new("items")).unwrap().len(), 30);
}

#[tokio::test]
async fn update_applies_patch_to_matching_rows() {
    let (svc, _) = service();
    svc.update(br#"{"filter":{"a":"y"},"data":{"a":"w","b":0}}"#).await.unwrap();
    let resp = svc.get(br#"{"filter":{"a":"w","b":0}}"#).await.unwrap();
    assert_eq!(resp.total_count, 5);
}

#[tokio::test]
async fn mutations_require_an_applied_filter() {
    let (svc, storage) = service();
    let missing_filter = ServiceError { code: Code::InvalidArgument, message: "missing filter".into() };

    assert_eq!(svc.delete(b"{}").await.unwrap_err(), missing_filter);
    assert_eq!(svc.delete(br#"{"filter":{}}"#).await.unwrap_err(), missing_filter);
    assert_eq!(
        svc.delete(br#"{"filter":{"owner_id":1,"id":3}}"#).await.unwrap_err(),
        missing_filter
    );
    assert_eq!(
        svc.update(br#"{"filter":{"owner_id":1},"data":{"a":"gone"}}"#).await.unwrap_err(),
        missing_filter
    );
    assert_eq!(storage.rows(&ModelTemplate::new("items")).unwrap().len(), 30);

    svc.delete(br#"{"filter":{"a":"y"}}"#).await.unwrap();
    assert_eq!(storage.rows(&ModelTemplate::new("items")).unwrap().len(), 25);
}

#[tokio::test]
async fn capability_flags_gate_each_operation() {
    let (svc, _) = service();
    let denied = ServiceError { code: Code::PermissionDenied, message: "permission denied".into() };
    assert!(svc.get(br#"{"modelClass":"readonly"}"#).await.is_ok());
    assert_eq!(
        svc.create(br#"{"modelClass":"readonly","data":{"a":"x"}}"#).await.unwrap_err(),
        denied
    );
    assert_eq!(
        svc.update(br#"{"modelClass":"readonly","filter":{"a":"x"},"data":{"a":"q"}}"#)
            .await
            .unwrap_err(),
        denied
    );
    assert_eq!(
        svc.delete(br#"{"modelClass":"readonly","filter":{"a":"x"}}"#).await.unwrap_err(),
        denied
    );
}

#[tokio::test]
async fn unknown_model_and_missing_storage() {
    let (svc, _) = service();
    let err = svc.get(br#"{"modelClass":"ghost"}"#).await.unwrap_err();
    assert_eq!(err, ServiceError { code: Code::InvalidArgument, message: "invalid model class".into() });

    let mut bare = ModelRegistry::new();
    bare.register(ModelDescriptor::new("items", ModelTemplate::new("items")).allow(ALL))
        .unwrap();
    let svc = QueryService::new(Arc::new(bare), StatusErrorFactory);
    let err = svc.get(br#"{"modelClass":"items"}"#).await.unwrap_err();
    assert_eq!(err, ServiceError { code: Code::Internal, message: "missing db".into() });
}

struct SlowStorage;

struct SlowQuery {
    parts: QueryParts,
}

impl Storage for SlowStorage {
    fn query(&self, _template: &ModelTemplate) -> Box<dyn QueryBuilder> {
        Box::new(SlowQuery { parts: QueryParts::default() })
    }
}

#[async_trait]
impl QueryBuilder for SlowQuery {
    fn parts(&self) -> &QueryParts {
        &self.parts
    }

    fn parts_mut(&mut self) -> &mut QueryParts {
        &mut self.parts
    }

    async fn count(&self) -> Result<i64, StorageError> {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Ok(0)
    }

    async fn find(&self) -> Result<Vec<Record>, StorageError> {
        Ok(Vec::new())
    }
}

#[tokio::test]
async fn storage_calls_honor_the_request_deadline() {
    let mut registry = ModelRegistry::new().with_default_storage(Arc::new(SlowStorage));
    registry
        .register(ModelDescriptor::new("slow", ModelTemplate::new("slow")).allow(ALL))
        .unwrap();
    let svc = QueryService::new(Arc::new(registry), StatusErrorFactory)
        .with_request_timeout(Duration::from_millis(20));

    let err = svc.get(br#"{"modelClass":"slow"}"#).await.unwrap_err();
    assert_eq!(err.code, Code::DeadlineExceeded);
}

#[tokio::test]
async fn read_only_engines_reject_writes() {
    let mut registry = ModelRegistry::new().with_default_storage(Arc::new(SlowStorage));
    registry
        .register(
            ModelDescriptor::new("slow", ModelTemplate::new("slow"))
                .allow(ALL)
                .whitelist_field("a", FieldSpec::default()),
        )
        .unwrap();
    let svc = QueryService::new(Arc::new(registry), StatusErrorFactory);

    let err = svc.create(br#"{"modelClass":"slow","data":{}}"#).await.unwrap_err();
    assert_eq!(err, ServiceError { code: Code::Unimplemented, message: "create not supported".into() });
    let err = svc.delete(br#"{"modelClass":"slow","filter":{"a":1}}"#).await.unwrap_err();
    assert_eq!(err, ServiceError { code: Code::Unimplemented, message: "delete not supported".into() });
}

#[tokio::test]
async fn in_process_client_round_trip() {
    let (svc, _) = service();
    let client = QueryClient::new(Arc::new(svc), Duration::from_secs(1));

    let options = PathMap::try_from(json!({"filter": {"a": "y"}, "sort": {"b": "ASC"}})).unwrap();
    let (rows, total) = client.get(&options).await.unwrap();
    assert_eq!(total, 5);
    assert_eq!(rows[0].get_int("id").unwrap(), 26);

    let created = client
        .create(&PathMap::try_from(json!({"data": {"id": "fixed", "a": "v"}})).unwrap())
        .await
        .unwrap();
    assert_eq!(created.get_string("id").unwrap(), "fixed");

    client
        .update(&PathMap::try_from(json!({"filter": {"a": "v"}, "data": {"b": 1}})).unwrap())
        .await
        .unwrap();
    client
        .delete(&PathMap::try_from(json!({"filter": {"a": "v"}})).unwrap())
        .await
        .unwrap();
    let (_, total) = client
        .get(&PathMap::try_from(json!({"filter": {"a": "v"}})).unwrap())
        .await
        .unwrap();
    assert_eq!(total, 0);

    let err = client
        .delete(&PathMap::try_from(json!({"filter": {"id": "fixed"}})).unwrap())
        .await
        .unwrap_err();
    assert_eq!(err.code, Code::InvalidArgument);
}
