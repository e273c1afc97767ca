//! In-memory table store evaluating the same query parts as the SQL engine.
//! Used for tests and demos; rows are kept per `schema.table`.

use super::{ModelTemplate, Predicate, QueryBuilder, QueryParts, Record, SortDirection, Storage};
use crate::error::StorageError;
use async_trait::async_trait;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Column filled with a v4 UUID when a created record has none.
const ID_COLUMN: &str = "id";

#[derive(Clone, Default)]
pub struct MemoryStorage {
    tables: Arc<RwLock<HashMap<String, Vec<Record>>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed rows as-is (no id generation).
    pub fn insert_rows(
        &self,
        template: &ModelTemplate,
        rows: impl IntoIterator<Item = Record>,
    ) -> Result<(), StorageError> {
        let mut tables = self.tables.write().map_err(|_| StorageError::Poisoned)?;
        tables.entry(template.table_key()).or_default().extend(rows);
        Ok(())
    }

    /// Snapshot of every row of a table.
    pub fn rows(&self, template: &ModelTemplate) -> Result<Vec<Record>, StorageError> {
        let tables = self.tables.read().map_err(|_| StorageError::Poisoned)?;
        Ok(tables.get(&template.table_key()).cloned().unwrap_or_default())
    }
}

impl Storage for MemoryStorage {
    fn query(&self, template: &ModelTemplate) -> Box<dyn QueryBuilder> {
        Box::new(MemoryQuery {
            store: self.clone(),
            table: template.table_key(),
            parts: QueryParts::default(),
        })
    }
}

struct MemoryQuery {
    store: MemoryStorage,
    table: String,
    parts: QueryParts,
}

fn compare_values(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

fn same(left: &Value, right: &Value) -> bool {
    compare_values(left, right) == Some(Ordering::Equal)
}

/// Text of `doc ->> key`, where `doc` is a JSON object or a string holding one.
fn json_text(doc: &Value, key: &str) -> Option<String> {
    let parsed;
    let doc = match doc {
        Value::String(s) => {
            parsed = serde_json::from_str::<Value>(s).ok()?;
            &parsed
        }
        other => other,
    };
    match doc.get(key)? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn matches(record: &Record, predicate: &Predicate) -> bool {
    match predicate {
        Predicate::Eq { field, value } => record.as_map().get(field).is_some_and(|v| same(v, value)),
        Predicate::In { field, values } => record
            .as_map()
            .get(field)
            .is_some_and(|v| values.iter().any(|candidate| same(v, candidate))),
        Predicate::JsonEq { field, key, value } => record
            .as_map()
            .get(field)
            .and_then(|doc| json_text(doc, key))
            .is_some_and(|text| text == *value),
    }
}

fn to_usize(n: u64) -> usize {
    usize::try_from(n).unwrap_or(usize::MAX)
}

impl MemoryQuery {
    fn matches_all(&self, record: &Record) -> bool {
        self.parts.predicates.iter().all(|p| matches(record, p))
    }

    fn ordering(&self, a: &Record, b: &Record) -> Ordering {
        for (field, direction) in &self.parts.order {
            let ord = match (a.as_map().get(field), b.as_map().get(field)) {
                (Some(x), Some(y)) => compare_values(x, y).unwrap_or(Ordering::Equal),
                (None, Some(_)) => Ordering::Less,
                (Some(_), None) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            };
            let ord = match direction {
                SortDirection::Asc => ord,
                SortDirection::Desc => ord.reverse(),
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    }

    fn project(&self, record: Record) -> Record {
        match &self.parts.select {
            Some(fields) if !fields.is_empty() => record
                .into_map()
                .into_iter()
                .filter(|(k, _)| fields.iter().any(|f| f == k))
                .collect(),
            _ => record,
        }
    }
}

#[async_trait]
impl QueryBuilder for MemoryQuery {
    fn parts(&self) -> &QueryParts {
        &self.parts
    }

    fn parts_mut(&mut self) -> &mut QueryParts {
        &mut self.parts
    }

    async fn count(&self) -> Result<i64, StorageError> {
        let tables = self.store.tables.read().map_err(|_| StorageError::Poisoned)?;
        let n = tables
            .get(&self.table)
            .map(|rows| rows.iter().filter(|r| self.matches_all(r)).count())
            .unwrap_or(0);
        Ok(n as i64)
    }

    async fn find(&self) -> Result<Vec<Record>, StorageError> {
        let mut rows: Vec<Record> = {
            let tables = self.store.tables.read().map_err(|_| StorageError::Poisoned)?;
            tables
                .get(&self.table)
                .map(|rows| rows.iter().filter(|r| self.matches_all(r)).cloned().collect())
                .unwrap_or_default()
        };
        rows.sort_by(|a, b| self.ordering(a, b));
        let page = rows.into_iter().skip(to_usize(self.parts.offset.unwrap_or(0)));
        let page: Vec<Record> = match self.parts.limit {
            Some(n) => page.take(to_usize(n)).collect(),
            None => page.collect(),
        };
        Ok(page.into_iter().map(|r| self.project(r)).collect())
    }

    async fn create(&self, mut record: Record) -> Result<Record, StorageError> {
        if !record.contains_key(ID_COLUMN) {
            record.insert(ID_COLUMN, uuid::Uuid::new_v4().to_string());
        }
        let mut tables = self.store.tables.write().map_err(|_| StorageError::Poisoned)?;
        let rows = tables.entry(self.table.clone()).or_default();
        if let Some(id) = record.as_map().get(ID_COLUMN).filter(|id| !id.is_null()) {
            if rows.iter().any(|r| r.as_map().get(ID_COLUMN).is_some_and(|x| same(x, id))) {
                return Err(StorageError::Conflict(format!("{} {} already exists", ID_COLUMN, id)));
            }
        }
        rows.push(record.clone());
        Ok(record)
    }

    async fn update(&self, patch: Record) -> Result<u64, StorageError> {
        let mut tables = self.store.tables.write().map_err(|_| StorageError::Poisoned)?;
        let Some(rows) = tables.get_mut(&self.table) else {
            return Ok(0);
        };
        let mut affected = 0u64;
        for row in rows.iter_mut().filter(|r| self.matches_all(r)) {
            for (k, v) in patch.iter() {
                row.insert(k.clone(), v.clone());
            }
            affected += 1;
        }
        Ok(affected)
    }

    async fn delete(&self) -> Result<u64, StorageError> {
        let mut tables = self.store.tables.write().map_err(|_| StorageError::Poisoned)?;
        let Some(rows) = tables.get_mut(&self.table) else {
            return Ok(0);
        };
        let before = rows.len();
        rows.retain(|r| !self.matches_all(r));
        Ok((before - rows.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rec(v: Value) -> Record {
        Record::try_from(v).unwrap()
    }

    fn seeded() -> (MemoryStorage, ModelTemplate) {
        let store = MemoryStorage::new();
        let template = ModelTemplate::new("items");
        store
            .insert_rows(
                &template,
                vec![
                    rec(json!({"id": 1, "name": "b", "qty": 5, "tags": "{\"app\":\"A\"}"})),
                    rec(json!({"id": 2, "name": "a", "qty": 7, "tags": {"app": "B"}})),
                    rec(json!({"id": 3, "name": "c", "qty": 5.0})),
                ],
            )
            .unwrap();
        (store, template)
    }

    #[tokio::test]
    async fn filters_numbers_loosely() {
        let (store, template) = seeded();
        let mut q = store.query(&template);
        q.filter(Predicate::Eq { field: "qty".into(), value: json!(5) });
        assert_eq!(q.count().await.unwrap(), 2);

        let mut q = store.query(&template);
        q.filter(Predicate::In { field: "name".into(), values: vec![json!("a"), json!("c")] });
        assert_eq!(q.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn json_predicate_reads_text_and_objects() {
        let (store, template) = seeded();
        let mut q = store.query(&template);
        q.filter(Predicate::JsonEq { field: "tags".into(), key: "app".into(), value: "A".into() });
        let rows = q.find().await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get_int("id").unwrap(), 1);

        let mut q = store.query(&template);
        q.filter(Predicate::JsonEq { field: "tags".into(), key: "app".into(), value: "B".into() });
        assert_eq!(q.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn orders_pages_and_projects() {
        let (store, template) = seeded();
        let mut q = store.query(&template);
        q.order("name".into(), SortDirection::Desc);
        q.select(vec!["name".into()]);
        q.limit(2);
        q.offset(1);
        let rows = q.find().await.unwrap();
        let names: Vec<_> = rows.iter().map(|r| r.get_string("name").unwrap().to_string()).collect();
        assert_eq!(names, vec!["b", "a"]);
        assert_eq!(rows[0].len(), 1);

        let mut q = store.query(&template);
        q.select(Vec::new());
        let rows = q.find().await.unwrap();
        assert_eq!(rows[0].len(), 4, "an empty column list selects every column like SELECT *");
    }

    #[tokio::test]
    async fn create_fills_id() {
        let store = MemoryStorage::new();
        let template = ModelTemplate::new("notes");
        let created = store.query(&template).create(rec(json!({"body": "x"}))).await.unwrap();
        assert!(uuid::Uuid::parse_str(created.get_string("id").unwrap()).is_ok());
        let kept = store.query(&template).create(rec(json!({"id": 9}))).await.unwrap();
        assert_eq!(kept.get_int("id").unwrap(), 9);
        assert_eq!(store.rows(&template).unwrap().len(), 2);

        let dup = store.query(&template).create(rec(json!({"id": 9.0, "body": "y"}))).await;
        assert!(matches!(dup, Err(StorageError::Conflict(_))));
        assert_eq!(store.rows(&template).unwrap().len(), 2);
    }

    #[tokio::test]
    async fn update_and_delete_matching_rows() {
        let (store, template) = seeded();
        let mut q = store.query(&template);
        q.filter(Predicate::Eq { field: "qty".into(), value: json!(5) });
        assert_eq!(q.update(rec(json!({"name": "z"}))).await.unwrap(), 2);

        let mut q = store.query(&template);
        q.filter(Predicate::Eq { field: "name".into(), value: json!("z") });
        assert_eq!(q.delete().await.unwrap(), 2);
        assert_eq!(store.rows(&template).unwrap().len(), 1);
    }
}
