//! PostgreSQL query execution through sqlx.

use super::{ModelTemplate, QueryBuilder, QueryParts, Record, Storage};
use crate::error::StorageError;
use crate::sql::{self, bind_value, QueryBuf};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;

#[derive(Clone)]
pub struct PgStorage {
    pool: PgPool,
}

impl PgStorage {
    pub fn new(pool: PgPool) -> Self {
        PgStorage { pool }
    }

    /// Pool that connects on first use. Used for per-model databases.
    pub fn connect_lazy(database_url: &str, max_connections: u32) -> Result<Self, StorageError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect_lazy(database_url)?;
        Ok(PgStorage { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl Storage for PgStorage {
    fn query(&self, template: &ModelTemplate) -> Box<dyn QueryBuilder> {
        Box::new(PgQuery {
            pool: self.pool.clone(),
            template: template.clone(),
            parts: QueryParts::default(),
        })
    }
}

struct PgQuery {
    pool: PgPool,
    template: ModelTemplate,
    parts: QueryParts,
}

impl PgQuery {
    async fn fetch_all(&self, q: &QueryBuf) -> Result<Vec<PgRow>, StorageError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let mut query = sqlx::query(&q.sql);
        for p in &q.params {
            query = bind_value(query, p);
        }
        query.fetch_all(&self.pool).await.map_err(db_error)
    }

    async fn execute(&self, q: &QueryBuf) -> Result<u64, StorageError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "execute");
        let mut query = sqlx::query(&q.sql);
        for p in &q.params {
            query = bind_value(query, p);
        }
        let done = query.execute(&self.pool).await.map_err(db_error)?;
        Ok(done.rows_affected())
    }

    async fn fetch_records(&self, q: &QueryBuf) -> Result<Vec<Record>, StorageError> {
        let rows = self.fetch_all(q).await?;
        if q.json_rows {
            rows.iter().map(json_row_to_record).collect()
        } else {
            Ok(rows.iter().map(row_to_record).collect())
        }
    }
}

/// Unique violations become `Conflict`; everything else stays a database error.
fn db_error(err: sqlx::Error) -> StorageError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            return StorageError::Conflict(db.message().to_string());
        }
    }
    StorageError::Db(err)
}

#[async_trait]
impl QueryBuilder for PgQuery {
    fn parts(&self) -> &QueryParts {
        &self.parts
    }

    fn parts_mut(&mut self) -> &mut QueryParts {
        &mut self.parts
    }

    async fn count(&self) -> Result<i64, StorageError> {
        let q = sql::count(&self.template, &self.parts);
        let rows = self.fetch_all(&q).await?;
        match rows.first() {
            Some(row) => Ok(row.try_get::<i64, _>(0)?),
            None => Ok(0),
        }
    }

    async fn find(&self) -> Result<Vec<Record>, StorageError> {
        let q = sql::select(&self.template, &self.parts);
        self.fetch_records(&q).await
    }

    async fn create(&self, record: Record) -> Result<Record, StorageError> {
        let q = sql::insert(&self.template, &record);
        self.fetch_records(&q)
            .await?
            .into_iter()
            .next()
            .ok_or(StorageError::Db(sqlx::Error::RowNotFound))
    }

    async fn update(&self, patch: Record) -> Result<u64, StorageError> {
        match sql::update(&self.template, &self.parts, &patch) {
            Some(q) => self.execute(&q).await,
            None => Ok(0),
        }
    }

    async fn delete(&self) -> Result<u64, StorageError> {
        let q = sql::delete(&self.template, &self.parts);
        self.execute(&q).await
    }
}

/// Row whose only column is the whole record as a JSON object.
fn json_row_to_record(row: &PgRow) -> Result<Record, StorageError> {
    let doc: Value = row.try_get(0)?;
    Record::try_from(doc).map_err(|e| StorageError::Db(sqlx::Error::Decode(Box::new(e))))
}

fn row_to_record(row: &PgRow) -> Record {
    use sqlx::Column;
    let mut record = Record::new();
    for col in row.columns() {
        let name = col.name();
        record.insert(name, cell_to_value(row, name));
    }
    record
}

fn cell_to_value(row: &PgRow, name: &str) -> Value {
    if let Ok(Some(n)) = row.try_get::<Option<i16>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<i32>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<i64>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<f32>, _>(name) {
        if let Some(n) = serde_json::Number::from_f64(n as f64) {
            return Value::Number(n);
        }
    }
    if let Ok(Some(n)) = row.try_get::<Option<f64>, _>(name) {
        if let Some(n) = serde_json::Number::from_f64(n) {
            return Value::Number(n);
        }
    }
    if let Ok(Some(b)) = row.try_get::<Option<bool>, _>(name) {
        return Value::Bool(b);
    }
    if let Ok(Some(u)) = row.try_get::<Option<uuid::Uuid>, _>(name) {
        return Value::String(u.to_string());
    }
    if let Ok(Some(d)) = row.try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(name) {
        return Value::String(d.to_rfc3339());
    }
    if let Ok(Some(d)) = row.try_get::<Option<chrono::NaiveDateTime>, _>(name) {
        return Value::String(d.format("%Y-%m-%dT%H:%M:%S%.f").to_string());
    }
    if let Ok(Some(d)) = row.try_get::<Option<chrono::NaiveDate>, _>(name) {
        return Value::String(d.format("%Y-%m-%d").to_string());
    }
    if let Ok(Some(s)) = row.try_get::<Option<String>, _>(name) {
        return Value::String(s);
    }
    if let Ok(Some(j)) = row.try_get::<Option<Value>, _>(name) {
        return j;
    }
    Value::Null
}
