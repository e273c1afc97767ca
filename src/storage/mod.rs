//! Storage capability consumed by the query factory. Concrete engines:
//! PostgreSQL ([`PgStorage`]) and an in-memory table store ([`MemoryStorage`]).

mod memory;
mod postgres;

pub use memory::MemoryStorage;
pub use postgres::PgStorage;

use crate::error::StorageError;
use crate::pathmap::PathMap;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

/// One row, keyed by column name.
pub type Record = PathMap;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    /// `ASC` or `DESC`, exact case.
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "ASC" => Some(SortDirection::Asc),
            "DESC" => Some(SortDirection::Desc),
            _ => None,
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortDirection::Asc => f.write_str("ASC"),
            SortDirection::Desc => f.write_str("DESC"),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Predicate {
    /// `field = value`
    Eq { field: String, value: Value },
    /// `field IN (values...)`
    In { field: String, values: Vec<Value> },
    /// `field ->> key = value` on a JSON document column.
    JsonEq { field: String, key: String, value: String },
}

/// Accumulated clauses of one query. Shared by the storage engines.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct QueryParts {
    /// `None` selects every column.
    pub select: Option<Vec<String>>,
    pub predicates: Vec<Predicate>,
    pub order: Vec<(String, SortDirection)>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

/// Identity of a record type in storage plus the values a new record starts from.
#[derive(Clone, Debug, Default)]
pub struct ModelTemplate {
    pub schema: Option<String>,
    pub table: String,
    /// Column name -> PostgreSQL type used to cast bound parameters (e.g. "uuid").
    pub column_types: HashMap<String, String>,
    pub defaults: Record,
}

impl ModelTemplate {
    pub fn new(table: impl Into<String>) -> Self {
        ModelTemplate {
            table: table.into(),
            ..Default::default()
        }
    }

    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    pub fn with_column_type(mut self, column: impl Into<String>, pg_type: impl Into<String>) -> Self {
        self.column_types.insert(column.into(), pg_type.into());
        self
    }

    pub fn with_default(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.defaults.insert(column, value);
        self
    }

    /// Empty record of this model: its default values.
    pub fn new_record(&self) -> Record {
        self.defaults.clone()
    }

    pub fn new_collection(&self) -> Vec<Record> {
        Vec::new()
    }

    /// `schema.table`, or the bare table name.
    pub fn table_key(&self) -> String {
        match &self.schema {
            Some(schema) => format!("{}.{}", schema, self.table),
            None => self.table.clone(),
        }
    }
}

/// A query built in place, then executed by one of the terminal operations.
#[async_trait]
pub trait QueryBuilder: Send + Sync {
    fn parts(&self) -> &QueryParts;
    fn parts_mut(&mut self) -> &mut QueryParts;

    fn select(&mut self, fields: Vec<String>) {
        self.parts_mut().select = Some(fields);
    }

    /// Add a WHERE predicate; predicates are AND-ed.
    fn filter(&mut self, predicate: Predicate) {
        self.parts_mut().predicates.push(predicate);
    }

    fn order(&mut self, field: String, direction: SortDirection) {
        self.parts_mut().order.push((field, direction));
    }

    fn limit(&mut self, n: u64) {
        self.parts_mut().limit = Some(n);
    }

    fn offset(&mut self, n: u64) {
        self.parts_mut().offset = Some(n);
    }

    /// Rows matching the predicates, ignoring projection, order and pagination.
    async fn count(&self) -> Result<i64, StorageError>;
    async fn find(&self) -> Result<Vec<Record>, StorageError>;

    // Writes default to `Unsupported` so read-only engines only implement the reads.

    /// Insert one record; returns it as stored (generated columns filled in).
    /// A taken unique key is `StorageError::Conflict`.
    async fn create(&self, _record: Record) -> Result<Record, StorageError> {
        Err(StorageError::Unsupported("create".into()))
    }

    /// Apply `patch` to every matching row. Returns rows affected.
    async fn update(&self, _patch: Record) -> Result<u64, StorageError> {
        Err(StorageError::Unsupported("update".into()))
    }

    /// Delete every matching row. Returns rows affected.
    async fn delete(&self) -> Result<u64, StorageError> {
        Err(StorageError::Unsupported("delete".into()))
    }
}

/// A storage handle: hands out fresh queries for a model.
pub trait Storage: Send + Sync + 'static {
    fn query(&self, template: &ModelTemplate) -> Box<dyn QueryBuilder>;
}
