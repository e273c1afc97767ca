//! Convert serde_json::Value to types that sqlx can bind.

use serde_json::Value;
use sqlx::postgres::{PgArguments, Postgres};
use sqlx::query::Query;

/// A value that can be bound to a PostgreSQL query. Converts from serde_json::Value.
#[derive(Clone, Debug, PartialEq)]
pub enum PgBindValue {
    Null,
    Bool(bool),
    I64(i64),
    F64(f64),
    String(String),
    Json(Value),
}

impl PgBindValue {
    pub fn from_json(v: &Value) -> Self {
        match v {
            Value::Null => PgBindValue::Null,
            Value::Bool(b) => PgBindValue::Bool(*b),
            Value::Number(n) => match (n.as_i64(), n.as_f64()) {
                (Some(i), _) => PgBindValue::I64(i),
                (None, Some(f)) => PgBindValue::F64(f),
                (None, None) => PgBindValue::String(n.to_string()),
            },
            Value::String(s) => PgBindValue::String(s.clone()),
            Value::Array(_) | Value::Object(_) => PgBindValue::Json(v.clone()),
        }
    }
}

/// Bind one JSON value with its natural PostgreSQL type.
pub fn bind_value<'q>(query: Query<'q, Postgres, PgArguments>, v: &Value) -> Query<'q, Postgres, PgArguments> {
    match PgBindValue::from_json(v) {
        PgBindValue::Null => query.bind(None::<String>),
        PgBindValue::Bool(b) => query.bind(b),
        PgBindValue::I64(n) => query.bind(n),
        PgBindValue::F64(n) => query.bind(n),
        PgBindValue::String(s) => query.bind(s),
        PgBindValue::Json(j) => query.bind(sqlx::types::Json(j)),
    }
}
