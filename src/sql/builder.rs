//! Builds parameterized SELECT, COUNT, INSERT, UPDATE, DELETE from query parts.

use crate::storage::{ModelTemplate, Predicate, QueryParts, Record};
use serde_json::Value;

/// Quote identifier for PostgreSQL. Request-supplied names are safe once quoted.
pub fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

/// Full qualified table name.
pub fn qualified_table(template: &ModelTemplate) -> String {
    match &template.schema {
        Some(schema) => format!("{}.{}", quoted(schema), quoted(&template.table)),
        None => quoted(&template.table),
    }
}

/// Alias of the table row when a whole row is read back as one JSON document.
const ROW_ALIAS: &str = "_row";

/// String literal for PostgreSQL.
fn literal(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

/// Declared types sqlx has no JSON decoding for: `numeric`/`decimal` (with or
/// without precision) and custom enums (`schema.typename`). Read back as `::text`.
fn reads_as_text(pg_type: &str) -> bool {
    let base = pg_type.split('(').next().unwrap_or_default().trim().to_ascii_lowercase();
    base.contains('.') || base == "numeric" || base == "decimal"
}

/// Columns of the template read back as text, sorted for stable SQL.
fn text_columns(template: &ModelTemplate) -> Vec<&str> {
    let mut cols: Vec<&str> = template
        .column_types
        .iter()
        .filter(|(_, t)| reads_as_text(t))
        .map(|(c, _)| c.as_str())
        .collect();
    cols.sort_unstable();
    cols
}

#[derive(Debug, Default)]
pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<Value>,
    /// Each result row is a single JSON object column.
    pub json_rows: bool,
}

impl QueryBuf {
    fn new() -> Self {
        Self::default()
    }

    fn push_param(&mut self, v: Value) -> u32 {
        let n = self.params.len() as u32 + 1;
        self.params.push(v);
        n
    }

    /// Push a value for `column`, returning its placeholder with the column's cast if declared.
    fn placeholder(&mut self, template: &ModelTemplate, column: &str, v: Value) -> String {
        let n = self.push_param(v);
        template
            .column_types
            .get(column)
            .map(|t| format!("${}::{}", n, t))
            .unwrap_or_else(|| format!("${}", n))
    }
}

fn where_clause(template: &ModelTemplate, predicates: &[Predicate], q: &mut QueryBuf) -> String {
    let mut parts = Vec::with_capacity(predicates.len());
    for p in predicates {
        match p {
            Predicate::Eq { field, value } => {
                let ph = q.placeholder(template, field, value.clone());
                parts.push(format!("{} = {}", quoted(field), ph));
            }
            Predicate::In { field, values } => {
                if values.is_empty() {
                    parts.push("1 = 0".to_string());
                    continue;
                }
                let phs: Vec<String> = values
                    .iter()
                    .map(|v| q.placeholder(template, field, v.clone()))
                    .collect();
                parts.push(format!("{} IN ({})", quoted(field), phs.join(", ")));
            }
            Predicate::JsonEq { field, key, value } => {
                let k = q.push_param(Value::String(key.clone()));
                let v = q.push_param(Value::String(value.clone()));
                parts.push(format!("{}::jsonb ->> ${}::text = ${}", quoted(field), k, v));
            }
        }
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", parts.join(" AND "))
    }
}

/// Whole-row output when some columns read as text: the row as one jsonb
/// document with those columns overridden by their text form. `None` means
/// plain `*`.
fn whole_row(template: &ModelTemplate) -> Option<String> {
    let text = text_columns(template);
    if text.is_empty() {
        return None;
    }
    let alias = quoted(ROW_ALIAS);
    let overrides: Vec<String> = text
        .iter()
        .map(|c| format!("{}, {}.{}::text", literal(c), alias, quoted(c)))
        .collect();
    Some(format!(
        "to_jsonb({}) || jsonb_build_object({}) AS {}",
        alias,
        overrides.join(", "),
        alias
    ))
}

/// Column list of a projected SELECT; text-read columns keep their name.
fn select_column_list(template: &ModelTemplate, fields: &[String]) -> String {
    fields
        .iter()
        .map(|f| {
            let q = quoted(f);
            match template.column_types.get(f) {
                Some(t) if reads_as_text(t) => format!("{}::text AS {}", q, q),
                _ => q,
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Output list and FROM/INTO target; the target gets the row alias when the
/// output is a whole-row JSON document.
fn output_and_target(template: &ModelTemplate, select: Option<&[String]>, q: &mut QueryBuf) -> (String, String) {
    let table = qualified_table(template);
    match select {
        Some(fields) if !fields.is_empty() => (select_column_list(template, fields), table),
        _ => match whole_row(template) {
            Some(row) => {
                q.json_rows = true;
                (row, format!("{} AS {}", table, quoted(ROW_ALIAS)))
            }
            None => ("*".to_string(), table),
        },
    }
}

/// SELECT with projection, predicates, ORDER BY, LIMIT/OFFSET.
pub fn select(template: &ModelTemplate, parts: &QueryParts) -> QueryBuf {
    let mut q = QueryBuf::new();
    let (columns, table) = output_and_target(template, parts.select.as_deref(), &mut q);
    let where_sql = where_clause(template, &parts.predicates, &mut q);
    let order_sql = if parts.order.is_empty() {
        String::new()
    } else {
        let terms: Vec<String> = parts
            .order
            .iter()
            .map(|(field, dir)| format!("{} {}", quoted(field), dir))
            .collect();
        format!(" ORDER BY {}", terms.join(", "))
    };
    let limit_sql = parts.limit.map(|n| format!(" LIMIT {}", n)).unwrap_or_default();
    let offset_sql = parts.offset.map(|n| format!(" OFFSET {}", n)).unwrap_or_default();
    q.sql = format!(
        "SELECT {} FROM {}{}{}{}{}",
        columns,
        table,
        where_sql,
        order_sql,
        limit_sql,
        offset_sql
    );
    q
}

/// COUNT(*) over the predicates only.
pub fn count(template: &ModelTemplate, parts: &QueryParts) -> QueryBuf {
    let mut q = QueryBuf::new();
    let table = qualified_table(template);
    let where_sql = where_clause(template, &parts.predicates, &mut q);
    q.sql = format!("SELECT COUNT(*) FROM {}{}", table, where_sql);
    q
}

/// INSERT every key of the record; nested maps and arrays bind as JSON.
pub fn insert(template: &ModelTemplate, record: &Record) -> QueryBuf {
    let mut q = QueryBuf::new();
    let (returning, table) = output_and_target(template, None, &mut q);
    if record.is_empty() {
        q.sql = format!("INSERT INTO {} DEFAULT VALUES RETURNING {}", table, returning);
        return q;
    }
    let mut cols = Vec::with_capacity(record.len());
    let mut placeholders = Vec::with_capacity(record.len());
    for (name, v) in record.iter() {
        placeholders.push(q.placeholder(template, name, v.clone()));
        cols.push(quoted(name));
    }
    q.sql = format!(
        "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
        table,
        cols.join(", "),
        placeholders.join(", "),
        returning
    );
    q
}

/// UPDATE matching rows, SET only the keys present in the patch. `None` for an empty patch.
pub fn update(template: &ModelTemplate, parts: &QueryParts, patch: &Record) -> Option<QueryBuf> {
    if patch.is_empty() {
        return None;
    }
    let mut q = QueryBuf::new();
    let table = qualified_table(template);
    let sets: Vec<String> = patch
        .iter()
        .map(|(name, v)| format!("{} = {}", quoted(name), q.placeholder(template, name, v.clone())))
        .collect();
    let where_sql = where_clause(template, &parts.predicates, &mut q);
    q.sql = format!("UPDATE {} SET {}{}", table, sets.join(", "), where_sql);
    Some(q)
}

pub fn delete(template: &ModelTemplate, parts: &QueryParts) -> QueryBuf {
    let mut q = QueryBuf::new();
    let table = qualified_table(template);
    let where_sql = where_clause(template, &parts.predicates, &mut q);
    q.sql = format!("DELETE FROM {}{}", table, where_sql);
    q
}
